//! User repository interface

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::model::User;
use crate::domain::DomainResult;
use crate::shared::types::pagination::{PaginatedResult, PaginationParams};

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: User) -> DomainResult<()>;
    async fn find_by_id(&self, id: &str) -> DomainResult<Option<User>>;
    /// Lookup by lowercased email.
    async fn find_by_email(&self, email: &str) -> DomainResult<Option<User>>;
    async fn list(&self, page: PaginationParams) -> DomainResult<PaginatedResult<User>>;
    async fn list_drivers(&self) -> DomainResult<Vec<User>>;
    async fn update(&self, user: User) -> DomainResult<()>;
    async fn delete(&self, id: &str) -> DomainResult<()>;
    async fn set_push_token(&self, user_id: &str, token: Option<String>) -> DomainResult<()>;
    async fn set_last_login(&self, user_id: &str, at: DateTime<Utc>) -> DomainResult<()>;
    async fn count(&self) -> DomainResult<u64>;
}
