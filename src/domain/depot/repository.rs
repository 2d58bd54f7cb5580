//! Depot repository interface

use async_trait::async_trait;

use super::model::Depot;
use crate::domain::DomainResult;

#[async_trait]
pub trait DepotRepository: Send + Sync {
    /// Creating or updating a depot with `is_default=true` clears the flag
    /// on every other depot in the same transaction.
    async fn save(&self, depot: Depot) -> DomainResult<()>;
    async fn find_by_id(&self, id: &str) -> DomainResult<Option<Depot>>;
    async fn find_default(&self) -> DomainResult<Option<Depot>>;
    async fn list(&self) -> DomainResult<Vec<Depot>>;
    async fn delete(&self, id: &str) -> DomainResult<()>;
}
