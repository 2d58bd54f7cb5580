//! Address repository interface

use async_trait::async_trait;

use super::model::Address;
use crate::domain::DomainResult;
use crate::shared::types::pagination::{PaginatedResult, PaginationParams};

#[async_trait]
pub trait AddressRepository: Send + Sync {
    async fn create(&self, address: Address) -> DomainResult<()>;
    async fn find_by_id(&self, id: &str) -> DomainResult<Option<Address>>;
    async fn find_many(&self, ids: &[String]) -> DomainResult<Vec<Address>>;
    async fn list(
        &self,
        search: Option<&str>,
        page: PaginationParams,
    ) -> DomainResult<PaginatedResult<Address>>;
    async fn update(&self, address: Address) -> DomainResult<()>;
    /// Deletion fails while any stop still references the address.
    async fn delete(&self, id: &str) -> DomainResult<()>;
    async fn has_dependent_stops(&self, id: &str) -> DomainResult<bool>;
}
