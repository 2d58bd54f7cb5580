//! Settings repository interface

use async_trait::async_trait;

use crate::domain::DomainResult;

#[async_trait]
pub trait SettingsRepository: Send + Sync {
    async fn get(&self, key: &str) -> DomainResult<Option<serde_json::Value>>;
    async fn put(&self, key: &str, value: serde_json::Value) -> DomainResult<()>;
}
