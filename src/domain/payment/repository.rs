//! Payment repository interface

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::model::{Payment, PaymentVerification};
use crate::domain::DomainResult;

#[async_trait]
pub trait PaymentRepository: Send + Sync {
    async fn create(&self, payment: Payment) -> DomainResult<()>;
    async fn find_by_id(&self, id: &str) -> DomainResult<Option<Payment>>;
    async fn list_by_stop(&self, stop_id: &str) -> DomainResult<Vec<Payment>>;
    /// Inbound payment webhooks reference payments by processor transaction id.
    async fn find_by_transaction_id(&self, transaction_id: &str) -> DomainResult<Option<Payment>>;
    /// PENDING -> VERIFIED/REJECTED, first-writer-wins.
    async fn set_verification_if_pending(
        &self,
        id: &str,
        status: PaymentVerification,
        verified_by: Option<String>,
        verified_at: DateTime<Utc>,
    ) -> DomainResult<bool>;
}
