//! Refresh token repository interface
//!
//! The conditional find-and-revoke in `rotate` is the concurrency primitive
//! behind single-use refresh: two concurrent refreshes presenting the same
//! token race on the `revoked_at IS NULL` predicate and exactly one wins.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::model::RefreshTokenRecord;
use crate::domain::DomainResult;

#[async_trait]
pub trait RefreshTokenRepository: Send + Sync {
    /// Inserts a new record, first revoking any prior non-revoked record for
    /// the same (user_id, device_id) in the same transaction.
    async fn create_for_device(&self, record: RefreshTokenRecord) -> DomainResult<()>;

    /// Atomically: find the row matching (user_id, token_hash,
    /// revoked_at IS NULL, expires_at > now), mark it revoked, and insert
    /// `replacement` carrying over the device binding. Returns the consumed
    /// row, or None when no live row matched (expired, revoked or replayed).
    async fn rotate(
        &self,
        user_id: &str,
        token_hash: &str,
        now: DateTime<Utc>,
        replacement: RefreshTokenRecord,
    ) -> DomainResult<Option<RefreshTokenRecord>>;

    /// Revoke the single live row matching this hash. Returns false when no
    /// live row matched.
    async fn revoke_by_hash(
        &self,
        user_id: &str,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> DomainResult<bool>;

    /// Revoke every live row for the user. Returns the number revoked.
    async fn revoke_all_for_user(&self, user_id: &str, now: DateTime<Utc>) -> DomainResult<u64>;

    async fn find_live_by_hash(
        &self,
        user_id: &str,
        token_hash: &str,
    ) -> DomainResult<Option<RefreshTokenRecord>>;
}
