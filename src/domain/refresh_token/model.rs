//! Refresh token persistence record

use chrono::{DateTime, Utc};

/// One issued refresh token, stored by hash only.
///
/// Invariant: at most one row per (user_id, device_id) with
/// `revoked_at = NULL` at any instant.
#[derive(Debug, Clone)]
pub struct RefreshTokenRecord {
    pub id: String,
    pub user_id: String,
    /// SHA-256 hex of the refresh JWT. The token itself is never stored.
    pub token_hash: String,
    pub device_id: String,
    pub device_info: Option<String>,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
}

impl RefreshTokenRecord {
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        self.revoked_at.is_none() && self.expires_at > now
    }
}
