//! Session management: login, single-use refresh rotation, logout
//!
//! Access and refresh tokens are independent JWT families. Refresh tokens
//! are stored by hash only and are strictly single-use: rotation revokes
//! the presented token and issues a replacement in one atomic step, so a
//! replayed token always fails - and the failure never discloses whether
//! the token ever existed.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::refresh_token::RefreshTokenRecord;
use crate::domain::user::User;
use crate::domain::{DomainError, DomainResult, RepositoryProvider};
use crate::infrastructure::crypto::jwt::{
    create_access_token, create_refresh_token, verify_refresh_token, JwtConfig,
};
use crate::infrastructure::crypto::password::verify_password;
use crate::infrastructure::crypto::signature::token_hash;

#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug)]
pub struct LoginOutcome {
    pub user: User,
    pub tokens: TokenPair,
    pub device_id: String,
}

pub struct SessionService {
    repos: Arc<dyn RepositoryProvider>,
    jwt: JwtConfig,
}

impl SessionService {
    pub fn new(repos: Arc<dyn RepositoryProvider>, jwt: JwtConfig) -> Self {
        Self { repos, jwt }
    }

    pub fn jwt_config(&self) -> &JwtConfig {
        &self.jwt
    }

    fn issue_pair(&self, user: &User) -> DomainResult<TokenPair> {
        let access_token =
            create_access_token(&user.id, &user.email, user.role.as_str(), &self.jwt)
                .map_err(|err| DomainError::Internal(format!("token signing failed: {err}")))?;
        let refresh_token = create_refresh_token(&user.id, &self.jwt)
            .map_err(|err| DomainError::Internal(format!("token signing failed: {err}")))?;
        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    fn refresh_record(&self, user_id: &str, refresh_token: &str, device_id: &str, device_info: Option<String>) -> RefreshTokenRecord {
        let now = Utc::now();
        RefreshTokenRecord {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            token_hash: token_hash(refresh_token),
            device_id: device_id.to_string(),
            device_info,
            issued_at: now,
            expires_at: now + Duration::days(self.jwt.refresh_token_days),
            revoked_at: None,
        }
    }

    /// Authenticate and open (or replace) the session for this device.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        device_id: Option<String>,
        device_info: Option<String>,
    ) -> DomainResult<LoginOutcome> {
        let email = email.trim().to_lowercase();
        let user = self.repos.users().find_by_email(&email).await?;

        let Some(user) = user else {
            return Err(DomainError::Unauthenticated("Invalid credentials".into()));
        };
        if !user.is_active {
            return Err(DomainError::Unauthenticated("Account is disabled".into()));
        }
        if !verify_password(password, &user.password_hash).unwrap_or(false) {
            return Err(DomainError::Unauthenticated("Invalid credentials".into()));
        }

        let device_id = device_id
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let tokens = self.issue_pair(&user)?;
        let record = self.refresh_record(&user.id, &tokens.refresh_token, &device_id, device_info);
        self.repos.refresh_tokens().create_for_device(record).await?;

        let now = Utc::now();
        self.repos.users().set_last_login(&user.id, now).await?;

        info!(user_id = %user.id, device_id = %device_id, "User logged in");

        Ok(LoginOutcome {
            user,
            tokens,
            device_id,
        })
    }

    /// Exchange a refresh token for a new pair. Single-use: the presented
    /// token is revoked in the same atomic step that admits it, and a
    /// replay - including the loser of a concurrent double-refresh - gets
    /// `TokenInvalid`.
    pub async fn refresh(&self, presented: &str) -> DomainResult<(User, TokenPair)> {
        let claims =
            verify_refresh_token(presented, &self.jwt).map_err(|_| DomainError::TokenInvalid)?;

        let user = self
            .repos
            .users()
            .find_by_id(&claims.sub)
            .await?
            .filter(|u| u.is_active)
            .ok_or(DomainError::TokenInvalid)?;

        let tokens = self.issue_pair(&user)?;
        // Device binding is carried over from the consumed row by the store.
        let replacement = self.refresh_record(&user.id, &tokens.refresh_token, "", None);

        let now = Utc::now();
        let consumed = self
            .repos
            .refresh_tokens()
            .rotate(&user.id, &token_hash(presented), now, replacement)
            .await?;

        match consumed {
            Some(old) => {
                info!(user_id = %user.id, device_id = %old.device_id, "Refresh token rotated");
                Ok((user, tokens))
            }
            None => {
                // Either expired/revoked, or a replay of an already-rotated
                // token. Audit and fail without detail.
                warn!(user_id = %user.id, "Refresh token replay or reuse detected");
                Err(DomainError::TokenInvalid)
            }
        }
    }

    /// Revoke one session (by presented refresh token).
    pub async fn logout(&self, user_id: &str, refresh_token: &str) -> DomainResult<bool> {
        let revoked = self
            .repos
            .refresh_tokens()
            .revoke_by_hash(user_id, &token_hash(refresh_token), Utc::now())
            .await?;
        if revoked {
            info!(user_id, "Session revoked");
        }
        Ok(revoked)
    }

    /// Revoke every session for the user and drop the push token, so a
    /// lost device stops receiving dispatch notifications.
    pub async fn logout_all(&self, user_id: &str) -> DomainResult<u64> {
        let revoked = self
            .repos
            .refresh_tokens()
            .revoke_all_for_user(user_id, Utc::now())
            .await?;
        self.repos.users().set_push_token(user_id, None).await?;
        info!(user_id, revoked, "All sessions revoked");
        Ok(revoked)
    }
}
