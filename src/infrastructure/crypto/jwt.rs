//! JWT token handling
//!
//! Two independent token families with independent signing secrets:
//! short-lived access tokens carrying identity claims, and 7-day refresh
//! tokens carrying only the subject and a `type=refresh` marker.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

const REFRESH_TOKEN_TYPE: &str = "refresh";

/// JWT configuration
#[derive(Clone)]
pub struct JwtConfig {
    /// Secret for signing access tokens
    pub access_secret: String,
    /// Secret for signing refresh tokens
    pub refresh_secret: String,
    /// Access token lifetime in minutes (recommended 15 min - 4 h)
    pub access_token_minutes: i64,
    /// Refresh token lifetime in days
    pub refresh_token_days: i64,
    /// Issuer claim
    pub issuer: String,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            access_secret: std::env::var("JWT_ACCESS_SECRET")
                .unwrap_or_else(|_| "change-me-access-secret-at-least-32ch".to_string()),
            refresh_secret: std::env::var("JWT_REFRESH_SECRET")
                .unwrap_or_else(|_| "change-me-refresh-secret-at-least-32c".to_string()),
            access_token_minutes: 60,
            refresh_token_days: 7,
            issuer: "dispatch-service".to_string(),
        }
    }
}

/// Access token claims
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AccessClaims {
    /// Subject (user ID)
    pub sub: String,
    pub email: String,
    pub role: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    pub iss: String,
}

impl AccessClaims {
    pub fn new(user_id: &str, email: &str, role: &str, config: &JwtConfig) -> Self {
        let now = Utc::now();
        let exp = now + Duration::minutes(config.access_token_minutes);

        Self {
            sub: user_id.to_string(),
            email: email.to_string(),
            role: role.to_string(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
            iss: config.issuer.clone(),
        }
    }
}

/// Refresh token claims
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RefreshClaims {
    pub sub: String,
    #[serde(rename = "type")]
    pub token_type: String,
    pub exp: i64,
    pub iat: i64,
    pub iss: String,
}

impl RefreshClaims {
    pub fn new(user_id: &str, config: &JwtConfig) -> Self {
        let now = Utc::now();
        let exp = now + Duration::days(config.refresh_token_days);

        Self {
            sub: user_id.to_string(),
            token_type: REFRESH_TOKEN_TYPE.to_string(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
            iss: config.issuer.clone(),
        }
    }
}

pub fn create_access_token(
    user_id: &str,
    email: &str,
    role: &str,
    config: &JwtConfig,
) -> Result<String, jsonwebtoken::errors::Error> {
    let claims = AccessClaims::new(user_id, email, role, config);
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.access_secret.as_bytes()),
    )
}

pub fn verify_access_token(
    token: &str,
    config: &JwtConfig,
) -> Result<AccessClaims, jsonwebtoken::errors::Error> {
    let mut validation = Validation::default();
    validation.set_issuer(&[&config.issuer]);

    let token_data = decode::<AccessClaims>(
        token,
        &DecodingKey::from_secret(config.access_secret.as_bytes()),
        &validation,
    )?;

    Ok(token_data.claims)
}

pub fn create_refresh_token(
    user_id: &str,
    config: &JwtConfig,
) -> Result<String, jsonwebtoken::errors::Error> {
    let claims = RefreshClaims::new(user_id, config);
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.refresh_secret.as_bytes()),
    )
}

/// Verify signature, expiry and the `type=refresh` marker.
pub fn verify_refresh_token(
    token: &str,
    config: &JwtConfig,
) -> Result<RefreshClaims, jsonwebtoken::errors::Error> {
    let mut validation = Validation::default();
    validation.set_issuer(&[&config.issuer]);

    let token_data = decode::<RefreshClaims>(
        token,
        &DecodingKey::from_secret(config.refresh_secret.as_bytes()),
        &validation,
    )?;

    if token_data.claims.token_type != REFRESH_TOKEN_TYPE {
        return Err(jsonwebtoken::errors::ErrorKind::InvalidToken.into());
    }

    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> JwtConfig {
        JwtConfig {
            access_secret: "test-access-secret-0123456789abcdef".to_string(),
            refresh_secret: "test-refresh-secret-0123456789abcde".to_string(),
            access_token_minutes: 60,
            refresh_token_days: 7,
            issuer: "dispatch-service".to_string(),
        }
    }

    #[test]
    fn access_token_round_trip() {
        let cfg = config();
        let token = create_access_token("u1", "driver@example.com", "DRIVER", &cfg).unwrap();
        let claims = verify_access_token(&token, &cfg).unwrap();
        assert_eq!(claims.sub, "u1");
        assert_eq!(claims.email, "driver@example.com");
        assert_eq!(claims.role, "DRIVER");
    }

    #[test]
    fn refresh_token_round_trip() {
        let cfg = config();
        let token = create_refresh_token("u1", &cfg).unwrap();
        let claims = verify_refresh_token(&token, &cfg).unwrap();
        assert_eq!(claims.sub, "u1");
        assert_eq!(claims.token_type, "refresh");
    }

    #[test]
    fn token_families_do_not_cross_verify() {
        let cfg = config();
        let access = create_access_token("u1", "a@b.c", "ADMIN", &cfg).unwrap();
        let refresh = create_refresh_token("u1", &cfg).unwrap();

        // An access token is not a valid refresh token and vice versa:
        // different secrets, different claim shapes.
        assert!(verify_refresh_token(&access, &cfg).is_err());
        assert!(verify_access_token(&refresh, &cfg).is_err());
    }

    #[test]
    fn wrong_issuer_is_rejected() {
        let cfg = config();
        let mut other = config();
        other.issuer = "someone-else".to_string();
        let token = create_access_token("u1", "a@b.c", "ADMIN", &other).unwrap();
        assert!(verify_access_token(&token, &cfg).is_err());
    }
}
