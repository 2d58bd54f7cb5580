//! Authentication middleware
//!
//! Verifies the Bearer access token and attaches the authenticated user to
//! the request. Revoked sessions keep their already-issued access tokens
//! until natural expiry; only the refresh path checks the store.

use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::domain::user::UserRole;
use crate::infrastructure::crypto::jwt::{verify_access_token, AccessClaims, JwtConfig};

/// Authentication state for the middleware
#[derive(Clone)]
pub struct AuthState {
    pub jwt_config: JwtConfig,
}

/// Authenticated caller, extracted from verified access-token claims.
#[derive(Clone, Debug)]
pub struct AuthenticatedUser {
    pub user_id: String,
    pub email: String,
    pub role: String,
}

impl AuthenticatedUser {
    pub fn from_claims(claims: AccessClaims) -> Self {
        Self {
            user_id: claims.sub,
            email: claims.email,
            role: claims.role,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin.as_str()
    }

    pub fn is_driver(&self) -> bool {
        self.role == UserRole::Driver.as_str()
    }
}

fn extract_token(auth_header: &str) -> Option<&str> {
    auth_header.strip_prefix("Bearer ")
}

/// JWT authentication middleware
pub async fn auth_middleware(
    State(auth_state): State<AuthState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .map(String::from);
    let Some(auth_header) = auth_header else {
        return auth_error_response("Missing authentication token");
    };

    let Some(token) = extract_token(&auth_header) else {
        return auth_error_response("Invalid authentication token");
    };

    match verify_access_token(token, &auth_state.jwt_config) {
        Ok(claims) => {
            let user = AuthenticatedUser::from_claims(claims);
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(_) => auth_error_response("Invalid or expired token"),
    }
}

fn auth_error_response(message: &str) -> Response {
    let body = Json(json!({
        "success": false,
        "error": message
    }));
    (StatusCode::UNAUTHORIZED, body).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_prefix_is_required() {
        assert_eq!(extract_token("Bearer abc"), Some("abc"));
        assert_eq!(extract_token("Basic abc"), None);
        assert_eq!(extract_token("abc"), None);
    }

    #[test]
    fn role_checks_use_wire_strings() {
        let user = AuthenticatedUser {
            user_id: "u1".into(),
            email: "a@b.c".into(),
            role: "ADMIN".into(),
        };
        assert!(user.is_admin());
        assert!(!user.is_driver());
    }
}
