//! Authentication API handlers

use std::sync::Arc;

use axum::{extract::State, Extension, Json};

use super::dto::{
    LoginRequest, LoginResponse, LogoutRequest, LogoutResponse, RefreshRequest, RefreshResponse,
    UserInfo,
};
use crate::application::sessions::SessionService;
use crate::domain::{DomainError, RepositoryProvider};
use crate::interfaces::http::common::{ApiResponse, ApiResult, ValidatedJson};
use crate::interfaces::http::middleware::AuthenticatedUser;

#[derive(Clone)]
pub struct AuthModuleState {
    pub sessions: Arc<SessionService>,
    pub repos: Arc<dyn RepositoryProvider>,
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "Authentication",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Successful login", body = ApiResponse<LoginResponse>),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(state): State<AuthModuleState>,
    ValidatedJson(request): ValidatedJson<LoginRequest>,
) -> ApiResult<Json<ApiResponse<LoginResponse>>> {
    let outcome = state
        .sessions
        .login(
            &request.email,
            &request.password,
            request.device_id,
            request.device_info,
        )
        .await?;

    Ok(Json(ApiResponse::success(LoginResponse {
        user: UserInfo::from_user(&outcome.user),
        access_token: outcome.tokens.access_token,
        refresh_token: outcome.tokens.refresh_token,
        device_id: outcome.device_id,
    })))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/refresh",
    tag = "Authentication",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "Tokens rotated", body = ApiResponse<RefreshResponse>),
        (status = 401, description = "Invalid, expired or replayed refresh token")
    )
)]
pub async fn refresh(
    State(state): State<AuthModuleState>,
    ValidatedJson(request): ValidatedJson<RefreshRequest>,
) -> ApiResult<Json<ApiResponse<RefreshResponse>>> {
    let (_user, tokens) = state.sessions.refresh(&request.refresh_token).await?;

    Ok(Json(ApiResponse::success(RefreshResponse {
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
    })))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    tag = "Authentication",
    security(("bearer_auth" = [])),
    request_body = LogoutRequest,
    responses(
        (status = 200, description = "Session(s) revoked", body = ApiResponse<LogoutResponse>)
    )
)]
pub async fn logout(
    State(state): State<AuthModuleState>,
    Extension(user): Extension<AuthenticatedUser>,
    ValidatedJson(request): ValidatedJson<LogoutRequest>,
) -> ApiResult<Json<ApiResponse<LogoutResponse>>> {
    let revoked = if request.logout_all.unwrap_or(false) {
        state.sessions.logout_all(&user.user_id).await?
    } else if let Some(refresh_token) = request.refresh_token.as_deref() {
        u64::from(state.sessions.logout(&user.user_id, refresh_token).await?)
    } else {
        return Err(DomainError::Validation(
            "Either refreshToken or logoutAll is required".into(),
        )
        .into());
    };

    Ok(Json(ApiResponse::success(LogoutResponse { revoked })))
}

#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    tag = "Authentication",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current user info", body = ApiResponse<UserInfo>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn get_current_user(
    State(state): State<AuthModuleState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> ApiResult<Json<ApiResponse<UserInfo>>> {
    let db_user = state
        .repos
        .users()
        .find_by_id(&user.user_id)
        .await?
        .ok_or_else(|| DomainError::not_found("User", user.user_id.as_str()))?;

    Ok(Json(ApiResponse::success(UserInfo::from_user(&db_user))))
}
