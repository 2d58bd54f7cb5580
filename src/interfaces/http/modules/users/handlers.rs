//! User management handlers (admin surface + driver self-service)

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use chrono::Utc;
use uuid::Uuid;

use super::dto::{CreateUserRequest, PushTokenRequest, UpdateUserRequest, UserDto};
use crate::domain::user::{User, UserRole};
use crate::domain::{DomainError, RepositoryProvider};
use crate::infrastructure::crypto::password::hash_password;
use crate::interfaces::http::common::{
    ApiResponse, ApiResult, PaginatedResponse, PaginationQuery, ValidatedJson,
};
use crate::interfaces::http::middleware::AuthenticatedUser;

#[derive(Clone)]
pub struct UserModuleState {
    pub repos: Arc<dyn RepositoryProvider>,
}

fn require_admin(user: &AuthenticatedUser) -> Result<(), DomainError> {
    if user.is_admin() {
        Ok(())
    } else {
        Err(DomainError::Forbidden("Admin role required".into()))
    }
}

fn parse_role(role: &str) -> Result<UserRole, DomainError> {
    UserRole::from_str(role)
        .ok_or_else(|| DomainError::Validation(format!("Unknown role: {role}")))
}

#[utoipa::path(
    get,
    path = "/api/v1/users",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(PaginationQuery),
    responses(
        (status = 200, description = "User list", body = ApiResponse<PaginatedResponse<UserDto>>)
    )
)]
pub async fn list_users(
    State(state): State<UserModuleState>,
    Extension(user): Extension<AuthenticatedUser>,
    Query(pagination): Query<PaginationQuery>,
) -> ApiResult<Json<ApiResponse<PaginatedResponse<UserDto>>>> {
    require_admin(&user)?;
    let result = state.repos.users().list(pagination.params()).await?;
    Ok(Json(ApiResponse::success(PaginatedResponse::from_result(
        result,
        |u| UserDto::from_user(&u),
    ))))
}

#[utoipa::path(
    get,
    path = "/api/v1/users/drivers",
    tag = "Users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Active drivers", body = ApiResponse<Vec<UserDto>>)
    )
)]
pub async fn list_drivers(
    State(state): State<UserModuleState>,
    Extension(_user): Extension<AuthenticatedUser>,
) -> ApiResult<Json<ApiResponse<Vec<UserDto>>>> {
    let drivers = state.repos.users().list_drivers().await?;
    Ok(Json(ApiResponse::success(
        drivers.iter().map(UserDto::from_user).collect(),
    )))
}

#[utoipa::path(
    get,
    path = "/api/v1/users/{id}",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "User id")),
    responses(
        (status = 200, description = "User", body = ApiResponse<UserDto>),
        (status = 404, description = "Not found")
    )
)]
pub async fn get_user(
    State(state): State<UserModuleState>,
    Extension(caller): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<UserDto>>> {
    if caller.user_id != id {
        require_admin(&caller)?;
    }
    let user = state
        .repos
        .users()
        .find_by_id(&id)
        .await?
        .ok_or_else(|| DomainError::not_found("User", id.as_str()))?;
    Ok(Json(ApiResponse::success(UserDto::from_user(&user))))
}

#[utoipa::path(
    post,
    path = "/api/v1/users",
    tag = "Users",
    security(("bearer_auth" = [])),
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = ApiResponse<UserDto>),
        (status = 409, description = "Email already in use")
    )
)]
pub async fn create_user(
    State(state): State<UserModuleState>,
    Extension(caller): Extension<AuthenticatedUser>,
    ValidatedJson(request): ValidatedJson<CreateUserRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<UserDto>>)> {
    require_admin(&caller)?;
    let role = parse_role(&request.role)?;
    let email = request.email.trim().to_lowercase();

    if state.repos.users().find_by_email(&email).await?.is_some() {
        return Err(DomainError::Conflict("Email already in use".into()).into());
    }

    let password_hash = hash_password(&request.password)
        .map_err(|err| DomainError::Internal(format!("password hashing failed: {err}")))?;

    let now = Utc::now();
    let user = User {
        id: Uuid::new_v4().to_string(),
        email,
        password_hash,
        name: request.name,
        role,
        is_active: true,
        phone: request.phone,
        push_token: None,
        preferences: serde_json::json!({}),
        last_login_at: None,
        created_at: now,
        updated_at: now,
    };
    state.repos.users().create(user.clone()).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(UserDto::from_user(&user))),
    ))
}

#[utoipa::path(
    patch,
    path = "/api/v1/users/{id}",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "User id")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = ApiResponse<UserDto>),
        (status = 404, description = "Not found")
    )
)]
pub async fn update_user(
    State(state): State<UserModuleState>,
    Extension(caller): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    ValidatedJson(request): ValidatedJson<UpdateUserRequest>,
) -> ApiResult<Json<ApiResponse<UserDto>>> {
    require_admin(&caller)?;

    let mut user = state
        .repos
        .users()
        .find_by_id(&id)
        .await?
        .ok_or_else(|| DomainError::not_found("User", id.as_str()))?;

    if let Some(email) = request.email {
        let email = email.trim().to_lowercase();
        if email != user.email {
            if state.repos.users().find_by_email(&email).await?.is_some() {
                return Err(DomainError::Conflict("Email already in use".into()).into());
            }
            user.email = email;
        }
    }
    if let Some(password) = request.password {
        user.password_hash = hash_password(&password)
            .map_err(|err| DomainError::Internal(format!("password hashing failed: {err}")))?;
    }
    if let Some(name) = request.name {
        user.name = Some(name);
    }
    if let Some(role) = request.role {
        user.role = parse_role(&role)?;
    }
    if let Some(phone) = request.phone {
        user.phone = Some(phone);
    }
    if let Some(is_active) = request.is_active {
        user.is_active = is_active;
    }
    user.updated_at = Utc::now();

    state.repos.users().update(user.clone()).await?;
    Ok(Json(ApiResponse::success(UserDto::from_user(&user))))
}

#[utoipa::path(
    delete,
    path = "/api/v1/users/{id}",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "User id")),
    responses(
        (status = 200, description = "User deleted"),
        (status = 404, description = "Not found")
    )
)]
pub async fn delete_user(
    State(state): State<UserModuleState>,
    Extension(caller): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<()>>> {
    require_admin(&caller)?;
    if caller.user_id == id {
        return Err(DomainError::Validation("Cannot delete your own account".into()).into());
    }

    state
        .repos
        .users()
        .find_by_id(&id)
        .await?
        .ok_or_else(|| DomainError::not_found("User", id.as_str()))?;
    state.repos.users().delete(&id).await?;
    Ok(Json(ApiResponse::success(())))
}

#[utoipa::path(
    put,
    path = "/api/v1/users/me/push-token",
    tag = "Users",
    security(("bearer_auth" = [])),
    request_body = PushTokenRequest,
    responses(
        (status = 200, description = "Push token stored")
    )
)]
pub async fn set_push_token(
    State(state): State<UserModuleState>,
    Extension(caller): Extension<AuthenticatedUser>,
    ValidatedJson(request): ValidatedJson<PushTokenRequest>,
) -> ApiResult<Json<ApiResponse<()>>> {
    state
        .repos
        .users()
        .set_push_token(&caller.user_id, request.push_token)
        .await?;
    Ok(Json(ApiResponse::success(())))
}
