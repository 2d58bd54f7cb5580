//! Depot handlers

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use chrono::Utc;
use uuid::Uuid;

use super::dto::{CreateDepotRequest, DepotDto, UpdateDepotRequest};
use crate::domain::depot::Depot;
use crate::domain::{DomainError, RepositoryProvider};
use crate::interfaces::http::common::{ApiResponse, ApiResult, ValidatedJson};
use crate::interfaces::http::middleware::AuthenticatedUser;

#[derive(Clone)]
pub struct DepotModuleState {
    pub repos: Arc<dyn RepositoryProvider>,
}

fn require_operator(user: &AuthenticatedUser) -> Result<(), DomainError> {
    if user.is_driver() {
        Err(DomainError::Forbidden("Operator role required".into()))
    } else {
        Ok(())
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/depots",
    tag = "Depots",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Depot list", body = ApiResponse<Vec<DepotDto>>))
)]
pub async fn list_depots(
    State(state): State<DepotModuleState>,
    Extension(_user): Extension<AuthenticatedUser>,
) -> ApiResult<Json<ApiResponse<Vec<DepotDto>>>> {
    let depots = state.repos.depots().list().await?;
    Ok(Json(ApiResponse::success(
        depots.iter().map(DepotDto::from_depot).collect(),
    )))
}

#[utoipa::path(
    get,
    path = "/api/v1/depots/{id}",
    tag = "Depots",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Depot id")),
    responses(
        (status = 200, description = "Depot", body = ApiResponse<DepotDto>),
        (status = 404, description = "Not found")
    )
)]
pub async fn get_depot(
    State(state): State<DepotModuleState>,
    Extension(_user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<DepotDto>>> {
    let depot = state
        .repos
        .depots()
        .find_by_id(&id)
        .await?
        .ok_or_else(|| DomainError::not_found("Depot", id.as_str()))?;
    Ok(Json(ApiResponse::success(DepotDto::from_depot(&depot))))
}

#[utoipa::path(
    post,
    path = "/api/v1/depots",
    tag = "Depots",
    security(("bearer_auth" = [])),
    request_body = CreateDepotRequest,
    responses((status = 201, description = "Depot created", body = ApiResponse<DepotDto>))
)]
pub async fn create_depot(
    State(state): State<DepotModuleState>,
    Extension(user): Extension<AuthenticatedUser>,
    ValidatedJson(request): ValidatedJson<CreateDepotRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<DepotDto>>)> {
    require_operator(&user)?;

    let now = Utc::now();
    let depot = Depot {
        id: Uuid::new_v4().to_string(),
        name: request.name,
        address: request.address,
        lat: request.lat,
        lng: request.lng,
        default_departure_time: request
            .default_departure_time
            .unwrap_or_else(|| "09:00".to_string()),
        default_service_minutes: request.default_service_minutes.unwrap_or(10),
        eta_window_before: request.eta_window_before.unwrap_or(30),
        eta_window_after: request.eta_window_after.unwrap_or(30),
        is_default: request.is_default.unwrap_or(false),
        is_active: true,
        created_at: now,
        updated_at: now,
    };
    state.repos.depots().save(depot.clone()).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(DepotDto::from_depot(&depot))),
    ))
}

#[utoipa::path(
    patch,
    path = "/api/v1/depots/{id}",
    tag = "Depots",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Depot id")),
    request_body = UpdateDepotRequest,
    responses(
        (status = 200, description = "Depot updated", body = ApiResponse<DepotDto>),
        (status = 404, description = "Not found")
    )
)]
pub async fn update_depot(
    State(state): State<DepotModuleState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    ValidatedJson(request): ValidatedJson<UpdateDepotRequest>,
) -> ApiResult<Json<ApiResponse<DepotDto>>> {
    require_operator(&user)?;

    let mut depot = state
        .repos
        .depots()
        .find_by_id(&id)
        .await?
        .ok_or_else(|| DomainError::not_found("Depot", id.as_str()))?;

    if let Some(name) = request.name {
        depot.name = name;
    }
    if let Some(address) = request.address {
        depot.address = address;
    }
    if let Some(lat) = request.lat {
        depot.lat = lat;
    }
    if let Some(lng) = request.lng {
        depot.lng = lng;
    }
    if let Some(departure) = request.default_departure_time {
        depot.default_departure_time = departure;
    }
    if let Some(minutes) = request.default_service_minutes {
        depot.default_service_minutes = minutes;
    }
    if let Some(before) = request.eta_window_before {
        depot.eta_window_before = before;
    }
    if let Some(after) = request.eta_window_after {
        depot.eta_window_after = after;
    }
    if let Some(is_default) = request.is_default {
        depot.is_default = is_default;
    }
    if let Some(is_active) = request.is_active {
        depot.is_active = is_active;
    }
    depot.updated_at = Utc::now();

    state.repos.depots().save(depot.clone()).await?;
    Ok(Json(ApiResponse::success(DepotDto::from_depot(&depot))))
}

#[utoipa::path(
    delete,
    path = "/api/v1/depots/{id}",
    tag = "Depots",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Depot id")),
    responses(
        (status = 200, description = "Depot deleted"),
        (status = 404, description = "Not found")
    )
)]
pub async fn delete_depot(
    State(state): State<DepotModuleState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<()>>> {
    require_operator(&user)?;
    state
        .repos
        .depots()
        .find_by_id(&id)
        .await?
        .ok_or_else(|| DomainError::not_found("Depot", id.as_str()))?;
    state.repos.depots().delete(&id).await?;
    Ok(Json(ApiResponse::success(())))
}
