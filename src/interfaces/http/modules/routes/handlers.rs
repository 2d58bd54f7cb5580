//! Route and stop handlers: CRUD, optimization, lifecycle and live events

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use chrono::Utc;
use uuid::Uuid;

use super::dto::*;
use crate::application::notifications::NotificationService;
use crate::application::routes::{
    CompleteStopRequest, OptimizeRouteOptions, RouteEngine, RoutePlanner,
};
use crate::domain::address::{Address, GeocodeStatus};
use crate::domain::payment::PaymentMethod;
use crate::domain::route::{DriverFix, Route, RouteFilter, RouteStatus};
use crate::domain::settings::{DeliverySettings, DELIVERY_SETTINGS_KEY};
use crate::domain::stop::{Stop, StopPaymentStatus, StopStatus};
use crate::domain::user::UserRole;
use crate::domain::{DomainError, RepositoryProvider};
use crate::interfaces::http::common::{
    ApiResponse, ApiResult, PaginatedResponse, ValidatedJson,
};
use crate::interfaces::http::middleware::AuthenticatedUser;
use crate::shared::types::pagination::PaginationParams;

#[derive(Clone)]
pub struct RouteModuleState {
    pub repos: Arc<dyn RepositoryProvider>,
    pub engine: Arc<RouteEngine>,
    pub planner: Arc<RoutePlanner>,
    pub notifications: Arc<NotificationService>,
}

impl RouteModuleState {
    async fn delivery_settings(&self) -> DeliverySettings {
        match self.repos.settings().get(DELIVERY_SETTINGS_KEY).await {
            Ok(Some(value)) => serde_json::from_value(value).unwrap_or_default(),
            _ => DeliverySettings::default(),
        }
    }

    async fn load_route(&self, id: &str) -> ApiResult<Route> {
        Ok(self
            .repos
            .routes()
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Route", id))?)
    }
}

fn parse_payment_method(value: Option<&str>) -> Result<Option<PaymentMethod>, DomainError> {
    match value {
        None => Ok(None),
        Some(raw) => PaymentMethod::from_str(raw)
            .map(Some)
            .ok_or_else(|| DomainError::Validation(format!("Unknown payment method: {raw}"))),
    }
}

fn require_dispatcher(user: &AuthenticatedUser) -> Result<(), DomainError> {
    if user.is_driver() {
        Err(DomainError::Forbidden("Operator role required".into()))
    } else {
        Ok(())
    }
}

/// Drivers may only touch routes assigned to them.
fn check_route_access(user: &AuthenticatedUser, route: &Route) -> Result<(), DomainError> {
    if user.is_driver() && route.assigned_driver_id.as_deref() != Some(user.user_id.as_str()) {
        return Err(DomainError::Forbidden(
            "Route is not assigned to this driver".into(),
        ));
    }
    Ok(())
}

// ── Route CRUD ──────────────────────────────────────────────────

#[utoipa::path(
    get,
    path = "/api/v1/routes",
    tag = "Routes",
    security(("bearer_auth" = [])),
    params(RouteListQuery),
    responses(
        (status = 200, description = "Route list", body = ApiResponse<PaginatedResponse<RouteDto>>)
    )
)]
pub async fn list_routes(
    State(state): State<RouteModuleState>,
    Extension(user): Extension<AuthenticatedUser>,
    Query(query): Query<RouteListQuery>,
) -> ApiResult<Json<ApiResponse<PaginatedResponse<RouteDto>>>> {
    let status = match query.status.as_deref() {
        None => None,
        Some(raw) => Some(
            RouteStatus::from_str(raw)
                .ok_or_else(|| DomainError::Validation(format!("Unknown route status: {raw}")))?,
        ),
    };

    // Drivers see only their own routes.
    let driver_filter = if user.role == UserRole::Driver.as_str() {
        Some(user.user_id.clone())
    } else {
        query.driver_id.clone()
    };

    let filter = RouteFilter {
        status,
        assigned_driver_id: driver_filter,
        scheduled_date: query.date,
    };
    let page = PaginationParams::new(query.page, query.limit);
    let result = state.repos.routes().list(filter, page).await?;

    Ok(Json(ApiResponse::success(PaginatedResponse::from_result(
        result,
        |r| RouteDto::from_route(&r),
    ))))
}

#[utoipa::path(
    post,
    path = "/api/v1/routes",
    tag = "Routes",
    security(("bearer_auth" = [])),
    request_body = CreateRouteRequest,
    responses((status = 201, description = "Route created", body = ApiResponse<RouteDto>))
)]
pub async fn create_route(
    State(state): State<RouteModuleState>,
    Extension(user): Extension<AuthenticatedUser>,
    ValidatedJson(request): ValidatedJson<CreateRouteRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<RouteDto>>)> {
    require_dispatcher(&user)?;

    let now = Utc::now();
    let route = Route {
        id: Uuid::new_v4().to_string(),
        name: request.name,
        status: RouteStatus::Draft,
        scheduled_date: request.scheduled_date,
        departure_time: request.departure_time,
        depot_id: request.depot_id,
        origin_lat: request.origin_lat,
        origin_lng: request.origin_lng,
        origin_address: request.origin_address,
        assigned_driver_id: request.assigned_driver_id,
        created_by: user.user_id.clone(),
        sent_at: None,
        loaded_at: None,
        started_at: None,
        actual_start_time: None,
        paused_at: None,
        completed_at: None,
        total_distance_km: None,
        total_duration_min: None,
        optimized_at: None,
        optimization_hash: None,
        depot_return_time: None,
        driver_lat: None,
        driver_lng: None,
        driver_location_at: None,
        driver_heading: None,
        driver_speed: None,
        created_at: now,
        updated_at: now,
    };
    state.repos.routes().create(route.clone()).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(RouteDto::from_route(&route))),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/routes/{id}",
    tag = "Routes",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Route id")),
    responses(
        (status = 200, description = "Route with its stops", body = ApiResponse<RouteDetailDto>),
        (status = 404, description = "Not found")
    )
)]
pub async fn get_route(
    State(state): State<RouteModuleState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<RouteDetailDto>>> {
    let route = state.load_route(&id).await?;
    check_route_access(&user, &route)?;

    let stops = state.repos.stops().list_by_route(&id).await?;
    Ok(Json(ApiResponse::success(RouteDetailDto {
        route: RouteDto::from_route(&route),
        stops: stops.iter().map(StopDto::from_stop).collect(),
    })))
}

#[utoipa::path(
    patch,
    path = "/api/v1/routes/{id}",
    tag = "Routes",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Route id")),
    request_body = UpdateRouteRequest,
    responses(
        (status = 200, description = "Route updated", body = ApiResponse<RouteDto>),
        (status = 409, description = "Route is past editing")
    )
)]
pub async fn update_route(
    State(state): State<RouteModuleState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    ValidatedJson(request): ValidatedJson<UpdateRouteRequest>,
) -> ApiResult<Json<ApiResponse<RouteDto>>> {
    require_dispatcher(&user)?;
    let mut route = state.load_route(&id).await?;

    if !matches!(route.status, RouteStatus::Draft | RouteStatus::Scheduled) {
        return Err(DomainError::Conflict(format!(
            "Route {id} cannot be edited in status {}",
            route.status
        ))
        .into());
    }

    if let Some(name) = request.name {
        route.name = name;
    }
    if let Some(date) = request.scheduled_date {
        route.scheduled_date = Some(date);
    }
    if let Some(departure) = request.departure_time {
        route.departure_time = Some(departure);
    }
    if let Some(depot_id) = request.depot_id {
        state
            .repos
            .depots()
            .find_by_id(&depot_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Depot", depot_id.as_str()))?;
        route.depot_id = Some(depot_id);
    }
    if let Some(driver_id) = request.assigned_driver_id {
        let driver = state
            .repos
            .users()
            .find_by_id(&driver_id)
            .await?
            .ok_or_else(|| DomainError::not_found("User", driver_id.as_str()))?;
        if !driver.is_driver() {
            return Err(DomainError::Validation("Assigned user is not a driver".into()).into());
        }
        route.assigned_driver_id = Some(driver_id);
    }
    if request.origin_lat.is_some() {
        route.origin_lat = request.origin_lat;
    }
    if request.origin_lng.is_some() {
        route.origin_lng = request.origin_lng;
    }
    if request.origin_address.is_some() {
        route.origin_address = request.origin_address;
    }
    route.updated_at = Utc::now();

    state.repos.routes().update(route.clone()).await?;
    Ok(Json(ApiResponse::success(RouteDto::from_route(&route))))
}

#[utoipa::path(
    delete,
    path = "/api/v1/routes/{id}",
    tag = "Routes",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Route id")),
    request_body = DeleteRouteRequest,
    responses(
        (status = 200, description = "Route deleted"),
        (status = 403, description = "Password confirmation required")
    )
)]
pub async fn delete_route(
    State(state): State<RouteModuleState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    body: Option<Json<DeleteRouteRequest>>,
) -> ApiResult<Json<ApiResponse<()>>> {
    require_dispatcher(&user)?;

    let requester = state
        .repos
        .users()
        .find_by_id(&user.user_id)
        .await?
        .ok_or_else(|| DomainError::not_found("User", user.user_id.as_str()))?;

    let password = body.as_ref().and_then(|json| json.0.password.as_deref());
    state.engine.delete_route(&id, &requester, password).await?;
    Ok(Json(ApiResponse::success(())))
}

// ── Stops ───────────────────────────────────────────────────────

#[utoipa::path(
    get,
    path = "/api/v1/routes/{id}/stops",
    tag = "Stops",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Route id")),
    responses((status = 200, description = "Stops in visit order", body = ApiResponse<Vec<StopDto>>))
)]
pub async fn list_stops(
    State(state): State<RouteModuleState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<Vec<StopDto>>>> {
    let route = state.load_route(&id).await?;
    check_route_access(&user, &route)?;

    let stops = state.repos.stops().list_by_route(&id).await?;
    Ok(Json(ApiResponse::success(
        stops.iter().map(StopDto::from_stop).collect(),
    )))
}

#[utoipa::path(
    post,
    path = "/api/v1/routes/{id}/stops",
    tag = "Stops",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Route id")),
    request_body = AddStopRequest,
    responses(
        (status = 201, description = "Stop added", body = ApiResponse<StopDto>),
        (status = 409, description = "Route is past editing")
    )
)]
pub async fn add_stop(
    State(state): State<RouteModuleState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    ValidatedJson(request): ValidatedJson<AddStopRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<StopDto>>)> {
    require_dispatcher(&user)?;
    let route = state.load_route(&id).await?;

    if !matches!(route.status, RouteStatus::Draft | RouteStatus::Scheduled) {
        return Err(DomainError::Conflict(format!(
            "Stops cannot be added in status {}",
            route.status
        ))
        .into());
    }

    let address = state
        .repos
        .addresses()
        .find_by_id(&request.address_id)
        .await?
        .ok_or_else(|| DomainError::not_found("Address", request.address_id.as_str()))?;

    let delivery = state.delivery_settings().await;
    let payment_method = parse_payment_method(request.payment_method.as_deref())?
        .or(address.payment_method);
    let sequence = state.repos.stops().max_sequence(&id).await? + 1;

    let now = Utc::now();
    let stop = Stop {
        id: Uuid::new_v4().to_string(),
        route_id: id.clone(),
        address_id: address.id.clone(),
        sequence_order: sequence,
        status: StopStatus::Pending,
        estimated_minutes: request.estimated_minutes.unwrap_or(delivery.service_minutes),
        priority: request.priority.unwrap_or(0),
        time_window_start: request.time_window_start,
        time_window_end: request.time_window_end,
        estimated_arrival: None,
        original_estimated_arrival: None,
        travel_minutes_from_previous: None,
        arrived_at: None,
        completed_at: None,
        require_signature: request
            .require_signature
            .unwrap_or(delivery.proof_enabled && delivery.require_signature),
        require_photo: request
            .require_photo
            .unwrap_or(delivery.proof_enabled && delivery.require_photo),
        signature_url: None,
        photo_url: None,
        is_paid: false,
        payment_status: StopPaymentStatus::Pending,
        payment_method,
        payment_amount: request.payment_amount,
        customer_rut: request.customer_rut.or(address.customer_rut),
        external_order_id: request.external_order_id.or(address.external_order_id),
        notes: request.notes,
        failure_reason: None,
        created_at: now,
        updated_at: now,
    };
    state.repos.stops().create(stop.clone()).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(StopDto::from_stop(&stop))),
    ))
}

#[utoipa::path(
    patch,
    path = "/api/v1/routes/{id}/stops/{stop_id}",
    tag = "Stops",
    security(("bearer_auth" = [])),
    params(
        ("id" = String, Path, description = "Route id"),
        ("stop_id" = String, Path, description = "Stop id")
    ),
    request_body = UpdateStopRequest,
    responses(
        (status = 200, description = "Stop updated", body = ApiResponse<StopDto>),
        (status = 409, description = "Stop is terminal")
    )
)]
pub async fn update_stop(
    State(state): State<RouteModuleState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path((id, stop_id)): Path<(String, String)>,
    ValidatedJson(request): ValidatedJson<UpdateStopRequest>,
) -> ApiResult<Json<ApiResponse<StopDto>>> {
    require_dispatcher(&user)?;
    state.load_route(&id).await?;

    let mut stop = state
        .repos
        .stops()
        .find_by_id(&stop_id)
        .await?
        .filter(|s| s.route_id == id)
        .ok_or_else(|| DomainError::not_found("Stop", stop_id.as_str()))?;

    if stop.status.is_terminal() {
        return Err(DomainError::Conflict(format!(
            "Stop {stop_id} already processed (status {})",
            stop.status
        ))
        .into());
    }

    if let Some(minutes) = request.estimated_minutes {
        stop.estimated_minutes = minutes;
    }
    if let Some(priority) = request.priority {
        stop.priority = priority;
    }
    if request.time_window_start.is_some() {
        stop.time_window_start = request.time_window_start;
    }
    if request.time_window_end.is_some() {
        stop.time_window_end = request.time_window_end;
    }
    if let Some(signature) = request.require_signature {
        stop.require_signature = signature;
    }
    if let Some(photo) = request.require_photo {
        stop.require_photo = photo;
    }
    if request.payment_amount.is_some() {
        stop.payment_amount = request.payment_amount;
    }
    if request.payment_method.is_some() {
        stop.payment_method = parse_payment_method(request.payment_method.as_deref())?;
    }
    if request.notes.is_some() {
        stop.notes = request.notes;
    }
    stop.updated_at = Utc::now();

    state.repos.stops().update(stop.clone()).await?;
    Ok(Json(ApiResponse::success(StopDto::from_stop(&stop))))
}

#[utoipa::path(
    delete,
    path = "/api/v1/routes/{id}/stops/{stop_id}",
    tag = "Stops",
    security(("bearer_auth" = [])),
    params(
        ("id" = String, Path, description = "Route id"),
        ("stop_id" = String, Path, description = "Stop id")
    ),
    responses(
        (status = 200, description = "Stop removed"),
        (status = 409, description = "Route is past editing")
    )
)]
pub async fn delete_stop(
    State(state): State<RouteModuleState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path((id, stop_id)): Path<(String, String)>,
) -> ApiResult<Json<ApiResponse<()>>> {
    require_dispatcher(&user)?;
    let route = state.load_route(&id).await?;

    if route.status != RouteStatus::Draft {
        return Err(DomainError::Conflict(format!(
            "Stops can only be removed from a draft route (status {})",
            route.status
        ))
        .into());
    }

    state
        .repos
        .stops()
        .find_by_id(&stop_id)
        .await?
        .filter(|s| s.route_id == id)
        .ok_or_else(|| DomainError::not_found("Stop", stop_id.as_str()))?;
    state.repos.stops().delete(&stop_id).await?;

    // Close the sequence gap.
    let remaining: Vec<String> = state
        .repos
        .stops()
        .list_by_route(&id)
        .await?
        .iter()
        .map(|s| s.id.clone())
        .collect();
    if !remaining.is_empty() {
        state.repos.stops().reorder(&id, &remaining).await?;
    }

    Ok(Json(ApiResponse::success(())))
}

#[utoipa::path(
    post,
    path = "/api/v1/routes/{id}/stops/reorder",
    tag = "Stops",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Route id")),
    request_body = ReorderStopsRequest,
    responses(
        (status = 200, description = "New visit order", body = ApiResponse<Vec<StopDto>>),
        (status = 400, description = "Id set does not match the route")
    )
)]
pub async fn reorder_stops(
    State(state): State<RouteModuleState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    ValidatedJson(request): ValidatedJson<ReorderStopsRequest>,
) -> ApiResult<Json<ApiResponse<Vec<StopDto>>>> {
    require_dispatcher(&user)?;
    let route = state.load_route(&id).await?;

    if !matches!(route.status, RouteStatus::Draft | RouteStatus::Scheduled) {
        return Err(DomainError::Conflict(format!(
            "Stops cannot be reordered in status {}",
            route.status
        ))
        .into());
    }

    let current = state.repos.stops().list_by_route(&id).await?;
    let mut current_ids: Vec<&str> = current.iter().map(|s| s.id.as_str()).collect();
    current_ids.sort_unstable();
    let mut requested: Vec<&str> = request.stop_ids.iter().map(String::as_str).collect();
    requested.sort_unstable();
    if current_ids != requested {
        return Err(DomainError::Validation(
            "stopIds must contain exactly the route's stops".into(),
        )
        .into());
    }

    state.repos.stops().reorder(&id, &request.stop_ids).await?;

    let stops = state.repos.stops().list_by_route(&id).await?;
    Ok(Json(ApiResponse::success(
        stops.iter().map(StopDto::from_stop).collect(),
    )))
}

// ── Optimization ────────────────────────────────────────────────

#[utoipa::path(
    post,
    path = "/api/v1/routes/{id}/optimize",
    tag = "Routes",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Route id")),
    request_body = OptimizeRouteRequestDto,
    responses(
        (status = 200, description = "Optimization result", body = ApiResponse<OptimizeRouteResponseDto>),
        (status = 400, description = "Route cannot be optimized"),
        (status = 502, description = "Travel time provider unavailable")
    )
)]
pub async fn optimize_route(
    State(state): State<RouteModuleState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    body: Option<Json<OptimizeRouteRequestDto>>,
) -> ApiResult<Json<ApiResponse<OptimizeRouteResponseDto>>> {
    require_dispatcher(&user)?;

    let request = body.map(|Json(b)| b).unwrap_or(OptimizeRouteRequestDto {
        driver_start_time: None,
        driver_end_time: None,
        force: None,
        first_stop_id: None,
        last_stop_id: None,
        use_haversine: None,
    });

    let options = OptimizeRouteOptions {
        driver_start_time: request.driver_start_time,
        driver_end_time: request.driver_end_time,
        force: request.force.unwrap_or(false),
        first_stop_id: request.first_stop_id,
        last_stop_id: request.last_stop_id,
        use_haversine: request.use_haversine.unwrap_or(false),
    };

    let result = state
        .planner
        .optimize_route(&id, options, Utc::now())
        .await?;

    Ok(Json(ApiResponse::success(OptimizeRouteResponseDto {
        route: RouteDto::from_route(&result.route),
        ordered_stop_ids: result.ordered_stop_ids,
        unchanged: result.unchanged,
        unserviceable_stop_ids: result.unserviceable_stop_ids,
        warnings: result.warnings,
    })))
}

// ── Lifecycle ───────────────────────────────────────────────────

macro_rules! lifecycle_handler {
    ($name:ident, $method:ident, $path:literal, $description:literal) => {
        #[utoipa::path(
            post,
            path = $path,
            tag = "Routes",
            security(("bearer_auth" = [])),
            params(("id" = String, Path, description = "Route id")),
            responses(
                (status = 200, description = $description, body = ApiResponse<RouteDto>),
                (status = 409, description = "State machine guard violated")
            )
        )]
        pub async fn $name(
            State(state): State<RouteModuleState>,
            Extension(user): Extension<AuthenticatedUser>,
            Path(id): Path<String>,
        ) -> ApiResult<Json<ApiResponse<RouteDto>>> {
            let route = state.load_route(&id).await?;
            check_route_access(&user, &route)?;
            let route = state.engine.$method(&id, Utc::now()).await?;
            Ok(Json(ApiResponse::success(RouteDto::from_route(&route))))
        }
    };
}

lifecycle_handler!(
    send_route,
    send_route,
    "/api/v1/routes/{id}/send",
    "Route sent to its driver"
);
lifecycle_handler!(
    unsend_route,
    unsend_route,
    "/api/v1/routes/{id}/unsend",
    "Route returned to draft"
);
lifecycle_handler!(
    load_route,
    mark_loaded,
    "/api/v1/routes/{id}/load",
    "Vehicle loading confirmed"
);
lifecycle_handler!(
    start_route,
    start_route,
    "/api/v1/routes/{id}/start",
    "Route started; ETAs frozen"
);
lifecycle_handler!(
    pause_route,
    pause_route,
    "/api/v1/routes/{id}/pause",
    "Route paused"
);
lifecycle_handler!(
    resume_route,
    resume_route,
    "/api/v1/routes/{id}/resume",
    "Route resumed"
);
lifecycle_handler!(
    complete_route,
    complete_route,
    "/api/v1/routes/{id}/complete",
    "Route completed"
);
lifecycle_handler!(
    cancel_route,
    cancel_route,
    "/api/v1/routes/{id}/cancel",
    "Route cancelled"
);

// ── Live execution ──────────────────────────────────────────────

#[utoipa::path(
    post,
    path = "/api/v1/routes/{id}/location",
    tag = "Routes",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Route id")),
    request_body = LocationUpdateRequest,
    responses(
        (status = 200, description = "Location stored"),
        (status = 409, description = "Route is not in progress")
    )
)]
pub async fn update_location(
    State(state): State<RouteModuleState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    ValidatedJson(request): ValidatedJson<LocationUpdateRequest>,
) -> ApiResult<Json<ApiResponse<()>>> {
    let route = state.load_route(&id).await?;
    check_route_access(&user, &route)?;

    state
        .engine
        .update_location(
            &id,
            DriverFix {
                lat: request.latitude,
                lng: request.longitude,
                heading: request.heading,
                speed: request.speed,
                accuracy: request.accuracy,
                recorded_at: Utc::now(),
            },
        )
        .await?;
    Ok(Json(ApiResponse::success(())))
}

#[utoipa::path(
    get,
    path = "/api/v1/routes/{id}/tracking",
    tag = "Routes",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Route id")),
    responses((status = 200, description = "Location history", body = ApiResponse<Vec<TrackingPointDto>>))
)]
pub async fn list_tracking_points(
    State(state): State<RouteModuleState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<Vec<TrackingPointDto>>>> {
    let route = state.load_route(&id).await?;
    check_route_access(&user, &route)?;

    let points = state.repos.routes().list_tracking_points(&id).await?;
    Ok(Json(ApiResponse::success(
        points.iter().map(TrackingPointDto::from_point).collect(),
    )))
}

#[utoipa::path(
    post,
    path = "/api/v1/routes/{id}/stops/{stop_id}/in-transit",
    tag = "Stops",
    security(("bearer_auth" = [])),
    params(
        ("id" = String, Path, description = "Route id"),
        ("stop_id" = String, Path, description = "Stop id")
    ),
    responses(
        (status = 200, description = "Stop marked in transit", body = ApiResponse<StopDto>),
        (status = 409, description = "Stop is not pending")
    )
)]
pub async fn mark_stop_in_transit(
    State(state): State<RouteModuleState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path((id, stop_id)): Path<(String, String)>,
) -> ApiResult<Json<ApiResponse<StopDto>>> {
    let route = state.load_route(&id).await?;
    check_route_access(&user, &route)?;

    let stop = state
        .engine
        .mark_stop_in_transit(&id, &stop_id, Utc::now())
        .await?;
    Ok(Json(ApiResponse::success(StopDto::from_stop(&stop))))
}

#[utoipa::path(
    post,
    path = "/api/v1/routes/{id}/stops/{stop_id}/arrived",
    tag = "Stops",
    security(("bearer_auth" = [])),
    params(
        ("id" = String, Path, description = "Route id"),
        ("stop_id" = String, Path, description = "Stop id")
    ),
    responses(
        (status = 200, description = "Stop marked arrived", body = ApiResponse<StopDto>),
        (status = 409, description = "Stop cannot be marked arrived")
    )
)]
pub async fn mark_stop_arrived(
    State(state): State<RouteModuleState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path((id, stop_id)): Path<(String, String)>,
) -> ApiResult<Json<ApiResponse<StopDto>>> {
    let route = state.load_route(&id).await?;
    check_route_access(&user, &route)?;

    let stop = state
        .engine
        .mark_stop_arrived(&id, &stop_id, Utc::now())
        .await?;
    Ok(Json(ApiResponse::success(StopDto::from_stop(&stop))))
}

#[utoipa::path(
    post,
    path = "/api/v1/routes/{id}/stops/{stop_id}/complete",
    tag = "Stops",
    security(("bearer_auth" = [])),
    params(
        ("id" = String, Path, description = "Route id"),
        ("stop_id" = String, Path, description = "Stop id")
    ),
    request_body = CompleteStopRequestDto,
    responses(
        (status = 200, description = "Terminal stop event applied", body = ApiResponse<StopCompletionResponseDto>),
        (status = 400, description = "Missing proof of delivery"),
        (status = 409, description = "Stop already processed")
    )
)]
pub async fn complete_stop(
    State(state): State<RouteModuleState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path((id, stop_id)): Path<(String, String)>,
    ValidatedJson(request): ValidatedJson<CompleteStopRequestDto>,
) -> ApiResult<Json<ApiResponse<StopCompletionResponseDto>>> {
    let route = state.load_route(&id).await?;
    check_route_access(&user, &route)?;

    let status = StopStatus::from_str(&request.status)
        .filter(|s| s.is_terminal())
        .ok_or_else(|| {
            DomainError::Validation(format!(
                "status must be COMPLETED, FAILED or SKIPPED (got {})",
                request.status
            ))
        })?;

    let outcome = state
        .engine
        .complete_stop(
            &id,
            &stop_id,
            CompleteStopRequest {
                status,
                notes: request.notes,
                failure_reason: request.failure_reason,
                signature_url: request.signature_url,
                photo_url: request.photo_url,
            },
            Utc::now(),
        )
        .await?;

    Ok(Json(ApiResponse::success(StopCompletionResponseDto {
        stop: StopDto::from_stop(&outcome.stop),
        route_completed: outcome.route_completed,
    })))
}

#[utoipa::path(
    post,
    path = "/api/v1/routes/{id}/resend-notifications",
    tag = "Routes",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Route id")),
    responses(
        (status = 200, description = "Dispatch outcome from the receiver", body = ApiResponse<ResendNotificationsResponseDto>),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "Not found")
    )
)]
pub async fn resend_notifications(
    State(state): State<RouteModuleState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<ResendNotificationsResponseDto>>> {
    if !user.is_admin() {
        return Err(DomainError::Forbidden("Admin role required".into()).into());
    }

    let route = state.load_route(&id).await?;
    let driver = match route.assigned_driver_id.as_deref() {
        Some(driver_id) => state.repos.users().find_by_id(driver_id).await?,
        None => None,
    };
    let remaining: Vec<Stop> = state
        .repos
        .stops()
        .list_by_route(&id)
        .await?
        .into_iter()
        .filter(|s| !s.status.is_terminal())
        .collect();

    // Unlike engine-triggered dispatches this one is awaited so the admin
    // sees the receiver's actual response.
    let outcome = state
        .notifications
        .resend_route(&route, driver.as_ref(), remaining.as_slice())
        .await;

    Ok(Json(ApiResponse::success(ResendNotificationsResponseDto {
        ok: outcome.ok,
        http_status: outcome.http_status,
        error: outcome.error,
    })))
}

// ── Import (third-party integrators) ────────────────────────────

#[utoipa::path(
    post,
    path = "/api/v1/routes/import",
    tag = "Routes",
    security(("bearer_auth" = [])),
    request_body = ImportRouteRequest,
    responses(
        (status = 201, description = "Route created with addresses and stops", body = ApiResponse<RouteDetailDto>)
    )
)]
pub async fn import_route(
    State(state): State<RouteModuleState>,
    Extension(user): Extension<AuthenticatedUser>,
    ValidatedJson(request): ValidatedJson<ImportRouteRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<RouteDetailDto>>)> {
    require_dispatcher(&user)?;
    let delivery = state.delivery_settings().await;
    let now = Utc::now();

    let route = Route {
        id: Uuid::new_v4().to_string(),
        name: request.name,
        status: RouteStatus::Draft,
        scheduled_date: request.scheduled_date,
        departure_time: request.departure_time,
        depot_id: request.depot_id,
        origin_lat: None,
        origin_lng: None,
        origin_address: None,
        assigned_driver_id: request.assigned_driver_id,
        created_by: user.user_id.clone(),
        sent_at: None,
        loaded_at: None,
        started_at: None,
        actual_start_time: None,
        paused_at: None,
        completed_at: None,
        total_distance_km: None,
        total_duration_min: None,
        optimized_at: None,
        optimization_hash: None,
        depot_return_time: None,
        driver_lat: None,
        driver_lng: None,
        driver_location_at: None,
        driver_heading: None,
        driver_speed: None,
        created_at: now,
        updated_at: now,
    };
    state.repos.routes().create(route.clone()).await?;

    let mut stops = Vec::with_capacity(request.stops.len());
    for (index, imported) in request.stops.into_iter().enumerate() {
        let geocode_status = match (imported.address.lat, imported.address.lng) {
            (Some(_), Some(_)) => GeocodeStatus::Success,
            _ => GeocodeStatus::Pending,
        };
        let full_address = imported.address.full_address.unwrap_or_else(|| {
            format!("{}, {}", imported.address.street, imported.address.city)
        });
        let address = Address {
            id: Uuid::new_v4().to_string(),
            street: imported.address.street,
            city: imported.address.city,
            full_address,
            lat: imported.address.lat,
            lng: imported.address.lng,
            geocode_status,
            customer_name: imported.customer_name,
            customer_phone: imported.customer_phone,
            customer_rut: imported.customer_rut.clone(),
            external_order_id: imported.external_order_id.clone(),
            payment_method: parse_payment_method(imported.payment_method.as_deref())?,
            created_at: now,
            updated_at: now,
        };
        state.repos.addresses().create(address.clone()).await?;

        let stop = Stop {
            id: Uuid::new_v4().to_string(),
            route_id: route.id.clone(),
            address_id: address.id,
            sequence_order: index as i32 + 1,
            status: StopStatus::Pending,
            estimated_minutes: imported
                .service_minutes
                .unwrap_or(delivery.service_minutes),
            priority: imported.priority.unwrap_or(0),
            time_window_start: imported.time_window_start,
            time_window_end: imported.time_window_end,
            estimated_arrival: None,
            original_estimated_arrival: None,
            travel_minutes_from_previous: None,
            arrived_at: None,
            completed_at: None,
            require_signature: delivery.proof_enabled && delivery.require_signature,
            require_photo: delivery.proof_enabled && delivery.require_photo,
            signature_url: None,
            photo_url: None,
            is_paid: false,
            payment_status: StopPaymentStatus::Pending,
            payment_method: address.payment_method,
            payment_amount: imported.payment_amount,
            customer_rut: imported.customer_rut,
            external_order_id: imported.external_order_id,
            notes: imported.notes,
            failure_reason: None,
            created_at: now,
            updated_at: now,
        };
        state.repos.stops().create(stop.clone()).await?;
        stops.push(stop);
    }

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(RouteDetailDto {
            route: RouteDto::from_route(&route),
            stops: stops.iter().map(StopDto::from_stop).collect(),
        })),
    ))
}
