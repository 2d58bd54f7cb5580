//! Address handlers

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use chrono::Utc;
use uuid::Uuid;

use super::dto::{AddressDto, AddressSearchQuery, CreateAddressRequest, UpdateAddressRequest};
use crate::domain::address::{Address, GeocodeStatus};
use crate::domain::payment::PaymentMethod;
use crate::domain::{DomainError, RepositoryProvider};
use crate::interfaces::http::common::{
    ApiResponse, ApiResult, PaginatedResponse, ValidatedJson,
};
use crate::interfaces::http::middleware::AuthenticatedUser;
use crate::shared::types::pagination::PaginationParams;

#[derive(Clone)]
pub struct AddressModuleState {
    pub repos: Arc<dyn RepositoryProvider>,
}

fn parse_payment_method(value: Option<&str>) -> Result<Option<PaymentMethod>, DomainError> {
    match value {
        None => Ok(None),
        Some(raw) => PaymentMethod::from_str(raw)
            .map(Some)
            .ok_or_else(|| DomainError::Validation(format!("Unknown payment method: {raw}"))),
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/addresses",
    tag = "Addresses",
    security(("bearer_auth" = [])),
    params(AddressSearchQuery),
    responses(
        (status = 200, description = "Address list", body = ApiResponse<PaginatedResponse<AddressDto>>)
    )
)]
pub async fn list_addresses(
    State(state): State<AddressModuleState>,
    Extension(_user): Extension<AuthenticatedUser>,
    Query(query): Query<AddressSearchQuery>,
) -> ApiResult<Json<ApiResponse<PaginatedResponse<AddressDto>>>> {
    let page = PaginationParams::new(query.page, query.limit);
    let result = state
        .repos
        .addresses()
        .list(query.search.as_deref(), page)
        .await?;
    Ok(Json(ApiResponse::success(PaginatedResponse::from_result(
        result,
        |a| AddressDto::from_address(&a),
    ))))
}

#[utoipa::path(
    get,
    path = "/api/v1/addresses/{id}",
    tag = "Addresses",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Address id")),
    responses(
        (status = 200, description = "Address", body = ApiResponse<AddressDto>),
        (status = 404, description = "Not found")
    )
)]
pub async fn get_address(
    State(state): State<AddressModuleState>,
    Extension(_user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<AddressDto>>> {
    let address = state
        .repos
        .addresses()
        .find_by_id(&id)
        .await?
        .ok_or_else(|| DomainError::not_found("Address", id.as_str()))?;
    Ok(Json(ApiResponse::success(AddressDto::from_address(
        &address,
    ))))
}

#[utoipa::path(
    post,
    path = "/api/v1/addresses",
    tag = "Addresses",
    security(("bearer_auth" = [])),
    request_body = CreateAddressRequest,
    responses((status = 201, description = "Address created", body = ApiResponse<AddressDto>))
)]
pub async fn create_address(
    State(state): State<AddressModuleState>,
    Extension(_user): Extension<AuthenticatedUser>,
    ValidatedJson(request): ValidatedJson<CreateAddressRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<AddressDto>>)> {
    let payment_method = parse_payment_method(request.payment_method.as_deref())?;

    let geocode_status = match (request.lat, request.lng) {
        (Some(_), Some(_)) => GeocodeStatus::Manual,
        _ => GeocodeStatus::Pending,
    };

    let now = Utc::now();
    let full_address = request
        .full_address
        .unwrap_or_else(|| format!("{}, {}", request.street, request.city));
    let address = Address {
        id: Uuid::new_v4().to_string(),
        street: request.street,
        city: request.city,
        full_address,
        lat: request.lat,
        lng: request.lng,
        geocode_status,
        customer_name: request.customer_name,
        customer_phone: request.customer_phone,
        customer_rut: request.customer_rut,
        external_order_id: request.external_order_id,
        payment_method,
        created_at: now,
        updated_at: now,
    };
    state.repos.addresses().create(address.clone()).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(AddressDto::from_address(&address))),
    ))
}

#[utoipa::path(
    patch,
    path = "/api/v1/addresses/{id}",
    tag = "Addresses",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Address id")),
    request_body = UpdateAddressRequest,
    responses(
        (status = 200, description = "Address updated", body = ApiResponse<AddressDto>),
        (status = 404, description = "Not found")
    )
)]
pub async fn update_address(
    State(state): State<AddressModuleState>,
    Extension(_user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    ValidatedJson(request): ValidatedJson<UpdateAddressRequest>,
) -> ApiResult<Json<ApiResponse<AddressDto>>> {
    let mut address = state
        .repos
        .addresses()
        .find_by_id(&id)
        .await?
        .ok_or_else(|| DomainError::not_found("Address", id.as_str()))?;

    if let Some(street) = request.street {
        address.street = street;
    }
    if let Some(city) = request.city {
        address.city = city;
    }
    if let Some(full_address) = request.full_address {
        address.full_address = full_address;
    }
    if request.lat.is_some() || request.lng.is_some() {
        address.lat = request.lat.or(address.lat);
        address.lng = request.lng.or(address.lng);
        if address.lat.is_some() && address.lng.is_some() {
            address.geocode_status = GeocodeStatus::Manual;
        }
    }
    if let Some(name) = request.customer_name {
        address.customer_name = Some(name);
    }
    if let Some(phone) = request.customer_phone {
        address.customer_phone = Some(phone);
    }
    if let Some(rut) = request.customer_rut {
        address.customer_rut = Some(rut);
    }
    if let Some(order_id) = request.external_order_id {
        address.external_order_id = Some(order_id);
    }
    if request.payment_method.is_some() {
        address.payment_method = parse_payment_method(request.payment_method.as_deref())?;
    }
    address.updated_at = Utc::now();

    state.repos.addresses().update(address.clone()).await?;
    Ok(Json(ApiResponse::success(AddressDto::from_address(
        &address,
    ))))
}

#[utoipa::path(
    delete,
    path = "/api/v1/addresses/{id}",
    tag = "Addresses",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Address id")),
    responses(
        (status = 200, description = "Address deleted"),
        (status = 404, description = "Not found"),
        (status = 409, description = "Address still referenced by stops")
    )
)]
pub async fn delete_address(
    State(state): State<AddressModuleState>,
    Extension(_user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<()>>> {
    state
        .repos
        .addresses()
        .find_by_id(&id)
        .await?
        .ok_or_else(|| DomainError::not_found("Address", id.as_str()))?;
    state.repos.addresses().delete(&id).await?;
    Ok(Json(ApiResponse::success(())))
}
