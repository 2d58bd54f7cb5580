//! Route and stop DTOs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::domain::route::{Route, TrackingPoint};
use crate::domain::stop::Stop;

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RouteDto {
    pub id: String,
    pub name: String,
    pub status: String,
    pub scheduled_date: Option<NaiveDate>,
    pub departure_time: Option<String>,
    pub depot_id: Option<String>,
    pub origin_lat: Option<f64>,
    pub origin_lng: Option<f64>,
    pub origin_address: Option<String>,
    pub assigned_driver_id: Option<String>,
    pub created_by: String,
    pub sent_at: Option<DateTime<Utc>>,
    pub loaded_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub actual_start_time: Option<DateTime<Utc>>,
    pub paused_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub total_distance_km: Option<f64>,
    pub total_duration_min: Option<f64>,
    pub optimized_at: Option<DateTime<Utc>>,
    pub depot_return_time: Option<DateTime<Utc>>,
    pub driver_lat: Option<f64>,
    pub driver_lng: Option<f64>,
    pub driver_location_at: Option<DateTime<Utc>>,
    pub driver_heading: Option<f64>,
    pub driver_speed: Option<f64>,
    pub created_at: DateTime<Utc>,
}

impl RouteDto {
    pub fn from_route(route: &Route) -> Self {
        Self {
            id: route.id.clone(),
            name: route.name.clone(),
            status: route.status.as_str().to_string(),
            scheduled_date: route.scheduled_date,
            departure_time: route.departure_time.clone(),
            depot_id: route.depot_id.clone(),
            origin_lat: route.origin_lat,
            origin_lng: route.origin_lng,
            origin_address: route.origin_address.clone(),
            assigned_driver_id: route.assigned_driver_id.clone(),
            created_by: route.created_by.clone(),
            sent_at: route.sent_at,
            loaded_at: route.loaded_at,
            started_at: route.started_at,
            actual_start_time: route.actual_start_time,
            paused_at: route.paused_at,
            completed_at: route.completed_at,
            total_distance_km: route.total_distance_km,
            total_duration_min: route.total_duration_min,
            optimized_at: route.optimized_at,
            depot_return_time: route.depot_return_time,
            driver_lat: route.driver_lat,
            driver_lng: route.driver_lng,
            driver_location_at: route.driver_location_at,
            driver_heading: route.driver_heading,
            driver_speed: route.driver_speed,
            created_at: route.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StopDto {
    pub id: String,
    pub route_id: String,
    pub address_id: String,
    pub sequence_order: i32,
    pub status: String,
    pub estimated_minutes: i32,
    pub priority: i32,
    pub time_window_start: Option<DateTime<Utc>>,
    pub time_window_end: Option<DateTime<Utc>>,
    pub estimated_arrival: Option<DateTime<Utc>>,
    pub original_estimated_arrival: Option<DateTime<Utc>>,
    pub travel_minutes_from_previous: Option<f64>,
    pub arrived_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub require_signature: bool,
    pub require_photo: bool,
    pub signature_url: Option<String>,
    pub photo_url: Option<String>,
    pub is_paid: bool,
    pub payment_status: String,
    pub payment_method: Option<String>,
    #[schema(value_type = Option<String>)]
    pub payment_amount: Option<Decimal>,
    pub customer_rut: Option<String>,
    pub external_order_id: Option<String>,
    pub notes: Option<String>,
    pub failure_reason: Option<String>,
}

impl StopDto {
    pub fn from_stop(stop: &Stop) -> Self {
        Self {
            id: stop.id.clone(),
            route_id: stop.route_id.clone(),
            address_id: stop.address_id.clone(),
            sequence_order: stop.sequence_order,
            status: stop.status.as_str().to_string(),
            estimated_minutes: stop.estimated_minutes,
            priority: stop.priority,
            time_window_start: stop.time_window_start,
            time_window_end: stop.time_window_end,
            estimated_arrival: stop.estimated_arrival,
            original_estimated_arrival: stop.original_estimated_arrival,
            travel_minutes_from_previous: stop.travel_minutes_from_previous,
            arrived_at: stop.arrived_at,
            completed_at: stop.completed_at,
            require_signature: stop.require_signature,
            require_photo: stop.require_photo,
            signature_url: stop.signature_url.clone(),
            photo_url: stop.photo_url.clone(),
            is_paid: stop.is_paid,
            payment_status: stop.payment_status.as_str().to_string(),
            payment_method: stop.payment_method.map(|m| m.as_str().to_string()),
            payment_amount: stop.payment_amount,
            customer_rut: stop.customer_rut.clone(),
            external_order_id: stop.external_order_id.clone(),
            notes: stop.notes.clone(),
            failure_reason: stop.failure_reason.clone(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RouteDetailDto {
    #[serde(flatten)]
    pub route: RouteDto,
    pub stops: Vec<StopDto>,
}

#[derive(Debug, Deserialize, ToSchema, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct RouteListQuery {
    pub status: Option<String>,
    pub driver_id: Option<String>,
    /// YYYY-MM-DD
    pub date: Option<NaiveDate>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateRouteRequest {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    pub scheduled_date: Option<NaiveDate>,
    /// "HH:MM"
    pub departure_time: Option<String>,
    pub depot_id: Option<String>,
    pub assigned_driver_id: Option<String>,
    #[validate(range(min = -90.0, max = 90.0))]
    pub origin_lat: Option<f64>,
    #[validate(range(min = -180.0, max = 180.0))]
    pub origin_lng: Option<f64>,
    pub origin_address: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRouteRequest {
    #[validate(length(min = 1, max = 120))]
    pub name: Option<String>,
    pub scheduled_date: Option<NaiveDate>,
    pub departure_time: Option<String>,
    pub depot_id: Option<String>,
    pub assigned_driver_id: Option<String>,
    #[validate(range(min = -90.0, max = 90.0))]
    pub origin_lat: Option<f64>,
    #[validate(range(min = -180.0, max = 180.0))]
    pub origin_lng: Option<f64>,
    pub origin_address: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeleteRouteRequest {
    /// Admin password confirmation; required for non-draft routes.
    pub password: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddStopRequest {
    #[validate(length(min = 1))]
    pub address_id: String,
    #[validate(range(min = 0, max = 240))]
    pub estimated_minutes: Option<i32>,
    #[validate(range(min = 0, max = 10))]
    pub priority: Option<i32>,
    pub time_window_start: Option<DateTime<Utc>>,
    pub time_window_end: Option<DateTime<Utc>>,
    pub require_signature: Option<bool>,
    pub require_photo: Option<bool>,
    #[schema(value_type = Option<String>)]
    pub payment_amount: Option<Decimal>,
    pub payment_method: Option<String>,
    pub customer_rut: Option<String>,
    pub external_order_id: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStopRequest {
    #[validate(range(min = 0, max = 240))]
    pub estimated_minutes: Option<i32>,
    #[validate(range(min = 0, max = 10))]
    pub priority: Option<i32>,
    pub time_window_start: Option<DateTime<Utc>>,
    pub time_window_end: Option<DateTime<Utc>>,
    pub require_signature: Option<bool>,
    pub require_photo: Option<bool>,
    #[schema(value_type = Option<String>)]
    pub payment_amount: Option<Decimal>,
    pub payment_method: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReorderStopsRequest {
    #[validate(length(min = 1))]
    pub stop_ids: Vec<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OptimizeRouteRequestDto {
    /// "HH:MM" on the scheduled date
    pub driver_start_time: Option<String>,
    /// "HH:MM"
    pub driver_end_time: Option<String>,
    /// Bypass the fingerprint short-circuit
    pub force: Option<bool>,
    pub first_stop_id: Option<String>,
    pub last_stop_id: Option<String>,
    /// Force the cheap (haversine) provider
    pub use_haversine: Option<bool>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OptimizeRouteResponseDto {
    pub route: RouteDto,
    pub ordered_stop_ids: Vec<String>,
    pub unchanged: bool,
    pub unserviceable_stop_ids: Vec<String>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LocationUpdateRequest {
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,
    #[validate(range(min = 0.0, max = 360.0))]
    pub heading: Option<f64>,
    #[validate(range(min = 0.0))]
    pub speed: Option<f64>,
    #[validate(range(min = 0.0))]
    pub accuracy: Option<f64>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompleteStopRequestDto {
    /// COMPLETED, FAILED or SKIPPED
    #[validate(length(min = 1))]
    pub status: String,
    pub notes: Option<String>,
    pub failure_reason: Option<String>,
    pub signature_url: Option<String>,
    pub photo_url: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StopCompletionResponseDto {
    pub stop: StopDto,
    pub route_completed: bool,
}

/// Outcome of the awaited notification re-dispatch.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResendNotificationsResponseDto {
    pub ok: bool,
    pub http_status: Option<u16>,
    pub error: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TrackingPointDto {
    pub lat: f64,
    pub lng: f64,
    pub heading: Option<f64>,
    pub speed: Option<f64>,
    pub accuracy: Option<f64>,
    pub recorded_at: DateTime<Utc>,
}

impl TrackingPointDto {
    pub fn from_point(point: &TrackingPoint) -> Self {
        Self {
            lat: point.lat,
            lng: point.lng,
            heading: point.heading,
            speed: point.speed,
            accuracy: point.accuracy,
            recorded_at: point.recorded_at,
        }
    }
}

// ── Import (third-party integrators) ────────────────────────────

#[derive(Debug, Deserialize, Serialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImportAddressDto {
    #[validate(length(min = 1))]
    pub street: String,
    #[validate(length(min = 1))]
    pub city: String,
    pub full_address: Option<String>,
    #[validate(range(min = -90.0, max = 90.0))]
    pub lat: Option<f64>,
    #[validate(range(min = -180.0, max = 180.0))]
    pub lng: Option<f64>,
}

#[derive(Debug, Deserialize, Serialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImportStopDto {
    #[validate(nested)]
    pub address: ImportAddressDto,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub customer_rut: Option<String>,
    pub external_order_id: Option<String>,
    #[validate(range(min = 0, max = 240))]
    pub service_minutes: Option<i32>,
    #[validate(range(min = 0, max = 10))]
    pub priority: Option<i32>,
    pub time_window_start: Option<DateTime<Utc>>,
    pub time_window_end: Option<DateTime<Utc>>,
    #[schema(value_type = Option<String>)]
    pub payment_amount: Option<Decimal>,
    pub payment_method: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImportRouteRequest {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    pub scheduled_date: Option<NaiveDate>,
    pub departure_time: Option<String>,
    pub depot_id: Option<String>,
    pub assigned_driver_id: Option<String>,
    #[validate(length(min = 1))]
    #[validate(nested)]
    pub stops: Vec<ImportStopDto>,
}
