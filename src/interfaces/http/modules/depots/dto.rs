//! Depot DTOs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::domain::depot::Depot;

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DepotDto {
    pub id: String,
    pub name: String,
    pub address: String,
    pub lat: f64,
    pub lng: f64,
    pub default_departure_time: String,
    pub default_service_minutes: i32,
    pub eta_window_before: i32,
    pub eta_window_after: i32,
    pub is_default: bool,
    pub is_active: bool,
}

impl DepotDto {
    pub fn from_depot(depot: &Depot) -> Self {
        Self {
            id: depot.id.clone(),
            name: depot.name.clone(),
            address: depot.address.clone(),
            lat: depot.lat,
            lng: depot.lng,
            default_departure_time: depot.default_departure_time.clone(),
            default_service_minutes: depot.default_service_minutes,
            eta_window_before: depot.eta_window_before,
            eta_window_after: depot.eta_window_after,
            is_default: depot.is_default,
            is_active: depot.is_active,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateDepotRequest {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    #[validate(length(min = 1))]
    pub address: String,
    #[validate(range(min = -90.0, max = 90.0))]
    pub lat: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub lng: f64,
    pub default_departure_time: Option<String>,
    pub default_service_minutes: Option<i32>,
    pub eta_window_before: Option<i32>,
    pub eta_window_after: Option<i32>,
    pub is_default: Option<bool>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDepotRequest {
    #[validate(length(min = 1, max = 120))]
    pub name: Option<String>,
    pub address: Option<String>,
    #[validate(range(min = -90.0, max = 90.0))]
    pub lat: Option<f64>,
    #[validate(range(min = -180.0, max = 180.0))]
    pub lng: Option<f64>,
    pub default_departure_time: Option<String>,
    pub default_service_minutes: Option<i32>,
    pub eta_window_before: Option<i32>,
    pub eta_window_after: Option<i32>,
    pub is_default: Option<bool>,
    pub is_active: Option<bool>,
}
