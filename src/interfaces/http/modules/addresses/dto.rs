//! Address DTOs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::domain::address::Address;

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddressDto {
    pub id: String,
    pub street: String,
    pub city: String,
    pub full_address: String,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub geocode_status: String,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub customer_rut: Option<String>,
    pub external_order_id: Option<String>,
    pub payment_method: Option<String>,
}

impl AddressDto {
    pub fn from_address(address: &Address) -> Self {
        Self {
            id: address.id.clone(),
            street: address.street.clone(),
            city: address.city.clone(),
            full_address: address.full_address.clone(),
            lat: address.lat,
            lng: address.lng,
            geocode_status: address.geocode_status.as_str().to_string(),
            customer_name: address.customer_name.clone(),
            customer_phone: address.customer_phone.clone(),
            customer_rut: address.customer_rut.clone(),
            external_order_id: address.external_order_id.clone(),
            payment_method: address.payment_method.map(|m| m.as_str().to_string()),
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateAddressRequest {
    #[validate(length(min = 1))]
    pub street: String,
    #[validate(length(min = 1))]
    pub city: String,
    pub full_address: Option<String>,
    #[validate(range(min = -90.0, max = 90.0))]
    pub lat: Option<f64>,
    #[validate(range(min = -180.0, max = 180.0))]
    pub lng: Option<f64>,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub customer_rut: Option<String>,
    pub external_order_id: Option<String>,
    pub payment_method: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAddressRequest {
    pub street: Option<String>,
    pub city: Option<String>,
    pub full_address: Option<String>,
    #[validate(range(min = -90.0, max = 90.0))]
    pub lat: Option<f64>,
    #[validate(range(min = -180.0, max = 180.0))]
    pub lng: Option<f64>,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub customer_rut: Option<String>,
    pub external_order_id: Option<String>,
    pub payment_method: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct AddressSearchQuery {
    /// Substring match on the full address.
    pub search: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}
