//! Address domain entity

use chrono::{DateTime, Utc};

use crate::domain::payment::PaymentMethod;
use crate::shared::geo::Point;

/// Geocoding state of an address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeocodeStatus {
    Pending,
    Success,
    Failed,
    /// Coordinates entered by an operator, not resolved automatically.
    Manual,
}

impl GeocodeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Success => "SUCCESS",
            Self::Failed => "FAILED",
            Self::Manual => "MANUAL",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(Self::Pending),
            "SUCCESS" => Some(Self::Success),
            "FAILED" => Some(Self::Failed),
            "MANUAL" => Some(Self::Manual),
            _ => None,
        }
    }
}

/// Delivery address, shared between stops.
#[derive(Debug, Clone)]
pub struct Address {
    pub id: String,
    pub street: String,
    pub city: String,
    pub full_address: String,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub geocode_status: GeocodeStatus,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub customer_rut: Option<String>,
    pub external_order_id: Option<String>,
    pub payment_method: Option<PaymentMethod>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Address {
    /// Position, when both coordinates are present.
    pub fn position(&self) -> Option<Point> {
        match (self.lat, self.lng) {
            (Some(lat), Some(lng)) => Some(Point::new(lat, lng)),
            _ => None,
        }
    }

    pub fn is_geocoded(&self) -> bool {
        self.position().is_some()
    }
}
