//! Depot domain entity

use chrono::{DateTime, Utc};

use crate::shared::geo::Point;

/// Fixed origin/return point of a route.
///
/// At most one depot may be the default.
#[derive(Debug, Clone)]
pub struct Depot {
    pub id: String,
    pub name: String,
    pub address: String,
    pub lat: f64,
    pub lng: f64,
    /// Default departure time for routes leaving this depot, "HH:MM".
    pub default_departure_time: String,
    /// Default per-stop service time in minutes.
    pub default_service_minutes: i32,
    /// Minutes subtracted from a frozen ETA for the customer-facing window.
    pub eta_window_before: i32,
    /// Minutes added to a frozen ETA for the customer-facing window.
    pub eta_window_after: i32,
    pub is_default: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Depot {
    pub fn position(&self) -> Point {
        Point::new(self.lat, self.lng)
    }
}
