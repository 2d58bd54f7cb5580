//! Outbound webhook payload shapes
//!
//! Every payload carries the route snapshot, the driver snapshot (when one
//! is assigned), optionally the triggering stop, the remaining stops with
//! their customer-facing ETA windows, and a free-form metadata object.
//!
//! ETA windows are rendered from `original_estimated_arrival` - the value
//! frozen at route start - so the window communicated to a customer never
//! moves after the driver leaves the depot.

use chrono::{DateTime, Duration, Timelike, Utc};
use serde::Serialize;

use crate::domain::route::Route;
use crate::domain::stop::Stop;
use crate::domain::user::User;

/// Canonical outbound event names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookEventKind {
    RouteStarted,
    RouteCompleted,
    StopInTransit,
    StopCompleted,
    StopFailed,
    StopSkipped,
    EtaUpdated,
    /// Reserved: a geofence-triggered heads-up. The shape is fixed here but
    /// nothing emits it until a trigger condition is defined.
    StopApproaching,
}

impl WebhookEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RouteStarted => "route.started",
            Self::RouteCompleted => "route.completed",
            Self::StopInTransit => "stop.in_transit",
            Self::StopCompleted => "stop.completed",
            Self::StopFailed => "stop.failed",
            Self::StopSkipped => "stop.skipped",
            Self::EtaUpdated => "eta.updated",
            Self::StopApproaching => "stop.approaching",
        }
    }
}

/// Round down to the previous 10-minute boundary.
pub fn floor10(t: DateTime<Utc>) -> DateTime<Utc> {
    let t = t
        .with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(t);
    let excess = t.minute() % 10;
    t - Duration::minutes(i64::from(excess))
}

/// Round up to the next 10-minute boundary.
pub fn ceil10(t: DateTime<Utc>) -> DateTime<Utc> {
    let floored = floor10(t);
    if floored == t {
        t
    } else {
        floored + Duration::minutes(10)
    }
}

/// Customer-facing arrival window around a frozen ETA.
pub fn eta_window(
    original_estimated_arrival: DateTime<Utc>,
    before_minutes: i64,
    after_minutes: i64,
) -> (DateTime<Utc>, DateTime<Utc>) {
    (
        floor10(original_estimated_arrival - Duration::minutes(before_minutes)),
        ceil10(original_estimated_arrival + Duration::minutes(after_minutes)),
    )
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteSnapshot {
    pub id: String,
    pub name: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depot_return_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_distance_km: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_duration_min: Option<f64>,
}

impl RouteSnapshot {
    pub fn from_route(route: &Route) -> Self {
        Self {
            id: route.id.clone(),
            name: route.name.clone(),
            status: route.status.as_str().to_string(),
            started_at: route.started_at,
            completed_at: route.completed_at,
            depot_return_time: route.depot_return_time,
            total_distance_km: route.total_distance_km,
            total_duration_min: route.total_duration_min,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverSnapshot {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl DriverSnapshot {
    pub fn from_user(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            phone: user.phone.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StopSnapshot {
    pub id: String,
    pub sequence_order: i32,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_arrival: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eta_window_start: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eta_window_end: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_order_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_rut: Option<String>,
}

impl StopSnapshot {
    /// Snapshot with the customer window rendered around the frozen ETA.
    pub fn from_stop(stop: &Stop, window_before_min: i64, window_after_min: i64) -> Self {
        let window = stop
            .original_estimated_arrival
            .map(|eta| eta_window(eta, window_before_min, window_after_min));
        Self {
            id: stop.id.clone(),
            sequence_order: stop.sequence_order,
            status: stop.status.as_str().to_string(),
            estimated_arrival: stop.estimated_arrival,
            eta_window_start: window.map(|w| w.0),
            eta_window_end: window.map(|w| w.1),
            completed_at: stop.completed_at,
            external_order_id: stop.external_order_id.clone(),
            customer_rut: stop.customer_rut.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookPayload {
    pub event: String,
    pub timestamp: DateTime<Utc>,
    pub route: RouteSnapshot,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver: Option<DriverSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<StopSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_stops: Option<Vec<StopSnapshot>>,
    pub metadata: serde_json::Value,
}

/// Assemble a payload for one outbound event.
#[allow(clippy::too_many_arguments)]
pub fn build_payload(
    kind: WebhookEventKind,
    timestamp: DateTime<Utc>,
    route: &Route,
    driver: Option<&User>,
    stop: Option<&Stop>,
    remaining_stops: Option<&[Stop]>,
    window_before_min: i64,
    window_after_min: i64,
    metadata: serde_json::Value,
) -> WebhookPayload {
    WebhookPayload {
        event: kind.as_str().to_string(),
        timestamp,
        route: RouteSnapshot::from_route(route),
        driver: driver.map(DriverSnapshot::from_user),
        stop: stop.map(|s| StopSnapshot::from_stop(s, window_before_min, window_after_min)),
        remaining_stops: remaining_stops.map(|stops| {
            stops
                .iter()
                .map(|s| StopSnapshot::from_stop(s, window_before_min, window_after_min))
                .collect()
        }),
        metadata,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn floor10_and_ceil10_round_to_boundaries() {
        let t = Utc.with_ymd_and_hms(2025, 6, 1, 11, 7, 42).unwrap();
        assert_eq!(floor10(t), Utc.with_ymd_and_hms(2025, 6, 1, 11, 0, 0).unwrap());
        assert_eq!(ceil10(t), Utc.with_ymd_and_hms(2025, 6, 1, 11, 10, 0).unwrap());

        let exact = Utc.with_ymd_and_hms(2025, 6, 1, 11, 20, 0).unwrap();
        assert_eq!(floor10(exact), exact);
        assert_eq!(ceil10(exact), exact);
    }

    #[test]
    fn window_brackets_the_frozen_eta() {
        let eta = Utc.with_ymd_and_hms(2025, 6, 1, 11, 4, 0).unwrap();
        let (start, end) = eta_window(eta, 30, 30);
        assert_eq!(start, Utc.with_ymd_and_hms(2025, 6, 1, 10, 30, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2025, 6, 1, 11, 40, 0).unwrap());
        assert!(start <= eta && eta <= end);
    }

    #[test]
    fn event_names_are_stable() {
        assert_eq!(WebhookEventKind::RouteStarted.as_str(), "route.started");
        assert_eq!(WebhookEventKind::EtaUpdated.as_str(), "eta.updated");
        assert_eq!(WebhookEventKind::StopApproaching.as_str(), "stop.approaching");
    }
}
