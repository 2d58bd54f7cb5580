//! Live route events broadcast to SSE subscribers
//!
//! Delivery is best-effort and non-durable: subscribers that disconnect do
//! not receive replay.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// State change on a route, mirrored to dashboard subscribers.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum RouteEvent {
    Connected {
        #[serde(rename = "routeId")]
        route_id: String,
        status: String,
    },
    RouteLoaded {
        #[serde(rename = "routeId")]
        route_id: String,
        #[serde(rename = "loadedAt")]
        loaded_at: DateTime<Utc>,
    },
    RouteSent {
        #[serde(rename = "routeId")]
        route_id: String,
        #[serde(rename = "driverId")]
        driver_id: String,
    },
    RouteStarted {
        #[serde(rename = "routeId")]
        route_id: String,
        #[serde(rename = "startedAt")]
        started_at: DateTime<Utc>,
    },
    RouteCompleted {
        #[serde(rename = "routeId")]
        route_id: String,
        #[serde(rename = "completedAt")]
        completed_at: DateTime<Utc>,
    },
    StopStatusChanged {
        #[serde(rename = "routeId")]
        route_id: String,
        #[serde(rename = "stopId")]
        stop_id: String,
        status: String,
    },
    StopInTransit {
        #[serde(rename = "routeId")]
        route_id: String,
        #[serde(rename = "stopId")]
        stop_id: String,
        #[serde(rename = "estimatedArrival", skip_serializing_if = "Option::is_none")]
        estimated_arrival: Option<DateTime<Utc>>,
    },
    DriverLocationUpdated {
        #[serde(rename = "routeId")]
        route_id: String,
        latitude: f64,
        longitude: f64,
        #[serde(skip_serializing_if = "Option::is_none")]
        heading: Option<f64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        speed: Option<f64>,
        #[serde(rename = "recordedAt")]
        recorded_at: DateTime<Utc>,
    },
}

impl RouteEvent {
    /// SSE event name.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Connected { .. } => "connected",
            Self::RouteLoaded { .. } => "route.loaded",
            Self::RouteSent { .. } => "route.sent",
            Self::RouteStarted { .. } => "route.started",
            Self::RouteCompleted { .. } => "route.completed",
            Self::StopStatusChanged { .. } => "stop.status_changed",
            Self::StopInTransit { .. } => "stop.in_transit",
            Self::DriverLocationUpdated { .. } => "driver.location_updated",
        }
    }

    pub fn route_id(&self) -> &str {
        match self {
            Self::Connected { route_id, .. }
            | Self::RouteLoaded { route_id, .. }
            | Self::RouteSent { route_id, .. }
            | Self::RouteStarted { route_id, .. }
            | Self::RouteCompleted { route_id, .. }
            | Self::StopStatusChanged { route_id, .. }
            | Self::StopInTransit { route_id, .. }
            | Self::DriverLocationUpdated { route_id, .. } => route_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_names_match_the_taxonomy() {
        let ev = RouteEvent::StopStatusChanged {
            route_id: "r1".into(),
            stop_id: "s1".into(),
            status: "COMPLETED".into(),
        };
        assert_eq!(ev.event_type(), "stop.status_changed");
        assert_eq!(ev.route_id(), "r1");
    }

    #[test]
    fn payload_serializes_camel_case() {
        let ev = RouteEvent::DriverLocationUpdated {
            route_id: "r1".into(),
            latitude: -33.45,
            longitude: -70.66,
            heading: None,
            speed: Some(12.5),
            recorded_at: Utc::now(),
        };
        let json = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["routeId"], "r1");
        assert!(json.get("heading").is_none());
        assert_eq!(json["speed"], 12.5);
    }
}
