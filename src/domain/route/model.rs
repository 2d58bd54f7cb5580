//! Route domain entity and its status machine

use chrono::{DateTime, NaiveDate, Utc};

use crate::shared::geo::Point;

/// Route lifecycle status.
///
/// DRAFT -> SCHEDULED -> IN_PROGRESS <-> PAUSED -> COMPLETED, with
/// CANCELLED reachable from any non-terminal state. The Route Engine is
/// the only component allowed to move a route between states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteStatus {
    Draft,
    Scheduled,
    InProgress,
    Paused,
    Completed,
    Cancelled,
}

impl RouteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Scheduled => "SCHEDULED",
            Self::InProgress => "IN_PROGRESS",
            Self::Paused => "PAUSED",
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "DRAFT" => Some(Self::Draft),
            "SCHEDULED" => Some(Self::Scheduled),
            "IN_PROGRESS" => Some(Self::InProgress),
            "PAUSED" => Some(Self::Paused),
            "COMPLETED" => Some(Self::Completed),
            "CANCELLED" => Some(Self::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// A driver may hold at most one route in an active state.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::InProgress | Self::Paused)
    }

    /// Whether the status machine permits `self -> to`.
    pub fn can_transition(&self, to: RouteStatus) -> bool {
        use RouteStatus::*;
        matches!(
            (*self, to),
            (Draft, Scheduled)
                | (Scheduled, Draft)
                | (Scheduled, InProgress)
                | (InProgress, Paused)
                | (Paused, InProgress)
                | (InProgress, Completed)
                | (Draft, Cancelled)
                | (Scheduled, Cancelled)
                | (InProgress, Cancelled)
                | (Paused, Cancelled)
        )
    }
}

impl std::fmt::Display for RouteStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A dispatch route: an ordered set of stops assigned to one driver.
#[derive(Debug, Clone)]
pub struct Route {
    pub id: String,
    pub name: String,
    pub status: RouteStatus,
    pub scheduled_date: Option<NaiveDate>,
    /// Planned departure, "HH:MM".
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
    /// Fingerprint of the stop set at the time of the last optimization.
    pub optimization_hash: Option<String>,
    pub depot_return_time: Option<DateTime<Utc>>,
    pub driver_lat: Option<f64>,
    pub driver_lng: Option<f64>,
    pub driver_location_at: Option<DateTime<Utc>>,
    pub driver_heading: Option<f64>,
    pub driver_speed: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Route {
    /// Origin of the route: explicit origin first, else unset (the engine
    /// falls back to the depot position).
    pub fn origin(&self) -> Option<Point> {
        match (self.origin_lat, self.origin_lng) {
            (Some(lat), Some(lng)) => Some(Point::new(lat, lng)),
            _ => None,
        }
    }

    pub fn driver_position(&self) -> Option<Point> {
        match (self.driver_lat, self.driver_lng) {
            (Some(lat), Some(lng)) => Some(Point::new(lat, lng)),
            _ => None,
        }
    }
}

/// A single driver location fix, written last-writer-wins onto the route.
#[derive(Debug, Clone, Copy)]
pub struct DriverFix {
    pub lat: f64,
    pub lng: f64,
    pub heading: Option<f64>,
    pub speed: Option<f64>,
    pub accuracy: Option<f64>,
    pub recorded_at: DateTime<Utc>,
}

/// Historical driver position, appended on every location update.
#[derive(Debug, Clone)]
pub struct TrackingPoint {
    pub id: String,
    pub route_id: String,
    pub lat: f64,
    pub lng: f64,
    pub heading: Option<f64>,
    pub speed: Option<f64>,
    pub accuracy: Option<f64>,
    pub recorded_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_wire_form() {
        for s in [
            RouteStatus::Draft,
            RouteStatus::Scheduled,
            RouteStatus::InProgress,
            RouteStatus::Paused,
            RouteStatus::Completed,
            RouteStatus::Cancelled,
        ] {
            assert_eq!(RouteStatus::from_str(s.as_str()), Some(s));
        }
    }

    #[test]
    fn terminal_states_admit_no_transition() {
        for to in [
            RouteStatus::Draft,
            RouteStatus::Scheduled,
            RouteStatus::InProgress,
            RouteStatus::Paused,
            RouteStatus::Completed,
            RouteStatus::Cancelled,
        ] {
            assert!(!RouteStatus::Completed.can_transition(to));
            assert!(!RouteStatus::Cancelled.can_transition(to));
        }
    }

    #[test]
    fn lifecycle_follows_the_table() {
        assert!(RouteStatus::Draft.can_transition(RouteStatus::Scheduled));
        assert!(RouteStatus::Scheduled.can_transition(RouteStatus::Draft));
        assert!(RouteStatus::Scheduled.can_transition(RouteStatus::InProgress));
        assert!(RouteStatus::InProgress.can_transition(RouteStatus::Paused));
        assert!(RouteStatus::Paused.can_transition(RouteStatus::InProgress));
        assert!(RouteStatus::InProgress.can_transition(RouteStatus::Completed));

        assert!(!RouteStatus::Draft.can_transition(RouteStatus::InProgress));
        assert!(!RouteStatus::Paused.can_transition(RouteStatus::Completed));
        assert!(!RouteStatus::Draft.can_transition(RouteStatus::Completed));
    }
}
