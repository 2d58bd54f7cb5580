//! Optimizer input/output shapes

use chrono::{DateTime, Utc};

use crate::shared::geo::Point;

/// One stop as the planner sees it.
#[derive(Debug, Clone)]
pub struct OptimizerStop {
    pub id: String,
    pub position: Point,
    pub service_minutes: i32,
    pub time_window_start: Option<DateTime<Utc>>,
    pub time_window_end: Option<DateTime<Utc>>,
    pub priority: i32,
}

impl OptimizerStop {
    pub fn has_window(&self) -> bool {
        self.time_window_start.is_some() || self.time_window_end.is_some()
    }
}

/// Scheduled visit produced by the planner.
#[derive(Debug, Clone)]
pub struct PlannedStop {
    pub stop_id: String,
    pub arrival: DateTime<Utc>,
    pub departure: DateTime<Utc>,
    pub wait_minutes: f64,
    pub late_by_minutes: f64,
    pub travel_minutes_from_previous: f64,
    pub distance_meters_from_previous: f64,
}

/// Complete ordered plan for one route.
#[derive(Debug, Clone)]
pub struct OptimizedPlan {
    /// Stop ids in visit order.
    pub ordered_stop_ids: Vec<String>,
    pub stops: Vec<PlannedStop>,
    pub total_distance_km: f64,
    pub total_duration_min: f64,
    pub total_wait_min: f64,
    /// Instant the driver is back at the depot after the last stop.
    pub return_to_depot: Option<DateTime<Utc>>,
    pub unserviceable_stop_ids: Vec<String>,
    pub warnings: Vec<String>,
    /// Fingerprint of the *input* stop set, stored on the route for the
    /// idempotence short-circuit.
    pub fingerprint: String,
}

impl OptimizedPlan {
    pub fn empty(fingerprint: String) -> Self {
        Self {
            ordered_stop_ids: Vec::new(),
            stops: Vec::new(),
            total_distance_km: 0.0,
            total_duration_min: 0.0,
            total_wait_min: 0.0,
            return_to_depot: None,
            unserviceable_stop_ids: Vec::new(),
            warnings: Vec::new(),
            fingerprint,
        }
    }
}
