//! Route optimizer
//!
//! Pure planning over `{origin, stops, driver shift}` plus a
//! `TravelTimeProvider`. Stops with time windows or priorities go through
//! the greedy time-window planner; unconstrained stop sets go through
//! nearest-neighbor + simulated annealing + 2-opt. Provider choice is a
//! cost decision: matrix calls grow quadratically, so larger routes fall
//! back to local geometry.

mod annealing;
pub mod fingerprint;
pub mod plan;
pub mod provider;
mod vrp;

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use thiserror::Error;
use tracing::{debug, info};

use crate::domain::DomainError;
use crate::shared::geo::Point;

pub use fingerprint::optimization_fingerprint;
pub use plan::{OptimizedPlan, OptimizerStop, PlannedStop};
pub use provider::{CheapProvider, ProviderError, TravelMatrix, TravelTimeProvider};

/// Above this stop count a remote matrix call exceeds provider batch limits
/// (and its cost), so the cheap provider is used by default.
pub const CHEAP_PROVIDER_THRESHOLD: usize = 9;

#[derive(Debug, Error)]
pub enum OptimizerError {
    #[error("travel time unavailable: {0}")]
    TravelTimeUnavailable(String),

    #[error("no feasible tour: {0}")]
    Unreachable(String),

    #[error("invalid optimizer input: {0}")]
    InvalidInput(String),
}

impl From<ProviderError> for OptimizerError {
    fn from(err: ProviderError) -> Self {
        Self::TravelTimeUnavailable(err.to_string())
    }
}

impl From<OptimizerError> for DomainError {
    fn from(err: OptimizerError) -> Self {
        match err {
            OptimizerError::TravelTimeUnavailable(msg) => DomainError::ProviderUnavailable(msg),
            OptimizerError::Unreachable(msg) | OptimizerError::InvalidInput(msg) => {
                DomainError::Validation(msg)
            }
        }
    }
}

/// One optimization request.
#[derive(Debug, Clone)]
pub struct OptimizeRequest {
    pub origin: Point,
    pub stops: Vec<OptimizerStop>,
    pub shift_start: DateTime<Utc>,
    pub shift_end: Option<DateTime<Utc>>,
    /// Pin a stop as the fixed first visit.
    pub first_stop_id: Option<String>,
    /// Pin a stop as the fixed last visit.
    pub last_stop_id: Option<String>,
    /// Force the cheap provider regardless of stop count.
    pub force_cheap: bool,
    /// Force the remote provider regardless of stop count.
    pub force_real: bool,
}

pub struct Optimizer {
    cheap: Arc<dyn TravelTimeProvider>,
    real: Option<Arc<dyn TravelTimeProvider>>,
    /// Fixed RNG seed; set in tests for reproducible annealing.
    seed: Option<u64>,
}

impl Optimizer {
    pub fn new(cheap: Arc<dyn TravelTimeProvider>, real: Option<Arc<dyn TravelTimeProvider>>) -> Self {
        Self {
            cheap,
            real,
            seed: None,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    fn provider_for(&self, stop_count: usize, force_cheap: bool, force_real: bool) -> Arc<dyn TravelTimeProvider> {
        if force_cheap {
            return Arc::clone(&self.cheap);
        }
        if let Some(real) = &self.real {
            if force_real || stop_count <= CHEAP_PROVIDER_THRESHOLD {
                return Arc::clone(real);
            }
        }
        Arc::clone(&self.cheap)
    }

    pub async fn optimize(&self, req: &OptimizeRequest) -> Result<OptimizedPlan, OptimizerError> {
        if !req.origin.is_valid() {
            return Err(OptimizerError::InvalidInput(
                "origin coordinates out of range".into(),
            ));
        }
        for stop in &req.stops {
            if !stop.position.is_valid() {
                return Err(OptimizerError::InvalidInput(format!(
                    "stop {} has invalid coordinates",
                    stop.id
                )));
            }
        }

        let fingerprint = optimization_fingerprint(&req.stops);
        let n = req.stops.len();
        if n == 0 {
            return Ok(OptimizedPlan::empty(fingerprint));
        }

        let first_pin = self.resolve_pin(req.first_stop_id.as_deref(), &req.stops, "first")?;
        let last_pin = self.resolve_pin(req.last_stop_id.as_deref(), &req.stops, "last")?;
        if let (Some(f), Some(l)) = (first_pin, last_pin) {
            if f == l && n > 1 {
                return Err(OptimizerError::InvalidInput(
                    "first and last pin reference the same stop".into(),
                ));
            }
        }

        let provider = self.provider_for(n, req.force_cheap, req.force_real);

        // Matrix index convention: 0 = origin, stop i = i + 1.
        let mut points = Vec::with_capacity(n + 1);
        points.push(req.origin);
        points.extend(req.stops.iter().map(|s| s.position));

        let matrix = provider.matrix(&points).await?;
        if matrix.len() != points.len() {
            return Err(OptimizerError::TravelTimeUnavailable(format!(
                "matrix size mismatch: expected {}, got {}",
                points.len(),
                matrix.len()
            )));
        }

        let constrained = req.stops.iter().any(|s| s.has_window() || s.priority > 0);

        if constrained {
            self.plan_with_windows(req, &matrix, first_pin, last_pin, fingerprint)
        } else {
            self.plan_unconstrained(req, &matrix, first_pin, last_pin, fingerprint)
                .await
        }
    }

    fn resolve_pin(
        &self,
        pin: Option<&str>,
        stops: &[OptimizerStop],
        which: &str,
    ) -> Result<Option<usize>, OptimizerError> {
        match pin {
            None => Ok(None),
            Some(id) => stops
                .iter()
                .position(|s| s.id == id)
                .map(Some)
                .ok_or_else(|| {
                    OptimizerError::InvalidInput(format!("{which} stop {id} is not on the route"))
                }),
        }
    }

    fn plan_with_windows(
        &self,
        req: &OptimizeRequest,
        matrix: &TravelMatrix,
        first_pin: Option<usize>,
        last_pin: Option<usize>,
        fingerprint: String,
    ) -> Result<OptimizedPlan, OptimizerError> {
        let outcome = vrp::solve_time_windows(
            &req.stops,
            matrix,
            req.shift_start,
            req.shift_end,
            first_pin,
            last_pin,
        );

        let stops: Vec<PlannedStop> = outcome
            .visits
            .iter()
            .map(|v| PlannedStop {
                stop_id: req.stops[v.stop_index].id.clone(),
                arrival: v.arrival,
                departure: v.departure,
                wait_minutes: v.wait_minutes,
                late_by_minutes: v.late_by_minutes,
                travel_minutes_from_previous: v.travel_minutes,
                distance_meters_from_previous: v.distance_meters,
            })
            .collect();

        let unserviceable = outcome
            .unserviceable
            .iter()
            .map(|&i| req.stops[i].id.clone())
            .collect();

        Ok(self.assemble(req, matrix, stops, unserviceable, outcome.warnings, fingerprint))
    }

    async fn plan_unconstrained(
        &self,
        req: &OptimizeRequest,
        matrix: &TravelMatrix,
        first_pin: Option<usize>,
        last_pin: Option<usize>,
        fingerprint: String,
    ) -> Result<OptimizedPlan, OptimizerError> {
        let n = req.stops.len();

        let start_index = first_pin.map(|i| i + 1).unwrap_or(0);
        let end_index = last_pin.map(|i| i + 1).unwrap_or(0);

        let movable: Vec<usize> = (1..=n)
            .filter(|&idx| Some(idx) != first_pin.map(|i| i + 1) && Some(idx) != last_pin.map(|i| i + 1))
            .collect();

        for &from in std::iter::once(&start_index).chain(movable.iter()) {
            for &to in movable.iter().chain(std::iter::once(&end_index)) {
                if !matrix.meters[from][to].is_finite() {
                    return Err(OptimizerError::Unreachable(
                        "travel matrix contains an unreachable leg".into(),
                    ));
                }
            }
        }

        let mut tour = annealing::nearest_neighbor(&movable, start_index, &matrix.meters);
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        tour = annealing::simulated_annealing(tour, start_index, end_index, &matrix.meters, &mut rng);
        tour = annealing::two_opt(tour, start_index, end_index, &matrix.meters);

        // Large routes skip the remote matrix; one waypoint-optimization call
        // is still allowed to refine the chosen tour with live travel times.
        if n > CHEAP_PROVIDER_THRESHOLD && !req.force_cheap && tour.len() > 2 {
            if let Some(real) = &self.real {
                let waypoints: Vec<Point> = tour.iter().map(|&idx| req.stops[idx - 1].position).collect();
                let permutation = real
                    .optimize_waypoints(
                        point_at(req, start_index),
                        &waypoints,
                        point_at(req, end_index),
                    )
                    .await?;
                if permutation.len() == tour.len() {
                    tour = permutation.iter().map(|&p| tour[p]).collect();
                } else {
                    debug!(
                        expected = tour.len(),
                        got = permutation.len(),
                        "waypoint optimization returned a partial permutation; keeping local tour"
                    );
                }
            }
        }

        let mut order = Vec::with_capacity(n);
        if let Some(f) = first_pin {
            order.push(f + 1);
        }
        order.extend(&tour);
        if let Some(l) = last_pin {
            order.push(l + 1);
        }

        let stops = schedule_tour(&order, &req.stops, matrix, req.shift_start);

        Ok(self.assemble(req, matrix, stops, Vec::new(), Vec::new(), fingerprint))
    }

    fn assemble(
        &self,
        req: &OptimizeRequest,
        matrix: &TravelMatrix,
        stops: Vec<PlannedStop>,
        unserviceable_stop_ids: Vec<String>,
        warnings: Vec<String>,
        fingerprint: String,
    ) -> OptimizedPlan {
        let ordered_stop_ids: Vec<String> = stops.iter().map(|s| s.stop_id.clone()).collect();
        let total_wait_min: f64 = stops.iter().map(|s| s.wait_minutes).sum();
        let mut total_distance_m: f64 = stops.iter().map(|s| s.distance_meters_from_previous).sum();

        // Close the loop back to the origin.
        let return_to_depot = stops.last().map(|last| {
            let last_index = req
                .stops
                .iter()
                .position(|s| s.id == last.stop_id)
                .map(|i| i + 1)
                .unwrap_or(0);
            total_distance_m += matrix.meters[last_index][0];
            let return_minutes = matrix.minutes[last_index][0];
            last.departure + Duration::milliseconds((return_minutes * 60_000.0).round() as i64)
        });

        let total_duration_min = return_to_depot
            .map(|back| (back - req.shift_start).num_milliseconds() as f64 / 60_000.0)
            .unwrap_or(0.0);

        info!(
            stops = stops.len(),
            unserviceable = unserviceable_stop_ids.len(),
            total_km = total_distance_m / 1000.0,
            "Optimization plan assembled"
        );

        OptimizedPlan {
            ordered_stop_ids,
            stops,
            total_distance_km: total_distance_m / 1000.0,
            total_duration_min,
            total_wait_min,
            return_to_depot,
            unserviceable_stop_ids,
            warnings,
            fingerprint,
        }
    }
}

fn point_at(req: &OptimizeRequest, index: usize) -> Point {
    if index == 0 {
        req.origin
    } else {
        req.stops[index - 1].position
    }
}

/// Walk an ordered tour computing per-stop arrival and departure from the
/// shift start.
fn schedule_tour(
    order: &[usize],
    stops: &[OptimizerStop],
    matrix: &TravelMatrix,
    shift_start: DateTime<Utc>,
) -> Vec<PlannedStop> {
    let mut planned = Vec::with_capacity(order.len());
    let mut previous = 0usize;
    let mut current_time = shift_start;

    for &idx in order {
        let stop = &stops[idx - 1];
        let travel = matrix.minutes[previous][idx];
        let distance = matrix.meters[previous][idx];
        let arrival = current_time + Duration::milliseconds((travel * 60_000.0).round() as i64);

        let wait = match stop.time_window_start {
            Some(start) if start > arrival => {
                (start - arrival).num_milliseconds() as f64 / 60_000.0
            }
            _ => 0.0,
        };
        let service_start = arrival + Duration::milliseconds((wait * 60_000.0).round() as i64);
        let late_by = match stop.time_window_end {
            Some(end) if service_start > end => {
                (service_start - end).num_milliseconds() as f64 / 60_000.0
            }
            _ => 0.0,
        };
        let departure = service_start + Duration::minutes(i64::from(stop.service_minutes));

        planned.push(PlannedStop {
            stop_id: stop.id.clone(),
            arrival,
            departure,
            wait_minutes: wait,
            late_by_minutes: late_by,
            travel_minutes_from_previous: travel,
            distance_meters_from_previous: distance,
        });

        previous = idx;
        current_time = departure;
    }

    planned
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn cheap() -> Arc<dyn TravelTimeProvider> {
        Arc::new(CheapProvider::default())
    }

    fn stop(id: &str, lat: f64, lng: f64) -> OptimizerStop {
        OptimizerStop {
            id: id.to_string(),
            position: Point::new(lat, lng),
            service_minutes: 10,
            time_window_start: None,
            time_window_end: None,
            priority: 0,
        }
    }

    fn request(stops: Vec<OptimizerStop>) -> OptimizeRequest {
        OptimizeRequest {
            origin: Point::new(-33.45, -70.66),
            stops,
            shift_start: Utc.with_ymd_and_hms(2025, 6, 1, 10, 0, 0).unwrap(),
            shift_end: None,
            first_stop_id: None,
            last_stop_id: None,
            force_cheap: true,
            force_real: false,
        }
    }

    #[tokio::test]
    async fn zero_stops_yield_an_empty_plan() {
        let optimizer = Optimizer::new(cheap(), None);
        let plan = optimizer.optimize(&request(vec![])).await.unwrap();
        assert!(plan.ordered_stop_ids.is_empty());
        assert_eq!(plan.total_distance_km, 0.0);
        assert_eq!(plan.total_duration_min, 0.0);
        assert!(plan.return_to_depot.is_none());
    }

    #[tokio::test]
    async fn one_stop_arrives_after_the_depot_leg() {
        let optimizer = Optimizer::new(cheap(), None);
        let req = request(vec![stop("a", -33.46, -70.65)]);
        let plan = optimizer.optimize(&req).await.unwrap();

        assert_eq!(plan.ordered_stop_ids, vec!["a"]);
        let provider = CheapProvider::default();
        let expected = provider
            .travel_time(req.origin, req.stops[0].position, None)
            .await
            .unwrap();
        let visit = &plan.stops[0];
        let actual = (visit.arrival - req.shift_start).num_milliseconds() as f64 / 60_000.0;
        assert!((actual - expected).abs() < 0.02, "{actual} vs {expected}");
    }

    #[tokio::test]
    async fn three_stop_tour_minimizes_total_distance() {
        // Depot and stops from the reference scenario.
        let optimizer = Optimizer::new(cheap(), None).with_seed(42);
        let stops = vec![
            stop("a", -33.46, -70.65),
            stop("b", -33.44, -70.67),
            stop("c", -33.45, -70.68),
        ];
        let req = request(stops.clone());
        let plan = optimizer.optimize(&req).await.unwrap();
        assert_eq!(plan.ordered_stop_ids.len(), 3);

        // Brute-force the optimum over all 6 permutations.
        let provider = CheapProvider::default();
        let mut points = vec![req.origin];
        points.extend(stops.iter().map(|s| s.position));
        let matrix = provider.matrix(&points).await.unwrap();

        let mut best = f64::INFINITY;
        let perms: [[usize; 3]; 6] = [
            [1, 2, 3],
            [1, 3, 2],
            [2, 1, 3],
            [2, 3, 1],
            [3, 1, 2],
            [3, 2, 1],
        ];
        for perm in perms {
            let mut cost = 0.0;
            let mut prev = 0;
            for idx in perm {
                cost += matrix.meters[prev][idx];
                prev = idx;
            }
            cost += matrix.meters[prev][0];
            best = best.min(cost);
        }

        assert!((plan.total_distance_km - best / 1000.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn pinned_first_stop_leads_the_tour() {
        let optimizer = Optimizer::new(cheap(), None).with_seed(1);
        let mut req = request(vec![
            stop("a", -33.46, -70.65),
            stop("b", -33.44, -70.67),
            stop("c", -33.45, -70.68),
        ]);
        req.first_stop_id = Some("c".into());
        let plan = optimizer.optimize(&req).await.unwrap();
        assert_eq!(plan.ordered_stop_ids[0], "c");
        assert!(plan.stops[0].travel_minutes_from_previous > 0.0);
    }

    #[tokio::test]
    async fn pinned_last_stop_closes_the_tour() {
        let optimizer = Optimizer::new(cheap(), None).with_seed(1);
        let mut req = request(vec![
            stop("a", -33.46, -70.65),
            stop("b", -33.44, -70.67),
            stop("c", -33.45, -70.68),
        ]);
        req.last_stop_id = Some("a".into());
        let plan = optimizer.optimize(&req).await.unwrap();
        assert_eq!(plan.ordered_stop_ids.last().unwrap(), "a");
    }

    #[tokio::test]
    async fn unknown_pin_is_invalid_input() {
        let optimizer = Optimizer::new(cheap(), None);
        let mut req = request(vec![stop("a", -33.46, -70.65)]);
        req.first_stop_id = Some("ghost".into());
        let err = optimizer.optimize(&req).await.unwrap_err();
        assert!(matches!(err, OptimizerError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn out_of_range_coordinates_are_invalid_input() {
        let optimizer = Optimizer::new(cheap(), None);
        let req = request(vec![stop("a", -133.46, -70.65)]);
        let err = optimizer.optimize(&req).await.unwrap_err();
        assert!(matches!(err, OptimizerError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn window_or_priority_routes_through_the_greedy_planner() {
        let optimizer = Optimizer::new(cheap(), None);
        let mut stops = vec![
            stop("a", -33.46, -70.65),
            stop("b", -33.44, -70.67),
        ];
        stops[1].priority = 3;
        let req = request(stops);
        let plan = optimizer.optimize(&req).await.unwrap();
        // Priority pulls "b" to the front even though "a" may be closer.
        assert_eq!(plan.ordered_stop_ids[0], "b");
    }

    #[tokio::test]
    async fn optimization_is_idempotent_for_identical_input() {
        let optimizer = Optimizer::new(cheap(), None).with_seed(9);
        let req = request(vec![
            stop("a", -33.46, -70.65),
            stop("b", -33.44, -70.67),
            stop("c", -33.45, -70.68),
        ]);
        let first = optimizer.optimize(&req).await.unwrap();
        let second = optimizer.optimize(&req).await.unwrap();
        assert_eq!(first.ordered_stop_ids, second.ordered_stop_ids);
        assert_eq!(first.fingerprint, second.fingerprint);
    }
}
