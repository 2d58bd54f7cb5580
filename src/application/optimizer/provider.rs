//! Travel time provider capability interface
//!
//! The optimizer and the route engine never know whether travel times come
//! from a remote mapping API or from local geometry; they receive a
//! provider by composition.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::shared::geo::{
    estimate_travel_minutes, road_distance_meters, Point, DEFAULT_AVERAGE_SPEED_KMH,
    DEFAULT_ROAD_FACTOR,
};

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("travel time provider unavailable: {0}")]
    Unavailable(String),

    #[error("invalid provider response: {0}")]
    InvalidResponse(String),
}

/// Full pairwise travel matrix: `minutes[i][j]` and `meters[i][j]` are the
/// cost of the leg from point `i` to point `j`.
#[derive(Debug, Clone)]
pub struct TravelMatrix {
    pub minutes: Vec<Vec<f64>>,
    pub meters: Vec<Vec<f64>>,
}

impl TravelMatrix {
    pub fn len(&self) -> usize {
        self.minutes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.minutes.is_empty()
    }
}

#[async_trait]
pub trait TravelTimeProvider: Send + Sync {
    /// Travel minutes for a single leg, optionally traffic-aware.
    async fn travel_time(
        &self,
        origin: Point,
        destination: Point,
        depart_at: Option<DateTime<Utc>>,
    ) -> Result<f64, ProviderError>;

    /// Pairwise matrix over `points`. Grows quadratically with the point
    /// count; remote implementations enforce batch limits.
    async fn matrix(&self, points: &[Point]) -> Result<TravelMatrix, ProviderError>;

    /// A permutation of `waypoints` minimizing total travel time from
    /// `origin` to `destination`.
    async fn optimize_waypoints(
        &self,
        origin: Point,
        waypoints: &[Point],
        destination: Point,
    ) -> Result<Vec<usize>, ProviderError>;
}

/// Local fallback provider: haversine scaled by a road factor, divided by a
/// fixed average speed. Used whenever calling a remote mapping service is
/// uneconomical.
#[derive(Debug, Clone)]
pub struct CheapProvider {
    pub road_factor: f64,
    pub average_speed_kmh: f64,
}

impl CheapProvider {
    pub fn new(road_factor: f64, average_speed_kmh: f64) -> Self {
        Self {
            road_factor,
            average_speed_kmh,
        }
    }

    fn leg_minutes(&self, a: Point, b: Point) -> f64 {
        estimate_travel_minutes(a, b, self.road_factor, self.average_speed_kmh)
    }

    fn leg_meters(&self, a: Point, b: Point) -> f64 {
        road_distance_meters(a, b, self.road_factor)
    }
}

impl Default for CheapProvider {
    fn default() -> Self {
        Self::new(DEFAULT_ROAD_FACTOR, DEFAULT_AVERAGE_SPEED_KMH)
    }
}

#[async_trait]
impl TravelTimeProvider for CheapProvider {
    async fn travel_time(
        &self,
        origin: Point,
        destination: Point,
        _depart_at: Option<DateTime<Utc>>,
    ) -> Result<f64, ProviderError> {
        Ok(self.leg_minutes(origin, destination))
    }

    async fn matrix(&self, points: &[Point]) -> Result<TravelMatrix, ProviderError> {
        let n = points.len();
        let mut minutes = vec![vec![0.0; n]; n];
        let mut meters = vec![vec![0.0; n]; n];
        for i in 0..n {
            for j in 0..n {
                if i == j {
                    continue;
                }
                minutes[i][j] = self.leg_minutes(points[i], points[j]);
                meters[i][j] = self.leg_meters(points[i], points[j]);
            }
        }
        Ok(TravelMatrix { minutes, meters })
    }

    async fn optimize_waypoints(
        &self,
        _origin: Point,
        waypoints: &[Point],
        _destination: Point,
    ) -> Result<Vec<usize>, ProviderError> {
        // No remote optimization capability; the caller's own heuristics
        // order the tour.
        Ok((0..waypoints.len()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn cheap_matrix_is_symmetric_for_symmetric_geometry() {
        let provider = CheapProvider::default();
        let points = vec![
            Point::new(-33.45, -70.66),
            Point::new(-33.46, -70.65),
            Point::new(-33.44, -70.67),
        ];
        let m = provider.matrix(&points).await.unwrap();
        assert_eq!(m.len(), 3);
        for i in 0..3 {
            assert_eq!(m.minutes[i][i], 0.0);
            for j in 0..3 {
                assert!((m.minutes[i][j] - m.minutes[j][i]).abs() < 1e-9);
            }
        }
    }

    #[tokio::test]
    async fn cheap_travel_time_uses_road_factor_and_speed() {
        let provider = CheapProvider::new(1.35, 30.0);
        let a = Point::new(-33.45, -70.66);
        let b = Point::new(-33.45, -70.70);
        let minutes = provider.travel_time(a, b, None).await.unwrap();
        let km = crate::shared::geo::haversine_km(a, b) * 1.35;
        assert!((minutes - km / 30.0 * 60.0).abs() < 1e-9);
    }
}
