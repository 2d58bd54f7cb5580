//! Remote travel-time provider backed by the Google Maps APIs
//!
//! Implements `TravelTimeProvider` over the Distance Matrix API (single
//! legs and full matrices) and the Directions API with `optimize:true`
//! waypoints (tour refinement). Matrix requests grow quadratically with
//! the point count, which is why the optimizer caps remote usage.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::debug;

use crate::application::optimizer::provider::{ProviderError, TravelMatrix, TravelTimeProvider};
use crate::shared::geo::Point;

const DEFAULT_MATRIX_URL: &str = "https://maps.googleapis.com/maps/api/distancematrix/json";
const DEFAULT_DIRECTIONS_URL: &str = "https://maps.googleapis.com/maps/api/directions/json";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub struct GoogleMapsProvider {
    client: reqwest::Client,
    api_key: String,
    matrix_url: String,
    directions_url: String,
}

impl GoogleMapsProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("failed to build mapping HTTP client");
        Self {
            client,
            api_key: api_key.into(),
            matrix_url: DEFAULT_MATRIX_URL.to_string(),
            directions_url: DEFAULT_DIRECTIONS_URL.to_string(),
        }
    }

    /// Point endpoints at a proxy or a test double.
    pub fn with_base_urls(mut self, matrix_url: impl Into<String>, directions_url: impl Into<String>) -> Self {
        self.matrix_url = matrix_url.into();
        self.directions_url = directions_url.into();
        self
    }

    async fn fetch_matrix(
        &self,
        origins: &[Point],
        destinations: &[Point],
        depart_at: Option<DateTime<Utc>>,
    ) -> Result<MatrixResponse, ProviderError> {
        let mut query = vec![
            ("origins".to_string(), join_points(origins)),
            ("destinations".to_string(), join_points(destinations)),
            ("key".to_string(), self.api_key.clone()),
        ];
        if let Some(depart) = depart_at {
            query.push(("departure_time".to_string(), depart.timestamp().to_string()));
        }

        let response = self
            .client
            .get(&self.matrix_url)
            .query(&query)
            .send()
            .await
            .map_err(|err| ProviderError::Unavailable(err.to_string()))?;

        if !response.status().is_success() {
            return Err(ProviderError::Unavailable(format!(
                "distance matrix returned HTTP {}",
                response.status()
            )));
        }

        let body: MatrixResponse = response
            .json()
            .await
            .map_err(|err| ProviderError::InvalidResponse(err.to_string()))?;

        if body.status != "OK" {
            return Err(ProviderError::Unavailable(format!(
                "distance matrix status {}",
                body.status
            )));
        }

        Ok(body)
    }
}

fn join_points(points: &[Point]) -> String {
    points
        .iter()
        .map(|p| format!("{:.6},{:.6}", p.lat, p.lng))
        .collect::<Vec<_>>()
        .join("|")
}

#[derive(Debug, Deserialize)]
struct MatrixResponse {
    status: String,
    rows: Vec<MatrixRow>,
}

#[derive(Debug, Deserialize)]
struct MatrixRow {
    elements: Vec<MatrixElement>,
}

#[derive(Debug, Deserialize)]
struct MatrixElement {
    status: String,
    duration: Option<ValueField>,
    #[serde(rename = "duration_in_traffic")]
    duration_in_traffic: Option<ValueField>,
    distance: Option<ValueField>,
}

#[derive(Debug, Deserialize)]
struct ValueField {
    value: f64,
}

impl MatrixElement {
    fn minutes(&self) -> Result<f64, ProviderError> {
        if self.status != "OK" {
            return Err(ProviderError::InvalidResponse(format!(
                "matrix element status {}",
                self.status
            )));
        }
        let seconds = self
            .duration_in_traffic
            .as_ref()
            .or(self.duration.as_ref())
            .ok_or_else(|| ProviderError::InvalidResponse("element without duration".into()))?;
        Ok(seconds.value / 60.0)
    }

    fn meters(&self) -> f64 {
        self.distance.as_ref().map(|d| d.value).unwrap_or(0.0)
    }
}

#[derive(Debug, Deserialize)]
struct DirectionsResponse {
    status: String,
    routes: Vec<DirectionsRoute>,
}

#[derive(Debug, Deserialize)]
struct DirectionsRoute {
    #[serde(default)]
    waypoint_order: Vec<usize>,
}

#[async_trait]
impl TravelTimeProvider for GoogleMapsProvider {
    async fn travel_time(
        &self,
        origin: Point,
        destination: Point,
        depart_at: Option<DateTime<Utc>>,
    ) -> Result<f64, ProviderError> {
        let body = self
            .fetch_matrix(&[origin], &[destination], depart_at)
            .await?;
        let element = body
            .rows
            .first()
            .and_then(|r| r.elements.first())
            .ok_or_else(|| ProviderError::InvalidResponse("empty matrix response".into()))?;
        element.minutes()
    }

    async fn matrix(&self, points: &[Point]) -> Result<TravelMatrix, ProviderError> {
        let body = self.fetch_matrix(points, points, None).await?;
        if body.rows.len() != points.len() {
            return Err(ProviderError::InvalidResponse(format!(
                "expected {} matrix rows, got {}",
                points.len(),
                body.rows.len()
            )));
        }

        let mut minutes = Vec::with_capacity(points.len());
        let mut meters = Vec::with_capacity(points.len());
        for row in &body.rows {
            if row.elements.len() != points.len() {
                return Err(ProviderError::InvalidResponse(
                    "ragged matrix response".into(),
                ));
            }
            let mut minute_row = Vec::with_capacity(points.len());
            let mut meter_row = Vec::with_capacity(points.len());
            for element in &row.elements {
                minute_row.push(element.minutes()?);
                meter_row.push(element.meters());
            }
            minutes.push(minute_row);
            meters.push(meter_row);
        }

        debug!(points = points.len(), "Distance matrix fetched");
        Ok(TravelMatrix { minutes, meters })
    }

    async fn optimize_waypoints(
        &self,
        origin: Point,
        waypoints: &[Point],
        destination: Point,
    ) -> Result<Vec<usize>, ProviderError> {
        if waypoints.is_empty() {
            return Ok(Vec::new());
        }

        let waypoint_param = format!("optimize:true|{}", join_points(waypoints));
        let query = [
            ("origin".to_string(), join_points(&[origin])),
            ("destination".to_string(), join_points(&[destination])),
            ("waypoints".to_string(), waypoint_param),
            ("key".to_string(), self.api_key.clone()),
        ];

        let response = self
            .client
            .get(&self.directions_url)
            .query(&query)
            .send()
            .await
            .map_err(|err| ProviderError::Unavailable(err.to_string()))?;

        if !response.status().is_success() {
            return Err(ProviderError::Unavailable(format!(
                "directions returned HTTP {}",
                response.status()
            )));
        }

        let body: DirectionsResponse = response
            .json()
            .await
            .map_err(|err| ProviderError::InvalidResponse(err.to_string()))?;

        if body.status != "OK" {
            return Err(ProviderError::Unavailable(format!(
                "directions status {}",
                body.status
            )));
        }

        let order = body
            .routes
            .first()
            .map(|r| r.waypoint_order.clone())
            .ok_or_else(|| ProviderError::InvalidResponse("directions without routes".into()))?;

        if order.len() != waypoints.len() {
            return Err(ProviderError::InvalidResponse(format!(
                "waypoint order has {} entries for {} waypoints",
                order.len(),
                waypoints.len()
            )));
        }

        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn points_join_in_pipe_separated_pairs() {
        let joined = join_points(&[Point::new(-33.45, -70.66), Point::new(-33.46, -70.65)]);
        assert_eq!(joined, "-33.450000,-70.660000|-33.460000,-70.650000");
    }

    #[test]
    fn element_prefers_traffic_duration() {
        let element = MatrixElement {
            status: "OK".to_string(),
            duration: Some(ValueField { value: 600.0 }),
            duration_in_traffic: Some(ValueField { value: 900.0 }),
            distance: Some(ValueField { value: 5000.0 }),
        };
        assert_eq!(element.minutes().unwrap(), 15.0);
        assert_eq!(element.meters(), 5000.0);
    }

    #[test]
    fn element_with_error_status_is_rejected() {
        let element = MatrixElement {
            status: "ZERO_RESULTS".to_string(),
            duration: None,
            duration_in_traffic: None,
            distance: None,
        };
        assert!(element.minutes().is_err());
    }
}
