//! Route-level optimization
//!
//! Bridges persisted routes to the pure optimizer: collects geocoded stops,
//! resolves the origin and the driver shift, applies the idempotence
//! short-circuit, and writes the winning order back (sequence, per-leg
//! travel minutes, preview ETAs, totals, fingerprint).

use std::sync::Arc;

use chrono::{DateTime, NaiveTime, TimeZone, Utc};
use tracing::info;

use crate::application::optimizer::{
    optimization_fingerprint, OptimizeRequest, Optimizer, OptimizerStop,
};
use crate::domain::route::Route;
use crate::domain::stop::StopEtaUpdate;
use crate::domain::{DomainError, DomainResult, RepositoryProvider, RouteStatus};
use crate::shared::geo::Point;

#[derive(Debug, Default, Clone)]
pub struct OptimizeRouteOptions {
    /// Driver shift start, "HH:MM" on the route's scheduled date.
    pub driver_start_time: Option<String>,
    /// Driver shift end, "HH:MM".
    pub driver_end_time: Option<String>,
    /// Bypass the fingerprint short-circuit.
    pub force: bool,
    pub first_stop_id: Option<String>,
    pub last_stop_id: Option<String>,
    /// Force the cheap provider.
    pub use_haversine: bool,
}

#[derive(Debug)]
pub struct OptimizeRouteResult {
    pub route: Route,
    pub ordered_stop_ids: Vec<String>,
    /// True when the fingerprint matched and the stored order was kept.
    pub unchanged: bool,
    pub unserviceable_stop_ids: Vec<String>,
    pub warnings: Vec<String>,
}

pub struct RoutePlanner {
    repos: Arc<dyn RepositoryProvider>,
    optimizer: Arc<Optimizer>,
}

impl RoutePlanner {
    pub fn new(repos: Arc<dyn RepositoryProvider>, optimizer: Arc<Optimizer>) -> Self {
        Self { repos, optimizer }
    }

    pub async fn optimize_route(
        &self,
        route_id: &str,
        options: OptimizeRouteOptions,
        now: DateTime<Utc>,
    ) -> DomainResult<OptimizeRouteResult> {
        let mut route = self
            .repos
            .routes()
            .find_by_id(route_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Route", route_id))?;

        if !matches!(route.status, RouteStatus::Draft | RouteStatus::Scheduled) {
            return Err(DomainError::Conflict(format!(
                "Route {route_id} cannot be optimized in status {}",
                route.status
            )));
        }

        let stops = self.repos.stops().list_by_route(route_id).await?;
        let address_ids: Vec<String> = stops.iter().map(|s| s.address_id.clone()).collect();
        let addresses = self.repos.addresses().find_many(&address_ids).await?;
        let positions: std::collections::HashMap<String, Point> = addresses
            .into_iter()
            .filter_map(|a| a.position().map(|p| (a.id, p)))
            .collect();

        let mut optimizer_stops = Vec::new();
        let mut ungeocoded_ids = Vec::new();
        for stop in &stops {
            match positions.get(&stop.address_id) {
                Some(position) => optimizer_stops.push(OptimizerStop {
                    id: stop.id.clone(),
                    position: *position,
                    service_minutes: stop.estimated_minutes,
                    time_window_start: stop.time_window_start,
                    time_window_end: stop.time_window_end,
                    priority: stop.priority,
                }),
                None => ungeocoded_ids.push(stop.id.clone()),
            }
        }

        if optimizer_stops.len() < 2 {
            return Err(DomainError::Validation(
                "Route needs at least two geocoded stops to optimize".into(),
            ));
        }

        let fingerprint = optimization_fingerprint(&optimizer_stops);
        let pinned = options.first_stop_id.is_some() || options.last_stop_id.is_some();

        // Pins always bypass the short-circuit: a pinned call is an explicit
        // request to re-solve even over an unchanged stop set.
        if !options.force
            && !pinned
            && route.optimized_at.is_some()
            && route.optimization_hash.as_deref() == Some(fingerprint.as_str())
        {
            info!(route_id, "Optimization fingerprint unchanged; keeping stored order");
            return Ok(OptimizeRouteResult {
                ordered_stop_ids: stops.iter().map(|s| s.id.clone()).collect(),
                route,
                unchanged: true,
                unserviceable_stop_ids: Vec::new(),
                warnings: Vec::new(),
            });
        }

        let origin = match route.origin() {
            Some(origin) => origin,
            None => self
                .depot_position(&route)
                .await?
                .ok_or_else(|| DomainError::Validation("Route has no origin or depot".into()))?,
        };

        let shift_start = self
            .resolve_shift_instant(&route, options.driver_start_time.as_deref(), now)
            .await?
            .unwrap_or(now);
        let shift_end = self
            .resolve_shift_end(&route, options.driver_end_time.as_deref())
            .await?;

        let request = OptimizeRequest {
            origin,
            stops: optimizer_stops,
            shift_start,
            shift_end,
            first_stop_id: options.first_stop_id.clone(),
            last_stop_id: options.last_stop_id.clone(),
            force_cheap: options.use_haversine,
            force_real: false,
        };

        let plan = self.optimizer.optimize(&request).await.map_err(DomainError::from)?;

        let mut warnings = plan.warnings.clone();
        if !ungeocoded_ids.is_empty() {
            warnings.push(format!(
                "{} stop(s) without coordinates were left at the end of the route",
                ungeocoded_ids.len()
            ));
        }

        // Final order: planned tour, then unserviceable, then ungeocoded.
        let mut order = plan.ordered_stop_ids.clone();
        order.extend(plan.unserviceable_stop_ids.iter().cloned());
        order.extend(ungeocoded_ids.iter().cloned());
        self.repos.stops().reorder(route_id, &order).await?;

        let eta_updates: Vec<StopEtaUpdate> = plan
            .stops
            .iter()
            .map(|p| StopEtaUpdate {
                stop_id: p.stop_id.clone(),
                estimated_arrival: p.arrival,
                travel_minutes_from_previous: Some(p.travel_minutes_from_previous),
            })
            .collect();
        self.repos.stops().apply_eta_updates(&eta_updates).await?;

        route.total_distance_km = Some(plan.total_distance_km);
        route.total_duration_min = Some(plan.total_duration_min);
        route.depot_return_time = plan.return_to_depot;
        route.optimized_at = Some(now);
        route.optimization_hash = Some(fingerprint);
        route.updated_at = now;
        self.repos.routes().update(route.clone()).await?;

        info!(
            route_id,
            stops = order.len(),
            total_km = plan.total_distance_km,
            "Route optimized"
        );

        Ok(OptimizeRouteResult {
            route,
            ordered_stop_ids: order,
            unchanged: false,
            unserviceable_stop_ids: plan.unserviceable_stop_ids,
            warnings,
        })
    }

    async fn depot_position(&self, route: &Route) -> DomainResult<Option<Point>> {
        if let Some(depot_id) = &route.depot_id {
            if let Some(depot) = self.repos.depots().find_by_id(depot_id).await? {
                return Ok(Some(depot.position()));
            }
        }
        Ok(self
            .repos
            .depots()
            .find_default()
            .await?
            .map(|d| d.position()))
    }

    /// Shift start: explicit "HH:MM" first, then the route's planned
    /// departure, then the depot default.
    async fn resolve_shift_instant(
        &self,
        route: &Route,
        explicit: Option<&str>,
        now: DateTime<Utc>,
    ) -> DomainResult<Option<DateTime<Utc>>> {
        let hhmm = match explicit {
            Some(value) => Some(value.to_string()),
            None => match &route.departure_time {
                Some(value) => Some(value.clone()),
                None => self.depot_departure(route).await?,
            },
        };
        let Some(hhmm) = hhmm else {
            return Ok(None);
        };
        Ok(Some(self.instant_on_route_date(route, &hhmm, now)?))
    }

    async fn resolve_shift_end(
        &self,
        route: &Route,
        explicit: Option<&str>,
    ) -> DomainResult<Option<DateTime<Utc>>> {
        match explicit {
            Some(hhmm) => Ok(Some(self.instant_on_route_date(route, hhmm, Utc::now())?)),
            None => Ok(None),
        }
    }

    async fn depot_departure(&self, route: &Route) -> DomainResult<Option<String>> {
        if let Some(depot_id) = &route.depot_id {
            if let Some(depot) = self.repos.depots().find_by_id(depot_id).await? {
                return Ok(Some(depot.default_departure_time));
            }
        }
        Ok(None)
    }

    fn instant_on_route_date(
        &self,
        route: &Route,
        hhmm: &str,
        now: DateTime<Utc>,
    ) -> DomainResult<DateTime<Utc>> {
        let time = parse_hhmm(hhmm)
            .ok_or_else(|| DomainError::Validation(format!("Invalid time of day: {hhmm}")))?;
        let date = route.scheduled_date.unwrap_or_else(|| now.date_naive());
        Ok(Utc.from_utc_datetime(&date.and_time(time)))
    }
}

fn parse_hhmm(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M").ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_times_of_day() {
        assert_eq!(
            parse_hhmm("08:30"),
            Some(NaiveTime::from_hms_opt(8, 30, 0).unwrap())
        );
        assert_eq!(
            parse_hhmm("23:59"),
            Some(NaiveTime::from_hms_opt(23, 59, 0).unwrap())
        );
    }

    #[test]
    fn rejects_malformed_times() {
        assert!(parse_hhmm("25:00").is_none());
        assert!(parse_hhmm("8h30").is_none());
        assert!(parse_hhmm("").is_none());
    }
}
