//! Route repository interface

use async_trait::async_trait;
use chrono::NaiveDate;

use super::model::{DriverFix, Route, RouteStatus, TrackingPoint};
use crate::domain::DomainResult;
use crate::shared::types::pagination::{PaginatedResult, PaginationParams};

/// Listing filter; all fields are conjunctive.
#[derive(Debug, Default, Clone)]
pub struct RouteFilter {
    pub status: Option<RouteStatus>,
    pub assigned_driver_id: Option<String>,
    pub scheduled_date: Option<NaiveDate>,
}

#[async_trait]
pub trait RouteRepository: Send + Sync {
    async fn create(&self, route: Route) -> DomainResult<()>;
    async fn find_by_id(&self, id: &str) -> DomainResult<Option<Route>>;
    async fn list(
        &self,
        filter: RouteFilter,
        page: PaginationParams,
    ) -> DomainResult<PaginatedResult<Route>>;
    /// Full-row write; per-route mutations are serialized by the store.
    async fn update(&self, route: Route) -> DomainResult<()>;
    /// Cascades to stops (and their payments) and tracking points.
    async fn delete(&self, id: &str) -> DomainResult<()>;
    /// The route currently IN_PROGRESS or PAUSED for this driver, if any.
    async fn find_active_for_driver(&self, driver_id: &str) -> DomainResult<Option<Route>>;
    /// Atomic last-writer-wins write of the live driver position.
    async fn update_driver_location(&self, route_id: &str, fix: DriverFix) -> DomainResult<()>;
    async fn append_tracking_point(&self, point: TrackingPoint) -> DomainResult<()>;
    async fn list_tracking_points(&self, route_id: &str) -> DomainResult<Vec<TrackingPoint>>;
}
