//! Stop repository interface

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::model::{Stop, StopCompletion};
use crate::domain::DomainResult;

/// One recomputed ETA, applied in a single batch write.
#[derive(Debug, Clone)]
pub struct StopEtaUpdate {
    pub stop_id: String,
    pub estimated_arrival: DateTime<Utc>,
    pub travel_minutes_from_previous: Option<f64>,
}

#[async_trait]
pub trait StopRepository: Send + Sync {
    async fn create(&self, stop: Stop) -> DomainResult<()>;
    async fn find_by_id(&self, id: &str) -> DomainResult<Option<Stop>>;
    /// All stops of a route, ordered by `sequence_order`.
    async fn list_by_route(&self, route_id: &str) -> DomainResult<Vec<Stop>>;
    async fn update(&self, stop: Stop) -> DomainResult<()>;
    async fn delete(&self, id: &str) -> DomainResult<()>;
    async fn max_sequence(&self, route_id: &str) -> DomainResult<i32>;

    /// Rewrite `sequence_order` for the whole route in one transaction.
    ///
    /// Uses a negative-then-positive two-phase write so the per-route
    /// uniqueness constraint holds at every intermediate state.
    async fn reorder(&self, route_id: &str, ordered_ids: &[String]) -> DomainResult<()>;

    /// Freeze ETAs at route start: sets `estimated_arrival` and, only where
    /// it is still null, `original_estimated_arrival`.
    async fn freeze_etas(&self, updates: &[StopEtaUpdate]) -> DomainResult<()>;

    /// Recalculation path: rewrites `estimated_arrival` only.
    /// `original_estimated_arrival` is never touched here.
    async fn apply_eta_updates(&self, updates: &[StopEtaUpdate]) -> DomainResult<()>;

    /// Conditionally applies a terminal status: succeeds only if the stop is
    /// still non-terminal. Returns false when another writer got there first.
    async fn complete_if_open(&self, stop_id: &str, completion: &StopCompletion)
        -> DomainResult<bool>;

    /// PENDING -> IN_TRANSIT, first-writer-wins.
    async fn set_in_transit_if_pending(&self, stop_id: &str) -> DomainResult<bool>;

    /// PENDING/IN_TRANSIT -> ARRIVED, first-writer-wins.
    async fn set_arrived_if_en_route(
        &self,
        stop_id: &str,
        at: DateTime<Utc>,
    ) -> DomainResult<bool>;

    /// Stops not yet in a terminal status.
    async fn count_open(&self, route_id: &str) -> DomainResult<u64>;

    /// Refresh a single stop's live ETA (in-transit marking).
    async fn set_estimated_arrival(
        &self,
        stop_id: &str,
        estimated_arrival: DateTime<Utc>,
    ) -> DomainResult<()>;

    async fn set_payment_state(
        &self,
        stop_id: &str,
        is_paid: bool,
        payment_status: super::model::StopPaymentStatus,
    ) -> DomainResult<()>;
}
