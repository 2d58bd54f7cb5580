//! ETA recalculation after stop completion
//!
//! Runs on every terminal stop event, behind the deviation gate: while the
//! driver is within 15 minutes of the frozen ETA, stored ETAs (and the
//! windows quoted to customers) are left untouched and no provider call is
//! made. Only a real deviation rewrites the downstream schedule.
//!
//! `original_estimated_arrival` is never written by this path.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use crate::application::notifications::{NotificationService, WebhookEventKind};
use crate::application::optimizer::TravelTimeProvider;
use crate::domain::route::Route;
use crate::domain::stop::{Stop, StopEtaUpdate};
use crate::domain::user::User;
use crate::domain::{DomainError, DomainResult, RepositoryProvider};
use crate::shared::geo::Point;

/// Deviations at or under this many minutes skip recalculation entirely.
pub const DEVIATION_GATE_MINUTES: i64 = 15;

#[derive(Debug, PartialEq, Eq)]
pub enum RecalcOutcome {
    Skipped { reason: &'static str },
    Applied { updated: usize },
}

pub struct EtaRecalculator {
    repos: Arc<dyn RepositoryProvider>,
    provider: Arc<dyn TravelTimeProvider>,
    notifications: Arc<NotificationService>,
}

impl EtaRecalculator {
    pub fn new(
        repos: Arc<dyn RepositoryProvider>,
        provider: Arc<dyn TravelTimeProvider>,
        notifications: Arc<NotificationService>,
    ) -> Self {
        Self {
            repos,
            provider,
            notifications,
        }
    }

    /// Recalculate downstream ETAs after `completed` went terminal.
    ///
    /// Failures leave previously stored ETAs intact; the caller logs and
    /// carries on - a missed recalculation never fails the stop event.
    pub async fn after_stop_completion(
        &self,
        route: &Route,
        completed: &Stop,
        completed_at: DateTime<Utc>,
        driver: Option<&User>,
    ) -> DomainResult<RecalcOutcome> {
        let Some(original) = completed.original_estimated_arrival else {
            debug!(stop_id = %completed.id, "Recalculation skipped: no frozen ETA");
            return Ok(RecalcOutcome::Skipped {
                reason: "no_frozen_eta",
            });
        };

        let deviation_min = (completed_at - original).num_minutes().abs();
        if deviation_min <= DEVIATION_GATE_MINUTES {
            debug!(
                stop_id = %completed.id,
                deviation_min,
                "Recalculation skipped: completion within the deviation gate"
            );
            return Ok(RecalcOutcome::Skipped { reason: "on_time" });
        }

        info!(
            route_id = %route.id,
            stop_id = %completed.id,
            deviation_min,
            "Deviation beyond gate; recalculating downstream ETAs"
        );

        let stops = self.repos.stops().list_by_route(&route.id).await?;
        let positions = self.stop_positions(&stops).await?;

        let Some(mut previous_location) = positions.get(&completed.address_id).copied() else {
            return Ok(RecalcOutcome::Skipped {
                reason: "no_coordinates",
            });
        };

        let mut current_time =
            completed_at + Duration::minutes(i64::from(completed.estimated_minutes));
        let mut updates: Vec<StopEtaUpdate> = Vec::new();

        for stop in stops
            .iter()
            .filter(|s| s.sequence_order > completed.sequence_order && !s.status.is_terminal())
        {
            let Some(position) = positions.get(&stop.address_id).copied() else {
                continue;
            };

            let travel = self
                .provider
                .travel_time(previous_location, position, Some(current_time))
                .await
                .map_err(|err| DomainError::ProviderUnavailable(err.to_string()))?;

            let arrival = current_time + minutes_to_duration(travel);
            updates.push(StopEtaUpdate {
                stop_id: stop.id.clone(),
                estimated_arrival: arrival,
                travel_minutes_from_previous: Some(travel),
            });

            current_time = arrival + Duration::minutes(i64::from(stop.estimated_minutes));
            previous_location = position;
        }

        if updates.is_empty() {
            return Ok(RecalcOutcome::Skipped {
                reason: "no_downstream_stops",
            });
        }

        self.repos.stops().apply_eta_updates(&updates).await?;

        if let Err(err) = self
            .update_depot_return(route, previous_location, current_time)
            .await
        {
            warn!(route_id = %route.id, error = %err, "Depot return update failed");
        }

        // Refetch so the payload carries exactly what was persisted.
        let refreshed: Vec<Stop> = self
            .repos
            .stops()
            .list_by_route(&route.id)
            .await?
            .into_iter()
            .filter(|s| s.sequence_order > completed.sequence_order && !s.status.is_terminal())
            .collect();

        self.notifications
            .publish(
                WebhookEventKind::EtaUpdated,
                route,
                driver,
                None,
                Some(refreshed.as_slice()),
                serde_json::json!({ "reason": "stop_completed" }),
            )
            .await;

        Ok(RecalcOutcome::Applied {
            updated: updates.len(),
        })
    }

    async fn stop_positions(&self, stops: &[Stop]) -> DomainResult<HashMap<String, Point>> {
        let address_ids: Vec<String> = stops.iter().map(|s| s.address_id.clone()).collect();
        let addresses = self.repos.addresses().find_many(&address_ids).await?;
        Ok(addresses
            .into_iter()
            .filter_map(|a| a.position().map(|p| (a.id, p)))
            .collect())
    }

    /// `depot_return_time = departure of the last stop + travel(last -> depot)`.
    async fn update_depot_return(
        &self,
        route: &Route,
        last_location: Point,
        last_departure: DateTime<Utc>,
    ) -> DomainResult<()> {
        let Some(depot_id) = &route.depot_id else {
            return Ok(());
        };
        let Some(depot) = self.repos.depots().find_by_id(depot_id).await? else {
            return Ok(());
        };

        let travel = self
            .provider
            .travel_time(last_location, depot.position(), Some(last_departure))
            .await
            .map_err(|err| DomainError::ProviderUnavailable(err.to_string()))?;

        let mut updated = route.clone();
        updated.depot_return_time = Some(last_departure + minutes_to_duration(travel));
        updated.updated_at = Utc::now();
        self.repos.routes().update(updated).await
    }
}

fn minutes_to_duration(minutes: f64) -> Duration {
    Duration::milliseconds((minutes * 60_000.0).round() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::notifications::{NotificationService, PushNotifier, WebhookDispatcher};
    use crate::application::optimizer::CheapProvider;
    use crate::infrastructure::database::entities::{address, route, stop};
    use crate::infrastructure::database::migrator::Migrator;
    use crate::infrastructure::database::repositories::SeaOrmRepositoryProvider;
    use chrono::TimeZone;
    use sea_orm::{ActiveModelTrait, Database, Set};
    use sea_orm_migration::MigratorTrait;

    #[test]
    fn gate_boundary_is_inclusive() {
        // The gate itself: deviations of exactly 15 minutes stay quiet.
        assert!(15 <= DEVIATION_GATE_MINUTES);
        assert!(16 > DEVIATION_GATE_MINUTES);
    }

    #[test]
    fn minutes_to_duration_rounds_to_milliseconds() {
        assert_eq!(minutes_to_duration(1.5), Duration::milliseconds(90_000));
        assert_eq!(minutes_to_duration(0.0005), Duration::milliseconds(30));
    }

    async fn insert_stop(
        db: &sea_orm::DatabaseConnection,
        id: &str,
        sequence: i32,
        lat: f64,
        lng: f64,
        original: DateTime<Utc>,
    ) {
        let now = Utc::now();
        address::ActiveModel {
            id: Set(format!("addr-{id}")),
            street: Set(format!("Street {id}")),
            city: Set("Santiago".to_string()),
            full_address: Set(format!("Street {id}, Santiago")),
            lat: Set(Some(lat)),
            lng: Set(Some(lng)),
            geocode_status: Set("SUCCESS".to_string()),
            customer_name: Set(None),
            customer_phone: Set(None),
            customer_rut: Set(None),
            external_order_id: Set(None),
            payment_method: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db)
        .await
        .unwrap();

        stop::ActiveModel {
            id: Set(id.to_string()),
            route_id: Set("r1".to_string()),
            address_id: Set(format!("addr-{id}")),
            sequence_order: Set(sequence),
            status: Set("PENDING".to_string()),
            estimated_minutes: Set(10),
            priority: Set(0),
            time_window_start: Set(None),
            time_window_end: Set(None),
            estimated_arrival: Set(Some(original)),
            original_estimated_arrival: Set(Some(original)),
            travel_minutes_from_previous: Set(Some(5.0)),
            arrived_at: Set(None),
            completed_at: Set(None),
            require_signature: Set(false),
            require_photo: Set(false),
            signature_url: Set(None),
            photo_url: Set(None),
            is_paid: Set(false),
            payment_status: Set("PENDING".to_string()),
            payment_method: Set(None),
            payment_amount: Set(None),
            customer_rut: Set(None),
            external_order_id: Set(None),
            notes: Set(None),
            failure_reason: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db)
        .await
        .unwrap();
    }

    async fn setup() -> (Arc<dyn RepositoryProvider>, EtaRecalculator) {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        let now = Utc::now();

        route::ActiveModel {
            id: Set("r1".to_string()),
            name: Set("Morning run".to_string()),
            status: Set("IN_PROGRESS".to_string()),
            scheduled_date: Set(None),
            departure_time: Set(None),
            depot_id: Set(None),
            origin_lat: Set(None),
            origin_lng: Set(None),
            origin_address: Set(None),
            assigned_driver_id: Set(None),
            created_by: Set("op".to_string()),
            sent_at: Set(Some(now)),
            loaded_at: Set(None),
            started_at: Set(Some(now)),
            actual_start_time: Set(Some(now)),
            paused_at: Set(None),
            completed_at: Set(None),
            total_distance_km: Set(None),
            total_duration_min: Set(None),
            optimized_at: Set(Some(now)),
            optimization_hash: Set(None),
            depot_return_time: Set(None),
            driver_lat: Set(None),
            driver_lng: Set(None),
            driver_location_at: Set(None),
            driver_heading: Set(None),
            driver_speed: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&db)
        .await
        .unwrap();

        let original = Utc.with_ymd_and_hms(2025, 6, 1, 11, 0, 0).unwrap();
        insert_stop(&db, "s1", 1, -33.45, -70.66, original).await;
        insert_stop(&db, "s2", 2, -33.46, -70.65, original + Duration::minutes(20)).await;
        insert_stop(&db, "s3", 3, -33.44, -70.67, original + Duration::minutes(40)).await;

        let repos: Arc<dyn RepositoryProvider> = Arc::new(SeaOrmRepositoryProvider::new(db));
        let notifications = Arc::new(NotificationService::new(
            Arc::clone(&repos),
            Arc::new(WebhookDispatcher::new()),
            Arc::new(PushNotifier::new(Arc::clone(&repos), None)),
        ));
        let recalculator = EtaRecalculator::new(
            Arc::clone(&repos),
            Arc::new(CheapProvider::default()),
            notifications,
        );
        (repos, recalculator)
    }

    #[tokio::test]
    async fn on_time_completion_leaves_downstream_etas_untouched() {
        let (repos, recalculator) = setup().await;
        let route = repos.routes().find_by_id("r1").await.unwrap().unwrap();
        let completed = repos.stops().find_by_id("s1").await.unwrap().unwrap();

        // 7 minutes past the frozen ETA: inside the gate.
        let completed_at = completed.original_estimated_arrival.unwrap() + Duration::minutes(7);
        let outcome = recalculator
            .after_stop_completion(&route, &completed, completed_at, None)
            .await
            .unwrap();

        assert_eq!(outcome, RecalcOutcome::Skipped { reason: "on_time" });

        let s2 = repos.stops().find_by_id("s2").await.unwrap().unwrap();
        assert_eq!(
            s2.estimated_arrival,
            s2.original_estimated_arrival,
            "downstream ETAs must not move"
        );
    }

    #[tokio::test]
    async fn late_completion_shifts_downstream_but_never_the_original() {
        let (repos, recalculator) = setup().await;
        let route = repos.routes().find_by_id("r1").await.unwrap().unwrap();
        let completed = repos.stops().find_by_id("s1").await.unwrap().unwrap();

        // 25 minutes past the frozen ETA: beyond the gate.
        let completed_at = completed.original_estimated_arrival.unwrap() + Duration::minutes(25);
        let outcome = recalculator
            .after_stop_completion(&route, &completed, completed_at, None)
            .await
            .unwrap();

        assert_eq!(outcome, RecalcOutcome::Applied { updated: 2 });

        let s2 = repos.stops().find_by_id("s2").await.unwrap().unwrap();
        let s3 = repos.stops().find_by_id("s3").await.unwrap().unwrap();
        let frozen = Utc.with_ymd_and_hms(2025, 6, 1, 11, 0, 0).unwrap();

        assert!(s2.estimated_arrival.unwrap() > completed_at);
        assert!(s3.estimated_arrival.unwrap() > s2.estimated_arrival.unwrap());
        assert_eq!(s2.original_estimated_arrival, Some(frozen + Duration::minutes(20)));
        assert_eq!(s3.original_estimated_arrival, Some(frozen + Duration::minutes(40)));
    }

    #[tokio::test]
    async fn terminal_downstream_stops_are_not_rescheduled() {
        let (repos, recalculator) = setup().await;
        let route = repos.routes().find_by_id("r1").await.unwrap().unwrap();
        let completed = repos.stops().find_by_id("s1").await.unwrap().unwrap();

        // s3 already failed; only s2 remains reschedulable.
        let failed = crate::domain::stop::StopCompletion {
            status: crate::domain::stop::StopStatus::Failed,
            completed_at: Utc::now(),
            notes: None,
            failure_reason: Some("customer absent".into()),
            signature_url: None,
            photo_url: None,
        };
        assert!(repos.stops().complete_if_open("s3", &failed).await.unwrap());

        let completed_at = completed.original_estimated_arrival.unwrap() + Duration::minutes(30);
        let outcome = recalculator
            .after_stop_completion(&route, &completed, completed_at, None)
            .await
            .unwrap();

        assert_eq!(outcome, RecalcOutcome::Applied { updated: 1 });
    }
}
