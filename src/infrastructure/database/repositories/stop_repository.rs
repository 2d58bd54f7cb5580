//! SeaORM implementation of StopRepository
//!
//! Terminal transitions are conditional updates filtered on non-terminal
//! status: first writer wins, concurrent writers observe zero affected
//! rows. Reordering rewrites sequence numbers negative-then-positive so the
//! per-route uniqueness constraint holds at every intermediate state.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::prelude::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};

use crate::domain::payment::PaymentMethod;
use crate::domain::stop::{
    Stop, StopCompletion, StopEtaUpdate, StopPaymentStatus, StopRepository, StopStatus,
};
use crate::domain::DomainResult;
use crate::infrastructure::database::entities::stop;

use super::db_err;

pub struct SeaOrmStopRepository {
    db: DatabaseConnection,
}

impl SeaOrmStopRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

const OPEN_STATUSES: [&str; 3] = ["PENDING", "IN_TRANSIT", "ARRIVED"];

fn model_to_domain(m: stop::Model) -> Stop {
    Stop {
        id: m.id,
        route_id: m.route_id,
        address_id: m.address_id,
        sequence_order: m.sequence_order,
        status: StopStatus::from_str(&m.status).unwrap_or(StopStatus::Pending),
        estimated_minutes: m.estimated_minutes,
        priority: m.priority,
        time_window_start: m.time_window_start,
        time_window_end: m.time_window_end,
        estimated_arrival: m.estimated_arrival,
        original_estimated_arrival: m.original_estimated_arrival,
        travel_minutes_from_previous: m.travel_minutes_from_previous,
        arrived_at: m.arrived_at,
        completed_at: m.completed_at,
        require_signature: m.require_signature,
        require_photo: m.require_photo,
        signature_url: m.signature_url,
        photo_url: m.photo_url,
        is_paid: m.is_paid,
        payment_status: StopPaymentStatus::from_str(&m.payment_status)
            .unwrap_or(StopPaymentStatus::Pending),
        payment_method: m.payment_method.as_deref().and_then(PaymentMethod::from_str),
        payment_amount: m.payment_amount,
        customer_rut: m.customer_rut,
        external_order_id: m.external_order_id,
        notes: m.notes,
        failure_reason: m.failure_reason,
        created_at: m.created_at,
        updated_at: m.updated_at,
    }
}

fn domain_to_active(s: Stop) -> stop::ActiveModel {
    stop::ActiveModel {
        id: Set(s.id),
        route_id: Set(s.route_id),
        address_id: Set(s.address_id),
        sequence_order: Set(s.sequence_order),
        status: Set(s.status.as_str().to_string()),
        estimated_minutes: Set(s.estimated_minutes),
        priority: Set(s.priority),
        time_window_start: Set(s.time_window_start),
        time_window_end: Set(s.time_window_end),
        estimated_arrival: Set(s.estimated_arrival),
        original_estimated_arrival: Set(s.original_estimated_arrival),
        travel_minutes_from_previous: Set(s.travel_minutes_from_previous),
        arrived_at: Set(s.arrived_at),
        completed_at: Set(s.completed_at),
        require_signature: Set(s.require_signature),
        require_photo: Set(s.require_photo),
        signature_url: Set(s.signature_url),
        photo_url: Set(s.photo_url),
        is_paid: Set(s.is_paid),
        payment_status: Set(s.payment_status.as_str().to_string()),
        payment_method: Set(s.payment_method.map(|m| m.as_str().to_string())),
        payment_amount: Set(s.payment_amount),
        customer_rut: Set(s.customer_rut),
        external_order_id: Set(s.external_order_id),
        notes: Set(s.notes),
        failure_reason: Set(s.failure_reason),
        created_at: Set(s.created_at),
        updated_at: Set(s.updated_at),
    }
}

#[async_trait]
impl StopRepository for SeaOrmStopRepository {
    async fn create(&self, new_stop: Stop) -> DomainResult<()> {
        domain_to_active(new_stop)
            .insert(&self.db)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> DomainResult<Option<Stop>> {
        let model = stop::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(model_to_domain))
    }

    async fn list_by_route(&self, route_id: &str) -> DomainResult<Vec<Stop>> {
        let models = stop::Entity::find()
            .filter(stop::Column::RouteId.eq(route_id))
            .order_by_asc(stop::Column::SequenceOrder)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(models.into_iter().map(model_to_domain).collect())
    }

    async fn update(&self, updated: Stop) -> DomainResult<()> {
        domain_to_active(updated)
            .update(&self.db)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> DomainResult<()> {
        stop::Entity::delete_by_id(id)
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn max_sequence(&self, route_id: &str) -> DomainResult<i32> {
        let max = stop::Entity::find()
            .filter(stop::Column::RouteId.eq(route_id))
            .order_by_desc(stop::Column::SequenceOrder)
            .limit(1)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(max.map(|m| m.sequence_order).unwrap_or(0))
    }

    async fn reorder(&self, route_id: &str, ordered_ids: &[String]) -> DomainResult<()> {
        let txn = self.db.begin().await.map_err(db_err)?;

        // Phase one: park every stop on a negative sequence number.
        for (index, stop_id) in ordered_ids.iter().enumerate() {
            stop::Entity::update_many()
                .filter(stop::Column::Id.eq(stop_id))
                .filter(stop::Column::RouteId.eq(route_id))
                .col_expr(
                    stop::Column::SequenceOrder,
                    Expr::value(-(index as i32 + 1)),
                )
                .exec(&txn)
                .await
                .map_err(db_err)?;
        }

        // Phase two: assign the final positive order.
        for (index, stop_id) in ordered_ids.iter().enumerate() {
            stop::Entity::update_many()
                .filter(stop::Column::Id.eq(stop_id))
                .filter(stop::Column::RouteId.eq(route_id))
                .col_expr(stop::Column::SequenceOrder, Expr::value(index as i32 + 1))
                .col_expr(stop::Column::UpdatedAt, Expr::value(Utc::now()))
                .exec(&txn)
                .await
                .map_err(db_err)?;
        }

        txn.commit().await.map_err(db_err)?;
        Ok(())
    }

    async fn freeze_etas(&self, updates: &[StopEtaUpdate]) -> DomainResult<()> {
        let txn = self.db.begin().await.map_err(db_err)?;
        let now = Utc::now();

        for update in updates {
            stop::Entity::update_many()
                .filter(stop::Column::Id.eq(&update.stop_id))
                .col_expr(
                    stop::Column::EstimatedArrival,
                    Expr::value(Some(update.estimated_arrival)),
                )
                .col_expr(stop::Column::UpdatedAt, Expr::value(now))
                .exec(&txn)
                .await
                .map_err(db_err)?;

            // The original ETA is written once and only once.
            stop::Entity::update_many()
                .filter(stop::Column::Id.eq(&update.stop_id))
                .filter(stop::Column::OriginalEstimatedArrival.is_null())
                .col_expr(
                    stop::Column::OriginalEstimatedArrival,
                    Expr::value(Some(update.estimated_arrival)),
                )
                .exec(&txn)
                .await
                .map_err(db_err)?;
        }

        txn.commit().await.map_err(db_err)?;
        Ok(())
    }

    async fn apply_eta_updates(&self, updates: &[StopEtaUpdate]) -> DomainResult<()> {
        let txn = self.db.begin().await.map_err(db_err)?;
        let now = Utc::now();

        for update in updates {
            let mut statement = stop::Entity::update_many()
                .filter(stop::Column::Id.eq(&update.stop_id))
                .col_expr(
                    stop::Column::EstimatedArrival,
                    Expr::value(Some(update.estimated_arrival)),
                )
                .col_expr(stop::Column::UpdatedAt, Expr::value(now));
            if let Some(travel) = update.travel_minutes_from_previous {
                statement = statement.col_expr(
                    stop::Column::TravelMinutesFromPrevious,
                    Expr::value(Some(travel)),
                );
            }
            statement.exec(&txn).await.map_err(db_err)?;
        }

        txn.commit().await.map_err(db_err)?;
        Ok(())
    }

    async fn complete_if_open(
        &self,
        stop_id: &str,
        completion: &StopCompletion,
    ) -> DomainResult<bool> {
        let mut statement = stop::Entity::update_many()
            .filter(stop::Column::Id.eq(stop_id))
            .filter(stop::Column::Status.is_in(OPEN_STATUSES))
            .col_expr(
                stop::Column::Status,
                Expr::value(completion.status.as_str()),
            )
            .col_expr(
                stop::Column::CompletedAt,
                Expr::value(Some(completion.completed_at)),
            )
            .col_expr(stop::Column::UpdatedAt, Expr::value(completion.completed_at));

        if let Some(notes) = &completion.notes {
            statement = statement.col_expr(stop::Column::Notes, Expr::value(Some(notes.clone())));
        }
        if let Some(reason) = &completion.failure_reason {
            statement = statement.col_expr(
                stop::Column::FailureReason,
                Expr::value(Some(reason.clone())),
            );
        }
        if let Some(signature) = &completion.signature_url {
            statement = statement.col_expr(
                stop::Column::SignatureUrl,
                Expr::value(Some(signature.clone())),
            );
        }
        if let Some(photo) = &completion.photo_url {
            statement =
                statement.col_expr(stop::Column::PhotoUrl, Expr::value(Some(photo.clone())));
        }

        let result = statement.exec(&self.db).await.map_err(db_err)?;
        Ok(result.rows_affected > 0)
    }

    async fn set_in_transit_if_pending(&self, stop_id: &str) -> DomainResult<bool> {
        let result = stop::Entity::update_many()
            .filter(stop::Column::Id.eq(stop_id))
            .filter(stop::Column::Status.eq(StopStatus::Pending.as_str()))
            .col_expr(
                stop::Column::Status,
                Expr::value(StopStatus::InTransit.as_str()),
            )
            .col_expr(stop::Column::UpdatedAt, Expr::value(Utc::now()))
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected > 0)
    }

    async fn set_arrived_if_en_route(
        &self,
        stop_id: &str,
        at: DateTime<Utc>,
    ) -> DomainResult<bool> {
        let result = stop::Entity::update_many()
            .filter(stop::Column::Id.eq(stop_id))
            .filter(stop::Column::Status.is_in(["PENDING", "IN_TRANSIT"]))
            .col_expr(
                stop::Column::Status,
                Expr::value(StopStatus::Arrived.as_str()),
            )
            .col_expr(stop::Column::ArrivedAt, Expr::value(Some(at)))
            .col_expr(stop::Column::UpdatedAt, Expr::value(at))
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected > 0)
    }

    async fn count_open(&self, route_id: &str) -> DomainResult<u64> {
        stop::Entity::find()
            .filter(stop::Column::RouteId.eq(route_id))
            .filter(stop::Column::Status.is_in(OPEN_STATUSES))
            .count(&self.db)
            .await
            .map_err(db_err)
    }

    async fn set_estimated_arrival(
        &self,
        stop_id: &str,
        estimated_arrival: DateTime<Utc>,
    ) -> DomainResult<()> {
        stop::Entity::update_many()
            .filter(stop::Column::Id.eq(stop_id))
            .col_expr(
                stop::Column::EstimatedArrival,
                Expr::value(Some(estimated_arrival)),
            )
            .col_expr(stop::Column::UpdatedAt, Expr::value(Utc::now()))
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn set_payment_state(
        &self,
        stop_id: &str,
        is_paid: bool,
        payment_status: StopPaymentStatus,
    ) -> DomainResult<()> {
        stop::Entity::update_many()
            .filter(stop::Column::Id.eq(stop_id))
            .col_expr(stop::Column::IsPaid, Expr::value(is_paid))
            .col_expr(
                stop::Column::PaymentStatus,
                Expr::value(payment_status.as_str()),
            )
            .col_expr(stop::Column::UpdatedAt, Expr::value(Utc::now()))
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::database::entities::{address, route};
    use crate::infrastructure::database::migrator::Migrator;
    use sea_orm::Database;
    use sea_orm_migration::MigratorTrait;

    async fn setup_route_with_stops(n: usize) -> (DatabaseConnection, Vec<String>) {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        let now = Utc::now();

        route::ActiveModel {
            id: Set("r1".to_string()),
            name: Set("Test route".to_string()),
            status: Set("DRAFT".to_string()),
            scheduled_date: Set(None),
            departure_time: Set(None),
            depot_id: Set(None),
            origin_lat: Set(None),
            origin_lng: Set(None),
            origin_address: Set(None),
            assigned_driver_id: Set(None),
            created_by: Set("op".to_string()),
            sent_at: Set(None),
            loaded_at: Set(None),
            started_at: Set(None),
            actual_start_time: Set(None),
            paused_at: Set(None),
            completed_at: Set(None),
            total_distance_km: Set(None),
            total_duration_min: Set(None),
            optimized_at: Set(None),
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

        let mut ids = Vec::new();
        for i in 0..n {
            let address_id = format!("a{i}");
            address::ActiveModel {
                id: Set(address_id.clone()),
                street: Set(format!("Street {i}")),
                city: Set("Santiago".to_string()),
                full_address: Set(format!("Street {i}, Santiago")),
                lat: Set(Some(-33.45)),
                lng: Set(Some(-70.66)),
                geocode_status: Set("SUCCESS".to_string()),
                customer_name: Set(None),
                customer_phone: Set(None),
                customer_rut: Set(None),
                external_order_id: Set(None),
                payment_method: Set(None),
                created_at: Set(now),
                updated_at: Set(now),
            }
            .insert(&db)
            .await
            .unwrap();

            let stop_id = format!("s{i}");
            stop::ActiveModel {
                id: Set(stop_id.clone()),
                route_id: Set("r1".to_string()),
                address_id: Set(address_id),
                sequence_order: Set(i as i32 + 1),
                status: Set("PENDING".to_string()),
                estimated_minutes: Set(10),
                priority: Set(0),
                time_window_start: Set(None),
                time_window_end: Set(None),
                estimated_arrival: Set(None),
                original_estimated_arrival: Set(None),
                travel_minutes_from_previous: Set(None),
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
            .insert(&db)
            .await
            .unwrap();
            ids.push(stop_id);
        }

        (db, ids)
    }

    #[tokio::test]
    async fn reorder_survives_the_uniqueness_constraint() {
        let (db, ids) = setup_route_with_stops(3).await;
        let repo = SeaOrmStopRepository::new(db);

        // Reverse the visit order; naive positive writes would collide.
        let reversed: Vec<String> = ids.iter().rev().cloned().collect();
        repo.reorder("r1", &reversed).await.unwrap();

        let stops = repo.list_by_route("r1").await.unwrap();
        let order: Vec<&str> = stops.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(order, vec!["s2", "s1", "s0"]);
        assert_eq!(
            stops.iter().map(|s| s.sequence_order).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
    }

    #[tokio::test]
    async fn reorder_with_identical_order_is_a_noop() {
        let (db, ids) = setup_route_with_stops(3).await;
        let repo = SeaOrmStopRepository::new(db);

        repo.reorder("r1", &ids).await.unwrap();

        let stops = repo.list_by_route("r1").await.unwrap();
        assert_eq!(
            stops.iter().map(|s| s.id.as_str()).collect::<Vec<_>>(),
            vec!["s0", "s1", "s2"]
        );
    }

    #[tokio::test]
    async fn terminal_transition_is_first_writer_wins() {
        let (db, ids) = setup_route_with_stops(1).await;
        let repo = SeaOrmStopRepository::new(db);
        let completion = StopCompletion {
            status: StopStatus::Completed,
            completed_at: Utc::now(),
            notes: None,
            failure_reason: None,
            signature_url: None,
            photo_url: None,
        };

        assert!(repo.complete_if_open(&ids[0], &completion).await.unwrap());
        // Second writer observes the terminal status.
        assert!(!repo.complete_if_open(&ids[0], &completion).await.unwrap());
    }

    #[tokio::test]
    async fn freeze_never_overwrites_the_original_eta() {
        let (db, ids) = setup_route_with_stops(1).await;
        let repo = SeaOrmStopRepository::new(db);
        let first = Utc::now();
        let later = first + chrono::Duration::minutes(45);

        repo.freeze_etas(&[StopEtaUpdate {
            stop_id: ids[0].clone(),
            estimated_arrival: first,
            travel_minutes_from_previous: None,
        }])
        .await
        .unwrap();

        // A second freeze (route restarted) moves the estimate only.
        repo.freeze_etas(&[StopEtaUpdate {
            stop_id: ids[0].clone(),
            estimated_arrival: later,
            travel_minutes_from_previous: None,
        }])
        .await
        .unwrap();

        let stop = repo.find_by_id(&ids[0]).await.unwrap().unwrap();
        assert_eq!(stop.estimated_arrival, Some(later));
        assert_eq!(stop.original_estimated_arrival, Some(first));
    }

    #[tokio::test]
    async fn recalculation_path_leaves_the_original_untouched() {
        let (db, ids) = setup_route_with_stops(1).await;
        let repo = SeaOrmStopRepository::new(db);
        let original = Utc::now();

        repo.freeze_etas(&[StopEtaUpdate {
            stop_id: ids[0].clone(),
            estimated_arrival: original,
            travel_minutes_from_previous: None,
        }])
        .await
        .unwrap();

        let shifted = original + chrono::Duration::minutes(25);
        repo.apply_eta_updates(&[StopEtaUpdate {
            stop_id: ids[0].clone(),
            estimated_arrival: shifted,
            travel_minutes_from_previous: Some(12.5),
        }])
        .await
        .unwrap();

        let stop = repo.find_by_id(&ids[0]).await.unwrap().unwrap();
        assert_eq!(stop.estimated_arrival, Some(shifted));
        assert_eq!(stop.original_estimated_arrival, Some(original));
        assert_eq!(stop.travel_minutes_from_previous, Some(12.5));
    }
}
