//! SeaORM implementation of RouteRepository

use async_trait::async_trait;
use sea_orm::prelude::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};

use crate::domain::route::{
    DriverFix, Route, RouteFilter, RouteRepository, RouteStatus, TrackingPoint,
};
use crate::domain::DomainResult;
use crate::infrastructure::database::entities::{route, tracking_point};
use crate::shared::types::pagination::{PaginatedResult, PaginationParams};

use super::db_err;

pub struct SeaOrmRouteRepository {
    db: DatabaseConnection,
}

impl SeaOrmRouteRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn model_to_domain(m: route::Model) -> Route {
    Route {
        id: m.id,
        name: m.name,
        status: RouteStatus::from_str(&m.status).unwrap_or(RouteStatus::Draft),
        scheduled_date: m.scheduled_date,
        departure_time: m.departure_time,
        depot_id: m.depot_id,
        origin_lat: m.origin_lat,
        origin_lng: m.origin_lng,
        origin_address: m.origin_address,
        assigned_driver_id: m.assigned_driver_id,
        created_by: m.created_by,
        sent_at: m.sent_at,
        loaded_at: m.loaded_at,
        started_at: m.started_at,
        actual_start_time: m.actual_start_time,
        paused_at: m.paused_at,
        completed_at: m.completed_at,
        total_distance_km: m.total_distance_km,
        total_duration_min: m.total_duration_min,
        optimized_at: m.optimized_at,
        optimization_hash: m.optimization_hash,
        depot_return_time: m.depot_return_time,
        driver_lat: m.driver_lat,
        driver_lng: m.driver_lng,
        driver_location_at: m.driver_location_at,
        driver_heading: m.driver_heading,
        driver_speed: m.driver_speed,
        created_at: m.created_at,
        updated_at: m.updated_at,
    }
}

fn domain_to_active(r: Route) -> route::ActiveModel {
    route::ActiveModel {
        id: Set(r.id),
        name: Set(r.name),
        status: Set(r.status.as_str().to_string()),
        scheduled_date: Set(r.scheduled_date),
        departure_time: Set(r.departure_time),
        depot_id: Set(r.depot_id),
        origin_lat: Set(r.origin_lat),
        origin_lng: Set(r.origin_lng),
        origin_address: Set(r.origin_address),
        assigned_driver_id: Set(r.assigned_driver_id),
        created_by: Set(r.created_by),
        sent_at: Set(r.sent_at),
        loaded_at: Set(r.loaded_at),
        started_at: Set(r.started_at),
        actual_start_time: Set(r.actual_start_time),
        paused_at: Set(r.paused_at),
        completed_at: Set(r.completed_at),
        total_distance_km: Set(r.total_distance_km),
        total_duration_min: Set(r.total_duration_min),
        optimized_at: Set(r.optimized_at),
        optimization_hash: Set(r.optimization_hash),
        depot_return_time: Set(r.depot_return_time),
        driver_lat: Set(r.driver_lat),
        driver_lng: Set(r.driver_lng),
        driver_location_at: Set(r.driver_location_at),
        driver_heading: Set(r.driver_heading),
        driver_speed: Set(r.driver_speed),
        created_at: Set(r.created_at),
        updated_at: Set(r.updated_at),
    }
}

const ACTIVE_STATUSES: [&str; 2] = ["IN_PROGRESS", "PAUSED"];

#[async_trait]
impl RouteRepository for SeaOrmRouteRepository {
    async fn create(&self, new_route: Route) -> DomainResult<()> {
        domain_to_active(new_route)
            .insert(&self.db)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> DomainResult<Option<Route>> {
        let model = route::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(model_to_domain))
    }

    async fn list(
        &self,
        filter: RouteFilter,
        page: PaginationParams,
    ) -> DomainResult<PaginatedResult<Route>> {
        let mut query = route::Entity::find();
        if let Some(status) = filter.status {
            query = query.filter(route::Column::Status.eq(status.as_str()));
        }
        if let Some(driver_id) = filter.assigned_driver_id {
            query = query.filter(route::Column::AssignedDriverId.eq(driver_id));
        }
        if let Some(date) = filter.scheduled_date {
            query = query.filter(route::Column::ScheduledDate.eq(date));
        }

        let paginator = query
            .order_by_desc(route::Column::CreatedAt)
            .paginate(&self.db, u64::from(page.limit));

        let total = paginator.num_items().await.map_err(db_err)?;
        let items = paginator
            .fetch_page(u64::from(page.page - 1))
            .await
            .map_err(db_err)?
            .into_iter()
            .map(model_to_domain)
            .collect();

        Ok(PaginatedResult::new(items, total, page.page, page.limit))
    }

    async fn update(&self, updated: Route) -> DomainResult<()> {
        domain_to_active(updated)
            .update(&self.db)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> DomainResult<()> {
        route::Entity::delete_by_id(id)
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn find_active_for_driver(&self, driver_id: &str) -> DomainResult<Option<Route>> {
        let model = route::Entity::find()
            .filter(route::Column::AssignedDriverId.eq(driver_id))
            .filter(route::Column::Status.is_in(ACTIVE_STATUSES))
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(model_to_domain))
    }

    async fn update_driver_location(&self, route_id: &str, fix: DriverFix) -> DomainResult<()> {
        route::Entity::update_many()
            .filter(route::Column::Id.eq(route_id))
            .col_expr(route::Column::DriverLat, Expr::value(Some(fix.lat)))
            .col_expr(route::Column::DriverLng, Expr::value(Some(fix.lng)))
            .col_expr(
                route::Column::DriverLocationAt,
                Expr::value(Some(fix.recorded_at)),
            )
            .col_expr(route::Column::DriverHeading, Expr::value(fix.heading))
            .col_expr(route::Column::DriverSpeed, Expr::value(fix.speed))
            .col_expr(route::Column::UpdatedAt, Expr::value(fix.recorded_at))
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn append_tracking_point(&self, point: TrackingPoint) -> DomainResult<()> {
        tracking_point::ActiveModel {
            id: Set(point.id),
            route_id: Set(point.route_id),
            lat: Set(point.lat),
            lng: Set(point.lng),
            heading: Set(point.heading),
            speed: Set(point.speed),
            accuracy: Set(point.accuracy),
            recorded_at: Set(point.recorded_at),
        }
        .insert(&self.db)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn list_tracking_points(&self, route_id: &str) -> DomainResult<Vec<TrackingPoint>> {
        let models = tracking_point::Entity::find()
            .filter(tracking_point::Column::RouteId.eq(route_id))
            .order_by_asc(tracking_point::Column::RecordedAt)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(models
            .into_iter()
            .map(|m| TrackingPoint {
                id: m.id,
                route_id: m.route_id,
                lat: m.lat,
                lng: m.lng,
                heading: m.heading,
                speed: m.speed,
                accuracy: m.accuracy,
                recorded_at: m.recorded_at,
            })
            .collect())
    }
}
