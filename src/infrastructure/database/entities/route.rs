//! Route entity

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "routes")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    pub status: String,
    pub scheduled_date: Option<Date>,
    pub departure_time: Option<String>,
    pub depot_id: Option<String>,
    pub origin_lat: Option<f64>,
    pub origin_lng: Option<f64>,
    pub origin_address: Option<String>,
    pub assigned_driver_id: Option<String>,
    pub created_by: String,
    pub sent_at: Option<DateTime<Utc>>,
    pub loaded_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub actual_start_time: Option<DateTime<Utc>>,
    pub paused_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub total_distance_km: Option<f64>,
    pub total_duration_min: Option<f64>,
    pub optimized_at: Option<DateTime<Utc>>,
    pub optimization_hash: Option<String>,
    pub depot_return_time: Option<DateTime<Utc>>,
    pub driver_lat: Option<f64>,
    pub driver_lng: Option<f64>,
    pub driver_location_at: Option<DateTime<Utc>>,
    pub driver_heading: Option<f64>,
    pub driver_speed: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::stop::Entity")]
    Stops,
    #[sea_orm(has_many = "super::tracking_point::Entity")]
    TrackingPoints,
    #[sea_orm(
        belongs_to = "super::depot::Entity",
        from = "Column::DepotId",
        to = "super::depot::Column::Id",
        on_delete = "SetNull"
    )]
    Depot,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::AssignedDriverId",
        to = "super::user::Column::Id",
        on_delete = "SetNull"
    )]
    Driver,
}

impl Related<super::stop::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Stops.def()
    }
}

impl Related<super::tracking_point::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TrackingPoints.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
