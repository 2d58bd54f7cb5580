//! Stop entity
//!
//! (route_id, sequence_order) is unique; the reorder path keeps the
//! constraint satisfied with a negative-then-positive two-phase rewrite.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "stops")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub route_id: String,
    pub address_id: String,
    pub sequence_order: i32,
    pub status: String,
    pub estimated_minutes: i32,
    pub priority: i32,
    pub time_window_start: Option<DateTime<Utc>>,
    pub time_window_end: Option<DateTime<Utc>>,
    pub estimated_arrival: Option<DateTime<Utc>>,
    pub original_estimated_arrival: Option<DateTime<Utc>>,
    pub travel_minutes_from_previous: Option<f64>,
    pub arrived_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub require_signature: bool,
    pub require_photo: bool,
    pub signature_url: Option<String>,
    pub photo_url: Option<String>,
    pub is_paid: bool,
    pub payment_status: String,
    pub payment_method: Option<String>,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))", nullable)]
    pub payment_amount: Option<Decimal>,
    pub customer_rut: Option<String>,
    pub external_order_id: Option<String>,
    pub notes: Option<String>,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::route::Entity",
        from = "Column::RouteId",
        to = "super::route::Column::Id",
        on_delete = "Cascade"
    )]
    Route,
    #[sea_orm(
        belongs_to = "super::address::Entity",
        from = "Column::AddressId",
        to = "super::address::Column::Id",
        on_delete = "Restrict"
    )]
    Address,
    #[sea_orm(has_many = "super::payment::Entity")]
    Payments,
}

impl Related<super::route::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Route.def()
    }
}

impl Related<super::address::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Address.def()
    }
}

impl Related<super::payment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Payments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
