//! Address entity

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "addresses")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub street: String,
    pub city: String,
    pub full_address: String,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub geocode_status: String,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub customer_rut: Option<String>,
    pub external_order_id: Option<String>,
    pub payment_method: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::stop::Entity")]
    Stops,
}

impl Related<super::stop::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Stops.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
