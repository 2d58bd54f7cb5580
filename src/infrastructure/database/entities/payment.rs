//! Payment entity

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "payments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub stop_id: String,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub amount: Decimal,
    pub method: String,
    pub status: String,
    pub customer_rut: Option<String>,
    pub transaction_id: Option<String>,
    pub bank_reference: Option<String>,
    pub verified_at: Option<DateTime<Utc>>,
    pub verified_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::stop::Entity",
        from = "Column::StopId",
        to = "super::stop::Column::Id",
        on_delete = "Cascade"
    )]
    Stop,
}

impl Related<super::stop::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Stop.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
