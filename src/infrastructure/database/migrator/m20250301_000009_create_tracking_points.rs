//! Create tracking_points table

use sea_orm_migration::prelude::*;

use super::m20250301_000004_create_routes::Routes;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(TrackingPoints::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TrackingPoints::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(TrackingPoints::RouteId).string().not_null())
                    .col(ColumnDef::new(TrackingPoints::Lat).double().not_null())
                    .col(ColumnDef::new(TrackingPoints::Lng).double().not_null())
                    .col(ColumnDef::new(TrackingPoints::Heading).double())
                    .col(ColumnDef::new(TrackingPoints::Speed).double())
                    .col(ColumnDef::new(TrackingPoints::Accuracy).double())
                    .col(
                        ColumnDef::new(TrackingPoints::RecordedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_tracking_points_route")
                            .from(TrackingPoints::Table, TrackingPoints::RouteId)
                            .to(Routes::Table, Routes::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_tracking_points_route")
                    .table(TrackingPoints::Table)
                    .col(TrackingPoints::RouteId)
                    .col(TrackingPoints::RecordedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(TrackingPoints::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum TrackingPoints {
    Table,
    Id,
    RouteId,
    Lat,
    Lng,
    Heading,
    Speed,
    Accuracy,
    RecordedAt,
}
