//! Create routes table

use sea_orm_migration::prelude::*;

use super::m20250301_000001_create_users::Users;
use super::m20250301_000002_create_depots::Depots;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Routes::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Routes::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Routes::Name).string().not_null())
                    .col(
                        ColumnDef::new(Routes::Status)
                            .string()
                            .not_null()
                            .default("DRAFT"),
                    )
                    .col(ColumnDef::new(Routes::ScheduledDate).date())
                    .col(ColumnDef::new(Routes::DepartureTime).string())
                    .col(ColumnDef::new(Routes::DepotId).string())
                    .col(ColumnDef::new(Routes::OriginLat).double())
                    .col(ColumnDef::new(Routes::OriginLng).double())
                    .col(ColumnDef::new(Routes::OriginAddress).string())
                    .col(ColumnDef::new(Routes::AssignedDriverId).string())
                    .col(ColumnDef::new(Routes::CreatedBy).string().not_null())
                    .col(ColumnDef::new(Routes::SentAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Routes::LoadedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Routes::StartedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Routes::ActualStartTime).timestamp_with_time_zone())
                    .col(ColumnDef::new(Routes::PausedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Routes::CompletedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Routes::TotalDistanceKm).double())
                    .col(ColumnDef::new(Routes::TotalDurationMin).double())
                    .col(ColumnDef::new(Routes::OptimizedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Routes::OptimizationHash).string())
                    .col(ColumnDef::new(Routes::DepotReturnTime).timestamp_with_time_zone())
                    .col(ColumnDef::new(Routes::DriverLat).double())
                    .col(ColumnDef::new(Routes::DriverLng).double())
                    .col(ColumnDef::new(Routes::DriverLocationAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Routes::DriverHeading).double())
                    .col(ColumnDef::new(Routes::DriverSpeed).double())
                    .col(
                        ColumnDef::new(Routes::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Routes::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_routes_depot")
                            .from(Routes::Table, Routes::DepotId)
                            .to(Depots::Table, Depots::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_routes_driver")
                            .from(Routes::Table, Routes::AssignedDriverId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_routes_status")
                    .table(Routes::Table)
                    .col(Routes::Status)
                    .to_owned(),
            )
            .await?;

        // One-active-route-per-driver lookups.
        manager
            .create_index(
                Index::create()
                    .name("idx_routes_driver_status")
                    .table(Routes::Table)
                    .col(Routes::AssignedDriverId)
                    .col(Routes::Status)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Routes::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Routes {
    Table,
    Id,
    Name,
    Status,
    ScheduledDate,
    DepartureTime,
    DepotId,
    OriginLat,
    OriginLng,
    OriginAddress,
    AssignedDriverId,
    CreatedBy,
    SentAt,
    LoadedAt,
    StartedAt,
    ActualStartTime,
    PausedAt,
    CompletedAt,
    TotalDistanceKm,
    TotalDurationMin,
    OptimizedAt,
    OptimizationHash,
    DepotReturnTime,
    DriverLat,
    DriverLng,
    DriverLocationAt,
    DriverHeading,
    DriverSpeed,
    CreatedAt,
    UpdatedAt,
}
