//! Create stops table

use sea_orm_migration::prelude::*;

use super::m20250301_000003_create_addresses::Addresses;
use super::m20250301_000004_create_routes::Routes;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Stops::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Stops::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Stops::RouteId).string().not_null())
                    .col(ColumnDef::new(Stops::AddressId).string().not_null())
                    .col(ColumnDef::new(Stops::SequenceOrder).integer().not_null())
                    .col(
                        ColumnDef::new(Stops::Status)
                            .string()
                            .not_null()
                            .default("PENDING"),
                    )
                    .col(
                        ColumnDef::new(Stops::EstimatedMinutes)
                            .integer()
                            .not_null()
                            .default(10),
                    )
                    .col(
                        ColumnDef::new(Stops::Priority)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Stops::TimeWindowStart).timestamp_with_time_zone())
                    .col(ColumnDef::new(Stops::TimeWindowEnd).timestamp_with_time_zone())
                    .col(ColumnDef::new(Stops::EstimatedArrival).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Stops::OriginalEstimatedArrival).timestamp_with_time_zone(),
                    )
                    .col(ColumnDef::new(Stops::TravelMinutesFromPrevious).double())
                    .col(ColumnDef::new(Stops::ArrivedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Stops::CompletedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Stops::RequireSignature)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Stops::RequirePhoto)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Stops::SignatureUrl).string())
                    .col(ColumnDef::new(Stops::PhotoUrl).string())
                    .col(
                        ColumnDef::new(Stops::IsPaid)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Stops::PaymentStatus)
                            .string()
                            .not_null()
                            .default("PENDING"),
                    )
                    .col(ColumnDef::new(Stops::PaymentMethod).string())
                    .col(ColumnDef::new(Stops::PaymentAmount).decimal_len(12, 2))
                    .col(ColumnDef::new(Stops::CustomerRut).string())
                    .col(ColumnDef::new(Stops::ExternalOrderId).string())
                    .col(ColumnDef::new(Stops::Notes).string())
                    .col(ColumnDef::new(Stops::FailureReason).string())
                    .col(
                        ColumnDef::new(Stops::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Stops::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_stops_route")
                            .from(Stops::Table, Stops::RouteId)
                            .to(Routes::Table, Routes::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_stops_address")
                            .from(Stops::Table, Stops::AddressId)
                            .to(Addresses::Table, Addresses::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        // Visit order is unique within a route; the reorder path keeps this
        // satisfied with its negative-then-positive rewrite.
        manager
            .create_index(
                Index::create()
                    .name("uq_stops_route_sequence")
                    .table(Stops::Table)
                    .col(Stops::RouteId)
                    .col(Stops::SequenceOrder)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_stops_status")
                    .table(Stops::Table)
                    .col(Stops::Status)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Stops::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Stops {
    Table,
    Id,
    RouteId,
    AddressId,
    SequenceOrder,
    Status,
    EstimatedMinutes,
    Priority,
    TimeWindowStart,
    TimeWindowEnd,
    EstimatedArrival,
    OriginalEstimatedArrival,
    TravelMinutesFromPrevious,
    ArrivedAt,
    CompletedAt,
    RequireSignature,
    RequirePhoto,
    SignatureUrl,
    PhotoUrl,
    IsPaid,
    PaymentStatus,
    PaymentMethod,
    PaymentAmount,
    CustomerRut,
    ExternalOrderId,
    Notes,
    FailureReason,
    CreatedAt,
    UpdatedAt,
}
