//! Create payments table

use sea_orm_migration::prelude::*;

use super::m20250301_000005_create_stops::Stops;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Payments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Payments::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Payments::StopId).string().not_null())
                    .col(
                        ColumnDef::new(Payments::Amount)
                            .decimal_len(12, 2)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Payments::Method).string().not_null())
                    .col(
                        ColumnDef::new(Payments::Status)
                            .string()
                            .not_null()
                            .default("PENDING"),
                    )
                    .col(ColumnDef::new(Payments::CustomerRut).string())
                    .col(ColumnDef::new(Payments::TransactionId).string())
                    .col(ColumnDef::new(Payments::BankReference).string())
                    .col(ColumnDef::new(Payments::VerifiedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Payments::VerifiedBy).string())
                    .col(
                        ColumnDef::new(Payments::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_payments_stop")
                            .from(Payments::Table, Payments::StopId)
                            .to(Stops::Table, Stops::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_payments_transaction")
                    .table(Payments::Table)
                    .col(Payments::TransactionId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Payments::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Payments {
    Table,
    Id,
    StopId,
    Amount,
    Method,
    Status,
    CustomerRut,
    TransactionId,
    BankReference,
    VerifiedAt,
    VerifiedBy,
    CreatedAt,
}
