//! Create addresses table

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Addresses::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Addresses::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Addresses::Street).string().not_null())
                    .col(ColumnDef::new(Addresses::City).string().not_null())
                    .col(ColumnDef::new(Addresses::FullAddress).string().not_null())
                    .col(ColumnDef::new(Addresses::Lat).double())
                    .col(ColumnDef::new(Addresses::Lng).double())
                    .col(
                        ColumnDef::new(Addresses::GeocodeStatus)
                            .string()
                            .not_null()
                            .default("PENDING"),
                    )
                    .col(ColumnDef::new(Addresses::CustomerName).string())
                    .col(ColumnDef::new(Addresses::CustomerPhone).string())
                    .col(ColumnDef::new(Addresses::CustomerRut).string())
                    .col(ColumnDef::new(Addresses::ExternalOrderId).string())
                    .col(ColumnDef::new(Addresses::PaymentMethod).string())
                    .col(
                        ColumnDef::new(Addresses::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Addresses::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_addresses_external_order")
                    .table(Addresses::Table)
                    .col(Addresses::ExternalOrderId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Addresses::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Addresses {
    Table,
    Id,
    Street,
    City,
    FullAddress,
    Lat,
    Lng,
    GeocodeStatus,
    CustomerName,
    CustomerPhone,
    CustomerRut,
    ExternalOrderId,
    PaymentMethod,
    CreatedAt,
    UpdatedAt,
}
