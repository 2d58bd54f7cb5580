//! Create depots table

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Depots::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Depots::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Depots::Name).string().not_null())
                    .col(ColumnDef::new(Depots::Address).string().not_null())
                    .col(ColumnDef::new(Depots::Lat).double().not_null())
                    .col(ColumnDef::new(Depots::Lng).double().not_null())
                    .col(
                        ColumnDef::new(Depots::DefaultDepartureTime)
                            .string()
                            .not_null()
                            .default("09:00"),
                    )
                    .col(
                        ColumnDef::new(Depots::DefaultServiceMinutes)
                            .integer()
                            .not_null()
                            .default(10),
                    )
                    .col(
                        ColumnDef::new(Depots::EtaWindowBefore)
                            .integer()
                            .not_null()
                            .default(30),
                    )
                    .col(
                        ColumnDef::new(Depots::EtaWindowAfter)
                            .integer()
                            .not_null()
                            .default(30),
                    )
                    .col(
                        ColumnDef::new(Depots::IsDefault)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Depots::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Depots::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Depots::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Depots::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Depots {
    Table,
    Id,
    Name,
    Address,
    Lat,
    Lng,
    DefaultDepartureTime,
    DefaultServiceMinutes,
    EtaWindowBefore,
    EtaWindowAfter,
    IsDefault,
    IsActive,
    CreatedAt,
    UpdatedAt,
}
