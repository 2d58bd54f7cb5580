//! Database migrations

use sea_orm_migration::prelude::*;

mod m20250301_000001_create_users;
mod m20250301_000002_create_depots;
mod m20250301_000003_create_addresses;
mod m20250301_000004_create_routes;
mod m20250301_000005_create_stops;
mod m20250301_000006_create_payments;
mod m20250301_000007_create_refresh_tokens;
mod m20250301_000008_create_settings;
mod m20250301_000009_create_tracking_points;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_000001_create_users::Migration),
            Box::new(m20250301_000002_create_depots::Migration),
            Box::new(m20250301_000003_create_addresses::Migration),
            Box::new(m20250301_000004_create_routes::Migration),
            Box::new(m20250301_000005_create_stops::Migration),
            Box::new(m20250301_000006_create_payments::Migration),
            Box::new(m20250301_000007_create_refresh_tokens::Migration),
            Box::new(m20250301_000008_create_settings::Migration),
            Box::new(m20250301_000009_create_tracking_points::Migration),
        ]
    }
}
