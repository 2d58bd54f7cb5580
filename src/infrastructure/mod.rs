//! Infrastructure layer - external concerns

pub mod crypto;
pub mod database;
pub mod providers;

pub use database::{init_database, DatabaseConfig, SeaOrmRepositoryProvider};
pub use providers::{FcmClient, GoogleMapsProvider};
