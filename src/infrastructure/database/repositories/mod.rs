//! SeaORM repository implementations

mod address_repository;
mod depot_repository;
mod payment_repository;
mod refresh_token_repository;
mod repository_provider;
mod route_repository;
mod settings_repository;
mod stop_repository;
mod user_repository;

pub use address_repository::SeaOrmAddressRepository;
pub use depot_repository::SeaOrmDepotRepository;
pub use payment_repository::SeaOrmPaymentRepository;
pub use refresh_token_repository::SeaOrmRefreshTokenRepository;
pub use repository_provider::SeaOrmRepositoryProvider;
pub use route_repository::SeaOrmRouteRepository;
pub use settings_repository::SeaOrmSettingsRepository;
pub use stop_repository::SeaOrmStopRepository;
pub use user_repository::SeaOrmUserRepository;

use crate::domain::DomainError;

pub(crate) fn db_err(e: sea_orm::DbErr) -> DomainError {
    DomainError::Internal(format!("Database error: {}", e))
}
