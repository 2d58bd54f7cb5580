//! SeaORM implementation of RepositoryProvider

use sea_orm::DatabaseConnection;

use crate::domain::address::AddressRepository;
use crate::domain::depot::DepotRepository;
use crate::domain::payment::PaymentRepository;
use crate::domain::refresh_token::RefreshTokenRepository;
use crate::domain::repositories::RepositoryProvider;
use crate::domain::route::RouteRepository;
use crate::domain::settings::SettingsRepository;
use crate::domain::stop::StopRepository;
use crate::domain::user::UserRepository;

use super::address_repository::SeaOrmAddressRepository;
use super::depot_repository::SeaOrmDepotRepository;
use super::payment_repository::SeaOrmPaymentRepository;
use super::refresh_token_repository::SeaOrmRefreshTokenRepository;
use super::route_repository::SeaOrmRouteRepository;
use super::settings_repository::SeaOrmSettingsRepository;
use super::stop_repository::SeaOrmStopRepository;
use super::user_repository::SeaOrmUserRepository;

/// Unified repository provider backed by SeaORM.
///
/// Holds one connection pool and exposes per-aggregate repository accessors.
///
/// ```ignore
/// let repos = SeaOrmRepositoryProvider::new(db.clone());
/// let route = repos.routes().find_by_id("r1").await?;
/// let stops = repos.stops().list_by_route("r1").await?;
/// ```
pub struct SeaOrmRepositoryProvider {
    users: SeaOrmUserRepository,
    refresh_tokens: SeaOrmRefreshTokenRepository,
    depots: SeaOrmDepotRepository,
    addresses: SeaOrmAddressRepository,
    routes: SeaOrmRouteRepository,
    stops: SeaOrmStopRepository,
    payments: SeaOrmPaymentRepository,
    settings: SeaOrmSettingsRepository,
}

impl SeaOrmRepositoryProvider {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            users: SeaOrmUserRepository::new(db.clone()),
            refresh_tokens: SeaOrmRefreshTokenRepository::new(db.clone()),
            depots: SeaOrmDepotRepository::new(db.clone()),
            addresses: SeaOrmAddressRepository::new(db.clone()),
            routes: SeaOrmRouteRepository::new(db.clone()),
            stops: SeaOrmStopRepository::new(db.clone()),
            payments: SeaOrmPaymentRepository::new(db.clone()),
            settings: SeaOrmSettingsRepository::new(db),
        }
    }
}

impl RepositoryProvider for SeaOrmRepositoryProvider {
    fn users(&self) -> &dyn UserRepository {
        &self.users
    }

    fn refresh_tokens(&self) -> &dyn RefreshTokenRepository {
        &self.refresh_tokens
    }

    fn depots(&self) -> &dyn DepotRepository {
        &self.depots
    }

    fn addresses(&self) -> &dyn AddressRepository {
        &self.addresses
    }

    fn routes(&self) -> &dyn RouteRepository {
        &self.routes
    }

    fn stops(&self) -> &dyn StopRepository {
        &self.stops
    }

    fn payments(&self) -> &dyn PaymentRepository {
        &self.payments
    }

    fn settings(&self) -> &dyn SettingsRepository {
        &self.settings
    }
}
