//! Repository traits for the domain layer
//!
//! `RepositoryProvider` gives unified access to all per-aggregate
//! repositories. Consumers request only the repository they need:
//!
//! ```ignore
//! async fn handle(repos: &dyn RepositoryProvider) {
//!     let route = repos.routes().find_by_id("r1").await?;
//!     let stops = repos.stops().list_by_route("r1").await?;
//! }
//! ```

use super::address::AddressRepository;
use super::depot::DepotRepository;
use super::payment::PaymentRepository;
use super::refresh_token::RefreshTokenRepository;
use super::route::RouteRepository;
use super::settings::SettingsRepository;
use super::stop::StopRepository;
use super::user::UserRepository;

/// Provides access to all domain repositories.
pub trait RepositoryProvider: Send + Sync {
    fn users(&self) -> &dyn UserRepository;
    fn refresh_tokens(&self) -> &dyn RefreshTokenRepository;
    fn depots(&self) -> &dyn DepotRepository;
    fn addresses(&self) -> &dyn AddressRepository;
    fn routes(&self) -> &dyn RouteRepository;
    fn stops(&self) -> &dyn StopRepository;
    fn payments(&self) -> &dyn PaymentRepository;
    fn settings(&self) -> &dyn SettingsRepository;
}
