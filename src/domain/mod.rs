//! Domain layer - core business entities, status machines and repository traits

pub mod address;
pub mod depot;
pub mod events;
pub mod payment;
pub mod refresh_token;
pub mod repositories;
pub mod route;
pub mod settings;
pub mod stop;
pub mod user;

pub use crate::shared::types::errors::{DomainError, DomainResult};
pub use address::{Address, AddressRepository, GeocodeStatus};
pub use depot::{Depot, DepotRepository};
pub use events::RouteEvent;
pub use payment::{Payment, PaymentMethod, PaymentRepository, PaymentVerification};
pub use refresh_token::{RefreshTokenRecord, RefreshTokenRepository};
pub use repositories::RepositoryProvider;
pub use route::{DriverFix, Route, RouteRepository, RouteStatus, TrackingPoint};
pub use settings::{
    DeliverySettings, NotificationSettings, SettingsRepository, WebhookSettings,
};
pub use stop::{Stop, StopCompletion, StopPaymentStatus, StopRepository, StopStatus};
pub use user::{User, UserRepository, UserRole};
