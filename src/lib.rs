//! # Dispatch Service
//!
//! Last-mile delivery dispatch backend: route planning and optimization,
//! live execution with frozen ETAs, SSE fan-out to dashboards, signed
//! webhooks and driver push notifications.
//!
//! ## Architecture
//!
//! - **shared**: Cross-cutting utilities (errors, geometry, retry, shutdown)
//! - **domain**: Core business entities, status machines, repository traits
//! - **application**: Use-case orchestration (optimizer, route engine, ETA
//!   recalculation, sessions, live channel, notifications)
//! - **infrastructure**: External concerns (SeaORM database, crypto,
//!   mapping/push providers)
//! - **interfaces**: Delivery mechanisms (HTTP REST + SSE)
//! - **config**: Application configuration (TOML-based)

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod interfaces;
pub mod shared;

// Re-export commonly used types at crate root
pub use application::{
    create_live_channel, NotificationService, Optimizer, PushNotifier, RouteEngine, RoutePlanner,
    SessionService, WebhookDispatcher,
};
pub use config::{default_config_path, AppConfig};
pub use infrastructure::{init_database, DatabaseConfig, SeaOrmRepositoryProvider};
pub use interfaces::http::create_api_router;
