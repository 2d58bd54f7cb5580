//! Application layer - use-case orchestration over the domain

pub mod events;
pub mod notifications;
pub mod optimizer;
pub mod routes;
pub mod sessions;

pub use events::{create_live_channel, LiveChannel, SharedLiveChannel};
pub use notifications::{NotificationService, PushNotifier, WebhookDispatcher};
pub use optimizer::{CheapProvider, Optimizer, TravelTimeProvider};
pub use routes::{RouteEngine, RoutePlanner};
pub use sessions::SessionService;
