mod model;
mod repository;

pub use model::{
    DeliverySettings, NotificationSettings, WebhookSettings, DELIVERY_SETTINGS_KEY,
    NOTIFICATION_SETTINGS_KEY, WEBHOOK_SETTINGS_KEY,
};
pub use repository::SettingsRepository;
