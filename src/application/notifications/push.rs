//! Push notifications to driver devices
//!
//! Wraps an external push provider behind `PushSender`. Messages are
//! data-only - title and body travel inside the data map - so every
//! receiver surfaces them the same way. Failures never propagate to the
//! caller; the notifier reports a boolean and prunes stale tokens.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};

use crate::domain::RepositoryProvider;

#[derive(Debug, Error)]
pub enum PushError {
    #[error("push provider unavailable: {0}")]
    Unavailable(String),

    #[error("invalid push provider response: {0}")]
    InvalidResponse(String),
}

/// Notification content; `data` is merged with the title/body fields.
#[derive(Debug, Clone)]
pub struct PushMessage {
    pub title: String,
    pub body: String,
    pub data: serde_json::Map<String, serde_json::Value>,
}

impl PushMessage {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            data: serde_json::Map::new(),
        }
    }

    pub fn with_data(mut self, key: &str, value: serde_json::Value) -> Self {
        self.data.insert(key.to_string(), value);
        self
    }
}

/// Result of one provider send.
#[derive(Debug, Clone, Copy)]
pub struct PushDelivery {
    pub delivered: bool,
    /// The provider reported the device token as no longer valid.
    pub stale_token: bool,
}

#[async_trait]
pub trait PushSender: Send + Sync {
    async fn send_data_message(
        &self,
        token: &str,
        message: &PushMessage,
    ) -> Result<PushDelivery, PushError>;
}

pub struct PushNotifier {
    repos: Arc<dyn RepositoryProvider>,
    sender: Option<Arc<dyn PushSender>>,
}

impl PushNotifier {
    pub fn new(repos: Arc<dyn RepositoryProvider>, sender: Option<Arc<dyn PushSender>>) -> Self {
        Self { repos, sender }
    }

    /// Send a data-only push to the user's registered device.
    ///
    /// Returns false when no provider is configured, the user has no token,
    /// or delivery failed. Never returns an error.
    pub async fn send_to_user(&self, user_id: &str, message: PushMessage) -> bool {
        let Some(sender) = &self.sender else {
            debug!(user_id, "Push skipped: no provider configured");
            return false;
        };

        let user = match self.repos.users().find_by_id(user_id).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                debug!(user_id, "Push skipped: user not found");
                return false;
            }
            Err(err) => {
                warn!(user_id, error = %err, "Push skipped: user lookup failed");
                return false;
            }
        };

        let Some(token) = user.push_token.as_deref() else {
            debug!(user_id, "Push skipped: no device token");
            return false;
        };

        match sender.send_data_message(token, &message).await {
            Ok(delivery) => {
                if delivery.stale_token {
                    debug!(user_id, "Clearing stale push token");
                    if let Err(err) = self.repos.users().set_push_token(user_id, None).await {
                        warn!(user_id, error = %err, "Failed to clear stale push token");
                    }
                }
                delivery.delivered
            }
            Err(err) => {
                warn!(user_id, error = %err, "Push delivery failed");
                false
            }
        }
    }
}
