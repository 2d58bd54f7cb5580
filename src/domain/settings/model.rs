//! Key-addressed settings blobs
//!
//! Settings are stored as opaque JSON values under well-known keys; the
//! typed shapes below are the contract for the keys the core reads.

use serde::{Deserialize, Serialize};

pub const WEBHOOK_SETTINGS_KEY: &str = "webhook";
pub const NOTIFICATION_SETTINGS_KEY: &str = "notifications";
pub const DELIVERY_SETTINGS_KEY: &str = "delivery";

/// Outbound webhook target.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WebhookSettings {
    pub url: Option<String>,
    pub enabled: bool,
    pub secret: Option<String>,
}

impl WebhookSettings {
    /// Dispatch happens only with an explicit URL and the flag on.
    pub fn target(&self) -> Option<&str> {
        if self.enabled {
            self.url.as_deref().filter(|u| !u.is_empty())
        } else {
            None
        }
    }
}

/// Customer-facing ETA window margins, in minutes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NotificationSettings {
    pub eta_window_before: i64,
    pub eta_window_after: i64,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            eta_window_before: 30,
            eta_window_after: 30,
        }
    }
}

/// Proof-of-delivery defaults applied to newly created stops.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeliverySettings {
    pub require_signature: bool,
    pub require_photo: bool,
    pub proof_enabled: bool,
    pub service_minutes: i32,
}

impl Default for DeliverySettings {
    fn default() -> Self {
        Self {
            require_signature: false,
            require_photo: false,
            proof_enabled: true,
            service_minutes: 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn webhook_target_requires_enabled_and_url() {
        let mut s = WebhookSettings::default();
        assert_eq!(s.target(), None);

        s.url = Some("https://example.com/hook".into());
        assert_eq!(s.target(), None);

        s.enabled = true;
        assert_eq!(s.target(), Some("https://example.com/hook"));

        s.url = Some(String::new());
        assert_eq!(s.target(), None);
    }

    #[test]
    fn settings_deserialize_from_partial_json() {
        let s: NotificationSettings = serde_json::from_str("{\"etaWindowBefore\": 15}").unwrap();
        assert_eq!(s.eta_window_before, 15);
        assert_eq!(s.eta_window_after, 30);
    }
}
