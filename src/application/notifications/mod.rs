//! Outbound notification fabric: webhooks and push
//!
//! `NotificationService` is the single seam the route engine talks to. It
//! resolves the configured webhook target and ETA window margins, builds
//! payloads, and dispatches fire-and-forget. Webhook and push failures are
//! logged here and never fail the state change that triggered them.

pub mod payloads;
pub mod push;
pub mod webhook;

use std::sync::Arc;

use chrono::Utc;
use tracing::warn;

pub use payloads::{build_payload, eta_window, WebhookEventKind};
pub use push::{PushDelivery, PushError, PushMessage, PushNotifier, PushSender};
pub use webhook::{DispatchOutcome, WebhookDispatcher, DEFAULT_MAX_ATTEMPTS};

use crate::domain::route::Route;
use crate::domain::settings::{
    NotificationSettings, WebhookSettings, NOTIFICATION_SETTINGS_KEY, WEBHOOK_SETTINGS_KEY,
};
use crate::domain::stop::Stop;
use crate::domain::user::User;
use crate::domain::RepositoryProvider;

pub struct NotificationService {
    repos: Arc<dyn RepositoryProvider>,
    dispatcher: Arc<WebhookDispatcher>,
    push: Arc<PushNotifier>,
}

impl NotificationService {
    pub fn new(
        repos: Arc<dyn RepositoryProvider>,
        dispatcher: Arc<WebhookDispatcher>,
        push: Arc<PushNotifier>,
    ) -> Self {
        Self {
            repos,
            dispatcher,
            push,
        }
    }

    async fn webhook_settings(&self) -> WebhookSettings {
        match self.repos.settings().get(WEBHOOK_SETTINGS_KEY).await {
            Ok(Some(value)) => serde_json::from_value(value).unwrap_or_default(),
            Ok(None) => WebhookSettings::default(),
            Err(err) => {
                warn!(error = %err, "Failed to load webhook settings");
                WebhookSettings::default()
            }
        }
    }

    async fn notification_settings(&self) -> NotificationSettings {
        match self.repos.settings().get(NOTIFICATION_SETTINGS_KEY).await {
            Ok(Some(value)) => serde_json::from_value(value).unwrap_or_default(),
            Ok(None) => NotificationSettings::default(),
            Err(err) => {
                warn!(error = %err, "Failed to load notification settings");
                NotificationSettings::default()
            }
        }
    }

    /// ETA window margins: the route's depot overrides the global setting.
    async fn window_margins(&self, route: &Route) -> (i64, i64) {
        if let Some(depot_id) = &route.depot_id {
            if let Ok(Some(depot)) = self.repos.depots().find_by_id(depot_id).await {
                return (
                    i64::from(depot.eta_window_before),
                    i64::from(depot.eta_window_after),
                );
            }
        }
        let settings = self.notification_settings().await;
        (settings.eta_window_before, settings.eta_window_after)
    }

    /// Build and fire one webhook event. No-op when no target is configured.
    pub async fn publish(
        &self,
        kind: WebhookEventKind,
        route: &Route,
        driver: Option<&User>,
        stop: Option<&Stop>,
        remaining_stops: Option<&[Stop]>,
        metadata: serde_json::Value,
    ) {
        let settings = self.webhook_settings().await;
        let Some(url) = settings.target() else {
            return;
        };

        let (before, after) = self.window_margins(route).await;
        let payload = build_payload(
            kind,
            Utc::now(),
            route,
            driver,
            stop,
            remaining_stops,
            before,
            after,
            metadata,
        );

        let payload = match serde_json::to_value(&payload) {
            Ok(value) => value,
            Err(err) => {
                warn!(error = %err, event = kind.as_str(), "Failed to serialize webhook payload");
                return;
            }
        };

        WebhookDispatcher::dispatch_background(
            Arc::clone(&self.dispatcher),
            url.to_string(),
            kind.as_str().to_string(),
            payload,
            settings.secret.clone(),
        );
    }

    /// Admin "resend notifications" action: rebuilds the route's current
    /// notification payload and awaits the dispatch, so the operator sees
    /// the receiver's actual response. The payload mirrors `eta.updated` -
    /// route, driver and the remaining stops with their windows - tagged
    /// `reason=resend`.
    pub async fn resend_route(
        &self,
        route: &Route,
        driver: Option<&User>,
        remaining_stops: &[Stop],
    ) -> DispatchOutcome {
        let settings = self.webhook_settings().await;
        let Some(url) = settings.target() else {
            return DispatchOutcome {
                ok: false,
                http_status: None,
                error: Some("webhook is not configured or not enabled".to_string()),
            };
        };

        let (before, after) = self.window_margins(route).await;
        let payload = build_payload(
            WebhookEventKind::EtaUpdated,
            Utc::now(),
            route,
            driver,
            None,
            Some(remaining_stops),
            before,
            after,
            serde_json::json!({ "reason": "resend" }),
        );

        let payload = match serde_json::to_value(&payload) {
            Ok(value) => value,
            Err(err) => {
                return DispatchOutcome {
                    ok: false,
                    http_status: None,
                    error: Some(format!("payload serialization failed: {err}")),
                }
            }
        };

        self.dispatcher
            .dispatch(
                url,
                WebhookEventKind::EtaUpdated.as_str(),
                &payload,
                settings.secret.as_deref(),
                DEFAULT_MAX_ATTEMPTS,
            )
            .await
    }

    /// Admin "test webhook" action: awaited, outcome surfaced to the caller.
    pub async fn send_test(&self) -> DispatchOutcome {
        let settings = self.webhook_settings().await;
        let Some(url) = settings.target() else {
            return DispatchOutcome {
                ok: false,
                http_status: None,
                error: Some("webhook is not configured or not enabled".to_string()),
            };
        };

        let payload = serde_json::json!({
            "event": "webhook.test",
            "timestamp": Utc::now().to_rfc3339(),
            "metadata": { "source": "settings.test" },
        });

        self.dispatcher
            .dispatch(
                url,
                "webhook.test",
                &payload,
                settings.secret.as_deref(),
                1,
            )
            .await
    }

    /// Data-only push to a driver. Returns delivery success; never errors.
    pub async fn push_to_driver(&self, driver_id: &str, message: PushMessage) -> bool {
        self.push.send_to_user(driver_id, message).await
    }
}
