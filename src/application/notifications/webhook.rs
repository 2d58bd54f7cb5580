//! Outbound webhook delivery
//!
//! Signs, sends and retries HTTP POSTs to the configured receiver.
//! 2xx is success, 4xx is terminal (the receiver rejected the payload),
//! network errors and 5xx retry with exponential backoff. Dispatch is
//! fire-and-forget from the route engine; only explicit admin actions
//! await the outcome.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::infrastructure::crypto::signature::webhook_signature;
use crate::shared::utils::retry::{retry_with_backoff, RetryConfig};

/// Per-attempt request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Default delivery attempts (including the first).
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Final result of a dispatch, surfaced to admin actions and logs.
#[derive(Debug, Clone)]
pub struct DispatchOutcome {
    pub ok: bool,
    pub http_status: Option<u16>,
    pub error: Option<String>,
}

#[derive(Debug, Error)]
enum AttemptError {
    /// The receiver rejected the payload; retrying cannot help.
    #[error("webhook rejected with HTTP {status}")]
    Terminal { status: u16 },

    /// Network failure or receiver-side error; worth retrying.
    #[error("webhook attempt failed: {0}")]
    Transient(String),
}

/// Classify one HTTP response status.
fn classify_status(status: u16) -> Result<u16, AttemptError> {
    match status {
        200..=299 => Ok(status),
        400..=499 => Err(AttemptError::Terminal { status }),
        _ => Err(AttemptError::Transient(format!("HTTP {status}"))),
    }
}

pub struct WebhookDispatcher {
    client: reqwest::Client,
}

impl WebhookDispatcher {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("failed to build webhook HTTP client");
        Self { client }
    }

    /// Deliver one payload, retrying transient failures.
    pub async fn dispatch(
        &self,
        url: &str,
        event: &str,
        payload: &serde_json::Value,
        secret: Option<&str>,
        max_attempts: u32,
    ) -> DispatchOutcome {
        let body = match serde_json::to_string(payload) {
            Ok(body) => body,
            Err(err) => {
                return DispatchOutcome {
                    ok: false,
                    http_status: None,
                    error: Some(format!("payload serialization failed: {err}")),
                }
            }
        };
        let signature = secret.map(|s| webhook_signature(s, &body));

        let result = retry_with_backoff(
            RetryConfig::webhook(max_attempts.max(1)),
            || {
                let body = body.clone();
                let signature = signature.clone();
                async move {
                    let mut request = self
                        .client
                        .post(url)
                        .header("Content-Type", "application/json")
                        .header("X-Webhook-Event", event)
                        .header("X-Webhook-Timestamp", Utc::now().to_rfc3339())
                        .body(body);
                    if let Some(signature) = signature {
                        request = request.header("X-Webhook-Signature", signature);
                    }

                    match request.send().await {
                        Ok(response) => classify_status(response.status().as_u16()),
                        Err(err) => Err(AttemptError::Transient(err.to_string())),
                    }
                }
            },
            |err| matches!(err, AttemptError::Transient(_)),
            "webhook_dispatch",
        )
        .await;

        match result {
            Ok(status) => {
                debug!(event, url, status, "Webhook delivered");
                DispatchOutcome {
                    ok: true,
                    http_status: Some(status),
                    error: None,
                }
            }
            Err(AttemptError::Terminal { status }) => {
                warn!(event, url, status, "Webhook rejected by receiver");
                DispatchOutcome {
                    ok: false,
                    http_status: Some(status),
                    error: Some(format!("HTTP {status}")),
                }
            }
            Err(AttemptError::Transient(message)) => {
                warn!(event, url, error = %message, "Webhook delivery failed");
                DispatchOutcome {
                    ok: false,
                    http_status: None,
                    error: Some(message),
                }
            }
        }
    }

    /// Fire-and-forget dispatch. Retries survive the originating request;
    /// the outcome only reaches the logs.
    pub fn dispatch_background(
        dispatcher: Arc<Self>,
        url: String,
        event: String,
        payload: serde_json::Value,
        secret: Option<String>,
    ) {
        tokio::spawn(async move {
            let outcome = dispatcher
                .dispatch(&url, &event, &payload, secret.as_deref(), DEFAULT_MAX_ATTEMPTS)
                .await;
            if outcome.ok {
                info!(event = %event, "Webhook dispatched");
            }
        });
    }
}

impl Default for WebhookDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_statuses_pass_through() {
        assert_eq!(classify_status(200).unwrap(), 200);
        assert_eq!(classify_status(204).unwrap(), 204);
    }

    #[test]
    fn client_errors_are_terminal() {
        assert!(matches!(
            classify_status(404),
            Err(AttemptError::Terminal { status: 404 })
        ));
        assert!(matches!(
            classify_status(422),
            Err(AttemptError::Terminal { status: 422 })
        ));
    }

    #[test]
    fn server_errors_are_transient() {
        assert!(matches!(
            classify_status(500),
            Err(AttemptError::Transient(_))
        ));
        assert!(matches!(
            classify_status(503),
            Err(AttemptError::Transient(_))
        ));
    }
}
