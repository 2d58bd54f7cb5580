//! FCM push client
//!
//! Sends data-only messages through the FCM legacy HTTP API. Title and
//! body are folded into the data map so Android and iOS receivers handle
//! the message identically. A `NotRegistered`/`InvalidRegistration` result
//! marks the token stale so the notifier can prune it.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::application::notifications::push::{PushDelivery, PushError, PushMessage, PushSender};

const DEFAULT_ENDPOINT: &str = "https://fcm.googleapis.com/fcm/send";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

const STALE_TOKEN_ERRORS: [&str; 2] = ["NotRegistered", "InvalidRegistration"];

pub struct FcmClient {
    client: reqwest::Client,
    server_key: String,
    endpoint: String,
}

impl FcmClient {
    pub fn new(server_key: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("failed to build push HTTP client");
        Self {
            client,
            server_key: server_key.into(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[derive(Debug, Deserialize)]
struct FcmResponse {
    #[serde(default)]
    failure: u32,
    #[serde(default)]
    results: Vec<FcmResult>,
}

#[derive(Debug, Deserialize)]
struct FcmResult {
    error: Option<String>,
}

#[async_trait]
impl PushSender for FcmClient {
    async fn send_data_message(
        &self,
        token: &str,
        message: &PushMessage,
    ) -> Result<PushDelivery, PushError> {
        let mut data = message.data.clone();
        data.insert("title".to_string(), serde_json::json!(message.title));
        data.insert("body".to_string(), serde_json::json!(message.body));

        let payload = serde_json::json!({
            "to": token,
            "priority": "high",
            "content_available": true,
            "data": data,
        });

        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("key={}", self.server_key))
            .json(&payload)
            .send()
            .await
            .map_err(|err| PushError::Unavailable(err.to_string()))?;

        if !response.status().is_success() {
            return Err(PushError::Unavailable(format!(
                "push endpoint returned HTTP {}",
                response.status()
            )));
        }

        let body: FcmResponse = response
            .json()
            .await
            .map_err(|err| PushError::InvalidResponse(err.to_string()))?;

        if body.failure == 0 {
            debug!("Push delivered");
            return Ok(PushDelivery {
                delivered: true,
                stale_token: false,
            });
        }

        let stale = body
            .results
            .iter()
            .filter_map(|r| r.error.as_deref())
            .any(|e| STALE_TOKEN_ERRORS.contains(&e));

        Ok(PushDelivery {
            delivered: false,
            stale_token: stale,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stale_errors_are_recognized() {
        let body: FcmResponse = serde_json::from_str(
            r#"{"failure":1,"results":[{"error":"NotRegistered"}]}"#,
        )
        .unwrap();
        assert_eq!(body.failure, 1);
        assert!(body
            .results
            .iter()
            .filter_map(|r| r.error.as_deref())
            .any(|e| STALE_TOKEN_ERRORS.contains(&e)));
    }

    #[test]
    fn success_body_parses_without_results() {
        let body: FcmResponse = serde_json::from_str(r#"{"success":1,"failure":0}"#).unwrap();
        assert_eq!(body.failure, 0);
        assert!(body.results.is_empty());
    }
}
