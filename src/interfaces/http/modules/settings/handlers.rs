//! Settings handlers
//!
//! Settings are opaque JSON blobs under well-known keys; the typed shapes
//! of the keys the core reads are validated on write.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::{Extension, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::application::notifications::NotificationService;
use crate::domain::settings::{
    DeliverySettings, NotificationSettings, WebhookSettings, DELIVERY_SETTINGS_KEY,
    NOTIFICATION_SETTINGS_KEY, WEBHOOK_SETTINGS_KEY,
};
use crate::domain::{DomainError, RepositoryProvider};
use crate::interfaces::http::common::{ApiResponse, ApiResult};
use crate::interfaces::http::middleware::AuthenticatedUser;

#[derive(Clone)]
pub struct SettingsModuleState {
    pub repos: Arc<dyn RepositoryProvider>,
    pub notifications: Arc<NotificationService>,
}

const KNOWN_KEYS: [&str; 3] = [
    WEBHOOK_SETTINGS_KEY,
    NOTIFICATION_SETTINGS_KEY,
    DELIVERY_SETTINGS_KEY,
];

fn require_admin(user: &AuthenticatedUser) -> Result<(), DomainError> {
    if user.is_admin() {
        Ok(())
    } else {
        Err(DomainError::Forbidden("Admin role required".into()))
    }
}

fn validate_known_shape(key: &str, value: &serde_json::Value) -> Result<(), DomainError> {
    let check = match key {
        WEBHOOK_SETTINGS_KEY => {
            serde_json::from_value::<WebhookSettings>(value.clone()).map(|_| ())
        }
        NOTIFICATION_SETTINGS_KEY => {
            serde_json::from_value::<NotificationSettings>(value.clone()).map(|_| ())
        }
        DELIVERY_SETTINGS_KEY => {
            serde_json::from_value::<DeliverySettings>(value.clone()).map(|_| ())
        }
        _ => return Err(DomainError::not_found("Setting", key)),
    };
    check.map_err(|err| DomainError::Validation(format!("Invalid {key} settings: {err}")))
}

#[utoipa::path(
    get,
    path = "/api/v1/settings/{key}",
    tag = "Settings",
    security(("bearer_auth" = [])),
    params(("key" = String, Path, description = "Settings key")),
    responses(
        (status = 200, description = "Settings value", body = ApiResponse<serde_json::Value>),
        (status = 404, description = "Unknown key")
    )
)]
pub async fn get_setting(
    State(state): State<SettingsModuleState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(key): Path<String>,
) -> ApiResult<Json<ApiResponse<serde_json::Value>>> {
    require_admin(&user)?;
    if !KNOWN_KEYS.contains(&key.as_str()) {
        return Err(DomainError::not_found("Setting", key.as_str()).into());
    }

    let value = match state.repos.settings().get(&key).await? {
        Some(value) => value,
        None => match key.as_str() {
            WEBHOOK_SETTINGS_KEY => serde_json::to_value(WebhookSettings::default()),
            NOTIFICATION_SETTINGS_KEY => serde_json::to_value(NotificationSettings::default()),
            _ => serde_json::to_value(DeliverySettings::default()),
        }
        .map_err(|err| DomainError::Internal(err.to_string()))?,
    };

    Ok(Json(ApiResponse::success(value)))
}

#[utoipa::path(
    put,
    path = "/api/v1/settings/{key}",
    tag = "Settings",
    security(("bearer_auth" = [])),
    params(("key" = String, Path, description = "Settings key")),
    responses(
        (status = 200, description = "Settings stored"),
        (status = 400, description = "Value does not match the key's shape")
    )
)]
pub async fn put_setting(
    State(state): State<SettingsModuleState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(key): Path<String>,
    Json(value): Json<serde_json::Value>,
) -> ApiResult<Json<ApiResponse<serde_json::Value>>> {
    require_admin(&user)?;
    validate_known_shape(&key, &value)?;

    state.repos.settings().put(&key, value.clone()).await?;
    Ok(Json(ApiResponse::success(value)))
}

/// Outcome of the awaited test dispatch.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WebhookTestResponse {
    pub ok: bool,
    pub http_status: Option<u16>,
    pub error: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/v1/settings/webhook/test",
    tag = "Settings",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Test dispatch outcome", body = ApiResponse<WebhookTestResponse>)
    )
)]
pub async fn test_webhook(
    State(state): State<SettingsModuleState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> ApiResult<Json<ApiResponse<WebhookTestResponse>>> {
    require_admin(&user)?;

    // Unlike engine-triggered dispatches this one is awaited so the admin
    // sees the receiver's actual response.
    let outcome = state.notifications.send_test().await;
    Ok(Json(ApiResponse::success(WebhookTestResponse {
        ok: outcome.ok,
        http_status: outcome.http_status,
        error: outcome.error,
    })))
}
