//! SSE stream of live route events
//!
//! One stream per (route, subscriber). Frames follow the SSE wire format
//! (`event: <name>` / `data: <json>`); a `: heartbeat` comment every 30 s
//! defeats idle proxy timeouts. Browsers connect with `EventSource`, which
//! cannot set headers, so the access token rides the query string.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures_util::stream::{self, Stream, StreamExt};
use serde::Deserialize;
use tracing::info;

use crate::application::events::SharedLiveChannel;
use crate::domain::events::RouteEvent;
use crate::domain::user::UserRole;
use crate::domain::{DomainError, RepositoryProvider};
use crate::infrastructure::crypto::jwt::{verify_access_token, JwtConfig};
use crate::interfaces::http::common::ApiError;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct EventsModuleState {
    pub repos: Arc<dyn RepositoryProvider>,
    pub live: SharedLiveChannel,
    pub jwt_config: JwtConfig,
}

#[derive(Debug, Deserialize)]
pub struct SseAuthQuery {
    pub token: String,
}

#[utoipa::path(
    get,
    path = "/api/v1/routes/{id}/events",
    tag = "Live",
    params(
        ("id" = String, Path, description = "Route id"),
        ("token" = String, Query, description = "Access token (EventSource cannot set headers)")
    ),
    responses(
        (status = 200, description = "text/event-stream of route events"),
        (status = 401, description = "Invalid token"),
        (status = 404, description = "Unknown route")
    )
)]
pub async fn route_events(
    State(state): State<EventsModuleState>,
    Path(id): Path<String>,
    Query(query): Query<SseAuthQuery>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let claims = verify_access_token(&query.token, &state.jwt_config)
        .map_err(|_| DomainError::Unauthenticated("Invalid or expired token".into()))?;

    let route = state
        .repos
        .routes()
        .find_by_id(&id)
        .await?
        .ok_or_else(|| DomainError::not_found("Route", id.as_str()))?;

    if claims.role == UserRole::Driver.as_str()
        && route.assigned_driver_id.as_deref() != Some(claims.sub.as_str())
    {
        return Err(DomainError::Forbidden("Route is not assigned to this driver".into()).into());
    }

    info!(route_id = %id, user_id = %claims.sub, "SSE subscriber connected");

    let subscription = state.live.subscribe(&id);

    // The route's current status opens every stream; subscribers that
    // reconnect after a token rotation resynchronize from this event.
    let connected = RouteEvent::Connected {
        route_id: route.id.clone(),
        status: route.status.as_str().to_string(),
    };
    let initial = Event::default()
        .event(connected.event_type())
        .data(serde_json::to_string(&connected).unwrap_or_else(|_| "{}".to_string()));

    let live_stream = stream::unfold(subscription, |mut subscription| async move {
        subscription
            .recv()
            .await
            .map(|frame| {
                let event = Event::default().event(frame.event).data(frame.data);
                (Ok::<Event, Infallible>(event), subscription)
            })
    });

    let stream = stream::once(async move { Ok(initial) }).chain(live_stream);

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(HEARTBEAT_INTERVAL)
            .text("heartbeat"),
    ))
}
