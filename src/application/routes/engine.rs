//! Route execution engine
//!
//! The state machine over routes and stops, and the only component that
//! mutates their status. Every durable state change is followed by a live
//! broadcast (post-commit) and, where configured, a webhook dispatch
//! (post-emit, fire-and-forget).

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{error, info, warn};

use crate::application::events::SharedLiveChannel;
use crate::application::notifications::{
    NotificationService, PushMessage, WebhookEventKind,
};
use crate::application::optimizer::TravelTimeProvider;
use crate::application::routes::eta::EtaRecalculator;
use crate::domain::events::RouteEvent;
use crate::domain::route::{DriverFix, Route, RouteStatus, TrackingPoint};
use crate::domain::stop::{Stop, StopCompletion, StopEtaUpdate, StopStatus};
use crate::domain::user::User;
use crate::domain::{DomainError, DomainResult, RepositoryProvider};
use crate::infrastructure::crypto::password::verify_password;
use crate::shared::geo::Point;

/// Terminal stop event as received from the driver app.
#[derive(Debug, Clone)]
pub struct CompleteStopRequest {
    pub status: StopStatus,
    pub notes: Option<String>,
    pub failure_reason: Option<String>,
    pub signature_url: Option<String>,
    pub photo_url: Option<String>,
}

/// What a stop completion did to the route.
#[derive(Debug)]
pub struct StopCompletionOutcome {
    pub stop: Stop,
    pub route_completed: bool,
}

pub struct RouteEngine {
    repos: Arc<dyn RepositoryProvider>,
    live: SharedLiveChannel,
    notifications: Arc<NotificationService>,
    provider: Arc<dyn TravelTimeProvider>,
    eta: EtaRecalculator,
}

impl RouteEngine {
    pub fn new(
        repos: Arc<dyn RepositoryProvider>,
        live: SharedLiveChannel,
        notifications: Arc<NotificationService>,
        provider: Arc<dyn TravelTimeProvider>,
    ) -> Self {
        let eta = EtaRecalculator::new(
            Arc::clone(&repos),
            Arc::clone(&provider),
            Arc::clone(&notifications),
        );
        Self {
            repos,
            live,
            notifications,
            provider,
            eta,
        }
    }

    async fn load_route(&self, route_id: &str) -> DomainResult<Route> {
        self.repos
            .routes()
            .find_by_id(route_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Route", route_id))
    }

    async fn load_driver(&self, route: &Route) -> Option<User> {
        let driver_id = route.assigned_driver_id.as_deref()?;
        match self.repos.users().find_by_id(driver_id).await {
            Ok(user) => user,
            Err(err) => {
                warn!(driver_id, error = %err, "Driver lookup failed");
                None
            }
        }
    }

    async fn open_stops(&self, route_id: &str) -> DomainResult<Vec<Stop>> {
        Ok(self
            .repos
            .stops()
            .list_by_route(route_id)
            .await?
            .into_iter()
            .filter(|s| !s.status.is_terminal())
            .collect())
    }

    // ── Route lifecycle ─────────────────────────────────────────

    /// DRAFT -> SCHEDULED. Requires an optimized route with an assigned
    /// driver that has not been sent yet.
    pub async fn send_route(&self, route_id: &str, now: DateTime<Utc>) -> DomainResult<Route> {
        let mut route = self.load_route(route_id).await?;

        if route.status != RouteStatus::Draft || route.sent_at.is_some() {
            return Err(DomainError::Conflict(format!(
                "Route {route_id} has already been sent"
            )));
        }
        if route.optimized_at.is_none() {
            return Err(DomainError::Conflict(
                "Route must be optimized before sending".into(),
            ));
        }
        let Some(driver_id) = route.assigned_driver_id.clone() else {
            return Err(DomainError::Conflict(
                "Route must have an assigned driver before sending".into(),
            ));
        };

        route.status = RouteStatus::Scheduled;
        route.sent_at = Some(now);
        route.updated_at = now;
        self.repos.routes().update(route.clone()).await?;

        info!(route_id, driver_id = %driver_id, "Route sent to driver");
        self.live.broadcast(&RouteEvent::RouteSent {
            route_id: route.id.clone(),
            driver_id: driver_id.clone(),
        });

        let delivered = self
            .notifications
            .push_to_driver(
                &driver_id,
                PushMessage::new("New route assigned", route.name.clone())
                    .with_data("routeId", serde_json::json!(route.id))
                    .with_data("type", serde_json::json!("route.sent")),
            )
            .await;
        if !delivered {
            info!(route_id, driver_id = %driver_id, "Driver push not delivered");
        }

        Ok(route)
    }

    /// SCHEDULED -> DRAFT, only while the driver has not started.
    pub async fn unsend_route(&self, route_id: &str, now: DateTime<Utc>) -> DomainResult<Route> {
        let mut route = self.load_route(route_id).await?;

        if route.status != RouteStatus::Scheduled || route.started_at.is_some() {
            return Err(DomainError::Conflict(format!(
                "Route {route_id} cannot be unsent in status {}",
                route.status
            )));
        }

        route.status = RouteStatus::Draft;
        route.sent_at = None;
        route.loaded_at = None;
        route.updated_at = now;
        self.repos.routes().update(route.clone()).await?;

        info!(route_id, "Route returned to draft");
        Ok(route)
    }

    /// Driver confirms the vehicle is loaded.
    pub async fn mark_loaded(&self, route_id: &str, now: DateTime<Utc>) -> DomainResult<Route> {
        let mut route = self.load_route(route_id).await?;

        if route.status != RouteStatus::Scheduled {
            return Err(DomainError::Conflict(format!(
                "Route {route_id} is not awaiting loading (status {})",
                route.status
            )));
        }

        route.loaded_at = Some(now);
        route.updated_at = now;
        self.repos.routes().update(route.clone()).await?;

        self.live.broadcast(&RouteEvent::RouteLoaded {
            route_id: route.id.clone(),
            loaded_at: now,
        });

        Ok(route)
    }

    /// SCHEDULED -> IN_PROGRESS. Freezes ETAs: anchors the clock at `now`
    /// and walks the stops in sequence, assigning each its estimated and -
    /// exactly once - its original estimated arrival.
    pub async fn start_route(&self, route_id: &str, now: DateTime<Utc>) -> DomainResult<Route> {
        let mut route = self.load_route(route_id).await?;

        if route.status != RouteStatus::Scheduled {
            return Err(DomainError::Conflict(format!(
                "Route {route_id} cannot start from status {}",
                route.status
            )));
        }

        let Some(driver_id) = route.assigned_driver_id.clone() else {
            return Err(DomainError::Conflict(
                "Route has no assigned driver".into(),
            ));
        };

        // One active route per driver.
        if let Some(active) = self.repos.routes().find_active_for_driver(&driver_id).await? {
            if active.id != route.id {
                return Err(DomainError::Conflict(format!(
                    "Driver already has an active route: {}",
                    active.id
                )));
            }
        }

        let stops = self.repos.stops().list_by_route(route_id).await?;
        let mut current_time = now;
        let mut updates = Vec::with_capacity(stops.len());
        for stop in &stops {
            let travel = stop.travel_minutes_from_previous.unwrap_or(0.0);
            let arrival = current_time + minutes_to_duration(travel);
            updates.push(StopEtaUpdate {
                stop_id: stop.id.clone(),
                estimated_arrival: arrival,
                travel_minutes_from_previous: None,
            });
            current_time = arrival + Duration::minutes(i64::from(stop.estimated_minutes));
        }
        self.repos.stops().freeze_etas(&updates).await?;

        route.status = RouteStatus::InProgress;
        route.started_at = route.started_at.or(Some(now));
        route.actual_start_time = Some(now);
        route.updated_at = now;
        self.repos.routes().update(route.clone()).await?;

        info!(route_id, driver_id = %driver_id, "Route started; ETAs frozen");
        self.live.broadcast(&RouteEvent::RouteStarted {
            route_id: route.id.clone(),
            started_at: now,
        });

        let driver = self.load_driver(&route).await;
        let remaining = self.open_stops(route_id).await.unwrap_or_default();
        self.notifications
            .publish(
                WebhookEventKind::RouteStarted,
                &route,
                driver.as_ref(),
                None,
                Some(remaining.as_slice()),
                serde_json::json!({}),
            )
            .await;

        Ok(route)
    }

    /// IN_PROGRESS -> PAUSED.
    pub async fn pause_route(&self, route_id: &str, now: DateTime<Utc>) -> DomainResult<Route> {
        let mut route = self.load_route(route_id).await?;

        if route.status != RouteStatus::InProgress {
            return Err(DomainError::Conflict(format!(
                "Route {route_id} is not in progress"
            )));
        }

        route.status = RouteStatus::Paused;
        route.paused_at = Some(now);
        route.updated_at = now;
        self.repos.routes().update(route.clone()).await?;

        info!(route_id, "Route paused");
        Ok(route)
    }

    /// PAUSED -> IN_PROGRESS, guarded against another running route.
    pub async fn resume_route(&self, route_id: &str, now: DateTime<Utc>) -> DomainResult<Route> {
        let mut route = self.load_route(route_id).await?;

        if route.status != RouteStatus::Paused {
            return Err(DomainError::Conflict(format!(
                "Route {route_id} is not paused"
            )));
        }

        if let Some(driver_id) = &route.assigned_driver_id {
            if let Some(active) = self.repos.routes().find_active_for_driver(driver_id).await? {
                if active.id != route.id && active.status == RouteStatus::InProgress {
                    return Err(DomainError::Conflict(format!(
                        "Driver already has an active route: {}",
                        active.id
                    )));
                }
            }
        }

        route.status = RouteStatus::InProgress;
        route.updated_at = now;
        self.repos.routes().update(route.clone()).await?;

        info!(route_id, "Route resumed");
        Ok(route)
    }

    /// Manual completion: remaining open stops are skipped so that a
    /// COMPLETED route only ever holds terminal stops.
    pub async fn complete_route(&self, route_id: &str, now: DateTime<Utc>) -> DomainResult<Route> {
        let route = self.load_route(route_id).await?;

        if route.status != RouteStatus::InProgress {
            return Err(DomainError::Conflict(format!(
                "Route {route_id} is not in progress"
            )));
        }

        for stop in self.open_stops(route_id).await? {
            let skipped = StopCompletion {
                status: StopStatus::Skipped,
                completed_at: now,
                notes: None,
                failure_reason: Some("route completed by operator".into()),
                signature_url: None,
                photo_url: None,
            };
            self.repos.stops().complete_if_open(&stop.id, &skipped).await?;
        }

        self.finish_route(route, now).await
    }

    /// Cancel from any non-terminal status. Stops are left untouched.
    pub async fn cancel_route(&self, route_id: &str, now: DateTime<Utc>) -> DomainResult<Route> {
        let mut route = self.load_route(route_id).await?;

        if route.status.is_terminal() {
            return Err(DomainError::Conflict(format!(
                "Route {route_id} is already {}",
                route.status
            )));
        }

        route.status = RouteStatus::Cancelled;
        route.updated_at = now;
        self.repos.routes().update(route.clone()).await?;

        info!(route_id, "Route cancelled");
        Ok(route)
    }

    /// Delete a route. Anything past DRAFT requires the requester to be an
    /// admin re-presenting their password.
    pub async fn delete_route(
        &self,
        route_id: &str,
        requester: &User,
        password: Option<&str>,
    ) -> DomainResult<()> {
        let route = self.load_route(route_id).await?;

        if route.status != RouteStatus::Draft {
            if !requester.is_admin() {
                return Err(DomainError::Forbidden(
                    "Only an admin may delete a dispatched route".into(),
                ));
            }
            let Some(password) = password else {
                return Err(DomainError::Forbidden(
                    "Password confirmation required".into(),
                ));
            };
            let valid = verify_password(password, &requester.password_hash)
                .map_err(|err| DomainError::Internal(format!("password check failed: {err}")))?;
            if !valid {
                return Err(DomainError::Forbidden(
                    "Password confirmation failed".into(),
                ));
            }
        }

        self.repos.routes().delete(route_id).await?;
        info!(route_id, "Route deleted");
        Ok(())
    }

    // ── Stop events ─────────────────────────────────────────────

    /// Apply a terminal stop event, recalculate downstream ETAs, fan out
    /// notifications, and complete the route once every stop is terminal.
    pub async fn complete_stop(
        &self,
        route_id: &str,
        stop_id: &str,
        request: CompleteStopRequest,
        now: DateTime<Utc>,
    ) -> DomainResult<StopCompletionOutcome> {
        if !request.status.is_terminal() {
            return Err(DomainError::Validation(format!(
                "{} is not a terminal stop status",
                request.status
            )));
        }

        let mut route = self.load_route(route_id).await?;
        let stop = self
            .repos
            .stops()
            .find_by_id(stop_id)
            .await?
            .filter(|s| s.route_id == route_id)
            .ok_or_else(|| DomainError::not_found("Stop", stop_id))?;

        // A driver reporting a stop on a sent-but-not-started route
        // implicitly starts it.
        match route.status {
            RouteStatus::InProgress => {}
            RouteStatus::Scheduled => {
                route = self.start_route(route_id, now).await?;
            }
            other => {
                return Err(DomainError::Conflict(format!(
                    "Route {route_id} is not in progress (status {other})"
                )));
            }
        }

        if stop.status.is_terminal() {
            return Err(DomainError::Conflict(format!(
                "Stop {stop_id} already processed (status {})",
                stop.status
            )));
        }

        let signature_url = request.signature_url.or_else(|| stop.signature_url.clone());
        let photo_url = request.photo_url.or_else(|| stop.photo_url.clone());

        if request.status == StopStatus::Completed {
            if stop.require_signature && signature_url.is_none() {
                return Err(DomainError::Validation(
                    "Signature proof is required to complete this stop".into(),
                ));
            }
            if stop.require_photo && photo_url.is_none() {
                return Err(DomainError::Validation(
                    "Photo proof is required to complete this stop".into(),
                ));
            }
        }

        let completion = StopCompletion {
            status: request.status,
            completed_at: now,
            notes: request.notes,
            failure_reason: request.failure_reason,
            signature_url,
            photo_url,
        };

        // First writer wins; a concurrent completion observes terminal
        // status here and conflicts.
        let applied = self.repos.stops().complete_if_open(stop_id, &completion).await?;
        if !applied {
            return Err(DomainError::Conflict(format!(
                "Stop {stop_id} already processed"
            )));
        }

        let stop = self
            .repos
            .stops()
            .find_by_id(stop_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Stop", stop_id))?;

        let driver = self.load_driver(&route).await;

        // Failures here must not undo the stop event.
        match self
            .eta
            .after_stop_completion(&route, &stop, now, driver.as_ref())
            .await
        {
            Ok(outcome) => info!(route_id, stop_id, ?outcome, "ETA recalculation finished"),
            Err(err) => error!(route_id, stop_id, error = %err, "ETA recalculation failed"),
        }

        self.live.broadcast(&RouteEvent::StopStatusChanged {
            route_id: route.id.clone(),
            stop_id: stop.id.clone(),
            status: stop.status.as_str().to_string(),
        });

        let remaining = self.open_stops(route_id).await?;
        let kind = match stop.status {
            StopStatus::Failed => WebhookEventKind::StopFailed,
            StopStatus::Skipped => WebhookEventKind::StopSkipped,
            _ => WebhookEventKind::StopCompleted,
        };
        self.notifications
            .publish(
                kind,
                &route,
                driver.as_ref(),
                Some(&stop),
                Some(remaining.as_slice()),
                serde_json::json!({}),
            )
            .await;

        let route_completed = remaining.is_empty();
        if route_completed {
            self.finish_route(route, now).await?;
        }

        Ok(StopCompletionOutcome {
            stop,
            route_completed,
        })
    }

    /// PENDING -> IN_TRANSIT, optionally refreshing the live ETA from the
    /// driver's last known position.
    pub async fn mark_stop_in_transit(
        &self,
        route_id: &str,
        stop_id: &str,
        now: DateTime<Utc>,
    ) -> DomainResult<Stop> {
        let route = self.load_route(route_id).await?;

        if route.status != RouteStatus::InProgress {
            return Err(DomainError::Conflict(format!(
                "Route {route_id} is not in progress"
            )));
        }

        let stop = self
            .repos
            .stops()
            .find_by_id(stop_id)
            .await?
            .filter(|s| s.route_id == route_id)
            .ok_or_else(|| DomainError::not_found("Stop", stop_id))?;

        let applied = self.repos.stops().set_in_transit_if_pending(stop_id).await?;
        if !applied {
            return Err(DomainError::Conflict(format!(
                "Stop {stop_id} is not pending (status {})",
                stop.status
            )));
        }

        // Optional live refresh; a provider hiccup keeps the frozen estimate.
        if let Some(driver_position) = route.driver_position() {
            if let Some(position) = self.stop_position(&stop).await? {
                match self
                    .provider
                    .travel_time(driver_position, position, Some(now))
                    .await
                {
                    Ok(travel) => {
                        let arrival = now + minutes_to_duration(travel);
                        self.repos
                            .stops()
                            .set_estimated_arrival(stop_id, arrival)
                            .await?;
                    }
                    Err(err) => {
                        warn!(stop_id, error = %err, "Live ETA refresh failed");
                    }
                }
            }
        }

        let stop = self
            .repos
            .stops()
            .find_by_id(stop_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Stop", stop_id))?;

        self.live.broadcast(&RouteEvent::StopInTransit {
            route_id: route.id.clone(),
            stop_id: stop.id.clone(),
            estimated_arrival: stop.estimated_arrival,
        });

        let driver = self.load_driver(&route).await;
        let remaining = self.open_stops(route_id).await?;
        self.notifications
            .publish(
                WebhookEventKind::StopInTransit,
                &route,
                driver.as_ref(),
                Some(&stop),
                Some(remaining.as_slice()),
                serde_json::json!({}),
            )
            .await;

        Ok(stop)
    }

    /// Driver is at the door: PENDING/IN_TRANSIT -> ARRIVED.
    pub async fn mark_stop_arrived(
        &self,
        route_id: &str,
        stop_id: &str,
        now: DateTime<Utc>,
    ) -> DomainResult<Stop> {
        let route = self.load_route(route_id).await?;

        if route.status != RouteStatus::InProgress {
            return Err(DomainError::Conflict(format!(
                "Route {route_id} is not in progress"
            )));
        }

        let applied = self.repos.stops().set_arrived_if_en_route(stop_id, now).await?;
        if !applied {
            return Err(DomainError::Conflict(format!(
                "Stop {stop_id} cannot be marked arrived"
            )));
        }

        let stop = self
            .repos
            .stops()
            .find_by_id(stop_id)
            .await?
            .filter(|s| s.route_id == route_id)
            .ok_or_else(|| DomainError::not_found("Stop", stop_id))?;

        self.live.broadcast(&RouteEvent::StopStatusChanged {
            route_id: route.id.clone(),
            stop_id: stop.id.clone(),
            status: stop.status.as_str().to_string(),
        });

        Ok(stop)
    }

    /// Live driver position: validated, written last-writer-wins, appended
    /// to tracking history, broadcast to subscribers.
    pub async fn update_location(&self, route_id: &str, fix: DriverFix) -> DomainResult<()> {
        if !Point::new(fix.lat, fix.lng).is_valid() {
            return Err(DomainError::Validation(
                "latitude/longitude out of range".into(),
            ));
        }

        let route = self.load_route(route_id).await?;
        if route.status != RouteStatus::InProgress {
            return Err(DomainError::Conflict(format!(
                "Route {route_id} is not in progress"
            )));
        }

        self.repos.routes().update_driver_location(route_id, fix).await?;
        self.repos
            .routes()
            .append_tracking_point(TrackingPoint {
                id: uuid::Uuid::new_v4().to_string(),
                route_id: route_id.to_string(),
                lat: fix.lat,
                lng: fix.lng,
                heading: fix.heading,
                speed: fix.speed,
                accuracy: fix.accuracy,
                recorded_at: fix.recorded_at,
            })
            .await?;

        self.live.broadcast(&RouteEvent::DriverLocationUpdated {
            route_id: route_id.to_string(),
            latitude: fix.lat,
            longitude: fix.lng,
            heading: fix.heading,
            speed: fix.speed,
            recorded_at: fix.recorded_at,
        });

        Ok(())
    }

    // ── Internals ───────────────────────────────────────────────

    async fn stop_position(&self, stop: &Stop) -> DomainResult<Option<Point>> {
        Ok(self
            .repos
            .addresses()
            .find_by_id(&stop.address_id)
            .await?
            .and_then(|a| a.position()))
    }

    async fn finish_route(&self, mut route: Route, now: DateTime<Utc>) -> DomainResult<Route> {
        route.status = RouteStatus::Completed;
        route.completed_at = Some(now);
        route.updated_at = now;
        self.repos.routes().update(route.clone()).await?;

        info!(route_id = %route.id, "Route completed");
        self.live.broadcast(&RouteEvent::RouteCompleted {
            route_id: route.id.clone(),
            completed_at: now,
        });

        let driver = self.load_driver(&route).await;
        self.notifications
            .publish(
                WebhookEventKind::RouteCompleted,
                &route,
                driver.as_ref(),
                None,
                None,
                serde_json::json!({}),
            )
            .await;

        Ok(route)
    }
}

fn minutes_to_duration(minutes: f64) -> Duration {
    Duration::milliseconds((minutes * 60_000.0).round() as i64)
}
