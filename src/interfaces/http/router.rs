//! API router with Swagger UI

use std::sync::Arc;
use std::time::Instant;

use axum::{
    middleware,
    routing::{get, patch, post, put},
    Router,
};
use sea_orm::DatabaseConnection;
use tower_governor::governor::GovernorConfigBuilder;
use tower_governor::GovernorLayer;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;
use metrics_exporter_prometheus::PrometheusHandle;

use crate::application::events::SharedLiveChannel;
use crate::application::notifications::NotificationService;
use crate::application::routes::{RouteEngine, RoutePlanner};
use crate::application::sessions::SessionService;
use crate::config::AppConfig;
use crate::domain::RepositoryProvider;
use crate::infrastructure::crypto::jwt::JwtConfig;
use crate::interfaces::http::common::*;
use crate::interfaces::http::middleware::{auth_middleware, AuthState};

use super::modules::{
    addresses, auth, depots, events, health, metrics, payments, routes, settings, users,
};

/// Security scheme modifier for OpenAPI
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("JWT Bearer token"))
                        .build(),
                ),
            );
        }
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        // Health
        health::health_check,
        // Auth
        auth::login,
        auth::refresh,
        auth::logout,
        auth::get_current_user,
        // Users
        users::list_users,
        users::list_drivers,
        users::get_user,
        users::create_user,
        users::update_user,
        users::delete_user,
        users::set_push_token,
        // Depots
        depots::list_depots,
        depots::get_depot,
        depots::create_depot,
        depots::update_depot,
        depots::delete_depot,
        // Addresses
        addresses::list_addresses,
        addresses::get_address,
        addresses::create_address,
        addresses::update_address,
        addresses::delete_address,
        // Routes
        routes::list_routes,
        routes::create_route,
        routes::get_route,
        routes::update_route,
        routes::delete_route,
        routes::import_route,
        routes::optimize_route,
        routes::send_route,
        routes::unsend_route,
        routes::load_route,
        routes::start_route,
        routes::pause_route,
        routes::resume_route,
        routes::complete_route,
        routes::cancel_route,
        routes::update_location,
        routes::list_tracking_points,
        routes::resend_notifications,
        // Stops
        routes::list_stops,
        routes::add_stop,
        routes::update_stop,
        routes::delete_stop,
        routes::reorder_stops,
        routes::mark_stop_in_transit,
        routes::mark_stop_arrived,
        routes::complete_stop,
        // Live
        events::route_events,
        // Payments
        payments::list_stop_payments,
        payments::create_stop_payment,
        payments::payment_verified_webhook,
        // Settings
        settings::get_setting,
        settings::put_setting,
        settings::test_webhook,
    ),
    components(
        schemas(
            // Common
            ApiResponse<String>,
            PaginationQuery,
            PaginatedResponse<users::UserDto>,
            PaginatedResponse<addresses::AddressDto>,
            PaginatedResponse<routes::RouteDto>,
            // Health
            health::HealthResponse,
            health::ComponentHealth,
            // Auth
            auth::LoginRequest,
            auth::LoginResponse,
            auth::RefreshRequest,
            auth::RefreshResponse,
            auth::LogoutRequest,
            auth::LogoutResponse,
            auth::UserInfo,
            // Users
            users::UserDto,
            users::CreateUserRequest,
            users::UpdateUserRequest,
            users::PushTokenRequest,
            // Depots
            depots::DepotDto,
            depots::CreateDepotRequest,
            depots::UpdateDepotRequest,
            // Addresses
            addresses::AddressDto,
            addresses::CreateAddressRequest,
            addresses::UpdateAddressRequest,
            // Routes
            routes::RouteDto,
            routes::RouteDetailDto,
            routes::StopDto,
            routes::CreateRouteRequest,
            routes::UpdateRouteRequest,
            routes::DeleteRouteRequest,
            routes::AddStopRequest,
            routes::UpdateStopRequest,
            routes::ReorderStopsRequest,
            routes::OptimizeRouteRequestDto,
            routes::OptimizeRouteResponseDto,
            routes::LocationUpdateRequest,
            routes::CompleteStopRequestDto,
            routes::StopCompletionResponseDto,
            routes::ResendNotificationsResponseDto,
            routes::TrackingPointDto,
            routes::ImportRouteRequest,
            routes::ImportStopDto,
            routes::ImportAddressDto,
            // Payments
            payments::PaymentDto,
            payments::CreatePaymentRequest,
            payments::PaymentVerifiedWebhook,
            // Settings
            settings::WebhookTestResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Server health check endpoints"),
        (name = "Authentication", description = "Login (JWT), single-use refresh rotation, logout"),
        (name = "Users", description = "User management and driver device tokens"),
        (name = "Depots", description = "Depot management"),
        (name = "Addresses", description = "Delivery address management"),
        (name = "Routes", description = "Route composition, optimization and lifecycle"),
        (name = "Stops", description = "Stop management and terminal stop events"),
        (name = "Live", description = "Server-sent events for dashboards"),
        (name = "Payments", description = "Stop payments and processor webhooks"),
        (name = "Settings", description = "Webhook, notification and delivery settings"),
    ),
    info(
        title = "Dispatch Service API",
        version = "1.0.0",
        description = "REST API for last-mile delivery dispatch: route planning, live execution and notifications",
        license(name = "MIT")
    )
)]
pub struct ApiDoc;

/// Create the API router with all routes
#[allow(clippy::too_many_arguments)]
pub fn create_api_router(
    repos: Arc<dyn RepositoryProvider>,
    db: DatabaseConnection,
    jwt_config: JwtConfig,
    sessions: Arc<SessionService>,
    engine: Arc<RouteEngine>,
    planner: Arc<RoutePlanner>,
    live: SharedLiveChannel,
    notifications: Arc<NotificationService>,
    app_cfg: &AppConfig,
    prometheus_handle: PrometheusHandle,
) -> Router {
    let middleware_state = AuthState {
        jwt_config: jwt_config.clone(),
    };

    // CORS configuration
    let cors = build_cors_layer(&app_cfg.cors);

    // Rate limiting configuration
    let api_rpm = app_cfg.rate_limit.api_requests_per_minute.max(1);
    let api_replenish = (60.0 / api_rpm as f64) as u64;
    let api_governor_conf = GovernorConfigBuilder::default()
        .per_second(api_replenish.max(1))
        .burst_size(api_rpm)
        .use_headers()
        .finish()
        .expect("Failed to build API rate limiter config");
    info!("Rate limit (API): {} req/min per IP", api_rpm);

    let login_rpm = app_cfg.rate_limit.login_attempts_per_minute.max(1);
    let login_replenish = (60.0 / login_rpm as f64) as u64;
    let login_governor_conf = GovernorConfigBuilder::default()
        .per_second(login_replenish.max(1))
        .burst_size(login_rpm)
        .use_headers()
        .finish()
        .expect("Failed to build login rate limiter config");
    info!("Rate limit (login): {} req/min per IP", login_rpm);

    // ── Auth ────────────────────────────────────────────────────
    let auth_state = auth::AuthModuleState {
        sessions,
        repos: repos.clone(),
    };

    // Public auth routes - stricter rate limit on credential endpoints.
    let auth_public_routes = Router::new()
        .route("/login", post(auth::login))
        .route("/refresh", post(auth::refresh))
        .layer(GovernorLayer::new(login_governor_conf))
        .with_state(auth_state.clone());

    let auth_protected_routes = Router::new()
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::get_current_user))
        .layer(middleware::from_fn_with_state(
            middleware_state.clone(),
            auth_middleware,
        ))
        .with_state(auth_state);

    // ── Users ───────────────────────────────────────────────────
    let user_state = users::UserModuleState {
        repos: repos.clone(),
    };
    let user_routes = Router::new()
        .route("/", get(users::list_users).post(users::create_user))
        .route("/drivers", get(users::list_drivers))
        .route("/me/push-token", put(users::set_push_token))
        .route(
            "/{id}",
            get(users::get_user)
                .patch(users::update_user)
                .delete(users::delete_user),
        )
        .layer(middleware::from_fn_with_state(
            middleware_state.clone(),
            auth_middleware,
        ))
        .with_state(user_state);

    // ── Depots ──────────────────────────────────────────────────
    let depot_state = depots::DepotModuleState {
        repos: repos.clone(),
    };
    let depot_routes = Router::new()
        .route("/", get(depots::list_depots).post(depots::create_depot))
        .route(
            "/{id}",
            get(depots::get_depot)
                .patch(depots::update_depot)
                .delete(depots::delete_depot),
        )
        .layer(middleware::from_fn_with_state(
            middleware_state.clone(),
            auth_middleware,
        ))
        .with_state(depot_state);

    // ── Addresses ───────────────────────────────────────────────
    let address_state = addresses::AddressModuleState {
        repos: repos.clone(),
    };
    let address_routes = Router::new()
        .route(
            "/",
            get(addresses::list_addresses).post(addresses::create_address),
        )
        .route(
            "/{id}",
            get(addresses::get_address)
                .patch(addresses::update_address)
                .delete(addresses::delete_address),
        )
        .layer(middleware::from_fn_with_state(
            middleware_state.clone(),
            auth_middleware,
        ))
        .with_state(address_state);

    // ── Routes & stops ──────────────────────────────────────────
    let route_state = routes::RouteModuleState {
        repos: repos.clone(),
        engine,
        planner,
        notifications: notifications.clone(),
    };
    let route_routes = Router::new()
        .route("/", get(routes::list_routes).post(routes::create_route))
        .route("/import", post(routes::import_route))
        .route(
            "/{id}",
            get(routes::get_route)
                .patch(routes::update_route)
                .delete(routes::delete_route),
        )
        .route(
            "/{id}/stops",
            get(routes::list_stops).post(routes::add_stop),
        )
        .route("/{id}/stops/reorder", post(routes::reorder_stops))
        .route(
            "/{id}/stops/{stop_id}",
            patch(routes::update_stop).delete(routes::delete_stop),
        )
        .route(
            "/{id}/stops/{stop_id}/in-transit",
            post(routes::mark_stop_in_transit),
        )
        .route(
            "/{id}/stops/{stop_id}/arrived",
            post(routes::mark_stop_arrived),
        )
        .route(
            "/{id}/stops/{stop_id}/complete",
            post(routes::complete_stop),
        )
        .route("/{id}/optimize", post(routes::optimize_route))
        .route("/{id}/send", post(routes::send_route))
        .route("/{id}/unsend", post(routes::unsend_route))
        .route("/{id}/load", post(routes::load_route))
        .route("/{id}/start", post(routes::start_route))
        .route("/{id}/pause", post(routes::pause_route))
        .route("/{id}/resume", post(routes::resume_route))
        .route("/{id}/complete", post(routes::complete_route))
        .route("/{id}/cancel", post(routes::cancel_route))
        .route("/{id}/location", post(routes::update_location))
        .route("/{id}/tracking", get(routes::list_tracking_points))
        .route(
            "/{id}/resend-notifications",
            post(routes::resend_notifications),
        )
        .layer(middleware::from_fn_with_state(
            middleware_state.clone(),
            auth_middleware,
        ))
        .with_state(route_state);

    // SSE stream: token auth rides the query string, so this router sits
    // outside the bearer middleware.
    let events_state = events::EventsModuleState {
        repos: repos.clone(),
        live,
        jwt_config,
    };
    let event_routes = Router::new()
        .route("/{id}/events", get(events::route_events))
        .with_state(events_state);

    // ── Payments ────────────────────────────────────────────────
    let payment_state = payments::PaymentModuleState {
        repos: repos.clone(),
        payment_webhook_secret: app_cfg.payments.webhook_secret(),
    };
    let stop_payment_routes = Router::new()
        .route(
            "/{stop_id}/payments",
            get(payments::list_stop_payments).post(payments::create_stop_payment),
        )
        .layer(middleware::from_fn_with_state(
            middleware_state.clone(),
            auth_middleware,
        ))
        .with_state(payment_state.clone());

    // Inbound processor webhook authenticates via X-Webhook-Secret.
    let payment_webhook_routes = Router::new()
        .route("/webhooks/verified", post(payments::payment_verified_webhook))
        .with_state(payment_state);

    // ── Settings ────────────────────────────────────────────────
    let settings_state = settings::SettingsModuleState {
        repos,
        notifications,
    };
    let settings_routes = Router::new()
        .route("/webhook/test", post(settings::test_webhook))
        .route(
            "/{key}",
            get(settings::get_setting).put(settings::put_setting),
        )
        .layer(middleware::from_fn_with_state(
            middleware_state,
            auth_middleware,
        ))
        .with_state(settings_state);

    // ── Health & metrics ────────────────────────────────────────
    let health_state = health::HealthState {
        db,
        started_at: Arc::new(Instant::now()),
    };
    let health_routes = Router::new()
        .route("/health", get(health::health_check))
        .with_state(health_state);

    let metrics_state = metrics::MetricsState {
        handle: prometheus_handle,
    };
    let metrics_routes = Router::new()
        .route("/metrics", get(metrics::prometheus_metrics))
        .with_state(metrics_state);

    let swagger_routes = SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi());

    // Build router
    Router::new()
        .merge(swagger_routes)
        .merge(health_routes)
        .merge(metrics_routes)
        .nest("/api/v1/auth", auth_public_routes)
        .nest("/api/v1/auth", auth_protected_routes)
        .nest("/api/v1/users", user_routes)
        .nest("/api/v1/depots", depot_routes)
        .nest("/api/v1/addresses", address_routes)
        .nest("/api/v1/routes", route_routes)
        .nest("/api/v1/routes", event_routes)
        .nest("/api/v1/stops", stop_payment_routes)
        .nest("/api/v1/payments", payment_webhook_routes)
        .nest("/api/v1/settings", settings_routes)
        .layer(GovernorLayer::new(api_governor_conf))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn(metrics::http_metrics_middleware))
}

/// Build the CORS layer from application configuration.
///
/// - If `allowed_origins` is empty or contains `"*"` -> allow any origin (dev mode).
/// - Otherwise -> restrict to the explicit list of origins.
fn build_cors_layer(cors_cfg: &crate::config::CorsConfig) -> CorsLayer {
    let is_any = cors_cfg.allowed_origins.is_empty()
        || cors_cfg.allowed_origins.iter().any(|o| o.trim() == "*");

    if is_any {
        info!("CORS: allowing ANY origin (dev mode). Set [cors].allowed_origins for production.");
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<axum::http::HeaderValue> = cors_cfg
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        info!("CORS: allowed origins: {:?}", cors_cfg.allowed_origins);
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
