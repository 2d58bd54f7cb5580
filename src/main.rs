//!
//! Last-mile dispatch backend: REST API + SSE for route execution.
//! Reads configuration from TOML file (~/.config/dispatch-service/config.toml).

use std::sync::Arc;

use sea_orm_migration::MigratorTrait;
use tracing::{error, info, warn};

use fleet_dispatch::application::notifications::{
    NotificationService, PushNotifier, PushSender, WebhookDispatcher,
};
use fleet_dispatch::application::optimizer::{CheapProvider, Optimizer, TravelTimeProvider};
use fleet_dispatch::application::routes::{RouteEngine, RoutePlanner};
use fleet_dispatch::application::sessions::SessionService;
use fleet_dispatch::config::AppConfig;
use fleet_dispatch::domain::user::UserRole;
use fleet_dispatch::domain::RepositoryProvider;
use fleet_dispatch::infrastructure::crypto::jwt::JwtConfig;
use fleet_dispatch::infrastructure::database::migrator::Migrator;
use fleet_dispatch::infrastructure::providers::{FcmClient, GoogleMapsProvider};
use fleet_dispatch::shared::shutdown::ShutdownCoordinator;
use fleet_dispatch::{
    create_api_router, create_live_channel, default_config_path, init_database, DatabaseConfig,
    SeaOrmRepositoryProvider,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // ── Load configuration ─────────────────────────────────────
    let config_path = std::env::var("DISPATCH_CONFIG")
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|_| default_config_path());
    let app_cfg = match AppConfig::load(&config_path) {
        Ok(cfg) => {
            tracing_subscriber::fmt()
                .with_env_filter(
                    tracing_subscriber::EnvFilter::try_from_default_env()
                        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cfg.logging.level)),
                )
                .init();
            info!("Configuration loaded from {}", config_path.display());
            cfg
        }
        Err(e) => {
            tracing_subscriber::fmt()
                .with_env_filter(tracing_subscriber::EnvFilter::new("info"))
                .init();
            error!("Failed to load config: {}. Using defaults.", e);
            AppConfig::default()
        }
    };

    info!("Starting dispatch service...");

    if let Err(e) = app_cfg.validate() {
        error!("Configuration invalid: {}", e);
        return Err(e.into());
    }

    // ── Prometheus metrics recorder (must be installed before any metrics calls) ──
    let prometheus_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus metrics recorder");
    info!("Prometheus metrics recorder installed");

    // ── Database ───────────────────────────────────────────────
    let db_config = DatabaseConfig {
        url: app_cfg.database.connection_url(),
    };
    info!("Database: {}", db_config.url);

    let db = match init_database(&db_config).await {
        Ok(db) => db,
        Err(e) => {
            error!("Failed to connect to database: {}", e);
            return Err(e.into());
        }
    };

    info!("Running database migrations...");
    if let Err(e) = Migrator::up(&db, None).await {
        error!("Failed to run migrations: {}", e);
        return Err(e.into());
    }
    info!("Migrations completed");

    let jwt_config = JwtConfig {
        access_secret: app_cfg.security.access_secret(),
        refresh_secret: app_cfg.security.refresh_secret(),
        access_token_minutes: app_cfg.security.access_token_minutes,
        refresh_token_days: app_cfg.security.refresh_token_days,
        issuer: app_cfg.security.issuer.clone(),
    };
    info!(
        "JWT configured: {} min access tokens, {} day refresh tokens",
        jwt_config.access_token_minutes, jwt_config.refresh_token_days
    );

    // Initialize repository provider
    let repos: Arc<dyn RepositoryProvider> = Arc::new(SeaOrmRepositoryProvider::new(db.clone()));

    // Create default admin user if not exists
    create_default_admin(repos.as_ref(), &app_cfg).await;

    // ── Travel time providers ──────────────────────────────────
    let cheap: Arc<dyn TravelTimeProvider> = Arc::new(CheapProvider::new(
        app_cfg.mapping.road_factor,
        app_cfg.mapping.average_speed_kmh,
    ));
    let real: Option<Arc<dyn TravelTimeProvider>> = if app_cfg.mapping.use_remote_provider() {
        let api_key = app_cfg
            .mapping
            .api_key()
            .expect("remote mapping provider requires an API key");
        info!("Mapping: remote provider enabled");
        Some(Arc::new(GoogleMapsProvider::new(api_key)))
    } else {
        info!("Mapping: cheap provider only (haversine)");
        None
    };
    // The engine follows the same family the optimizer defaults to, so the
    // deviation gate compares like with like.
    let engine_provider: Arc<dyn TravelTimeProvider> =
        real.clone().unwrap_or_else(|| Arc::clone(&cheap));
    let optimizer = Arc::new(Optimizer::new(Arc::clone(&cheap), real));

    // ── Notification fabric ────────────────────────────────────
    let push_sender: Option<Arc<dyn PushSender>> = match app_cfg.push.server_key() {
        Some(key) if app_cfg.push.enabled => {
            info!("Push notifications enabled");
            Some(Arc::new(FcmClient::new(key)))
        }
        _ => {
            info!("Push notifications disabled");
            None
        }
    };
    let push = Arc::new(PushNotifier::new(repos.clone(), push_sender));
    let dispatcher = Arc::new(WebhookDispatcher::new());
    let notifications = Arc::new(NotificationService::new(
        repos.clone(),
        dispatcher,
        push,
    ));

    // ── Core services ──────────────────────────────────────────
    let live = create_live_channel();
    let engine = Arc::new(RouteEngine::new(
        repos.clone(),
        live.clone(),
        notifications.clone(),
        engine_provider,
    ));
    let planner = Arc::new(RoutePlanner::new(repos.clone(), optimizer));
    let sessions = Arc::new(SessionService::new(repos.clone(), jwt_config.clone()));

    // Initialize shutdown coordinator
    let shutdown = ShutdownCoordinator::new(app_cfg.server.shutdown_timeout);
    let shutdown_signal = shutdown.signal();
    shutdown.start_signal_listener();

    // Create REST API router
    let api_router = create_api_router(
        repos,
        db.clone(),
        jwt_config,
        sessions,
        engine,
        planner,
        live,
        notifications,
        &app_cfg,
        prometheus_handle,
    );

    // Start REST API server with graceful shutdown
    let api_addr = format!("{}:{}", app_cfg.server.api_host, app_cfg.server.api_port);
    let listener = tokio::net::TcpListener::bind(&api_addr).await?;
    info!("REST API server listening on http://{}", api_addr);
    info!("Swagger UI available at http://{}/docs/", api_addr);

    let api_shutdown = shutdown_signal.clone();
    let api_server = axum::serve(
        listener,
        api_router.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        api_shutdown.wait().await;
        info!("REST API server received shutdown signal");
    });

    info!("Server started. Press Ctrl+C to shutdown gracefully.");

    if let Err(e) = api_server.await {
        error!("REST API server error: {}", e);
    }

    // Perform final cleanup
    info!("Performing final cleanup...");
    if let Err(e) = db.close().await {
        warn!("Error closing database connection: {}", e);
    } else {
        info!("Database connection closed");
    }

    info!("Dispatch service shutdown complete");
    Ok(())
}

/// Create default admin user if no users exist
async fn create_default_admin(repos: &dyn RepositoryProvider, app_cfg: &AppConfig) {
    use chrono::Utc;
    use fleet_dispatch::domain::user::User;
    use fleet_dispatch::infrastructure::crypto::password::hash_password;

    let users_count = match repos.users().count().await {
        Ok(count) => count,
        Err(e) => {
            error!("Failed to count users: {}", e);
            return;
        }
    };

    if users_count == 0 {
        info!("Creating default admin user...");

        let password_hash = match hash_password(&app_cfg.admin.password) {
            Ok(hash) => hash,
            Err(e) => {
                error!("Failed to hash admin password: {}", e);
                return;
            }
        };

        let now = Utc::now();
        let admin = User {
            id: uuid::Uuid::new_v4().to_string(),
            email: app_cfg.admin.email.trim().to_lowercase(),
            password_hash,
            name: Some("Administrator".to_string()),
            role: UserRole::Admin,
            is_active: true,
            phone: None,
            push_token: None,
            preferences: serde_json::json!({}),
            last_login_at: None,
            created_at: now,
            updated_at: now,
        };

        match repos.users().create(admin).await {
            Ok(()) => {
                info!("Default admin created: {}", app_cfg.admin.email);
                warn!("Please change the admin password immediately!");
            }
            Err(e) => {
                error!("Failed to create admin user: {}", e);
            }
        }
    }
}
