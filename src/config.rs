//! Application configuration
//!
//! TOML file (default `~/.config/dispatch-service/config.toml`, overridable
//! via `DISPATCH_CONFIG`) with environment-variable overrides for secrets.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::warn;

/// Secrets below this length are rejected at startup.
const MIN_SECRET_LEN: usize = 32;

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseSection,
    pub security: SecurityConfig,
    pub admin: AdminConfig,
    pub cors: CorsConfig,
    pub rate_limit: RateLimitConfig,
    pub logging: LoggingConfig,
    pub mapping: MappingConfig,
    pub push: PushConfig,
    pub payments: PaymentsConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub api_host: String,
    pub api_port: u16,
    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            api_host: "0.0.0.0".to_string(),
            api_port: 8080,
            shutdown_timeout: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseSection {
    pub url: String,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            url: "sqlite://./dispatch.db?mode=rwc".to_string(),
        }
    }
}

impl DatabaseSection {
    pub fn connection_url(&self) -> String {
        std::env::var("DATABASE_URL").unwrap_or_else(|_| self.url.clone())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    pub access_secret: String,
    pub refresh_secret: String,
    pub access_token_minutes: i64,
    pub refresh_token_days: i64,
    pub issuer: String,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            access_secret: String::new(),
            refresh_secret: String::new(),
            access_token_minutes: 60,
            refresh_token_days: 7,
            issuer: "dispatch-service".to_string(),
        }
    }
}

impl SecurityConfig {
    pub fn access_secret(&self) -> String {
        std::env::var("JWT_ACCESS_SECRET").unwrap_or_else(|_| self.access_secret.clone())
    }

    pub fn refresh_secret(&self) -> String {
        std::env::var("JWT_REFRESH_SECRET").unwrap_or_else(|_| self.refresh_secret.clone())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AdminConfig {
    pub email: String,
    pub password: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            email: "admin@example.com".to_string(),
            password: "change-me-immediately".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct CorsConfig {
    /// Empty or containing "*" allows any origin (dev mode).
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub api_requests_per_minute: u32,
    pub login_attempts_per_minute: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            api_requests_per_minute: 300,
            login_attempts_per_minute: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MappingConfig {
    /// "cheap" or "google"
    pub provider: String,
    pub api_key: String,
    pub road_factor: f64,
    pub average_speed_kmh: f64,
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            provider: "cheap".to_string(),
            api_key: String::new(),
            road_factor: crate::shared::geo::DEFAULT_ROAD_FACTOR,
            average_speed_kmh: crate::shared::geo::DEFAULT_AVERAGE_SPEED_KMH,
        }
    }
}

impl MappingConfig {
    pub fn api_key(&self) -> Option<String> {
        std::env::var("MAPS_API_KEY")
            .ok()
            .or_else(|| Some(self.api_key.clone()))
            .filter(|k| !k.is_empty())
    }

    pub fn use_remote_provider(&self) -> bool {
        self.provider.eq_ignore_ascii_case("google") && self.api_key().is_some()
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct PushConfig {
    pub enabled: bool,
    pub server_key: String,
}

impl PushConfig {
    pub fn server_key(&self) -> Option<String> {
        std::env::var("FCM_SERVER_KEY")
            .ok()
            .or_else(|| Some(self.server_key.clone()))
            .filter(|k| !k.is_empty())
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct PaymentsConfig {
    pub webhook_secret: String,
}

impl PaymentsConfig {
    pub fn webhook_secret(&self) -> Option<String> {
        std::env::var("PAYMENT_WEBHOOK_SECRET")
            .ok()
            .or_else(|| Some(self.webhook_secret.clone()))
            .filter(|s| !s.is_empty())
    }
}

/// Default config file location.
pub fn default_config_path() -> PathBuf {
    dirs_next::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("dispatch-service")
        .join("config.toml")
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self, String> {
        let raw = std::fs::read_to_string(path)
            .map_err(|err| format!("cannot read {}: {err}", path.display()))?;
        toml::from_str(&raw).map_err(|err| format!("cannot parse {}: {err}", path.display()))
    }

    /// Fail fast on unusable secrets. Called once at startup.
    pub fn validate(&self) -> Result<(), String> {
        let access = self.security.access_secret();
        let refresh = self.security.refresh_secret();
        if access.len() < MIN_SECRET_LEN {
            return Err(format!(
                "JWT access secret must be at least {MIN_SECRET_LEN} characters"
            ));
        }
        if refresh.len() < MIN_SECRET_LEN {
            return Err(format!(
                "JWT refresh secret must be at least {MIN_SECRET_LEN} characters"
            ));
        }
        if access == refresh {
            warn!("Access and refresh secrets are identical; use independent secrets");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.server.api_port, 8080);
        assert_eq!(cfg.rate_limit.login_attempts_per_minute, 10);
        assert_eq!(cfg.mapping.provider, "cheap");
        assert!(!cfg.mapping.use_remote_provider());
    }

    #[test]
    fn short_secrets_fail_validation() {
        let mut cfg = AppConfig::default();
        cfg.security.access_secret = "short".to_string();
        cfg.security.refresh_secret = "also-short".to_string();
        assert!(cfg.validate().is_err());

        cfg.security.access_secret = "a".repeat(32);
        cfg.security.refresh_secret = "b".repeat(32);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn parses_partial_toml() {
        let cfg: AppConfig = toml::from_str(
            r#"
            [server]
            api_port = 9000

            [mapping]
            provider = "google"
            api_key = "test-key"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.server.api_port, 9000);
        assert_eq!(cfg.server.api_host, "0.0.0.0");
        assert!(cfg.mapping.use_remote_provider());
    }
}
