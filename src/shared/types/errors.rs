use thiserror::Error;

/// Business-rule errors surfaced to API callers.
///
/// Each variant maps to a stable HTTP status in the interface layer:
/// Unauthenticated/TokenInvalid -> 401, Forbidden -> 403, NotFound -> 404,
/// Conflict -> 409, Validation -> 400, ProviderUnavailable -> 502,
/// Internal -> 500.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Not found: {entity} with {field}={value}")]
    NotFound {
        entity: &'static str,
        field: &'static str,
        value: String,
    },

    #[error("Validation: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    /// Refresh failed, was replayed, or the token is otherwise unusable.
    /// Deliberately carries no detail: callers must not learn whether the
    /// presented token ever existed.
    #[error("Invalid or expired token")]
    TokenInvalid,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Internal: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            field: "id",
            value: id.into(),
        }
    }

    /// Whether this error is likely transient (e.g. DB connection lost)
    /// and the operation may succeed if retried.
    pub fn is_transient(&self) -> bool {
        match self {
            DomainError::Internal(msg) => msg.starts_with("Database error:"),
            DomainError::ProviderUnavailable(_) => true,
            _ => false,
        }
    }
}

/// Result type for domain operations
pub type DomainResult<T> = Result<T, DomainError>;

#[derive(Debug, Error)]
pub enum InfraError {
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Crypto error: {0}")]
    Crypto(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Infra(#[from] InfraError),
}
