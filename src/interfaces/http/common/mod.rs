//! Common API envelope types

mod validated_json;

pub use validated_json::ValidatedJson;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::DomainError;

/// Standard response wrapper.
///
/// Every REST endpoint returns its data in this envelope:
/// `{"success": true, "data": {...}}` on success,
/// `{"success": false, "error": "..."}` on failure.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    /// `true` when the request succeeded
    pub success: bool,
    /// Payload; `null` on error
    pub data: Option<T>,
    /// Error description; `null` on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Empty response for operations without return data
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct EmptyData {}

/// Pagination query parameters
#[derive(Debug, Deserialize, ToSchema, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct PaginationQuery {
    /// Page number (1-based). Default: 1
    pub page: Option<u32>,
    /// Items per page (1-100). Default: 50
    pub limit: Option<u32>,
}

impl PaginationQuery {
    pub fn params(&self) -> crate::shared::types::pagination::PaginationParams {
        crate::shared::types::pagination::PaginationParams::new(self.page, self.limit)
    }
}

/// Paginated payload
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u32,
}

impl<T> PaginatedResponse<T> {
    pub fn from_result<U>(
        result: crate::shared::types::pagination::PaginatedResult<U>,
        map: impl FnMut(U) -> T,
    ) -> Self {
        let items = result.items.into_iter().map(map).collect();
        Self {
            items,
            total: result.total,
            page: result.page,
            limit: result.limit,
            total_pages: result.total_pages,
        }
    }
}

/// Domain error carried through handlers; renders the error envelope with
/// the stable status mapping.
#[derive(Debug)]
pub struct ApiError(pub DomainError);

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            DomainError::Unauthenticated(_) | DomainError::TokenInvalid => StatusCode::UNAUTHORIZED,
            DomainError::Forbidden(_) => StatusCode::FORBIDDEN,
            DomainError::NotFound { .. } => StatusCode::NOT_FOUND,
            DomainError::Conflict(_) => StatusCode::CONFLICT,
            DomainError::Validation(_) => StatusCode::BAD_REQUEST,
            DomainError::ProviderUnavailable(_) => StatusCode::BAD_GATEWAY,
            DomainError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = Json(ApiResponse::<EmptyData>::error(self.0.to_string()));
        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
