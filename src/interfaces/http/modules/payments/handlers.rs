//! Payment handlers: stop payments and the inbound processor webhook

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::{Extension, Json};
use chrono::Utc;
use uuid::Uuid;

use super::dto::{CreatePaymentRequest, PaymentDto, PaymentVerifiedWebhook};
use crate::domain::payment::{Payment, PaymentMethod, PaymentVerification};
use crate::domain::stop::StopPaymentStatus;
use crate::domain::{DomainError, RepositoryProvider};
use crate::interfaces::http::common::{ApiResponse, ApiResult, ValidatedJson};
use crate::interfaces::http::middleware::AuthenticatedUser;

#[derive(Clone)]
pub struct PaymentModuleState {
    pub repos: Arc<dyn RepositoryProvider>,
    /// Shared secret expected in `X-Webhook-Secret` on inbound events.
    pub payment_webhook_secret: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/v1/stops/{stop_id}/payments",
    tag = "Payments",
    security(("bearer_auth" = [])),
    params(("stop_id" = String, Path, description = "Stop id")),
    responses((status = 200, description = "Payments for the stop", body = ApiResponse<Vec<PaymentDto>>))
)]
pub async fn list_stop_payments(
    State(state): State<PaymentModuleState>,
    Extension(_user): Extension<AuthenticatedUser>,
    Path(stop_id): Path<String>,
) -> ApiResult<Json<ApiResponse<Vec<PaymentDto>>>> {
    state
        .repos
        .stops()
        .find_by_id(&stop_id)
        .await?
        .ok_or_else(|| DomainError::not_found("Stop", stop_id.as_str()))?;

    let payments = state.repos.payments().list_by_stop(&stop_id).await?;
    Ok(Json(ApiResponse::success(
        payments.iter().map(PaymentDto::from_payment).collect(),
    )))
}

#[utoipa::path(
    post,
    path = "/api/v1/stops/{stop_id}/payments",
    tag = "Payments",
    security(("bearer_auth" = [])),
    params(("stop_id" = String, Path, description = "Stop id")),
    request_body = CreatePaymentRequest,
    responses((status = 201, description = "Payment recorded", body = ApiResponse<PaymentDto>))
)]
pub async fn create_stop_payment(
    State(state): State<PaymentModuleState>,
    Extension(_user): Extension<AuthenticatedUser>,
    Path(stop_id): Path<String>,
    ValidatedJson(request): ValidatedJson<CreatePaymentRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<PaymentDto>>)> {
    let stop = state
        .repos
        .stops()
        .find_by_id(&stop_id)
        .await?
        .ok_or_else(|| DomainError::not_found("Stop", stop_id.as_str()))?;

    let method = PaymentMethod::from_str(&request.method).ok_or_else(|| {
        DomainError::Validation(format!("Unknown payment method: {}", request.method))
    })?;

    let payment = Payment {
        id: Uuid::new_v4().to_string(),
        stop_id: stop.id.clone(),
        amount: request.amount,
        method,
        status: PaymentVerification::Pending,
        customer_rut: request.customer_rut.or(stop.customer_rut.clone()),
        transaction_id: request.transaction_id,
        bank_reference: request.bank_reference,
        verified_at: None,
        verified_by: None,
        created_at: Utc::now(),
    };
    state.repos.payments().create(payment.clone()).await?;

    // A freshly recorded payment marks the stop at least partially paid.
    let covered = match (stop.payment_amount, Some(payment.amount)) {
        (Some(expected), Some(received)) => received >= expected,
        _ => true,
    };
    state
        .repos
        .stops()
        .set_payment_state(
            &stop.id,
            covered,
            if covered {
                StopPaymentStatus::Paid
            } else {
                StopPaymentStatus::Partial
            },
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(PaymentDto::from_payment(&payment))),
    ))
}

#[utoipa::path(
    post,
    path = "/api/v1/payments/webhooks/verified",
    tag = "Payments",
    request_body = PaymentVerifiedWebhook,
    responses(
        (status = 200, description = "Payment verification applied", body = ApiResponse<PaymentDto>),
        (status = 401, description = "Bad or missing X-Webhook-Secret"),
        (status = 404, description = "Unknown transaction"),
        (status = 409, description = "Payment already verified")
    )
)]
pub async fn payment_verified_webhook(
    State(state): State<PaymentModuleState>,
    headers: HeaderMap,
    ValidatedJson(request): ValidatedJson<PaymentVerifiedWebhook>,
) -> ApiResult<Json<ApiResponse<PaymentDto>>> {
    let Some(expected) = state.payment_webhook_secret.as_deref() else {
        return Err(
            DomainError::Unauthenticated("Payment webhook is not configured".into()).into(),
        );
    };
    let presented = headers
        .get("X-Webhook-Secret")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if presented != expected {
        return Err(DomainError::Unauthenticated("Invalid webhook secret".into()).into());
    }

    let payment = state
        .repos
        .payments()
        .find_by_transaction_id(&request.transaction_id)
        .await?
        .ok_or_else(|| DomainError::not_found("Payment", request.transaction_id.as_str()))?;

    let status = match request.status.as_deref() {
        None | Some("VERIFIED") => PaymentVerification::Verified,
        Some("REJECTED") => PaymentVerification::Rejected,
        Some(other) => {
            return Err(
                DomainError::Validation(format!("Unknown payment status: {other}")).into(),
            )
        }
    };

    let applied = state
        .repos
        .payments()
        .set_verification_if_pending(&payment.id, status, None, Utc::now())
        .await?;
    if !applied {
        return Err(DomainError::Conflict("Payment already verified".into()).into());
    }

    if status == PaymentVerification::Verified {
        state
            .repos
            .stops()
            .set_payment_state(&payment.stop_id, true, StopPaymentStatus::Paid)
            .await?;
    }

    let refreshed = state
        .repos
        .payments()
        .find_by_id(&payment.id)
        .await?
        .ok_or_else(|| DomainError::not_found("Payment", payment.id.as_str()))?;

    Ok(Json(ApiResponse::success(PaymentDto::from_payment(
        &refreshed,
    ))))
}
