//! Payment DTOs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::domain::payment::Payment;

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDto {
    pub id: String,
    pub stop_id: String,
    #[schema(value_type = String)]
    pub amount: Decimal,
    pub method: String,
    pub status: String,
    pub customer_rut: Option<String>,
    pub transaction_id: Option<String>,
    pub bank_reference: Option<String>,
    pub verified_at: Option<DateTime<Utc>>,
    pub verified_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl PaymentDto {
    pub fn from_payment(payment: &Payment) -> Self {
        Self {
            id: payment.id.clone(),
            stop_id: payment.stop_id.clone(),
            amount: payment.amount,
            method: payment.method.as_str().to_string(),
            status: payment.status.as_str().to_string(),
            customer_rut: payment.customer_rut.clone(),
            transaction_id: payment.transaction_id.clone(),
            bank_reference: payment.bank_reference.clone(),
            verified_at: payment.verified_at,
            verified_by: payment.verified_by.clone(),
            created_at: payment.created_at,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentRequest {
    #[schema(value_type = String)]
    pub amount: Decimal,
    /// CASH, CARD, TRANSFER or ONLINE
    #[validate(length(min = 1))]
    pub method: String,
    pub customer_rut: Option<String>,
    pub transaction_id: Option<String>,
    pub bank_reference: Option<String>,
}

/// Inbound payment-processor webhook body.
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentVerifiedWebhook {
    #[validate(length(min = 1))]
    pub transaction_id: String,
    /// VERIFIED or REJECTED; defaults to VERIFIED.
    pub status: Option<String>,
    pub bank_reference: Option<String>,
}
