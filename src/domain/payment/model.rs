//! Payment domain entity

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// How the customer paid (or intends to pay) at the door.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentMethod {
    Cash,
    Card,
    Transfer,
    Online,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cash => "CASH",
            Self::Card => "CARD",
            Self::Transfer => "TRANSFER",
            Self::Online => "ONLINE",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "CASH" => Some(Self::Cash),
            "CARD" => Some(Self::Card),
            "TRANSFER" => Some(Self::Transfer),
            "ONLINE" => Some(Self::Online),
            _ => None,
        }
    }
}

/// Back-office verification state of a recorded payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentVerification {
    Pending,
    Verified,
    Rejected,
}

impl PaymentVerification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Verified => "VERIFIED",
            Self::Rejected => "REJECTED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(Self::Pending),
            "VERIFIED" => Some(Self::Verified),
            "REJECTED" => Some(Self::Rejected),
            _ => None,
        }
    }
}

/// A payment recorded against a stop.
#[derive(Debug, Clone)]
pub struct Payment {
    pub id: String,
    pub stop_id: String,
    pub amount: Decimal,
    pub method: PaymentMethod,
    pub status: PaymentVerification,
    pub customer_rut: Option<String>,
    pub transaction_id: Option<String>,
    pub bank_reference: Option<String>,
    pub verified_at: Option<DateTime<Utc>>,
    pub verified_by: Option<String>,
    pub created_at: DateTime<Utc>,
}
