//! Stop domain entity and its status machine

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::domain::payment::PaymentMethod;

/// Stop delivery status. COMPLETED, FAILED and SKIPPED are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopStatus {
    Pending,
    InTransit,
    Arrived,
    Completed,
    Failed,
    Skipped,
}

impl StopStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::InTransit => "IN_TRANSIT",
            Self::Arrived => "ARRIVED",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
            Self::Skipped => "SKIPPED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(Self::Pending),
            "IN_TRANSIT" => Some(Self::InTransit),
            "ARRIVED" => Some(Self::Arrived),
            "COMPLETED" => Some(Self::Completed),
            "FAILED" => Some(Self::Failed),
            "SKIPPED" => Some(Self::Skipped),
            _ => None,
        }
    }

    /// Terminal stops accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Skipped)
    }
}

impl std::fmt::Display for StopStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregate payment state of a stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopPaymentStatus {
    Pending,
    Partial,
    Paid,
}

impl StopPaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Partial => "PARTIAL",
            Self::Paid => "PAID",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(Self::Pending),
            "PARTIAL" => Some(Self::Partial),
            "PAID" => Some(Self::Paid),
            _ => None,
        }
    }
}

/// One visit on a route.
///
/// `sequence_order` is positive and unique within the route.
/// `original_estimated_arrival` is written exactly once, when the route
/// starts, and is never mutated afterwards: it is the reference for
/// deviation measurement and for customer-facing ETA windows.
#[derive(Debug, Clone)]
pub struct Stop {
    pub id: String,
    pub route_id: String,
    pub address_id: String,
    pub sequence_order: i32,
    pub status: StopStatus,
    /// Service time at the door, minutes.
    pub estimated_minutes: i32,
    /// 0 = no priority; higher is served earlier by the planner.
    pub priority: i32,
    pub time_window_start: Option<DateTime<Utc>>,
    pub time_window_end: Option<DateTime<Utc>>,
    pub estimated_arrival: Option<DateTime<Utc>>,
    pub original_estimated_arrival: Option<DateTime<Utc>>,
    pub travel_minutes_from_previous: Option<f64>,
    pub arrived_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub require_signature: bool,
    pub require_photo: bool,
    pub signature_url: Option<String>,
    pub photo_url: Option<String>,
    pub is_paid: bool,
    pub payment_status: StopPaymentStatus,
    pub payment_method: Option<PaymentMethod>,
    pub payment_amount: Option<Decimal>,
    pub customer_rut: Option<String>,
    pub external_order_id: Option<String>,
    pub notes: Option<String>,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Terminal event applied to a stop by the route engine.
#[derive(Debug, Clone)]
pub struct StopCompletion {
    pub status: StopStatus,
    pub completed_at: DateTime<Utc>,
    pub notes: Option<String>,
    pub failure_reason: Option<String>,
    pub signature_url: Option<String>,
    pub photo_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_statuses() {
        assert!(StopStatus::Completed.is_terminal());
        assert!(StopStatus::Failed.is_terminal());
        assert!(StopStatus::Skipped.is_terminal());
        assert!(!StopStatus::Pending.is_terminal());
        assert!(!StopStatus::InTransit.is_terminal());
        assert!(!StopStatus::Arrived.is_terminal());
    }

    #[test]
    fn status_round_trips_through_wire_form() {
        for s in [
            StopStatus::Pending,
            StopStatus::InTransit,
            StopStatus::Arrived,
            StopStatus::Completed,
            StopStatus::Failed,
            StopStatus::Skipped,
        ] {
            assert_eq!(StopStatus::from_str(s.as_str()), Some(s));
        }
    }
}
