//! Order status state machine.

use serde::{Deserialize, Serialize};

/// The status of an order in its lifecycle.
///
/// Status transitions:
/// ```text
/// Pending ──► Paid ──► Delivered
///    │          │
///    ▼          ▼
/// Cancelled  Refunded
/// ```
///
/// `Cancelled` and `Refunded` are administrative branches; the core flow is
/// `Pending → Paid → Delivered`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Order has been created, payment not yet confirmed.
    #[default]
    Pending,

    /// Payment confirmed by a verified provider signal.
    Paid,

    /// Order has been handed to the buyer (terminal state).
    Delivered,

    /// Order was cancelled before payment (terminal state).
    Cancelled,

    /// Paid order was refunded (terminal state).
    Refunded,
}

impl OrderStatus {
    /// Returns true if the order can transition to paid in this status.
    pub fn can_pay(&self) -> bool {
        matches!(self, OrderStatus::Pending)
    }

    /// Returns true if the order can be marked delivered in this status.
    pub fn can_deliver(&self) -> bool {
        matches!(self, OrderStatus::Paid)
    }

    /// Returns true if the order can be cancelled in this status.
    pub fn can_cancel(&self) -> bool {
        matches!(self, OrderStatus::Pending)
    }

    /// Returns true if the order can be refunded in this status.
    pub fn can_refund(&self) -> bool {
        matches!(self, OrderStatus::Paid)
    }

    /// Returns true if this is a terminal status (no further transitions possible).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Delivered | OrderStatus::Cancelled | OrderStatus::Refunded
        )
    }

    /// Returns the status name as stored and served.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Paid => "paid",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Refunded => "refunded",
        }
    }

    /// Parses a stored status name.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(OrderStatus::Pending),
            "paid" => Some(OrderStatus::Paid),
            "delivered" => Some(OrderStatus::Delivered),
            "cancelled" => Some(OrderStatus::Cancelled),
            "refunded" => Some(OrderStatus::Refunded),
            _ => None,
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
