//! Order payment status.

use serde::{Deserialize, Serialize};

use super::OrderError;

/// Payment status of an order.
///
/// Confirmed orders are always written as `Paid`; `Pending` and `Failed`
/// exist for rows written by operators or other tooling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Payment not yet confirmed.
    #[default]
    Pending,

    /// Payment confirmed by the gateway.
    Paid,

    /// Payment failed.
    Failed,
}

impl OrderStatus {
    /// Returns true if payment for the order has been confirmed.
    pub fn is_paid(&self) -> bool {
        matches!(self, OrderStatus::Paid)
    }

    /// Returns the status as stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Paid => "paid",
            OrderStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "paid" => Ok(OrderStatus::Paid),
            "failed" => Ok(OrderStatus::Failed),
            other => Err(OrderError::UnknownStatus(other.to_string())),
        }
    }
}
