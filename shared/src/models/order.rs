//! Order Model
//!
//! An order is created atomically with its lines and afterwards only its
//! status moves. Line prices are captured at order time.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::listing::ListingSummary;

/// Order lifecycle status
///
/// ```text
/// Pending ──pay──▶ Pending Payment ──callback ok──▶ Confirmed ──▶ Delivered
///    ▲                   │
///    └──callback failed──┘
/// ```
///
/// Farmers may also confirm or cancel directly. `Canceled` and `Delivered`
/// are final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    Pending,
    #[serde(rename = "Pending Payment")]
    PendingPayment,
    Confirmed,
    Delivered,
    Canceled,
}

impl OrderStatus {
    /// Parse from database string value
    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "Pending" => Some(Self::Pending),
            "Pending Payment" => Some(Self::PendingPayment),
            "Confirmed" => Some(Self::Confirmed),
            "Delivered" => Some(Self::Delivered),
            "Canceled" => Some(Self::Canceled),
            _ => None,
        }
    }

    /// Database string representation
    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::PendingPayment => "Pending Payment",
            Self::Confirmed => "Confirmed",
            Self::Delivered => "Delivered",
            Self::Canceled => "Canceled",
        }
    }

    /// Can a payment be initiated for an order in this status?
    pub fn is_payable(&self) -> bool {
        matches!(self, Self::Pending | Self::PendingPayment)
    }

    /// No further status change is permitted
    pub fn is_final(&self) -> bool {
        matches!(self, Self::Delivered | Self::Canceled)
    }

    /// Transitions a farmer may apply by hand
    pub fn can_farmer_set(&self, target: OrderStatus) -> bool {
        match (self, target) {
            (from, _) if from.is_final() => false,
            (Self::Pending | Self::PendingPayment, Self::Confirmed | Self::Canceled) => true,
            (Self::Confirmed, Self::Delivered | Self::Canceled) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_db())
    }
}

/// Order header
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub buyer_id: i64,
    pub status: OrderStatus,
    /// Sum of line totals, 2 decimal places
    pub total_price: Decimal,
    pub created_at: DateTime<Utc>,
}

/// One listing + quantity + price-at-purchase entry of an order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    pub id: i64,
    pub order_id: i64,
    pub listing_id: i64,
    pub quantity: i32,
    pub price_per_unit: Decimal,
}

/// Line as returned to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLineView {
    pub quantity: i32,
    pub price_per_unit: Decimal,
    pub produce: ListingSummary,
}

/// Order with expanded lines, the response shape of every order endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderView {
    pub id: i64,
    pub buyer_id: i64,
    pub status: OrderStatus,
    pub total_price: Decimal,
    pub created_at: DateTime<Utc>,
    pub order_items: Vec<OrderLineView>,
}

impl OrderView {
    pub fn new(order: Order, order_items: Vec<OrderLineView>) -> Self {
        Self {
            id: order.id,
            buyer_id: order.buyer_id,
            status: order.status,
            total_price: order.total_price,
            created_at: order.created_at,
            order_items,
        }
    }
}
