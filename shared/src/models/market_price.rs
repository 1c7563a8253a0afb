//! Market Price Model

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Reference price for a crop, answered over SMS
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketPrice {
    pub id: i64,
    pub crop_name: String,
    pub unit: String,
    pub average_price: Decimal,
}
