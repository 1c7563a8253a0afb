//! Listing Model

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Selling units a listing may use
pub const LISTING_UNITS: [&str; 4] = ["kg", "bunch", "crate", "item"];

/// A sellable unit of produce owned by a farmer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub id: i64,
    /// Owning farmer (users.id)
    pub farmer_id: i64,
    pub name: String,
    pub description: Option<String>,
    /// Selling unit, one of [`LISTING_UNITS`]
    pub unit: String,
    /// Unit price, 2 decimal places
    pub price: Decimal,
    /// Available stock, never negative
    pub quantity: i32,
    pub location: Option<String>,
    pub is_available: bool,
}

impl Listing {
    pub fn summary(&self) -> ListingSummary {
        ListingSummary {
            id: self.id,
            name: self.name.clone(),
            unit: self.unit.clone(),
        }
    }
}

/// Listing fields embedded in order line responses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingSummary {
    pub id: i64,
    pub name: String,
    pub unit: String,
}

/// Create listing payload
#[derive(Debug, Clone, Deserialize)]
pub struct NewListing {
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub quantity: i32,
    pub unit: String,
    pub location: Option<String>,
}

/// Owner edit; absent fields keep their stored value
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListingUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub quantity: Option<i32>,
    pub unit: Option<String>,
    pub location: Option<String>,
    pub is_available: Option<bool>,
}

/// Browse filter (query string)
///
/// `name` and `location` are case-insensitive substring matches, the price
/// bounds are inclusive.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListingFilter {
    pub name: Option<String>,
    pub location: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
}
