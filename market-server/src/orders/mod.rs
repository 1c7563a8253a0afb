//! Orders
//!
//! - [`assembler`]: reserve stock and create an order with its lines atomically
//! - [`status`]: farmer status changes and the admin aggregate delete

pub mod assembler;
pub mod status;

use shared::models::OrderView;

use crate::db::MarketStore;
use crate::error::ServiceResult;

pub use assembler::{LineRequest, PlacedOrder, create_order};
pub use status::{delete_order, update_status};

/// Buyer's own orders, newest first
pub async fn buyer_orders(store: &dyn MarketStore, buyer_id: i64) -> ServiceResult<Vec<OrderView>> {
    Ok(store.buyer_orders(buyer_id).await?)
}

/// Orders that include at least one of the farmer's listings, newest first
pub async fn farmer_orders(
    store: &dyn MarketStore,
    farmer_id: i64,
) -> ServiceResult<Vec<OrderView>> {
    Ok(store.farmer_orders(farmer_id).await?)
}
