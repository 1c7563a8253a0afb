//! Order assembly
//!
//! Every listing the order touches is locked up front, lowest id first, and
//! held until commit. Concurrent orders against the same listing serialize
//! and can never oversell, and two orders naming the same listings in
//! different orders cannot deadlock. Lines are then checked and reserved in
//! the order given, so the first failing line is the one reported. Any
//! failure drops the transaction, which rolls back every decrement made so
//! far.

use rust_decimal::Decimal;
use serde::Deserialize;
use shared::error::{AppError, ErrorCode};
use shared::models::{Listing, OrderLineView, OrderView};
use shared::money::{MAX_MONEY, fits_money_column, line_total, to_money};
use std::collections::BTreeSet;

use crate::db::{MarketStore, NewOrder, NewOrderLine, ReserveError};
use crate::error::{ServiceError, ServiceResult};
use crate::notify::Notice;

/// One requested line: `{produce_id, quantity}`
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct LineRequest {
    pub produce_id: i64,
    pub quantity: i32,
}

/// Committed order plus the farmer notices to send
#[derive(Debug)]
pub struct PlacedOrder {
    pub order: OrderView,
    pub notices: Vec<Notice>,
}

fn validate(lines: &[LineRequest]) -> Result<(), AppError> {
    if lines.is_empty() {
        return Err(AppError::with_message(
            ErrorCode::OrderEmpty,
            "Order must contain at least one item.",
        ));
    }
    for (index, line) in lines.iter().enumerate() {
        if line.quantity <= 0 {
            return Err(AppError::with_message(
                ErrorCode::InvalidQuantity,
                "Quantity must be at least 1.",
            )
            .with_detail("index", index)
            .with_detail("produce_id", line.produce_id));
        }
    }
    Ok(())
}

fn reserve_error(e: ReserveError) -> ServiceError {
    match e {
        ReserveError::NotFound(id) => AppError::with_message(
            ErrorCode::ListingNotFound,
            format!("Produce with id {id} not found."),
        )
        .with_detail("listing_id", id)
        .into(),
        ReserveError::InsufficientStock {
            listing_id,
            name,
            available,
        } => AppError::with_message(
            ErrorCode::InsufficientStock,
            format!("Insufficient stock for {name}. Available: {available}"),
        )
        .with_detail("listing_id", listing_id)
        .with_detail("available", available)
        .into(),
        ReserveError::Store(e) => e.into(),
    }
}

/// Create an order for `buyer_id`
///
/// Notification is left to the caller: the returned notices are meant to be
/// sent after this returns, never inside the transaction.
pub async fn create_order(
    store: &dyn MarketStore,
    buyer_id: i64,
    lines: &[LineRequest],
) -> ServiceResult<PlacedOrder> {
    validate(lines)?;

    let listing_ids: Vec<i64> = lines
        .iter()
        .map(|l| l.produce_id)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let mut tx = store.begin().await?;
    tx.lock_listings(&listing_ids).await?;
    let mut total = Decimal::ZERO;
    let mut new_lines = Vec::with_capacity(lines.len());
    let mut reserved: Vec<Listing> = Vec::with_capacity(lines.len());

    for line in lines {
        let listing = tx
            .reserve(line.produce_id, line.quantity)
            .await
            .map_err(reserve_error)?;
        total += line_total(listing.price, line.quantity);
        new_lines.push(NewOrderLine {
            listing_id: listing.id,
            quantity: line.quantity,
            price_per_unit: listing.price,
        });
        reserved.push(listing);
    }

    let total = to_money(total);
    if !fits_money_column(total) {
        return Err(AppError::with_message(
            ErrorCode::OrderTotalTooLarge,
            format!("Order total {total} exceeds the maximum of {MAX_MONEY}."),
        )
        .with_detail("total_price", total.to_string())
        .into());
    }

    let order = tx
        .insert_order(&NewOrder {
            buyer_id,
            total_price: total,
            lines: new_lines,
        })
        .await?;
    tx.commit().await?;

    tracing::info!(
        order_id = order.id,
        buyer_id,
        lines = lines.len(),
        total = %order.total_price,
        "Order created"
    );

    let items = lines
        .iter()
        .zip(&reserved)
        .map(|(line, listing)| OrderLineView {
            quantity: line.quantity,
            price_per_unit: listing.price,
            produce: listing.summary(),
        })
        .collect();

    let notices = farmer_notices(store, buyer_id, &reserved).await;
    Ok(PlacedOrder {
        order: OrderView::new(order, items),
        notices,
    })
}

/// One notice per distinct farmer with a phone number on file.
///
/// Runs after commit; a failed read drops that notice and nothing else.
async fn farmer_notices(store: &dyn MarketStore, buyer_id: i64, listings: &[Listing]) -> Vec<Notice> {
    let buyer_name = match store.find_user(buyer_id).await {
        Ok(Some(buyer)) => buyer.username,
        Ok(None) => "a buyer".to_string(),
        Err(e) => {
            tracing::warn!(buyer_id, error = %e, "Could not load buyer for order notices");
            "a buyer".to_string()
        }
    };

    let farmer_ids: BTreeSet<i64> = listings.iter().map(|l| l.farmer_id).collect();
    let mut notices = Vec::with_capacity(farmer_ids.len());
    for farmer_id in farmer_ids {
        match store.find_user(farmer_id).await {
            Ok(Some(farmer)) => match farmer.phone_number {
                Some(phone) if !phone.trim().is_empty() => notices.push(Notice::new(
                    phone,
                    format!(
                        "Hello {}, you've received a new order from {buyer_name}. Log in to confirm.",
                        farmer.username
                    ),
                )),
                _ => tracing::debug!(farmer_id, "Farmer has no phone number, not notified"),
            },
            Ok(None) => tracing::warn!(farmer_id, "Listing owner not found"),
            Err(e) => tracing::warn!(farmer_id, error = %e, "Could not load farmer for order notice"),
        }
    }
    notices
}
