//! Produce listings: farmer-owned stock and prices
//!
//! Owners create, edit and remove their own listings. Any signed-in user can
//! browse the available ones. Stock is otherwise only ever reduced by order
//! placement.

use rust_decimal::Decimal;
use shared::error::{AppError, ErrorCode};
use shared::models::{LISTING_UNITS, Listing, ListingFilter, ListingUpdate, NewListing};
use shared::money::{MAX_MONEY, to_money};

use crate::db::{MarketStore, MarketTx, StoreError};
use crate::error::ServiceResult;

fn invalid(field: &str, message: impl Into<String>) -> AppError {
    AppError::validation(message).with_detail("field", field)
}

fn check_name(name: &str) -> Result<String, AppError> {
    let name = name.trim();
    let len = name.chars().count();
    if !(3..=100).contains(&len) {
        return Err(invalid("name", "Name must be between 3 and 100 characters."));
    }
    Ok(name.to_string())
}

fn check_price(price: Decimal) -> Result<Decimal, AppError> {
    let price = to_money(price);
    if price <= Decimal::ZERO || price > MAX_MONEY {
        return Err(invalid(
            "price",
            format!("Price must be greater than 0 and at most {MAX_MONEY}."),
        ));
    }
    Ok(price)
}

fn check_quantity(quantity: i32) -> Result<i32, AppError> {
    if quantity < 0 {
        return Err(invalid("quantity", "Quantity cannot be negative."));
    }
    Ok(quantity)
}

fn check_unit(unit: &str) -> Result<String, AppError> {
    let unit = unit.trim();
    if !LISTING_UNITS.contains(&unit) {
        return Err(invalid(
            "unit",
            format!("Unit must be one of: {}.", LISTING_UNITS.join(", ")),
        ));
    }
    Ok(unit.to_string())
}

fn check_location(location: Option<&str>) -> Result<Option<String>, AppError> {
    match location.map(str::trim).filter(|l| !l.is_empty()) {
        Some(l) if l.chars().count() > 100 => {
            Err(invalid("location", "Location must be at most 100 characters."))
        }
        other => Ok(other.map(str::to_string)),
    }
}

fn not_found(listing_id: i64) -> AppError {
    AppError::with_message(
        ErrorCode::ListingNotFound,
        format!("Produce with id {listing_id} not found."),
    )
    .with_detail("listing_id", listing_id)
}

/// Lock the listing and make sure `farmer_id` owns it
async fn owned(tx: &mut dyn MarketTx, farmer_id: i64, listing_id: i64) -> ServiceResult<Listing> {
    let listing = tx
        .lock_listing(listing_id)
        .await?
        .ok_or_else(|| not_found(listing_id))?;
    if listing.farmer_id != farmer_id {
        tracing::debug!(listing_id, farmer_id, owner = listing.farmer_id, "Listing owner mismatch");
        return Err(AppError::new(ErrorCode::ListingNotOwned).into());
    }
    Ok(listing)
}

/// Available listings, newest first
pub async fn browse(store: &dyn MarketStore, filter: &ListingFilter) -> ServiceResult<Vec<Listing>> {
    Ok(store.list_listings(filter).await?)
}

pub async fn create_listing(
    store: &dyn MarketStore,
    farmer_id: i64,
    new: &NewListing,
) -> ServiceResult<Listing> {
    let new = NewListing {
        name: check_name(&new.name)?,
        description: new.description.clone(),
        price: check_price(new.price)?,
        quantity: check_quantity(new.quantity)?,
        unit: check_unit(&new.unit)?,
        location: check_location(new.location.as_deref())?,
    };

    let listing = store.insert_listing(farmer_id, &new).await?;
    tracing::info!(
        listing_id = listing.id,
        farmer_id,
        price = %listing.price,
        quantity = listing.quantity,
        "Listing created"
    );
    Ok(listing)
}

/// Owner edit. Price changes never touch prices already captured on order lines.
pub async fn update_listing(
    store: &dyn MarketStore,
    farmer_id: i64,
    listing_id: i64,
    update: &ListingUpdate,
) -> ServiceResult<Listing> {
    let update = ListingUpdate {
        name: update.name.as_deref().map(check_name).transpose()?,
        description: update.description.clone(),
        price: update.price.map(check_price).transpose()?,
        quantity: update.quantity.map(check_quantity).transpose()?,
        unit: update.unit.as_deref().map(check_unit).transpose()?,
        location: check_location(update.location.as_deref())?,
        is_available: update.is_available,
    };

    let mut tx = store.begin().await?;
    let before = owned(tx.as_mut(), farmer_id, listing_id).await?;
    let listing = tx.update_listing(listing_id, &update).await?;
    tx.commit().await?;

    tracing::info!(
        listing_id,
        farmer_id,
        old_price = %before.price,
        price = %listing.price,
        quantity = listing.quantity,
        is_available = listing.is_available,
        "Listing updated"
    );
    Ok(listing)
}

/// Remove a listing no order refers to
pub async fn delete_listing(
    store: &dyn MarketStore,
    farmer_id: i64,
    listing_id: i64,
) -> ServiceResult<()> {
    let mut tx = store.begin().await?;
    owned(tx.as_mut(), farmer_id, listing_id).await?;
    match tx.delete_listing(listing_id).await {
        Ok(true) => {}
        Ok(false) => return Err(not_found(listing_id).into()),
        Err(StoreError::Conflict(_)) => {
            return Err(AppError::with_message(
                ErrorCode::ListingInUse,
                "Produce has been ordered and cannot be deleted. Mark it unavailable instead.",
            )
            .with_detail("listing_id", listing_id)
            .into());
        }
        Err(e) => return Err(e.into()),
    }
    tx.commit().await?;

    tracing::info!(listing_id, farmer_id, "Listing deleted");
    Ok(())
}
