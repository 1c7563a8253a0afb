//! Database access layer
//!
//! Services talk to [`MarketStore`] and never to a pool directly. Every write
//! that touches more than one row happens inside a [`MarketTx`]; dropping a
//! transaction without calling [`MarketTx::commit`] rolls it back.

#[cfg(test)]
pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use rust_decimal::Decimal;
use shared::models::{
    Listing, ListingFilter, ListingUpdate, MarketPrice, NewListing, NewUser, Order, OrderStatus,
    OrderView, Transaction, TransactionStatus, User,
};

pub use postgres::PgStore;

/// Persistence failure
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A unique key or a reference was violated (duplicate checkout id, email,
    /// username or receipt; deleting a listing that order lines still point at)
    #[error("constraint violated: {0}")]
    Conflict(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    /// A stored value does not decode into a domain type
    #[error("corrupt row: {0}")]
    Corrupt(String),
}

/// Why a stock reservation was refused
#[derive(Debug, thiserror::Error)]
pub enum ReserveError {
    #[error("listing {0} not found")]
    NotFound(i64),
    #[error("insufficient stock for {name}: {available} available")]
    InsufficientStock {
        listing_id: i64,
        name: String,
        available: i32,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Order header plus its lines, inserted together
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub buyer_id: i64,
    pub total_price: Decimal,
    pub lines: Vec<NewOrderLine>,
}

#[derive(Debug, Clone)]
pub struct NewOrderLine {
    pub listing_id: i64,
    pub quantity: i32,
    /// Listing price captured at order time
    pub price_per_unit: Decimal,
}

/// Pending payment attempt recorded after the provider accepted it
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub order_id: i64,
    pub amount: Decimal,
    pub phone_number: String,
    pub checkout_request_id: String,
}

/// Non-transactional reads and single-row inserts
#[async_trait]
pub trait MarketStore: Send + Sync {
    /// Open an atomic unit of work
    async fn begin(&self) -> Result<Box<dyn MarketTx>, StoreError>;

    async fn find_user(&self, id: i64) -> Result<Option<User>, StoreError>;
    async fn find_user_by_phone(&self, phone: &str) -> Result<Option<User>, StoreError>;
    async fn email_taken(&self, email: &str) -> Result<bool, StoreError>;
    async fn insert_user(&self, user: &NewUser) -> Result<User, StoreError>;

    /// Available listings matching the filter, newest first
    async fn list_listings(&self, filter: &ListingFilter) -> Result<Vec<Listing>, StoreError>;
    async fn find_listing(&self, id: i64) -> Result<Option<Listing>, StoreError>;
    async fn insert_listing(&self, farmer_id: i64, listing: &NewListing) -> Result<Listing, StoreError>;

    async fn find_order(&self, id: i64) -> Result<Option<Order>, StoreError>;
    /// Order with its lines expanded to listing summaries
    async fn order_view(&self, id: i64) -> Result<Option<OrderView>, StoreError>;
    /// Buyer's orders, newest first
    async fn buyer_orders(&self, buyer_id: i64) -> Result<Vec<OrderView>, StoreError>;
    /// Orders containing at least one of the farmer's listings, newest first
    async fn farmer_orders(&self, farmer_id: i64) -> Result<Vec<OrderView>, StoreError>;

    /// Case-insensitive lookup by crop name
    async fn find_market_price(&self, crop_name: &str) -> Result<Option<MarketPrice>, StoreError>;
}

/// Row-locking operations inside one atomic unit
#[async_trait]
pub trait MarketTx: Send {
    /// Lock every listing row in `ids`, lowest id first.
    ///
    /// Writers that lock all of their rows through this before touching any
    /// of them acquire locks in one global order and cannot deadlock each
    /// other. Unknown ids are skipped.
    async fn lock_listings(&mut self, ids: &[i64]) -> Result<(), StoreError>;

    /// Lock the listing row, check stock and decrement it.
    ///
    /// Returns the listing after the decrement.
    async fn reserve(&mut self, listing_id: i64, quantity: i32) -> Result<Listing, ReserveError>;

    /// Lock one listing row for an owner edit
    async fn lock_listing(&mut self, id: i64) -> Result<Option<Listing>, StoreError>;

    /// Apply the fields present in `update`; returns the stored listing
    async fn update_listing(&mut self, id: i64, update: &ListingUpdate)
    -> Result<Listing, StoreError>;

    /// `false` if no such listing. Fails with [`StoreError::Conflict`] while
    /// order lines still reference it.
    async fn delete_listing(&mut self, id: i64) -> Result<bool, StoreError>;

    async fn insert_order(&mut self, order: &NewOrder) -> Result<Order, StoreError>;

    /// Lock the order row for update
    async fn lock_order(&mut self, id: i64) -> Result<Option<Order>, StoreError>;

    /// Whether any line of the order references one of the farmer's listings
    async fn farmer_owns_order(&mut self, order_id: i64, farmer_id: i64)
    -> Result<bool, StoreError>;

    async fn set_order_status(&mut self, id: i64, status: OrderStatus) -> Result<(), StoreError>;

    /// Delete transactions, lines and the order. `false` if no such order.
    async fn delete_order(&mut self, id: i64) -> Result<bool, StoreError>;

    /// Fails with [`StoreError::Conflict`] when the checkout id already exists
    async fn insert_transaction(&mut self, txn: &NewTransaction)
    -> Result<Transaction, StoreError>;

    /// Lock the transaction row matching a provider correlation id
    async fn lock_transaction_by_checkout(
        &mut self,
        checkout_request_id: &str,
    ) -> Result<Option<Transaction>, StoreError>;

    /// Move a transaction to a terminal status, stamping `updated_at`
    async fn finish_transaction(
        &mut self,
        id: i64,
        status: TransactionStatus,
        receipt_number: Option<&str>,
    ) -> Result<(), StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}
