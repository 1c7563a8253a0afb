//! In-memory store for service and router tests
//!
//! A transaction holds the store lock for its whole lifetime and works on a
//! copy of the state. `commit` writes the copy back; dropping discards it.
//! That gives the same serialization and rollback behavior the row locks give
//! on PostgreSQL.

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use shared::models::{
    Listing, ListingFilter, ListingUpdate, MarketPrice, NewListing, NewUser, Order, OrderLine,
    OrderLineView, OrderStatus, OrderView, Transaction, TransactionStatus, User, UserRole,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{MarketStore, MarketTx, NewOrder, NewTransaction, ReserveError, StoreError};

#[derive(Debug, Clone, Default)]
pub struct MemoryState {
    pub users: BTreeMap<i64, User>,
    pub listings: BTreeMap<i64, Listing>,
    pub orders: BTreeMap<i64, Order>,
    pub lines: Vec<OrderLine>,
    pub transactions: BTreeMap<i64, Transaction>,
    pub market_prices: Vec<MarketPrice>,
    next_id: i64,
}

impl MemoryState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn view(&self, order: &Order) -> OrderView {
        let items = self
            .lines
            .iter()
            .filter(|l| l.order_id == order.id)
            .filter_map(|l| {
                self.listings.get(&l.listing_id).map(|listing| OrderLineView {
                    quantity: l.quantity,
                    price_per_unit: l.price_per_unit,
                    produce: listing.summary(),
                })
            })
            .collect();
        OrderView::new(order.clone(), items)
    }

    fn newest_first(&self, mut orders: Vec<&Order>) -> Vec<OrderView> {
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        orders.into_iter().map(|o| self.view(o)).collect()
    }

    fn farmer_has_line(&self, order_id: i64, farmer_id: i64) -> bool {
        self.lines.iter().any(|l| {
            l.order_id == order_id
                && self
                    .listings
                    .get(&l.listing_id)
                    .is_some_and(|p| p.farmer_id == farmer_id)
        })
    }

    fn insert_listing(&mut self, farmer_id: i64, new: &NewListing) -> Listing {
        let listing = Listing {
            id: self.next_id(),
            farmer_id,
            name: new.name.clone(),
            description: new.description.clone(),
            unit: new.unit.clone(),
            price: new.price,
            quantity: new.quantity,
            location: new.location.clone(),
            is_available: true,
        };
        self.listings.insert(listing.id, listing.clone());
        listing
    }

    pub fn transaction_by_checkout(&self, checkout_request_id: &str) -> Option<&Transaction> {
        self.transactions
            .values()
            .find(|t| t.checkout_request_id == checkout_request_id)
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn snapshot(&self) -> MemoryState {
        self.state.lock().await.clone()
    }

    pub async fn seed_user(&self, username: &str, role: UserRole, phone: Option<&str>) -> User {
        let mut state = self.state.lock().await;
        let user = User {
            id: state.next_id(),
            username: username.to_string(),
            email: format!("{username}@example.com"),
            phone_number: phone.map(str::to_string),
            role,
            is_approved: true,
            location: None,
        };
        state.users.insert(user.id, user.clone());
        user
    }

    pub async fn set_approved(&self, user_id: i64, approved: bool) {
        if let Some(user) = self.state.lock().await.users.get_mut(&user_id) {
            user.is_approved = approved;
        }
    }

    pub async fn seed_listing(
        &self,
        farmer_id: i64,
        name: &str,
        price: Decimal,
        quantity: i32,
    ) -> Listing {
        self.state.lock().await.insert_listing(
            farmer_id,
            &NewListing {
                name: name.to_string(),
                description: None,
                price,
                quantity,
                unit: "kg".to_string(),
                location: None,
            },
        )
    }

    pub async fn set_price(&self, listing_id: i64, price: Decimal) {
        if let Some(listing) = self.state.lock().await.listings.get_mut(&listing_id) {
            listing.price = price;
        }
    }

    pub async fn seed_market_price(&self, crop_name: &str, unit: &str, average_price: Decimal) {
        let mut state = self.state.lock().await;
        let id = state.next_id();
        state.market_prices.push(MarketPrice {
            id,
            crop_name: crop_name.to_string(),
            unit: unit.to_string(),
            average_price,
        });
    }

    /// Insert an order directly, bypassing stock checks
    pub async fn seed_order(&self, buyer_id: i64, status: OrderStatus, lines: &[(i64, i32)]) -> Order {
        let mut state = self.state.lock().await;
        let order_id = state.next_id();
        let mut total = Decimal::ZERO;
        for &(listing_id, quantity) in lines {
            let price = state.listings.get(&listing_id).map(|l| l.price).unwrap_or_default();
            total += shared::money::line_total(price, quantity);
            let id = state.next_id();
            state.lines.push(OrderLine {
                id,
                order_id,
                listing_id,
                quantity,
                price_per_unit: price,
            });
        }
        let order = Order {
            id: order_id,
            buyer_id,
            status,
            total_price: shared::money::to_money(total),
            created_at: Utc::now(),
        };
        state.orders.insert(order.id, order.clone());
        order
    }

    pub async fn seed_transaction(&self, order_id: i64, amount: Decimal, checkout_request_id: &str) -> Transaction {
        let mut state = self.state.lock().await;
        let txn = Transaction {
            id: state.next_id(),
            order_id,
            amount,
            phone_number: "254712345678".to_string(),
            status: TransactionStatus::Pending,
            checkout_request_id: checkout_request_id.to_string(),
            mpesa_receipt_number: None,
            created_at: Utc::now(),
            updated_at: None,
        };
        state.transactions.insert(txn.id, txn.clone());
        txn
    }
}

#[async_trait]
impl MarketStore for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn MarketTx>, StoreError> {
        let guard = self.state.clone().lock_owned().await;
        let work = guard.clone();
        Ok(Box::new(MemoryTx { guard, work }))
    }

    async fn find_user(&self, id: i64) -> Result<Option<User>, StoreError> {
        Ok(self.state.lock().await.users.get(&id).cloned())
    }

    async fn find_user_by_phone(&self, phone: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .state
            .lock()
            .await
            .users
            .values()
            .find(|u| u.phone_number.as_deref() == Some(phone))
            .cloned())
    }

    async fn email_taken(&self, email: &str) -> Result<bool, StoreError> {
        Ok(self
            .state
            .lock()
            .await
            .users
            .values()
            .any(|u| u.email == email))
    }

    async fn insert_user(&self, new: &NewUser) -> Result<User, StoreError> {
        let mut state = self.state.lock().await;
        if state.users.values().any(|u| u.username == new.username) {
            return Err(StoreError::Conflict("users_username_key".into()));
        }
        if state.users.values().any(|u| u.email == new.email) {
            return Err(StoreError::Conflict("users_email_key".into()));
        }
        let user = User {
            id: state.next_id(),
            username: new.username.clone(),
            email: new.email.clone(),
            phone_number: new.phone_number.clone(),
            role: new.role,
            is_approved: new.is_approved,
            location: new.location.clone(),
        };
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn list_listings(&self, filter: &ListingFilter) -> Result<Vec<Listing>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .listings
            .values()
            .rev()
            .filter(|l| l.is_available && matches_filter(l, filter))
            .cloned()
            .collect())
    }

    async fn find_listing(&self, id: i64) -> Result<Option<Listing>, StoreError> {
        Ok(self.state.lock().await.listings.get(&id).cloned())
    }

    async fn insert_listing(&self, farmer_id: i64, new: &NewListing) -> Result<Listing, StoreError> {
        Ok(self.state.lock().await.insert_listing(farmer_id, new))
    }

    async fn find_order(&self, id: i64) -> Result<Option<Order>, StoreError> {
        Ok(self.state.lock().await.orders.get(&id).cloned())
    }

    async fn order_view(&self, id: i64) -> Result<Option<OrderView>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.orders.get(&id).map(|o| state.view(o)))
    }

    async fn buyer_orders(&self, buyer_id: i64) -> Result<Vec<OrderView>, StoreError> {
        let state = self.state.lock().await;
        let orders = state
            .orders
            .values()
            .filter(|o| o.buyer_id == buyer_id)
            .collect();
        Ok(state.newest_first(orders))
    }

    async fn farmer_orders(&self, farmer_id: i64) -> Result<Vec<OrderView>, StoreError> {
        let state = self.state.lock().await;
        let orders = state
            .orders
            .values()
            .filter(|o| state.farmer_has_line(o.id, farmer_id))
            .collect();
        Ok(state.newest_first(orders))
    }

    async fn find_market_price(&self, crop_name: &str) -> Result<Option<MarketPrice>, StoreError> {
        Ok(self
            .state
            .lock()
            .await
            .market_prices
            .iter()
            .find(|p| p.crop_name.eq_ignore_ascii_case(crop_name))
            .cloned())
    }
}

fn contains_ci(haystack: Option<&str>, needle: Option<&str>) -> bool {
    match needle.map(str::trim).filter(|n| !n.is_empty()) {
        None => true,
        Some(needle) => haystack
            .is_some_and(|h| h.to_lowercase().contains(&needle.to_lowercase())),
    }
}

fn matches_filter(listing: &Listing, filter: &ListingFilter) -> bool {
    contains_ci(Some(&listing.name), filter.name.as_deref())
        && contains_ci(listing.location.as_deref(), filter.location.as_deref())
        && filter.min_price.is_none_or(|min| listing.price >= min)
        && filter.max_price.is_none_or(|max| listing.price <= max)
}

struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    work: MemoryState,
}

#[async_trait]
impl MarketTx for MemoryTx {
    async fn lock_listings(&mut self, _ids: &[i64]) -> Result<(), StoreError> {
        // The store lock is already held
        Ok(())
    }

    async fn lock_listing(&mut self, id: i64) -> Result<Option<Listing>, StoreError> {
        Ok(self.work.listings.get(&id).cloned())
    }

    async fn update_listing(
        &mut self,
        id: i64,
        update: &ListingUpdate,
    ) -> Result<Listing, StoreError> {
        let listing = self
            .work
            .listings
            .get_mut(&id)
            .ok_or_else(|| StoreError::Corrupt(format!("listing {id} vanished under lock")))?;
        if let Some(name) = &update.name {
            listing.name = name.clone();
        }
        if let Some(description) = &update.description {
            listing.description = Some(description.clone());
        }
        if let Some(price) = update.price {
            listing.price = price;
        }
        if let Some(quantity) = update.quantity {
            listing.quantity = quantity;
        }
        if let Some(unit) = &update.unit {
            listing.unit = unit.clone();
        }
        if let Some(location) = &update.location {
            listing.location = Some(location.clone());
        }
        if let Some(is_available) = update.is_available {
            listing.is_available = is_available;
        }
        Ok(listing.clone())
    }

    async fn delete_listing(&mut self, id: i64) -> Result<bool, StoreError> {
        if self.work.lines.iter().any(|l| l.listing_id == id) {
            return Err(StoreError::Conflict("order_items_produce_id_fkey".into()));
        }
        Ok(self.work.listings.remove(&id).is_some())
    }

    async fn reserve(&mut self, listing_id: i64, quantity: i32) -> Result<Listing, ReserveError> {
        let listing = self
            .work
            .listings
            .get_mut(&listing_id)
            .ok_or(ReserveError::NotFound(listing_id))?;
        if listing.quantity < quantity {
            return Err(ReserveError::InsufficientStock {
                listing_id,
                name: listing.name.clone(),
                available: listing.quantity,
            });
        }
        listing.quantity -= quantity;
        Ok(listing.clone())
    }

    async fn insert_order(&mut self, new: &NewOrder) -> Result<Order, StoreError> {
        let order = Order {
            id: self.work.next_id(),
            buyer_id: new.buyer_id,
            status: OrderStatus::Pending,
            total_price: new.total_price,
            created_at: Utc::now(),
        };
        for line in &new.lines {
            let id = self.work.next_id();
            self.work.lines.push(OrderLine {
                id,
                order_id: order.id,
                listing_id: line.listing_id,
                quantity: line.quantity,
                price_per_unit: line.price_per_unit,
            });
        }
        self.work.orders.insert(order.id, order.clone());
        Ok(order)
    }

    async fn lock_order(&mut self, id: i64) -> Result<Option<Order>, StoreError> {
        Ok(self.work.orders.get(&id).cloned())
    }

    async fn farmer_owns_order(
        &mut self,
        order_id: i64,
        farmer_id: i64,
    ) -> Result<bool, StoreError> {
        Ok(self.work.farmer_has_line(order_id, farmer_id))
    }

    async fn set_order_status(&mut self, id: i64, status: OrderStatus) -> Result<(), StoreError> {
        if let Some(order) = self.work.orders.get_mut(&id) {
            order.status = status;
        }
        Ok(())
    }

    async fn delete_order(&mut self, id: i64) -> Result<bool, StoreError> {
        self.work.transactions.retain(|_, t| t.order_id != id);
        self.work.lines.retain(|l| l.order_id != id);
        Ok(self.work.orders.remove(&id).is_some())
    }

    async fn insert_transaction(
        &mut self,
        new: &NewTransaction,
    ) -> Result<Transaction, StoreError> {
        if self
            .work
            .transaction_by_checkout(&new.checkout_request_id)
            .is_some()
        {
            return Err(StoreError::Conflict(
                "transactions_checkout_request_id_key".into(),
            ));
        }
        let txn = Transaction {
            id: self.work.next_id(),
            order_id: new.order_id,
            amount: new.amount,
            phone_number: new.phone_number.clone(),
            status: TransactionStatus::Pending,
            checkout_request_id: new.checkout_request_id.clone(),
            mpesa_receipt_number: None,
            created_at: Utc::now(),
            updated_at: None,
        };
        self.work.transactions.insert(txn.id, txn.clone());
        Ok(txn)
    }

    async fn lock_transaction_by_checkout(
        &mut self,
        checkout_request_id: &str,
    ) -> Result<Option<Transaction>, StoreError> {
        Ok(self.work.transaction_by_checkout(checkout_request_id).cloned())
    }

    async fn finish_transaction(
        &mut self,
        id: i64,
        status: TransactionStatus,
        receipt_number: Option<&str>,
    ) -> Result<(), StoreError> {
        if let Some(receipt) = receipt_number
            && self
                .work
                .transactions
                .values()
                .any(|t| t.id != id && t.mpesa_receipt_number.as_deref() == Some(receipt))
        {
            return Err(StoreError::Conflict(
                "transactions_mpesa_receipt_number_key".into(),
            ));
        }
        if let Some(txn) = self.work.transactions.get_mut(&id) {
            txn.status = status;
            if let Some(receipt) = receipt_number {
                txn.mpesa_receipt_number = Some(receipt.to_string());
            }
            txn.updated_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let MemoryTx { mut guard, work } = *self;
        *guard = work;
        Ok(())
    }
}
