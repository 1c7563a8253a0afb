//! Post-creation order changes

use shared::error::{AppError, ErrorCode};
use shared::models::{OrderStatus, OrderView};

use crate::db::MarketStore;
use crate::error::ServiceResult;

const INVALID_STATUS: &str = "Invalid status provided. Must be one of: Confirmed, Delivered, Canceled.";

/// Statuses a farmer may request
fn parse_farmer_status(status: &str) -> Option<OrderStatus> {
    match OrderStatus::from_db(status)? {
        s @ (OrderStatus::Confirmed | OrderStatus::Delivered | OrderStatus::Canceled) => Some(s),
        _ => None,
    }
}

fn not_found() -> AppError {
    AppError::with_message(
        ErrorCode::OrderNotFound,
        "Order not found or you do not have permission to modify it.",
    )
}

/// Farmer moves an order that contains one of their listings.
///
/// Orders without such a line answer as not found. Cancellation does not
/// restock listings.
pub async fn update_status(
    store: &dyn MarketStore,
    farmer_id: i64,
    order_id: i64,
    status: &str,
) -> ServiceResult<OrderView> {
    let target = parse_farmer_status(status).ok_or_else(|| AppError::validation(INVALID_STATUS))?;

    let mut tx = store.begin().await?;
    let order = tx.lock_order(order_id).await?.ok_or_else(not_found)?;
    if !tx.farmer_owns_order(order_id, farmer_id).await? {
        return Err(not_found().into());
    }

    if !order.status.can_farmer_set(target) {
        return Err(AppError::with_message(
            ErrorCode::OrderInvalidState,
            format!("Cannot change order from {} to {target}.", order.status),
        )
        .with_detail("status", order.status.as_db())
        .into());
    }

    tx.set_order_status(order_id, target).await?;
    tx.commit().await?;

    tracing::info!(
        order_id,
        farmer_id,
        from = order.status.as_db(),
        to = target.as_db(),
        "Order status updated"
    );

    store
        .order_view(order_id)
        .await?
        .ok_or_else(|| not_found().into())
}

/// Delete an order with its lines and payment attempts in one atomic unit
pub async fn delete_order(store: &dyn MarketStore, order_id: i64) -> ServiceResult<()> {
    let mut tx = store.begin().await?;
    if !tx.delete_order(order_id).await? {
        return Err(AppError::with_message(ErrorCode::OrderNotFound, "Order not found.").into());
    }
    tx.commit().await?;

    tracing::info!(order_id, "Order deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::MemoryStore;
    use rust_decimal::Decimal;
    use shared::models::{Order, User, UserRole};

    struct Fixture {
        store: MemoryStore,
        farmer: User,
        order: Order,
    }

    async fn fixture(status: OrderStatus) -> Fixture {
        let store = MemoryStore::new();
        let farmer = store.seed_user("juma", UserRole::Farmer, None).await;
        let buyer = store.seed_user("amina", UserRole::Buyer, None).await;
        let maize = store
            .seed_listing(farmer.id, "Maize", Decimal::new(12000, 2), 45)
            .await;
        let order = store.seed_order(buyer.id, status, &[(maize.id, 5)]).await;
        Fixture {
            store,
            farmer,
            order,
        }
    }

    #[tokio::test]
    async fn test_farmer_confirms_then_delivers() {
        let f = fixture(OrderStatus::Pending).await;

        let view = update_status(&f.store, f.farmer.id, f.order.id, "Confirmed")
            .await
            .unwrap();
        assert_eq!(view.status, OrderStatus::Confirmed);

        let view = update_status(&f.store, f.farmer.id, f.order.id, "Delivered")
            .await
            .unwrap();
        assert_eq!(view.status, OrderStatus::Delivered);
        assert_eq!(view.order_items.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_status_rejected() {
        let f = fixture(OrderStatus::Pending).await;
        for status in ["Shipped", "Pending", "Pending Payment", "confirmed"] {
            let err = update_status(&f.store, f.farmer.id, f.order.id, status)
                .await
                .unwrap_err();
            assert_eq!(err.code(), ErrorCode::ValidationFailed);
        }
    }

    #[tokio::test]
    async fn test_other_farmer_sees_not_found() {
        let f = fixture(OrderStatus::Pending).await;
        let stranger = f.store.seed_user("wanjiru", UserRole::Farmer, None).await;

        let err = update_status(&f.store, stranger.id, f.order.id, "Confirmed")
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::OrderNotFound);
        assert_eq!(
            f.store.snapshot().await.orders[&f.order.id].status,
            OrderStatus::Pending
        );
    }

    #[tokio::test]
    async fn test_final_status_is_final() {
        let f = fixture(OrderStatus::Canceled).await;
        let err = update_status(&f.store, f.farmer.id, f.order.id, "Confirmed")
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::OrderInvalidState);
    }

    #[tokio::test]
    async fn test_cancel_does_not_restock() {
        let f = fixture(OrderStatus::Pending).await;
        update_status(&f.store, f.farmer.id, f.order.id, "Canceled")
            .await
            .unwrap();

        let state = f.store.snapshot().await;
        assert_eq!(state.orders[&f.order.id].status, OrderStatus::Canceled);
        assert_eq!(state.listings.values().next().unwrap().quantity, 45);
    }

    #[tokio::test]
    async fn test_delete_removes_whole_aggregate() {
        let f = fixture(OrderStatus::PendingPayment).await;
        f.store
            .seed_transaction(f.order.id, f.order.total_price, "ws_CO_1")
            .await;

        delete_order(&f.store, f.order.id).await.unwrap();

        let state = f.store.snapshot().await;
        assert!(state.orders.is_empty());
        assert!(state.lines.is_empty());
        assert!(state.transactions.is_empty());

        let err = delete_order(&f.store, f.order.id).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::OrderNotFound);
    }
}
