//! Payment initiation
//!
//! The provider round trip happens with no lock held. The order is re-locked
//! afterwards and the Pending transaction and the `Pending Payment` status
//! are written in one atomic unit.

use serde::Serialize;
use shared::error::{AppError, ErrorCode};
use shared::models::OrderStatus;
use shared::money::whole_units;
use std::sync::Arc;
use std::time::Duration;

use super::{PaymentProvider, PaymentReference, ProviderError};
use crate::db::{MarketStore, NewTransaction, StoreError};
use crate::error::ServiceResult;

#[derive(Debug, Clone, Serialize)]
pub struct PaymentInitiated {
    pub message: String,
    pub checkout_request_id: String,
}

#[derive(Clone)]
pub struct PaymentGateway {
    provider: Arc<dyn PaymentProvider>,
    timeout: Duration,
}

impl PaymentGateway {
    pub fn new(provider: Arc<dyn PaymentProvider>, timeout: Duration) -> Self {
        Self { provider, timeout }
    }

    /// Start a payment for one of the buyer's orders
    pub async fn initiate(
        &self,
        store: &dyn MarketStore,
        buyer_id: i64,
        order_id: i64,
    ) -> ServiceResult<PaymentInitiated> {
        let order = store
            .find_order(order_id)
            .await?
            .ok_or_else(|| AppError::with_message(ErrorCode::OrderNotFound, "Order not found."))?;

        if order.buyer_id != buyer_id {
            return Err(AppError::forbidden("You are not authorized to pay for this order.").into());
        }
        ensure_payable(order.status)?;
        if whole_units(order.total_price) < 1 {
            return Err(AppError::with_message(
                ErrorCode::InvalidRequest,
                "Order total is below the minimum payable amount.",
            )
            .into());
        }

        let contact = store
            .find_user(buyer_id)
            .await?
            .and_then(|u| u.phone_number)
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| {
                AppError::with_message(
                    ErrorCode::ContactMissing,
                    "No phone number on file for this user.",
                )
            })?;

        let reference = PaymentReference::for_order(order_id);
        let outcome = tokio::time::timeout(
            self.timeout,
            self.provider
                .request_payment(&contact, order.total_price, &reference),
        )
        .await
        .unwrap_or(Err(ProviderError::Timeout(self.timeout)))
        .map_err(|e| {
            tracing::warn!(order_id, error = %e, "Payment provider request failed");
            AppError::with_message(ErrorCode::PaymentGatewayFailed, "Failed to initiate payment.")
        })?;

        let checkout_request_id = match outcome.correlation_id {
            Some(id) if outcome.accepted && !id.is_empty() => id,
            _ => {
                tracing::warn!(order_id, response = %outcome.raw, "Payment provider rejected request");
                return Err(AppError::with_message(
                    ErrorCode::PaymentGatewayFailed,
                    "Failed to initiate payment.",
                )
                .with_detail("details", outcome.raw)
                .into());
            }
        };

        let mut tx = store.begin().await?;
        let order = tx
            .lock_order(order_id)
            .await?
            .ok_or_else(|| AppError::with_message(ErrorCode::OrderNotFound, "Order not found."))?;
        // Re-check: a callback or the farmer may have moved the order meanwhile
        ensure_payable(order.status)?;

        tx.insert_transaction(&NewTransaction {
            order_id,
            amount: order.total_price,
            phone_number: contact,
            checkout_request_id: checkout_request_id.clone(),
        })
        .await
        .map_err(|e| match e {
            StoreError::Conflict(_) => AppError::with_message(
                ErrorCode::DuplicateCheckoutRequest,
                "Payment request already recorded.",
            )
            .with_detail("checkout_request_id", checkout_request_id.clone())
            .into(),
            other => crate::error::ServiceError::from(other),
        })?;
        tx.set_order_status(order_id, OrderStatus::PendingPayment)
            .await?;
        tx.commit().await?;

        tracing::info!(
            order_id,
            checkout_request_id = %checkout_request_id,
            amount = %order.total_price,
            "Payment initiated"
        );

        Ok(PaymentInitiated {
            message: "Payment initiated successfully. Please check your phone.".into(),
            checkout_request_id,
        })
    }
}

fn ensure_payable(status: OrderStatus) -> Result<(), AppError> {
    if status.is_payable() {
        return Ok(());
    }
    Err(AppError::with_message(
        ErrorCode::OrderInvalidState,
        format!("Order is not in a payable state. Current status: {status}"),
    )
    .with_detail("status", status.as_db()))
}
