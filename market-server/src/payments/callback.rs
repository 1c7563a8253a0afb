//! M-Pesa STK callback reconciliation
//!
//! The callback endpoint is unauthenticated, so nothing in the body is
//! trusted beyond the checkout id: it must match a transaction we recorded.
//! A transaction leaves `Pending` exactly once. Replays of an already applied
//! result are acknowledged without touching state.

use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use shared::models::{OrderStatus, TransactionStatus};
use shared::money::money_eq;
use std::str::FromStr;

use crate::db::{MarketStore, StoreError};
use crate::notify::Notice;

// ── Envelope ──

#[derive(Debug, Deserialize)]
pub struct CallbackEnvelope {
    #[serde(rename = "Body")]
    pub body: CallbackBody,
}

#[derive(Debug, Deserialize)]
pub struct CallbackBody {
    #[serde(rename = "stkCallback")]
    pub stk_callback: StkCallback,
}

#[derive(Debug, Deserialize)]
pub struct StkCallback {
    #[serde(rename = "MerchantRequestID", default)]
    pub merchant_request_id: Option<String>,
    #[serde(rename = "CheckoutRequestID")]
    pub checkout_request_id: String,
    #[serde(rename = "ResultCode")]
    pub result_code: i64,
    #[serde(rename = "ResultDesc", default)]
    pub result_desc: Option<String>,
    #[serde(rename = "CallbackMetadata", default)]
    pub callback_metadata: Option<CallbackMetadata>,
}

#[derive(Debug, Deserialize)]
pub struct CallbackMetadata {
    #[serde(rename = "Item", default)]
    pub items: Vec<MetadataItem>,
}

#[derive(Debug, Deserialize)]
pub struct MetadataItem {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Value", default)]
    pub value: Option<Value>,
}

impl StkCallback {
    pub fn is_success(&self) -> bool {
        self.result_code == 0
    }

    fn metadata(&self, name: &str) -> Option<&Value> {
        self.callback_metadata
            .as_ref()?
            .items
            .iter()
            .find(|item| item.name == name)?
            .value
            .as_ref()
    }

    /// Provider receipt; numbers are accepted and stringified
    pub fn receipt_number(&self) -> Option<String> {
        match self.metadata("MpesaReceiptNumber")? {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn amount(&self) -> Option<Decimal> {
        match self.metadata("Amount")? {
            Value::Number(n) => Decimal::from_str(&n.to_string()).ok(),
            Value::String(s) => Decimal::from_str(s.trim()).ok(),
            _ => None,
        }
    }
}

// ── Reconciliation ──

/// How an accepted callback was applied
#[derive(Debug, Clone, PartialEq)]
pub enum Reconciled {
    /// Payment succeeded; order confirmed. Carries the buyer notice, if any.
    Confirmed {
        order_id: i64,
        notice: Option<Notice>,
    },
    /// Payment failed or was cancelled by the payer
    Failed { order_id: i64 },
    /// Transaction was already terminal; nothing changed
    Duplicate { status: TransactionStatus },
}

#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("invalid callback payload: {0}")]
    InvalidPayload(String),
    #[error("no transaction for checkout request {0}")]
    UnknownTransaction(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub fn parse_callback(body: &[u8]) -> Result<StkCallback, ReconcileError> {
    let envelope: CallbackEnvelope = serde_json::from_slice(body)
        .map_err(|e| ReconcileError::InvalidPayload(e.to_string()))?;
    let callback = envelope.body.stk_callback;
    if callback.checkout_request_id.trim().is_empty() {
        return Err(ReconcileError::InvalidPayload(
            "empty CheckoutRequestID".into(),
        ));
    }
    Ok(callback)
}

/// Apply one provider callback
pub async fn reconcile(
    store: &dyn MarketStore,
    body: &[u8],
) -> Result<Reconciled, ReconcileError> {
    let callback = parse_callback(body)?;
    let checkout_request_id = callback.checkout_request_id.as_str();

    let mut tx = store.begin().await?;
    let txn = tx
        .lock_transaction_by_checkout(checkout_request_id)
        .await?
        .ok_or_else(|| ReconcileError::UnknownTransaction(checkout_request_id.to_string()))?;

    if txn.status.is_terminal() {
        tracing::info!(
            checkout_request_id = %checkout_request_id,
            status = txn.status.as_db(),
            "Callback for already settled transaction ignored"
        );
        return Ok(Reconciled::Duplicate { status: txn.status });
    }

    let order = tx.lock_order(txn.order_id).await?;

    if !callback.is_success() {
        tx.finish_transaction(txn.id, TransactionStatus::Failed, None)
            .await?;
        if let Some(order) = &order
            && order.status == OrderStatus::PendingPayment
        {
            tx.set_order_status(order.id, OrderStatus::Pending).await?;
        }
        tx.commit().await?;

        tracing::info!(
            checkout_request_id = %checkout_request_id,
            order_id = txn.order_id,
            result_code = callback.result_code,
            result_desc = callback.result_desc.as_deref().unwrap_or(""),
            "Payment failed"
        );
        return Ok(Reconciled::Failed {
            order_id: txn.order_id,
        });
    }

    let receipt = callback.receipt_number();
    if receipt.is_none() {
        tracing::warn!(
            checkout_request_id = %checkout_request_id,
            order_id = txn.order_id,
            "Success callback without MpesaReceiptNumber, confirming without receipt"
        );
    }

    if let Some(paid) = callback.amount()
        && !money_eq(paid, txn.amount)
    {
        tracing::warn!(
            checkout_request_id = %checkout_request_id,
            expected = %txn.amount,
            paid = %paid,
            "Callback amount differs from transaction amount"
        );
    }

    tx.finish_transaction(txn.id, TransactionStatus::Success, receipt.as_deref())
        .await
        .map_err(|e| match e {
            StoreError::Conflict(_) => ReconcileError::InvalidPayload(format!(
                "receipt {} already recorded",
                receipt.as_deref().unwrap_or_default()
            )),
            other => other.into(),
        })?;

    match &order {
        Some(order) if order.status.is_final() => {
            tracing::warn!(
                order_id = order.id,
                status = order.status.as_db(),
                receipt = receipt.as_deref().unwrap_or(""),
                "Payment received for a closed order, status left unchanged"
            );
        }
        Some(order) => {
            tx.set_order_status(order.id, OrderStatus::Confirmed)
                .await?;
        }
        None => {
            tracing::warn!(order_id = txn.order_id, "Paid transaction has no order");
        }
    }
    tx.commit().await?;

    tracing::info!(
        checkout_request_id = %checkout_request_id,
        order_id = txn.order_id,
        receipt = receipt.as_deref().unwrap_or(""),
        merchant_request_id = callback.merchant_request_id.as_deref().unwrap_or(""),
        "Payment confirmed"
    );

    let notice = match &order {
        Some(order) => buyer_notice(store, order.buyer_id, order.id, receipt.as_deref()).await,
        None => None,
    };
    Ok(Reconciled::Confirmed {
        order_id: txn.order_id,
        notice,
    })
}

/// Read after commit; a failed read only costs the notification
async fn buyer_notice(
    store: &dyn MarketStore,
    buyer_id: i64,
    order_id: i64,
    receipt: Option<&str>,
) -> Option<Notice> {
    match store.find_user(buyer_id).await {
        Ok(Some(buyer)) => buyer.phone_number.map(|phone| {
            let message = match receipt {
                Some(receipt) => format!(
                    "Hello {}, your payment for order #{order_id} was received. Receipt: {receipt}.",
                    buyer.username
                ),
                None => format!(
                    "Hello {}, your payment for order #{order_id} was received.",
                    buyer.username
                ),
            };
            Notice::new(phone, message)
        }),
        Ok(None) => None,
        Err(e) => {
            tracing::warn!(order_id, error = %e, "Could not load buyer for payment notice");
            None
        }
    }
}
