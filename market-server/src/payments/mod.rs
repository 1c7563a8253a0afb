//! Payments
//!
//! - [`gateway`]: starts a payment for an order through a [`PaymentProvider`]
//! - [`callback`]: applies the provider's asynchronous result
//! - [`mpesa`]: M-Pesa Daraja STK push provider

pub mod callback;
pub mod gateway;
pub mod mpesa;

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::time::Duration;

pub use gateway::PaymentGateway;
pub use mpesa::MpesaClient;

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("provider request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("provider authentication failed: {0}")]
    Auth(String),
    #[error("provider did not answer within {0:?}")]
    Timeout(Duration),
}

/// Order-derived identifiers shown to the payer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentReference {
    pub account_reference: String,
    pub description: String,
}

impl PaymentReference {
    pub fn for_order(order_id: i64) -> Self {
        Self {
            account_reference: format!("FMLP{order_id}"),
            description: format!("Payment for Order #{order_id}"),
        }
    }
}

/// What the provider said about a payment request
#[derive(Debug, Clone)]
pub struct PaymentRequestOutcome {
    pub accepted: bool,
    /// Id the provider will quote in its callback
    pub correlation_id: Option<String>,
    /// Provider response body, kept for diagnostics
    pub raw: serde_json::Value,
}

#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Obtain an access token
    async fn authenticate(&self) -> Result<String, ProviderError>;

    /// Ask the payer's device to approve `amount`
    async fn request_payment(
        &self,
        contact: &str,
        amount: Decimal,
        reference: &PaymentReference,
    ) -> Result<PaymentRequestOutcome, ProviderError>;
}
