//! M-Pesa Daraja STK push via REST API (no SDK dependency)

use async_trait::async_trait;
use base64::Engine;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::{Value, json};
use shared::money::whole_units;
use shared::util::normalize_msisdn;

use super::{PaymentProvider, PaymentReference, PaymentRequestOutcome, ProviderError};
use crate::config::MpesaConfig;

/// Daraja timestamps are East Africa Time (UTC+3, no DST)
const EAT_OFFSET_HOURS: i64 = 3;

pub struct MpesaClient {
    client: reqwest::Client,
    config: MpesaConfig,
}

impl MpesaClient {
    pub fn new(config: MpesaConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }
}

/// `YYYYMMDDHHMMSS` in East Africa Time
fn timestamp(now: DateTime<Utc>) -> String {
    (now + chrono::Duration::hours(EAT_OFFSET_HOURS))
        .format("%Y%m%d%H%M%S")
        .to_string()
}

/// base64(shortcode + passkey + timestamp)
fn password(shortcode: &str, passkey: &str, timestamp: &str) -> String {
    base64::engine::general_purpose::STANDARD.encode(format!("{shortcode}{passkey}{timestamp}"))
}

fn stk_push_body(
    config: &MpesaConfig,
    contact: &str,
    amount: Decimal,
    reference: &PaymentReference,
    now: DateTime<Utc>,
) -> Value {
    let timestamp = timestamp(now);
    let phone = normalize_msisdn(contact);
    json!({
        "BusinessShortCode": config.shortcode,
        "Password": password(&config.shortcode, &config.passkey, &timestamp),
        "Timestamp": timestamp,
        "TransactionType": "CustomerPayBillOnline",
        "Amount": whole_units(amount),
        "PartyA": phone,
        "PartyB": config.shortcode,
        "PhoneNumber": phone,
        "CallBackURL": config.callback_url,
        "AccountReference": reference.account_reference,
        "TransactionDesc": reference.description,
    })
}

#[async_trait]
impl PaymentProvider for MpesaClient {
    async fn authenticate(&self) -> Result<String, ProviderError> {
        let url = format!(
            "{}/oauth/v1/generate?grant_type=client_credentials",
            self.config.base_url
        );
        let resp = self
            .client
            .get(&url)
            .basic_auth(&self.config.consumer_key, Some(&self.config.consumer_secret))
            .send()
            .await?;

        let status = resp.status();
        let json: Value = resp.json().await?;
        if !status.is_success() {
            return Err(ProviderError::Auth(format!("{status}: {json}")));
        }

        json["access_token"]
            .as_str()
            .map(String::from)
            .ok_or_else(|| ProviderError::Auth(format!("response missing access_token: {json}")))
    }

    async fn request_payment(
        &self,
        contact: &str,
        amount: Decimal,
        reference: &PaymentReference,
    ) -> Result<PaymentRequestOutcome, ProviderError> {
        let token = self.authenticate().await?;
        let body = stk_push_body(&self.config, contact, amount, reference, Utc::now());

        let url = format!("{}/mpesa/stkpush/v1/processrequest", self.config.base_url);
        let raw: Value = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?
            .json()
            .await?;

        let accepted = raw["ResponseCode"].as_str() == Some("0");
        let correlation_id = raw["CheckoutRequestID"].as_str().map(String::from);
        Ok(PaymentRequestOutcome {
            accepted,
            correlation_id,
            raw,
        })
    }
}
