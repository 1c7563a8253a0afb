//! Twilio SMS delivery via REST API (no SDK dependency)

use async_trait::async_trait;
use std::time::Duration;

use super::Notifier;
use crate::config::TwilioConfig;

const TWILIO_API_BASE: &str = "https://api.twilio.com/2010-04-01";

pub struct TwilioNotifier {
    client: reqwest::Client,
    /// `None` when credentials are not configured; sends become logged no-ops
    config: Option<TwilioConfig>,
}

impl TwilioNotifier {
    pub fn new(config: Option<TwilioConfig>) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        if config.is_none() {
            tracing::warn!("Twilio credentials not configured, SMS notifications disabled");
        }
        Ok(Self { client, config })
    }

    async fn post_message(
        &self,
        config: &TwilioConfig,
        to: &str,
        body: &str,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        let url = format!(
            "{TWILIO_API_BASE}/Accounts/{}/Messages.json",
            config.account_sid
        );
        let resp = self
            .client
            .post(&url)
            .basic_auth(&config.account_sid, Some(&config.auth_token))
            .form(&[("To", to), ("From", config.phone_number.as_str()), ("Body", body)])
            .send()
            .await?;

        let status = resp.status();
        let json: serde_json::Value = resp.json().await?;
        if !status.is_success() {
            return Err(format!("Twilio returned {status}: {json}").into());
        }

        json["sid"]
            .as_str()
            .map(String::from)
            .ok_or_else(|| format!("Twilio response missing sid: {json}").into())
    }
}

#[async_trait]
impl Notifier for TwilioNotifier {
    async fn send(&self, contact: &str, message: &str) -> bool {
        let Some(config) = &self.config else {
            tracing::info!(to = %contact, "Twilio not configured, skipping SMS");
            return true;
        };

        match self.post_message(config, contact, message).await {
            Ok(sid) => {
                tracing::info!(to = %contact, sid = %sid, "SMS sent");
                true
            }
            Err(e) => {
                tracing::warn!(to = %contact, error = %e, "Failed to send SMS");
                false
            }
        }
    }
}
