//! Server configuration

use std::time::Duration;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

const MPESA_SANDBOX_URL: &str = "https://sandbox.safaricom.co.ke";

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection URL
    pub database_url: String,
    pub http_port: u16,
    /// Environment: development | staging | production
    pub environment: String,
    /// JWT secret for user authentication
    pub jwt_secret: String,
    pub mpesa: MpesaConfig,
    /// `None` unless all three Twilio variables are set
    pub twilio: Option<TwilioConfig>,
}

/// M-Pesa Daraja STK push credentials
#[derive(Debug, Clone)]
pub struct MpesaConfig {
    pub base_url: String,
    pub consumer_key: String,
    pub consumer_secret: String,
    /// Paybill / till number (BusinessShortCode, PartyB)
    pub shortcode: String,
    pub passkey: String,
    /// Public URL of `/api/payments/callback`
    pub callback_url: String,
    /// Upper bound on one provider round trip
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: String,
    /// Sender number
    pub phone_number: String,
}

impl Config {
    /// Require a secret env var: must be set and non-empty in non-development environments.
    fn require_secret(name: &str, environment: &str) -> Result<String, BoxError> {
        let val = match std::env::var(name) {
            Ok(v) => v,
            Err(_) => {
                if environment != "development" {
                    return Err(format!("{name} must be set in {environment} environment").into());
                }
                format!("dev-{name}-not-for-production")
            }
        };
        if val.is_empty() && environment != "development" {
            return Err(format!("{name} must not be empty in {environment} environment").into());
        }
        Ok(val)
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, BoxError> {
        let environment = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into());

        Ok(Self {
            database_url: std::env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set")?,
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            jwt_secret: Self::require_secret("JWT_SECRET", &environment)?,
            mpesa: MpesaConfig::from_env(&environment)?,
            twilio: TwilioConfig::from_env(),
            environment,
        })
    }
}

impl MpesaConfig {
    fn from_env(environment: &str) -> Result<Self, BoxError> {
        Ok(Self {
            base_url: std::env::var("MPESA_BASE_URL")
                .unwrap_or_else(|_| MPESA_SANDBOX_URL.into())
                .trim_end_matches('/')
                .to_string(),
            consumer_key: Config::require_secret("MPESA_CONSUMER_KEY", environment)?,
            consumer_secret: Config::require_secret("MPESA_CONSUMER_SECRET", environment)?,
            shortcode: std::env::var("MPESA_SHORTCODE").unwrap_or_else(|_| "174379".into()),
            passkey: Config::require_secret("MPESA_PASSKEY", environment)?,
            callback_url: std::env::var("MPESA_CALLBACK_URL")
                .unwrap_or_else(|_| "http://localhost:8080/api/payments/callback".into()),
            timeout: Duration::from_secs(
                std::env::var("MPESA_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
        })
    }
}

impl TwilioConfig {
    fn from_env() -> Option<Self> {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());
        Some(Self {
            account_sid: var("TWILIO_ACCOUNT_SID")?,
            auth_token: var("TWILIO_AUTH_TOKEN")?,
            phone_number: var("TWILIO_PHONE_NUMBER")?,
        })
    }
}
