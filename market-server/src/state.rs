//! Application state

use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;

use crate::auth::rate_limit::RateLimiter;
use crate::config::Config;
use crate::db::{MarketStore, PgStore};
use crate::notify::{Notifier, TwilioNotifier};
use crate::payments::{MpesaClient, PaymentGateway, PaymentProvider};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn MarketStore>,
    pub payments: PaymentGateway,
    /// Outbound SMS
    pub notifier: Arc<dyn Notifier>,
    /// JWT secret for user authentication
    pub jwt_secret: String,
    /// Rate limiter for the public webhook routes
    pub rate_limiter: RateLimiter,
}

impl AppState {
    /// Assemble state from already-built collaborators
    pub fn with_components(
        store: Arc<dyn MarketStore>,
        provider: Arc<dyn PaymentProvider>,
        notifier: Arc<dyn Notifier>,
        jwt_secret: String,
        payment_timeout: Duration,
    ) -> Self {
        Self {
            store,
            payments: PaymentGateway::new(provider, payment_timeout),
            notifier,
            jwt_secret,
            rate_limiter: RateLimiter::new(),
        }
    }

    /// Connect, migrate and build the production collaborators
    pub async fn new(config: &Config) -> Result<Self, BoxError> {
        let pool = PgPool::connect(&config.database_url).await?;

        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("Database migrations applied");

        let provider = MpesaClient::new(config.mpesa.clone())?;
        let notifier = TwilioNotifier::new(config.twilio.clone())?;

        Ok(Self::with_components(
            Arc::new(PgStore::new(pool)),
            Arc::new(provider),
            Arc::new(notifier),
            config.jwt_secret.clone(),
            config.mpesa.timeout,
        ))
    }
}
