//! market-server: farmer to buyer produce marketplace
//!
//! Long-running service that:
//! - Lets farmers manage produce listings and buyers browse them
//! - Takes buyer orders against farmer stock without overselling
//! - Starts M-Pesa STK push payments and reconciles the provider callbacks
//! - Notifies farmers and buyers by SMS
//! - Answers inbound SMS commands (farmer registration, market prices)

mod api;
mod auth;
mod config;
mod db;
mod error;
mod listings;
mod notify;
mod orders;
mod payments;
mod sms;
mod state;
mod util;

use std::net::SocketAddr;

use config::Config;
use state::AppState;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    // Load .env file
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "market_server=info,tower_http=info".into()),
        )
        .init();

    let config = Config::from_env()?;

    tracing::info!("Starting market-server (env: {})", config.environment);
    if config.twilio.is_none() {
        tracing::warn!("Twilio not configured, outbound SMS disabled");
    }

    let state = AppState::new(&config).await?;

    // Periodic rate limiter cleanup (every 5 minutes)
    let rate_limiter = state.rate_limiter.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(300));
        loop {
            interval.tick().await;
            rate_limiter.cleanup().await;
        }
    });

    let app = api::create_router(state);

    let http_addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&http_addr).await?;
    tracing::info!("market-server HTTP listening on {http_addr}");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
