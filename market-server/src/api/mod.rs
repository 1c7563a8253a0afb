//! HTTP API
//!
//! Route groups carry their own guards:
//!
//! | Group | Guard |
//! |-------|-------|
//! | `/health` | none |
//! | `/api/orders` (POST, GET) | buyer |
//! | `/api/orders/farmer`, `/api/orders/{id}` (PATCH) | approved farmer |
//! | `/api/produce` (GET) | any authenticated user |
//! | `/api/produce` (POST), `/api/produce/{id}` (PUT, DELETE) | approved farmer |
//! | `/api/admin/*` | admin |
//! | `/api/payments/initiate/{order_id}` | any authenticated user |
//! | `/api/payments/callback`, `/api/sms/inbound` | none (rate limited) |

pub mod admin;
pub mod health;
pub mod orders;
pub mod payments;
pub mod produce;
pub mod sms;

use axum::extract::DefaultBodyLimit;
use axum::extract::rejection::JsonRejection;
use axum::{Json, Router, middleware};
use shared::error::AppError;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::user_auth::user_auth_middleware;
use crate::state::AppState;

/// Build the full application router
pub fn create_router(state: AppState) -> Router {
    // JWT required; each group adds its role guard
    let authenticated = Router::new()
        .merge(orders::router(&state))
        .merge(produce::router(&state))
        .merge(payments::router())
        .merge(admin::router(&state))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            user_auth_middleware,
        ));

    Router::new()
        .merge(health::router())
        .merge(authenticated)
        .merge(payments::callback_router(&state))
        .merge(sms::router(&state))
        .layer(DefaultBodyLimit::max(1024 * 1024)) // 1MB
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Unwrap a JSON body, turning extractor rejections into validation errors
fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload
        .map(|Json(value)| value)
        .map_err(|e| AppError::validation(e.body_text()))
}
