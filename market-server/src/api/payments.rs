//! Payment API: initiation by the buyer and the provider's result webhook

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Extension, Json, Router, middleware};
use http::StatusCode;
use serde_json::json;
use shared::error::ErrorCode;

use crate::auth::UserIdentity;
use crate::auth::rate_limit::callback_rate_limit;
use crate::error::ServiceResult;
use crate::notify::spawn_dispatch;
use crate::payments::callback::{self, ReconcileError, Reconciled};
use crate::payments::gateway::PaymentInitiated;
use crate::state::AppState;

/// Authenticated payment routes
pub fn router() -> Router<AppState> {
    Router::new().route("/api/payments/initiate/{order_id}", post(initiate_payment))
}

/// Provider webhook, public and rate limited
pub fn callback_router(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/api/payments/callback", post(payment_callback))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            callback_rate_limit,
        ))
}

/// POST /api/payments/initiate/{order_id}
pub async fn initiate_payment(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Path(order_id): Path<i64>,
) -> ServiceResult<Json<PaymentInitiated>> {
    let initiated = state
        .payments
        .initiate(state.store.as_ref(), identity.user_id, order_id)
        .await?;
    Ok(Json(initiated))
}

/// POST /api/payments/callback
///
/// The body is read raw so that a malformed payload answers 400 in the
/// provider's envelope instead of an extractor rejection.
pub async fn payment_callback(State(state): State<AppState>, body: Bytes) -> Response {
    match callback::reconcile(state.store.as_ref(), &body).await {
        Ok(Reconciled::Confirmed { order_id, notice }) => {
            tracing::info!(order_id, "Payment callback confirmed order");
            if let Some(notice) = notice {
                spawn_dispatch(state.notifier.clone(), vec![notice]);
            }
            processed()
        }
        Ok(Reconciled::Failed { order_id }) => {
            tracing::info!(order_id, "Payment callback reported failure");
            processed()
        }
        Ok(Reconciled::Duplicate { status }) => {
            tracing::info!(status = ?status, "Payment callback replayed");
            processed()
        }
        Err(ReconcileError::InvalidPayload(reason)) => {
            tracing::warn!(reason = %reason, "Invalid payment callback");
            rejected(ErrorCode::InvalidCallback)
        }
        Err(ReconcileError::UnknownTransaction(checkout_request_id)) => {
            tracing::warn!(checkout_request_id = %checkout_request_id, "Callback for unknown transaction");
            rejected(ErrorCode::TransactionNotFound)
        }
        Err(ReconcileError::Store(e)) => {
            tracing::error!(error = %e, "Payment callback failed");
            rejected(ErrorCode::InternalError)
        }
    }
}

fn processed() -> Response {
    (
        StatusCode::OK,
        Json(json!({ "result": "Callback processed successfully" })),
    )
        .into_response()
}

/// Provider-facing rejection: the status of `code`, its message as `result`
fn rejected(code: ErrorCode) -> Response {
    (
        code.http_status(),
        Json(json!({ "result": code.message(), "code": code.code() })),
    )
        .into_response()
}
