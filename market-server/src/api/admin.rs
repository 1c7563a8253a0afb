//! Admin API

use axum::extract::{Path, State};
use axum::routing::delete;
use axum::{Json, Router, middleware};
use serde_json::{Value, json};

use crate::auth::guard::require_admin;
use crate::error::ServiceResult;
use crate::orders;
use crate::state::AppState;

pub fn router(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/api/admin/orders/{id}", delete(delete_order))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin))
}

/// DELETE /api/admin/orders/{id}
pub async fn delete_order(
    State(state): State<AppState>,
    Path(order_id): Path<i64>,
) -> ServiceResult<Json<Value>> {
    orders::delete_order(state.store.as_ref(), order_id).await?;
    Ok(Json(json!({ "message": "Order deleted successfully." })))
}
