//! Order API: buyer placement and listing, farmer view and status changes

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::{get, patch, post};
use axum::{Extension, Json, Router, middleware};
use http::StatusCode;
use serde::Deserialize;
use shared::models::OrderView;

use super::json_body;
use crate::auth::AuthorizedUser;
use crate::auth::guard::{require_buyer, require_farmer};
use crate::error::ServiceResult;
use crate::notify::spawn_dispatch;
use crate::orders::{self, LineRequest};
use crate::state::AppState;

pub fn router(state: &AppState) -> Router<AppState> {
    let buyer = Router::new()
        .route("/api/orders", post(create_order).get(list_buyer_orders))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_buyer));

    let farmer = Router::new()
        .route("/api/orders/farmer", get(list_farmer_orders))
        .route("/api/orders/{id}", patch(update_status))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_farmer,
        ));

    buyer.merge(farmer)
}

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub items: Vec<LineRequest>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

/// POST /api/orders
pub async fn create_order(
    State(state): State<AppState>,
    Extension(AuthorizedUser(buyer)): Extension<AuthorizedUser>,
    payload: Result<Json<CreateOrderRequest>, JsonRejection>,
) -> ServiceResult<(StatusCode, Json<OrderView>)> {
    let req = json_body(payload)?;
    let placed = orders::create_order(state.store.as_ref(), buyer.id, &req.items).await?;
    spawn_dispatch(state.notifier.clone(), placed.notices);
    Ok((StatusCode::CREATED, Json(placed.order)))
}

/// GET /api/orders
pub async fn list_buyer_orders(
    State(state): State<AppState>,
    Extension(AuthorizedUser(buyer)): Extension<AuthorizedUser>,
) -> ServiceResult<Json<Vec<OrderView>>> {
    Ok(Json(
        orders::buyer_orders(state.store.as_ref(), buyer.id).await?,
    ))
}

/// GET /api/orders/farmer
pub async fn list_farmer_orders(
    State(state): State<AppState>,
    Extension(AuthorizedUser(farmer)): Extension<AuthorizedUser>,
) -> ServiceResult<Json<Vec<OrderView>>> {
    Ok(Json(
        orders::farmer_orders(state.store.as_ref(), farmer.id).await?,
    ))
}

/// PATCH /api/orders/{id}
pub async fn update_status(
    State(state): State<AppState>,
    Extension(AuthorizedUser(farmer)): Extension<AuthorizedUser>,
    Path(order_id): Path<i64>,
    payload: Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> ServiceResult<Json<OrderView>> {
    let req = json_body(payload)?;
    let view = orders::update_status(state.store.as_ref(), farmer.id, order_id, &req.status).await?;
    Ok(Json(view))
}
