//! Produce API: listing browse and farmer listing management

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::routing::{get, post, put};
use axum::{Extension, Json, Router, middleware};
use http::StatusCode;
use shared::error::AppError;
use shared::models::{Listing, ListingFilter, ListingUpdate, NewListing};

use super::json_body;
use crate::auth::AuthorizedUser;
use crate::auth::guard::require_farmer;
use crate::error::ServiceResult;
use crate::listings;
use crate::state::AppState;

pub fn router(state: &AppState) -> Router<AppState> {
    let browse = Router::new().route("/api/produce", get(list_produce));

    let farmer = Router::new()
        .route("/api/produce", post(create_produce))
        .route("/api/produce/{id}", put(update_produce).delete(delete_produce))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_farmer,
        ));

    browse.merge(farmer)
}

/// GET /api/produce?name=&location=&min_price=&max_price=
pub async fn list_produce(
    State(state): State<AppState>,
    filter: Result<Query<ListingFilter>, QueryRejection>,
) -> ServiceResult<Json<Vec<Listing>>> {
    let Query(filter) = filter.map_err(|e| AppError::validation(e.body_text()))?;
    Ok(Json(listings::browse(state.store.as_ref(), &filter).await?))
}

/// POST /api/produce
pub async fn create_produce(
    State(state): State<AppState>,
    Extension(AuthorizedUser(farmer)): Extension<AuthorizedUser>,
    payload: Result<Json<NewListing>, JsonRejection>,
) -> ServiceResult<(StatusCode, Json<Listing>)> {
    let req = json_body(payload)?;
    let listing = listings::create_listing(state.store.as_ref(), farmer.id, &req).await?;
    Ok((StatusCode::CREATED, Json(listing)))
}

/// PUT /api/produce/{id}
pub async fn update_produce(
    State(state): State<AppState>,
    Extension(AuthorizedUser(farmer)): Extension<AuthorizedUser>,
    Path(listing_id): Path<i64>,
    payload: Result<Json<ListingUpdate>, JsonRejection>,
) -> ServiceResult<Json<Listing>> {
    let req = json_body(payload)?;
    let listing =
        listings::update_listing(state.store.as_ref(), farmer.id, listing_id, &req).await?;
    Ok(Json(listing))
}

/// DELETE /api/produce/{id}
pub async fn delete_produce(
    State(state): State<AppState>,
    Extension(AuthorizedUser(farmer)): Extension<AuthorizedUser>,
    Path(listing_id): Path<i64>,
) -> ServiceResult<StatusCode> {
    listings::delete_listing(state.store.as_ref(), farmer.id, listing_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
