//! Role guards
//!
//! Each guard runs after [`user_auth_middleware`](super::user_auth::user_auth_middleware),
//! re-reads the account and checks the role against the stored row, not the
//! token, so a role change or a revoked approval takes effect immediately.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use shared::error::{AppError, ErrorCode};
use shared::models::{User, UserRole};

use super::UserIdentity;
use crate::db::MarketStore;
use crate::error::ServiceError;
use crate::state::AppState;

/// Account that passed a role guard
#[derive(Debug, Clone)]
pub struct AuthorizedUser(pub User);

/// Load the caller and check it holds `role`.
///
/// Farmers must also be approved.
pub async fn authorize(
    store: &dyn MarketStore,
    identity: &UserIdentity,
    role: UserRole,
) -> Result<AuthorizedUser, AppError> {
    let user = store
        .find_user(identity.user_id)
        .await
        .map_err(|e| AppError::from(ServiceError::from(e)))?
        .ok_or_else(AppError::unauthorized)?;

    if user.role != role {
        tracing::debug!(
            user_id = user.id,
            token_role = identity.role.as_db(),
            stored_role = user.role.as_db(),
            required_role = role.as_db(),
            "Role check failed"
        );
        let message = match role {
            UserRole::Buyer => "Buyers access required",
            UserRole::Farmer => "Approved farmers access required",
            UserRole::Admin => "Admin access required",
        };
        return Err(
            AppError::with_message(ErrorCode::RoleRequired, message)
                .with_detail("required_role", role.as_db()),
        );
    }

    if role == UserRole::Farmer && !user.is_approved {
        return Err(AppError::with_message(
            ErrorCode::AccountPendingApproval,
            "Your farmer account is pending approval.",
        ));
    }

    Ok(AuthorizedUser(user))
}

async fn guard(
    state: AppState,
    role: UserRole,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let identity = request
        .extensions()
        .get::<UserIdentity>()
        .copied()
        .ok_or_else(AppError::unauthorized)?;

    let user = authorize(state.store.as_ref(), &identity, role).await?;
    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}

pub async fn require_buyer(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    guard(state, UserRole::Buyer, request, next).await
}

pub async fn require_farmer(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    guard(state, UserRole::Farmer, request, next).await
}

pub async fn require_admin(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    guard(state, UserRole::Admin, request, next).await
}
