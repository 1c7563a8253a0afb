//! Inbound SMS webhook

use axum::extract::rejection::FormRejection;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Form, Router, middleware};
use http::{StatusCode, header};
use serde::Deserialize;

use crate::auth::rate_limit::sms_rate_limit;
use crate::sms::{handle_inbound, twiml};
use crate::state::AppState;

pub fn router(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/api/sms/inbound", post(inbound_sms))
        .route_layer(middleware::from_fn_with_state(state.clone(), sms_rate_limit))
}

/// Fields of the gateway's form post we act on; the rest are ignored
#[derive(Debug, Default, Deserialize)]
pub struct InboundSms {
    #[serde(rename = "From")]
    pub from: Option<String>,
    #[serde(rename = "Body")]
    pub body: Option<String>,
}

/// POST /api/sms/inbound
pub async fn inbound_sms(
    State(state): State<AppState>,
    form: Result<Form<InboundSms>, FormRejection>,
) -> Response {
    let Form(sms) = match form {
        Ok(form) => form,
        Err(e) => {
            tracing::warn!(error = %e, "Unreadable inbound SMS");
            return (StatusCode::BAD_REQUEST, e.body_text()).into_response();
        }
    };

    let Some(from) = sms.from.filter(|f| !f.trim().is_empty()) else {
        return (StatusCode::BAD_REQUEST, "Missing 'From' number.").into_response();
    };
    let body = sms.body.unwrap_or_default();

    tracing::info!(from = %from, "Inbound SMS");
    let reply = handle_inbound(state.store.as_ref(), from.trim(), &body).await;

    (
        [(header::CONTENT_TYPE, "application/xml")],
        twiml(&reply),
    )
        .into_response()
}
