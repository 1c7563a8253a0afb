//! Health check endpoint

use axum::routing::get;
use axum::{Json, Router};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "market-server",
        "version": env!("CARGO_PKG_VERSION"),
        "git_hash": option_env!("GIT_HASH").unwrap_or("dev"),
    }))
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use crate::payments::testing::FakeResponse;
    use http::StatusCode;

    #[tokio::test]
    async fn test_health() {
        let app = TestApp::new(FakeResponse::Reject);
        let (status, json) = app.send_json(empty_request("GET", "/health", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "ok");
        assert_eq!(json["service"], "market-server");
    }
}
