//! Health check HTTP route handlers
//!
//! - `GET /health` - Simple liveness check (returns 200 OK)
//! - `GET /health/live` - Liveness check with version

use axum::{response::IntoResponse, routing::get, Json, Router};

/// Create health check router
pub fn health_router() -> Router {
    Router::new()
        .route("/", get(simple_health))
        .route("/live", get(liveness_check))
}

/// Always returns OK if the server is running
async fn simple_health() -> &'static str {
    "OK"
}

async fn liveness_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "alive",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
