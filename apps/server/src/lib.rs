//! Hearth server library
//!
//! Exposes the web UI session registry, route handlers and application
//! wiring for use by the binary and by integration tests.

pub mod catalog;
pub mod config;
pub mod error;
pub mod library;
pub mod middleware;
pub mod routes;
pub mod sessions;
pub mod state;

use axum::{routing::get, Extension, Router};
use tower_http::trace::TraceLayer;

pub use error::{ApiError, ApiResult, ErrorResponse};
pub use sessions::{Session, SessionError, SessionManager, UiUpdates};
pub use state::AppState;

/// Build the application router without CORS
pub fn app(state: AppState) -> Router {
    let ui_routes = Router::new()
        .merge(routes::updates_router(state.clone()))
        .merge(routes::tasks_router(state.clone()));

    Router::new()
        .route("/", get(root))
        // Nested health routes: /health, /health/live
        .nest("/health", routes::health_router())
        // Auth routes: /auth/login, /auth/logout, /auth/me
        .nest("/auth", routes::auth_router(state.clone()))
        // UI routes: /ui/updates, /ui/tasks
        .nest("/ui", ui_routes)
        // Session registry for the UiSession extractor
        .layer(Extension(state.sessions))
        .layer(TraceLayer::new_for_http())
}

async fn root() -> &'static str {
    "Welcome to Hearth - Home Media Server"
}
