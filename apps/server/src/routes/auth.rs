//! Authentication REST route handlers
//!
//! - `POST /auth/login` - Create a logged-in UI session
//! - `DELETE /auth/logout` - Drop the caller's session
//! - `GET /auth/me` - Who the caller's session belongs to

use axum::{
    extract::State,
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::middleware::UiSession;
use crate::state::AppState;

/// Scratch key holding the logged-in user name
pub const USERNAME_KEY: &str = "username";

/// Create authentication router
pub fn auth_router(state: AppState) -> Router {
    Router::new()
        .route("/login", post(login))
        .route("/logout", delete(logout))
        .route("/me", get(me))
        .with_state(state)
}

// ========== Request/Response Types ==========

/// Login request body
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Login response
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    /// Value for the `X-Session-Id` header on later requests
    pub session_id: String,
}

/// Current session owner
#[derive(Debug, Serialize, Deserialize)]
pub struct MeResponse {
    pub username: String,
}

// ========== Handlers ==========

/// Check credentials and open a session
///
/// With accounts disabled any credentials are accepted.
async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let username = request.username.trim();
    if username.is_empty() {
        return Err(ApiError::ValidationError("username is required".to_string()));
    }

    if !state.sessions.check_credentials(username, &request.password) {
        tracing::info!(username, "Rejected UI login");
        return Err(ApiError::InvalidCredentials);
    }

    let session = state
        .sessions
        .create_session(state.sessions.session_timeout_secs())?;
    session.put(USERNAME_KEY, username);
    session.set_logged_in(true);

    tracing::info!(username, session = session.log_id(), "UI login");
    Ok(Json(LoginResponse {
        session_id: session.id().to_string(),
    }))
}

async fn logout(State(state): State<AppState>, UiSession(session): UiSession) -> StatusCode {
    session.set_logged_in(false);
    state.sessions.remove_session(session.id());
    tracing::info!(session = session.log_id(), "UI logout");
    StatusCode::NO_CONTENT
}

async fn me(UiSession(session): UiSession) -> Json<MeResponse> {
    Json(MeResponse {
        username: session.get(USERNAME_KEY).unwrap_or_default(),
    })
}
