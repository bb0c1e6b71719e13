//! Session extractor for Axum handlers
//!
//! The UI sends its session id in the `X-Session-Id` header. [`UiSession`]
//! resolves it against the [`SessionManager`] stored in the request
//! extensions, requires the session to be logged in and records the access.
//!
//! ```rust,ignore
//! async fn handler(UiSession(session): UiSession) -> String {
//!     session.get("username").unwrap_or_default()
//! }
//! ```

use std::sync::Arc;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, HeaderName},
    response::{IntoResponse, Response},
};

use crate::error::ApiError;
use crate::sessions::{Session, SessionManager};

/// Header carrying the UI session id
pub static SESSION_HEADER: HeaderName = HeaderName::from_static("x-session-id");

/// A live, logged-in session
#[derive(Debug, Clone)]
pub struct UiSession(pub Arc<Session>);

/// Why a request was not matched to a session
#[derive(Debug)]
pub enum SessionRejection {
    /// No `X-Session-Id` header
    MissingSessionId,
    /// The id does not belong to a live session
    UnknownSession,
    /// The session exists but never logged in
    NotLoggedIn,
    /// The router was built without a session registry
    MissingServices,
}

impl IntoResponse for SessionRejection {
    fn into_response(self) -> Response {
        let error = match self {
            SessionRejection::MissingSessionId => {
                tracing::debug!("Session rejected: missing session id");
                ApiError::Unauthorized
            }
            SessionRejection::UnknownSession => {
                tracing::debug!("Session rejected: unknown or expired session");
                ApiError::Unauthorized
            }
            SessionRejection::NotLoggedIn => {
                tracing::debug!("Session rejected: not logged in");
                ApiError::Unauthorized
            }
            SessionRejection::MissingServices => {
                tracing::error!("Session rejected: session manager missing from extensions");
                ApiError::Internal("session registry not configured".to_string())
            }
        };
        error.into_response()
    }
}

fn session_id(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(&SESSION_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|id| !id.is_empty())
}

#[async_trait]
impl<S> FromRequestParts<S> for UiSession
where
    S: Send + Sync,
{
    type Rejection = SessionRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = session_id(parts).ok_or(SessionRejection::MissingSessionId)?;

        let sessions = parts
            .extensions
            .get::<SessionManager>()
            .ok_or(SessionRejection::MissingServices)?;

        let session = sessions
            .get_session(id)
            .ok_or(SessionRejection::UnknownSession)?;
        if !session.is_logged_in() {
            return Err(SessionRejection::NotLoggedIn);
        }

        session.access();
        Ok(UiSession(session))
    }
}
