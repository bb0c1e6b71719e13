//! UI change polling
//!
//! `GET /ui/updates?updates=check|get|clear`
//!
//! - `check`: `{"pending": bool}` without consuming anything
//! - `get`: drains the session's pending changes, `{"updates": "" | "all" | "1,2"}`
//! - `clear`: forgets pending changes, `{"cleared": true}`

use std::str::FromStr;

use axum::{extract::Query, routing::get, Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{ApiError, ApiResult};
use crate::middleware::UiSession;
use crate::state::AppState;

/// Create the UI polling router
pub fn updates_router(state: AppState) -> Router {
    Router::new()
        .route("/updates", get(updates))
        .with_state(state)
}

/// What the poller wants to do with pending changes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdatesAction {
    Check,
    Get,
    Clear,
}

impl FromStr for UpdatesAction {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "check" => Ok(Self::Check),
            "get" => Ok(Self::Get),
            "clear" => Ok(Self::Clear),
            other => Err(ApiError::InvalidQueryParam {
                name: "updates",
                reason: format!("expected check, get or clear, got '{}'", other),
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdatesQuery {
    pub updates: Option<String>,
}

async fn updates(
    UiSession(session): UiSession,
    Query(query): Query<UpdatesQuery>,
) -> ApiResult<Json<Value>> {
    let action = query
        .updates
        .as_deref()
        .unwrap_or("check")
        .parse::<UpdatesAction>()?;

    let body = match action {
        UpdatesAction::Check => json!({ "pending": session.has_ui_update_ids() }),
        UpdatesAction::Get => {
            let updates = session.take_ui_update_ids();
            if !updates.is_none() {
                tracing::debug!(session = session.log_id(), %updates, "UI updates delivered");
            }
            json!({ "updates": updates.to_string() })
        }
        UpdatesAction::Clear => {
            session.clear_update_ids();
            json!({ "cleared": true })
        }
    };
    Ok(Json(body))
}
