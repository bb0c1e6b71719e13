//! Background task route handlers
//!
//! - `GET /ui/tasks` - Running task and queue snapshot
//! - `POST /ui/tasks/rescan` - Queue a directory rescan
//! - `DELETE /ui/tasks/:id` - Cooperatively cancel a task and its children

use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::{
    extract::{Path as UrlPath, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use hearth_task_processor::jobs::RescanDirectoryTask;
use hearth_task_processor::{TaskId, TaskView};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::middleware::UiSession;
use crate::state::AppState;

/// Create the task router
pub fn tasks_router(state: AppState) -> Router {
    Router::new()
        .route("/tasks", get(list_tasks))
        .route("/tasks/rescan", post(rescan))
        .route("/tasks/:id", delete(cancel_task))
        .with_state(state)
}

/// Snapshot of the task processor
#[derive(Debug, Serialize)]
pub struct TaskListResponse {
    pub current: Option<TaskView>,
    pub queued: Vec<TaskView>,
}

#[derive(Debug, Deserialize)]
pub struct RescanRequest {
    /// Directory to scan, absolute or relative to the media root
    pub path: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RescanResponse {
    pub task_id: u64,
}

async fn list_tasks(State(state): State<AppState>, _session: UiSession) -> Json<TaskListResponse> {
    Json(TaskListResponse {
        current: state.processor.current_task(),
        queued: state.processor.task_list(),
    })
}

fn resolve_scan_path(root: &Path, requested: &str) -> ApiResult<PathBuf> {
    let requested = requested.trim();
    if requested.is_empty() {
        return Err(ApiError::ValidationError("path is required".to_string()));
    }

    let path = Path::new(requested);
    let path = if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    };

    if !path.is_dir() {
        return Err(ApiError::not_found("directory", path.display().to_string()));
    }
    Ok(path)
}

async fn rescan(
    State(state): State<AppState>,
    UiSession(session): UiSession,
    Json(request): Json<RescanRequest>,
) -> ApiResult<(StatusCode, Json<RescanResponse>)> {
    let path = resolve_scan_path(&state.media_root, &request.path)?;

    let task = RescanDirectoryTask::new(
        path.clone(),
        state.library.clone(),
        Arc::new(state.sessions.clone()),
    );
    let id = state.processor.add_task(task);

    tracing::info!(
        session = session.log_id(),
        task_id = %id,
        path = %path.display(),
        "Rescan requested from UI"
    );
    Ok((
        StatusCode::ACCEPTED,
        Json(RescanResponse { task_id: id.get() }),
    ))
}

/// Unknown and non-cancellable ids are accepted silently
async fn cancel_task(
    State(state): State<AppState>,
    _session: UiSession,
    UrlPath(id): UrlPath<u64>,
) -> StatusCode {
    state.processor.invalidate_task(TaskId::new(id));
    StatusCode::NO_CONTENT
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_relative_and_absolute() {
        let root = TempDir::new().unwrap();
        std::fs::create_dir(root.path().join("music")).unwrap();

        let relative = resolve_scan_path(root.path(), "music").unwrap();
        assert_eq!(relative, root.path().join("music"));

        let absolute = root.path().join("music");
        let resolved = resolve_scan_path(Path::new("/elsewhere"), absolute.to_str().unwrap()).unwrap();
        assert_eq!(resolved, absolute);
    }

    #[test]
    fn test_resolve_rejects_empty_and_missing() {
        let root = TempDir::new().unwrap();

        assert_matches!(
            resolve_scan_path(root.path(), "  "),
            Err(ApiError::ValidationError(_))
        );
        assert_matches!(
            resolve_scan_path(root.path(), "nope"),
            Err(ApiError::NotFound { resource_type: "directory", .. })
        );
    }
}
