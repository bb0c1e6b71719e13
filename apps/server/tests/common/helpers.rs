//! Builders for session registries, app state and HTTP requests

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, Response},
};
use hearth_server::library::MemoryLibrary;
use hearth_server::{AppState, SessionManager};
use hearth_shared_config::UiConfig;
use hearth_task_processor::TaskProcessor;
use hearth_test_utils::ManualTimer;

/// Session registry driven by a manual timer
pub fn manager_with(config: UiConfig) -> (SessionManager, Arc<ManualTimer>) {
    let timer = Arc::new(ManualTimer::new());
    let manager = SessionManager::new(timer.clone(), &config);
    (manager, timer)
}

pub fn manager() -> (SessionManager, Arc<ManualTimer>) {
    manager_with(UiConfig::default())
}

/// UI config requiring the `admin` / `s3cret` account
pub fn accounts_config() -> UiConfig {
    UiConfig {
        accounts_enabled: true,
        accounts: HashMap::from([("admin".to_string(), "s3cret".to_string())]),
        ..UiConfig::default()
    }
}

/// Everything a router test needs to poke at
pub struct TestApp {
    pub state: AppState,
    pub timer: Arc<ManualTimer>,
}

impl TestApp {
    pub fn new(config: UiConfig, media_root: &Path) -> Self {
        let (sessions, timer) = manager_with(config);
        let state = AppState::new(
            sessions,
            TaskProcessor::start(),
            Arc::new(MemoryLibrary::new()),
            media_root,
        );
        Self { state, timer }
    }

    pub fn router(&self) -> axum::Router {
        hearth_server::app(self.state.clone())
    }
}

pub fn get(uri: &str, session: Option<&str>) -> Request<Body> {
    request("GET", uri, session, Body::empty())
}

pub fn delete(uri: &str, session: Option<&str>) -> Request<Body> {
    request("DELETE", uri, session, Body::empty())
}

pub fn post_json(uri: &str, session: Option<&str>, body: serde_json::Value) -> Request<Body> {
    request("POST", uri, session, Body::from(body.to_string()))
}

fn request(method: &str, uri: &str, session: Option<&str>, body: Body) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(session) = session {
        builder = builder.header("x-session-id", session);
    }
    builder.body(body).unwrap()
}

pub async fn json_body(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
