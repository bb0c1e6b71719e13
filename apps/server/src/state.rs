//! Shared application state for route handlers

use std::path::PathBuf;
use std::sync::Arc;

use hearth_task_processor::TaskProcessor;

use crate::library::MemoryLibrary;
use crate::sessions::SessionManager;

/// State cloned into every handler
#[derive(Clone)]
pub struct AppState {
    /// UI session registry
    pub sessions: SessionManager,
    /// Background task queue
    pub processor: TaskProcessor,
    /// Content store fed by rescans
    pub library: Arc<MemoryLibrary>,
    /// Root that relative rescan paths are resolved against
    pub media_root: PathBuf,
}

impl AppState {
    pub fn new(
        sessions: SessionManager,
        processor: TaskProcessor,
        library: Arc<MemoryLibrary>,
        media_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            sessions,
            processor,
            library,
            media_root: media_root.into(),
        }
    }
}
