//! Directory rescan task
//!
//! Walks a directory tree, hands every media file to the content store and
//! tells the change listener which containers gained entries.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use walkdir::WalkDir;

use crate::content::{ChangeListener, ContentStore, ObjectId};
use crate::error::{TaskError, TaskResult};
use crate::task::{Task, TaskKind, TaskOutcome};

/// Supported media file extensions
pub const MEDIA_EXTENSIONS: &[&str] = &[
    // Audio
    "mp3", "ogg", "opus", "aac", "m4a", "wma", "flac", "wav", "aiff", "aif", "alac", "ape", "wv",
    // Video
    "mkv", "mp4", "m4v", "avi", "mov", "mpg", "mpeg", "ts", "webm", "wmv",
    // Images
    "jpg", "jpeg", "png", "gif", "bmp",
];

/// Check if a file path has a supported media extension
pub fn is_media_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| MEDIA_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Rescan one directory of the media library
pub struct RescanDirectoryTask {
    path: PathBuf,
    store: Arc<dyn ContentStore>,
    listener: Arc<dyn ChangeListener>,
    follow_links: bool,
    cancellable: bool,
}

impl RescanDirectoryTask {
    pub fn new(
        path: impl Into<PathBuf>,
        store: Arc<dyn ContentStore>,
        listener: Arc<dyn ChangeListener>,
    ) -> Self {
        Self {
            path: path.into(),
            store,
            listener,
            follow_links: true,
            cancellable: true,
        }
    }

    /// Do not descend into symlinked directories
    pub fn without_following_links(mut self) -> Self {
        self.follow_links = false;
        self
    }

    /// Mark the rescan as one the UI may not cancel
    pub fn non_cancellable(mut self) -> Self {
        self.cancellable = false;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn notify(&self, changed: &BTreeSet<ObjectId>) {
        if !changed.is_empty() {
            let ids: Vec<ObjectId> = changed.iter().copied().collect();
            self.listener.container_changed(&ids);
        }
    }
}

#[async_trait]
impl Task for RescanDirectoryTask {
    fn kind(&self) -> TaskKind {
        TaskKind::RescanDirectory
    }

    fn description(&self) -> String {
        format!("Scanning directory: {}", self.path.display())
    }

    fn is_cancellable(&self) -> bool {
        self.cancellable
    }

    async fn run(&self, token: &CancellationToken) -> TaskResult<TaskOutcome> {
        if token.is_cancelled() {
            return Ok(TaskOutcome::Cancelled);
        }
        if !self.path.is_dir() {
            return Err(TaskError::DirectoryNotFound(self.path.clone()));
        }

        tracing::info!(path = %self.path.display(), "Starting directory rescan");

        let mut changed = BTreeSet::new();
        let mut added = 0usize;
        let mut skipped = 0usize;
        let mut errors = 0usize;

        for entry in WalkDir::new(&self.path).follow_links(self.follow_links) {
            // Anything registered so far is already visible in storage, so
            // the UI hears about it even when the scan stops early.
            if token.is_cancelled() {
                tracing::info!(path = %self.path.display(), added, "Directory rescan cancelled");
                self.notify(&changed);
                return Ok(TaskOutcome::Cancelled);
            }

            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping unreadable directory entry");
                    errors += 1;
                    continue;
                }
            };

            let path = entry.path();
            if !entry.file_type().is_file() || !is_media_file(path) {
                continue;
            }

            match self.store.add_file(path).await {
                Ok(Some(container)) => {
                    added += 1;
                    changed.insert(container);
                }
                Ok(None) => skipped += 1,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to add file");
                    errors += 1;
                }
            }
        }

        self.notify(&changed);

        tracing::info!(
            path = %self.path.display(),
            added,
            skipped,
            errors,
            containers = changed.len(),
            "Directory rescan completed"
        );

        Ok(TaskOutcome::Completed)
    }
}
