//! In-memory content library
//!
//! Rescans register media files here and online refreshes register remote
//! items. Every directory that holds media and every online service gets one
//! container id, handed out in discovery order starting after the root.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use hearth_task_processor::content::ROOT_CONTAINER_ID;
use hearth_task_processor::{ContentStore, ObjectId, TaskResult};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum ContainerKey {
    Directory(PathBuf),
    Service(String),
}

#[derive(Default)]
struct LibraryState {
    files: HashSet<PathBuf>,
    online_items: HashSet<(String, String)>,
    containers: HashMap<ContainerKey, ObjectId>,
}

impl LibraryState {
    fn container_for(&mut self, key: ContainerKey) -> ObjectId {
        let next = ROOT_CONTAINER_ID + 1 + self.containers.len() as ObjectId;
        *self.containers.entry(key).or_insert(next)
    }
}

/// Content store backed by process memory
#[derive(Default)]
pub struct MemoryLibrary {
    state: Mutex<LibraryState>,
}

impl MemoryLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, LibraryState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn file_count(&self) -> usize {
        self.lock().files.len()
    }

    pub fn online_item_count(&self) -> usize {
        self.lock().online_items.len()
    }

    pub fn container_count(&self) -> usize {
        self.lock().containers.len()
    }

    /// Container id assigned to `dir`, if it holds any media
    pub fn container_id(&self, dir: &Path) -> Option<ObjectId> {
        self.lock()
            .containers
            .get(&ContainerKey::Directory(dir.to_path_buf()))
            .copied()
    }

    /// Container id assigned to an online service, if it has any items
    pub fn service_container_id(&self, service: &str) -> Option<ObjectId> {
        self.lock()
            .containers
            .get(&ContainerKey::Service(service.to_string()))
            .copied()
    }

    /// Register an item published by an online service
    ///
    /// Returns the service container id, or `None` if the item was already known.
    pub fn add_online_item(&self, service: &str, url: &str) -> Option<ObjectId> {
        let mut state = self.lock();
        if !state
            .online_items
            .insert((service.to_string(), url.to_string()))
        {
            return None;
        }

        let id = state.container_for(ContainerKey::Service(service.to_string()));
        tracing::trace!(service, url, container = id, "Online item added to library");
        Some(id)
    }
}

#[async_trait]
impl ContentStore for MemoryLibrary {
    async fn add_file(&self, path: &Path) -> TaskResult<Option<ObjectId>> {
        let mut state = self.lock();
        if !state.files.insert(path.to_path_buf()) {
            return Ok(None);
        }

        let Some(parent) = path.parent() else {
            return Ok(Some(ROOT_CONTAINER_ID));
        };
        let id = state.container_for(ContainerKey::Directory(parent.to_path_buf()));

        tracing::trace!(path = %path.display(), container = id, "File added to library");
        Ok(Some(id))
    }
}
