//! Mock tasks and collaborators for task processor tests

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use hearth_task_processor::{
    CancellationToken, ChangeListener, ContentStore, ObjectId, OnlineService, Task, TaskError,
    TaskKind, TaskOutcome, TaskResult,
};

/// Shared log of task side effects, in execution order
#[derive(Clone, Default)]
pub struct ExecutionLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl ExecutionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, label: impl Into<String>) {
        self.entries.lock().unwrap().push(label.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().unwrap().clone()
    }

    pub fn contains(&self, label: &str) -> bool {
        self.entries.lock().unwrap().iter().any(|e| e == label)
    }
}

/// Task that appends its label to an [`ExecutionLog`] unless cancelled
pub struct RecordingTask {
    pub label: String,
    pub log: ExecutionLog,
    pub delay: Duration,
    pub cancellable: bool,
}

impl RecordingTask {
    pub fn new(label: impl Into<String>, log: &ExecutionLog) -> Self {
        Self {
            label: label.into(),
            log: log.clone(),
            delay: Duration::ZERO,
            cancellable: true,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn non_cancellable(mut self) -> Self {
        self.cancellable = false;
        self
    }
}

#[async_trait]
impl Task for RecordingTask {
    fn kind(&self) -> TaskKind {
        TaskKind::Generic
    }

    fn description(&self) -> String {
        format!("record {}", self.label)
    }

    fn is_cancellable(&self) -> bool {
        self.cancellable
    }

    async fn run(&self, token: &CancellationToken) -> TaskResult<TaskOutcome> {
        if token.is_cancelled() {
            return Ok(TaskOutcome::Cancelled);
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.log.push(self.label.clone());
        Ok(TaskOutcome::Completed)
    }
}

/// Task that tracks how many tasks run at the same time
pub struct ConcurrencyTracker {
    pub running: Arc<AtomicUsize>,
    pub max_seen: Arc<AtomicUsize>,
}

#[async_trait]
impl Task for ConcurrencyTracker {
    fn kind(&self) -> TaskKind {
        TaskKind::Generic
    }

    fn description(&self) -> String {
        "concurrency check".to_string()
    }

    async fn run(&self, _token: &CancellationToken) -> TaskResult<TaskOutcome> {
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_seen.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(2)).await;
        self.running.fetch_sub(1, Ordering::SeqCst);
        Ok(TaskOutcome::Completed)
    }
}

/// Task that always fails
pub struct FailingTask;

#[async_trait]
impl Task for FailingTask {
    fn kind(&self) -> TaskKind {
        TaskKind::Generic
    }

    fn description(&self) -> String {
        "always fails".to_string()
    }

    async fn run(&self, _token: &CancellationToken) -> TaskResult<TaskOutcome> {
        Err(TaskError::storage("disk full"))
    }
}

/// Task that panics
pub struct PanickingTask;

#[async_trait]
impl Task for PanickingTask {
    fn kind(&self) -> TaskKind {
        TaskKind::Generic
    }

    fn description(&self) -> String {
        "panics".to_string()
    }

    async fn run(&self, _token: &CancellationToken) -> TaskResult<TaskOutcome> {
        panic!("task exploded");
    }
}

/// Content store that assigns one container id per parent directory
#[derive(Default)]
pub struct MemoryStore {
    known: Mutex<Vec<PathBuf>>,
    containers: Mutex<HashMap<PathBuf, ObjectId>>,
    fail_on: Option<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail for any path whose file name equals `name`
    pub fn failing_on(name: &str) -> Self {
        Self {
            fail_on: Some(name.to_string()),
            ..Self::default()
        }
    }

    pub fn files(&self) -> Vec<PathBuf> {
        let mut files = self.known.lock().unwrap().clone();
        files.sort();
        files
    }

    pub fn container_of(&self, dir: &Path) -> Option<ObjectId> {
        self.containers.lock().unwrap().get(dir).copied()
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn add_file(&self, path: &Path) -> TaskResult<Option<ObjectId>> {
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        if self.fail_on.as_deref() == Some(name) {
            return Err(TaskError::storage(format!("cannot store {}", name)));
        }

        let mut known = self.known.lock().unwrap();
        if known.iter().any(|p| p == path) {
            return Ok(None);
        }
        known.push(path.to_path_buf());

        let parent = path.parent().unwrap_or(Path::new("/")).to_path_buf();
        let mut containers = self.containers.lock().unwrap();
        let next = containers.len() as ObjectId + 1;
        Ok(Some(*containers.entry(parent).or_insert(next)))
    }
}

/// Change listener that records every notification
#[derive(Default)]
pub struct RecordingListener {
    calls: Mutex<Vec<Vec<ObjectId>>>,
}

impl RecordingListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<Vec<ObjectId>> {
        self.calls.lock().unwrap().clone()
    }
}

impl ChangeListener for RecordingListener {
    fn container_changed(&self, ids: &[ObjectId]) {
        self.calls.lock().unwrap().push(ids.to_vec());
    }
}

/// Online service returning canned results
pub struct MockOnlineService {
    pub name: String,
    pub result: Mutex<Option<TaskResult<Vec<ObjectId>>>>,
    pub calls: AtomicUsize,
    pub interval: Option<Duration>,
}

impl MockOnlineService {
    pub fn returning(name: &str, changed: Vec<ObjectId>) -> Self {
        Self {
            name: name.to_string(),
            result: Mutex::new(Some(Ok(changed))),
            calls: AtomicUsize::new(0),
            interval: None,
        }
    }

    pub fn failing(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            result: Mutex::new(Some(Err(TaskError::online_service(name, message)))),
            calls: AtomicUsize::new(0),
            interval: None,
        }
    }

    /// Ask to be refreshed every `interval`
    pub fn every(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OnlineService for MockOnlineService {
    fn name(&self) -> &str {
        &self.name
    }

    fn refresh_interval(&self) -> Option<Duration> {
        self.interval
    }

    async fn refresh(&self, _token: &CancellationToken) -> TaskResult<Vec<ObjectId>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result
            .lock()
            .unwrap()
            .take()
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

/// Task that holds the worker until its sender fires or is dropped
pub struct GateTask {
    release: Mutex<Option<tokio::sync::oneshot::Receiver<()>>>,
}

impl GateTask {
    pub fn new() -> (Self, tokio::sync::oneshot::Sender<()>) {
        let (tx, rx) = tokio::sync::oneshot::channel();
        (
            Self {
                release: Mutex::new(Some(rx)),
            },
            tx,
        )
    }
}

#[async_trait]
impl Task for GateTask {
    fn kind(&self) -> TaskKind {
        TaskKind::Generic
    }

    fn description(&self) -> String {
        "gate".to_string()
    }

    async fn run(&self, _token: &CancellationToken) -> TaskResult<TaskOutcome> {
        let release = self.release.lock().unwrap().take();
        if let Some(release) = release {
            let _ = release.await;
        }
        Ok(TaskOutcome::Completed)
    }
}
