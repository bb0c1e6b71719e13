//! Task definitions shared by producers and the worker

use std::fmt;

use async_trait::async_trait;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::error::TaskResult;

/// Identity assigned to a task when it is enqueued
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct TaskId(u64);

impl TaskId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What kind of work a task performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// Walk a directory and register its media files
    RescanDirectory,
    /// Refresh content provided by an online service
    FetchOnlineContent,
    /// Anything else
    Generic,
}

impl TaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RescanDirectory => "rescan_directory",
            Self::FetchOnlineContent => "fetch_online_content",
            Self::Generic => "generic",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a task run ended when it did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    /// The task did all of its work
    Completed,
    /// The task observed its cancellation token and stopped early
    Cancelled,
}

/// A unit of deferred work executed by the [`TaskProcessor`](crate::TaskProcessor)
///
/// Cancellation is cooperative: `run` receives the task's token and is
/// expected to check it before doing anything effectful and at every
/// long-running step, returning [`TaskOutcome::Cancelled`] once it is set.
/// The processor never interrupts a running task.
#[async_trait]
pub trait Task: Send + Sync {
    fn kind(&self) -> TaskKind;

    /// Human readable description shown in the UI task list
    fn description(&self) -> String;

    /// Whether the UI may invalidate this task
    fn is_cancellable(&self) -> bool {
        true
    }

    async fn run(&self, token: &CancellationToken) -> TaskResult<TaskOutcome>;
}

/// Point-in-time copy of a task's public state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskView {
    pub id: TaskId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<TaskId>,
    pub kind: TaskKind,
    pub description: String,
    pub cancellable: bool,
    /// False once the task has been invalidated
    pub valid: bool,
}

/// A task owned by the processor, with its identity and validity flag
pub(crate) struct TaskEntry {
    pub(crate) id: TaskId,
    pub(crate) parent_id: Option<TaskId>,
    pub(crate) kind: TaskKind,
    pub(crate) description: String,
    pub(crate) cancellable: bool,
    pub(crate) token: CancellationToken,
    pub(crate) task: Box<dyn Task>,
}

impl TaskEntry {
    pub(crate) fn new(id: TaskId, parent_id: Option<TaskId>, task: Box<dyn Task>) -> Self {
        Self {
            id,
            parent_id,
            kind: task.kind(),
            description: task.description(),
            cancellable: task.is_cancellable(),
            token: CancellationToken::new(),
            task,
        }
    }

    pub(crate) fn is_valid(&self) -> bool {
        !self.token.is_cancelled()
    }

    pub(crate) fn view(&self) -> TaskView {
        TaskView {
            id: self.id,
            parent_id: self.parent_id,
            kind: self.kind,
            description: self.description.clone(),
            cancellable: self.cancellable,
            valid: self.is_valid(),
        }
    }
}
