//! Background task scheduler for Hearth
//!
//! Long-running jobs (library rescans, online service refreshes) are queued
//! on a [`TaskProcessor`] and executed one at a time, in submission order, by
//! a single worker. Running work is never interrupted; cancellation is
//! cooperative through each task's [`CancellationToken`].

pub mod content;
pub mod error;
pub mod jobs;
mod processor;
mod task;

pub use content::{ChangeListener, ContentStore, ObjectId, OnlineService, INVALID_OBJECT_ID};
pub use error::{ErrorSeverity, TaskError, TaskResult};
pub use processor::TaskProcessor;
pub use task::{Task, TaskId, TaskKind, TaskOutcome, TaskView};

pub use tokio_util::sync::CancellationToken;
