//! Error handling for background tasks
//!
//! Task failures never propagate to the producer that enqueued the task; the
//! worker logs them through [`TaskError::log`] and moves on to the next task.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while executing a task
#[derive(Error, Debug)]
pub enum TaskError {
    // ========== Library Scan Errors ==========
    /// Directory to scan does not exist or is not a directory
    #[error("directory not found: {0}")]
    DirectoryNotFound(PathBuf),

    // ========== Collaborator Errors ==========
    /// Content storage rejected an operation
    #[error("storage error: {0}")]
    Storage(String),

    /// Online service returned an error
    #[error("online service error from {service}: {message}")]
    OnlineService { service: String, message: String },

    /// Online service did not answer in time
    #[error("online service timeout: {service}")]
    ServiceTimeout { service: String },

    // ========== Internal Errors ==========
    /// Task panicked while executing
    #[error("task panicked: {0}")]
    Panicked(String),
}

impl TaskError {
    /// Get a severity level for logging
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Panicked(_) => ErrorSeverity::Critical,

            Self::Storage(_) => ErrorSeverity::Error,

            Self::OnlineService { .. } | Self::ServiceTimeout { .. } => ErrorSeverity::Warning,

            Self::DirectoryNotFound(_) => ErrorSeverity::Info,
        }
    }

    /// Log the error with appropriate severity
    pub fn log(&self, task_id: u64, kind: &str) {
        match self.severity() {
            ErrorSeverity::Critical => {
                tracing::error!(error = %self, task_id, kind, "Critical task failure");
            }
            ErrorSeverity::Error => {
                tracing::error!(error = %self, task_id, kind, "Task failed");
            }
            ErrorSeverity::Warning => {
                tracing::warn!(error = %self, task_id, kind, "Task failed");
            }
            ErrorSeverity::Info => {
                tracing::info!(error = %self, task_id, kind, "Task did not run");
            }
        }
    }

    /// Create an online service error
    pub fn online_service(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::OnlineService {
            service: service.into(),
            message: message.into(),
        }
    }

    /// Create a timeout error for `service`
    pub fn service_timeout(service: impl Into<String>) -> Self {
        Self::ServiceTimeout {
            service: service.into(),
        }
    }

    /// Create a storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }
}

/// Error severity levels for logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Errors that point at a bug in a task
    Critical,
    /// Standard errors
    Error,
    /// Warnings for expected failures
    Warning,
    /// Informational, nothing went wrong on our side
    Info,
}

/// Result type for task operations
pub type TaskResult<T> = Result<T, TaskError>;
