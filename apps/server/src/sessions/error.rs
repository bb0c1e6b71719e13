//! Session registry errors

use thiserror::Error;

/// Errors raised by the [`SessionManager`](super::SessionManager)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The id generator kept producing ids that are already in use
    #[error("could not find a free session id after {attempts} attempts (last: {last_id})")]
    IdExhausted { attempts: u32, last_id: String },
}

/// Result type for session operations
pub type SessionResult<T> = Result<T, SessionError>;
