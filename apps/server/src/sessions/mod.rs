//! Web UI session tracking
//!
//! - [`Session`]: per-client login state, scratch values and pending UI changes
//! - [`SessionManager`]: the registry, expiry sweep and change fan-out

pub mod clock;
mod error;
mod manager;
mod session;

pub use error::{SessionError, SessionResult};
pub use manager::{random_session_id, IdGenerator, SessionManager, MAX_ID_ATTEMPTS};
pub use session::{Session, UiUpdates};
