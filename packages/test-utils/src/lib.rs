//! Shared test utilities for the Hearth workspace
//!
//! Deterministic stand-ins for collaborators that would otherwise depend on
//! wall-clock time or randomness.
//!
//! # Utilities
//!
//! - [`ManualTimer`] - a [`Timer`](hearth_timer::Timer) that only ticks when told to
//! - [`ScriptedIds`] - an id source that replays a fixed sequence
//!
//! # Example
//!
//! ```rust,ignore
//! use hearth_test_utils::ManualTimer;
//!
//! let timer = Arc::new(ManualTimer::new());
//! let manager = SessionManager::new(timer.clone(), &config);
//! manager.create_session(60)?;
//!
//! assert_eq!(timer.subscription_count(), 1);
//! timer.fire();
//! ```

mod ids;
mod timer;

pub use ids::ScriptedIds;
pub use timer::ManualTimer;
