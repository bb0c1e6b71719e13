//! HTTP route handlers for the Hearth web UI
//!
//! - Health checks
//! - Login and logout
//! - UI change polling
//! - Background task control

pub mod auth;
pub mod health;
pub mod tasks;
pub mod ui;

pub use auth::auth_router;
pub use health::health_router;
pub use tasks::tasks_router;
pub use ui::updates_router;
