//! Request extractors shared by the route handlers

mod session;

pub use session::{SessionRejection, UiSession, SESSION_HEADER};
