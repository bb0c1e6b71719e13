//! Monotonic millisecond clock for session activity
//!
//! Readings are milliseconds since the first reading taken in this process.
//! Wall-clock adjustments do not move it. It follows tokio's clock, so a
//! paused test runtime controls it too.

use std::sync::OnceLock;
use std::time::Duration;

use tokio::time::Instant;

static ORIGIN: OnceLock<Instant> = OnceLock::new();

/// Current reading of the session clock
pub fn now_ms() -> i64 {
    let origin = *ORIGIN.get_or_init(Instant::now);
    let now = Instant::now();
    match now.checked_duration_since(origin) {
        Some(elapsed) => millis(elapsed),
        // A paused test clock can sit behind the origin.
        None => -millis(origin.duration_since(now)),
    }
}

fn millis(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}
