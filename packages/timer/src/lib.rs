//! Periodic timer subscriptions
//!
//! Components that need a recurring callback (the UI session sweep, for
//! example) register a [`TimerSubscriber`] with a [`Timer`] and receive
//! [`TimerSubscriber::timer_notify`] at the requested interval until they
//! unsubscribe. Ticks are delivered on the timer's own execution context, so
//! subscribers must tolerate being called from a thread other than the one
//! that subscribed.
//!
//! [`IntervalTimer`] is the tokio-backed implementation used by the server.

mod interval;

pub use interval::{IntervalTimer, MIN_INTERVAL};

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Handle identifying one subscription on a [`Timer`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// Wrap a raw subscription number
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw subscription number
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Receiver of periodic timer ticks
pub trait TimerSubscriber: Send + Sync {
    /// Called once per elapsed interval
    fn timer_notify(&self);
}

/// A source of periodic ticks
///
/// Implementations keep only a weak reference to each subscriber; the owner
/// is responsible for keeping it alive while subscribed.
pub trait Timer: Send + Sync {
    /// Start delivering ticks to `subscriber` every `interval`
    fn subscribe(&self, subscriber: Arc<dyn TimerSubscriber>, interval: Duration) -> SubscriptionId;

    /// Stop delivering ticks for `id`
    ///
    /// Returns `false` if the subscription was unknown or already removed.
    fn unsubscribe(&self, id: SubscriptionId) -> bool;
}
