//! Manually driven timer
//!
//! # Lock Poisoning Recovery
//!
//! Locks are acquired with `unwrap_or_else(|e| e.into_inner())` so a test
//! that panics while holding one does not poison the timer for the next.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use hearth_timer::{SubscriptionId, Timer, TimerSubscriber};

struct Subscription {
    id: SubscriptionId,
    subscriber: Weak<dyn TimerSubscriber>,
    interval: Duration,
}

/// Timer whose ticks are delivered only by calling [`ManualTimer::fire`]
///
/// Subscribers are held weakly, like the production timer.
#[derive(Default)]
pub struct ManualTimer {
    subscriptions: Mutex<Vec<Subscription>>,
    next_id: AtomicU64,
    unsubscribes: AtomicU64,
}

impl ManualTimer {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Subscription>> {
        self.subscriptions.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Deliver one tick to every live subscriber
    ///
    /// Subscribers may subscribe or unsubscribe from inside the callback.
    /// Returns the number of subscribers notified.
    pub fn fire(&self) -> usize {
        let targets: Vec<Arc<dyn TimerSubscriber>> = self
            .lock()
            .iter()
            .filter_map(|s| s.subscriber.upgrade())
            .collect();

        for subscriber in &targets {
            subscriber.timer_notify();
        }
        targets.len()
    }

    /// Deliver `n` ticks
    pub fn fire_times(&self, n: usize) {
        for _ in 0..n {
            self.fire();
        }
    }

    pub fn subscription_count(&self) -> usize {
        self.lock().len()
    }

    pub fn is_subscribed(&self, id: SubscriptionId) -> bool {
        self.lock().iter().any(|s| s.id == id)
    }

    /// Interval requested by subscription `id`
    pub fn interval_of(&self, id: SubscriptionId) -> Option<Duration> {
        self.lock().iter().find(|s| s.id == id).map(|s| s.interval)
    }

    /// Total number of subscriptions ever created
    pub fn subscribe_calls(&self) -> u64 {
        self.next_id.load(Ordering::SeqCst)
    }

    /// Total number of successful unsubscribe calls
    pub fn unsubscribe_calls(&self) -> u64 {
        self.unsubscribes.load(Ordering::SeqCst)
    }
}

impl Timer for ManualTimer {
    fn subscribe(&self, subscriber: Arc<dyn TimerSubscriber>, interval: Duration) -> SubscriptionId {
        let id = SubscriptionId::new(self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        self.lock().push(Subscription {
            id,
            subscriber: Arc::downgrade(&subscriber),
            interval,
        });
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscriptions = self.lock();
        let before = subscriptions.len();
        subscriptions.retain(|s| s.id != id);
        let removed = subscriptions.len() != before;
        if removed {
            self.unsubscribes.fetch_add(1, Ordering::SeqCst);
        }
        removed
    }
}
