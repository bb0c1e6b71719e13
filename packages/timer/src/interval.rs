//! Tokio-backed periodic timer

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::runtime::Handle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::{SubscriptionId, Timer, TimerSubscriber};

/// Shortest interval a subscription runs at; shorter requests are raised to it
pub const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Timer that runs one tokio task per subscription
///
/// The runtime handle is captured at construction, so `subscribe` and
/// `unsubscribe` may be called from any thread, including from inside a tick.
pub struct IntervalTimer {
    handle: Handle,
    subscriptions: Arc<DashMap<SubscriptionId, CancellationToken>>,
    next_id: AtomicU64,
    shutdown: CancellationToken,
}

impl IntervalTimer {
    /// Create a timer that spawns its tick tasks on `handle`
    pub fn new(handle: Handle) -> Self {
        Self {
            handle,
            subscriptions: Arc::new(DashMap::new()),
            next_id: AtomicU64::new(1),
            shutdown: CancellationToken::new(),
        }
    }

    /// Create a timer on the runtime of the calling context
    ///
    /// # Panics
    ///
    /// Panics when called outside of a tokio runtime.
    pub fn current() -> Self {
        Self::new(Handle::current())
    }

    /// Number of live subscriptions
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    /// Cancel every subscription; later subscriptions are cancelled immediately
    pub fn shutdown(&self) {
        tracing::debug!(
            subscriptions = self.subscriptions.len(),
            "Shutting down interval timer"
        );
        self.shutdown.cancel();
        self.subscriptions.clear();
    }
}

impl Timer for IntervalTimer {
    fn subscribe(&self, subscriber: Arc<dyn TimerSubscriber>, interval: Duration) -> SubscriptionId {
        let id = SubscriptionId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        let interval = if interval < MIN_INTERVAL {
            tracing::warn!(subscription = %id, requested = ?interval, "Timer interval too short, using minimum");
            MIN_INTERVAL
        } else {
            interval
        };
        let token = self.shutdown.child_token();
        self.subscriptions.insert(id, token.clone());

        let subscriber = Arc::downgrade(&subscriber);
        let subscriptions = Arc::clone(&self.subscriptions);

        tracing::debug!(subscription = %id, interval_ms = interval.as_millis() as u64, "Timer subscription added");

        self.handle.spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        if token.is_cancelled() {
                            break;
                        }
                        match subscriber.upgrade() {
                            Some(subscriber) => subscriber.timer_notify(),
                            None => {
                                tracing::debug!(subscription = %id, "Timer subscriber dropped");
                                subscriptions.remove(&id);
                                break;
                            }
                        }
                    }
                }
            }
        });

        id
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        match self.subscriptions.remove(&id) {
            Some((_, token)) => {
                token.cancel();
                tracing::debug!(subscription = %id, "Timer subscription removed");
                true
            }
            None => false,
        }
    }
}

impl Drop for IntervalTimer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
