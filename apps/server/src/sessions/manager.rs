//! Session registry
//!
//! Sessions live in a small vector scanned linearly; a home server has a
//! handful of UI clients at most. The registry holds a timer subscription
//! only while at least one session exists, and each tick evicts sessions that
//! have been idle for longer than their timeout.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use hearth_shared_config::UiConfig;
use hearth_task_processor::{ChangeListener, ObjectId};
use hearth_timer::{SubscriptionId, Timer, TimerSubscriber};

use super::clock;
use super::error::{SessionError, SessionResult};
use super::session::Session;

/// Consecutive id collisions tolerated before `create_session` gives up
pub const MAX_ID_ATTEMPTS: u32 = 100;

/// Source of candidate session ids
pub type IdGenerator = Arc<dyn Fn() -> String + Send + Sync>;

/// 128 random bits as 32 lowercase hex characters
pub fn random_session_id() -> String {
    format!("{:032x}", rand::random::<u128>())
}

/// Registry of live UI sessions
///
/// Cloning is cheap; all clones share the same registry.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<Inner>,
}

enum TimerSubscription {
    Unsubscribed,
    Subscribed(SubscriptionId),
}

struct Registry {
    sessions: Vec<Arc<Session>>,
    subscription: TimerSubscription,
}

struct Inner {
    registry: Mutex<Registry>,
    /// Mirrors `registry.sessions.len()`, readable without the lock
    session_count: AtomicUsize,
    accounts: HashMap<String, String>,
    accounts_enabled: bool,
    session_timeout_secs: u64,
    max_update_ids: usize,
    sweep_interval: Duration,
    timer: Arc<dyn Timer>,
    generate_id: IdGenerator,
    /// Handed to the timer; the timer only keeps a weak reference
    weak_self: Weak<Inner>,
}

impl SessionManager {
    /// Create a registry with random session ids
    pub fn new(timer: Arc<dyn Timer>, config: &UiConfig) -> Self {
        Self::with_id_generator(timer, config, Arc::new(random_session_id))
    }

    /// Create a registry that draws session ids from `generate_id`
    ///
    /// A zero update-id cap or sweep interval is raised to 1.
    pub fn with_id_generator(
        timer: Arc<dyn Timer>,
        config: &UiConfig,
        generate_id: IdGenerator,
    ) -> Self {
        if let Err(e) = config.validate() {
            tracing::warn!(error = %e, "Invalid UI configuration, clamping to usable values");
        }

        let inner = Arc::new_cyclic(|weak_self| Inner {
            registry: Mutex::new(Registry {
                sessions: Vec::new(),
                subscription: TimerSubscription::Unsubscribed,
            }),
            session_count: AtomicUsize::new(0),
            accounts: config.accounts.clone(),
            accounts_enabled: config.accounts_enabled,
            session_timeout_secs: config.session_timeout_secs,
            max_update_ids: config.max_update_ids.max(1),
            sweep_interval: Duration::from_secs(config.sweep_interval_secs.max(1)),
            timer,
            generate_id,
            weak_self: weak_self.clone(),
        });
        Self { inner }
    }

    /// Idle timeout applied to sessions created by the web layer
    pub fn session_timeout_secs(&self) -> u64 {
        self.inner.session_timeout_secs
    }

    pub fn accounts_enabled(&self) -> bool {
        self.inner.accounts_enabled
    }

    /// Create and register a new, not yet logged in session
    pub fn create_session(&self, timeout_secs: u64) -> SessionResult<Arc<Session>> {
        self.inner.create_session(timeout_secs)
    }

    pub fn get_session(&self, id: &str) -> Option<Arc<Session>> {
        let registry = self.inner.lock();
        find_session(&registry, id)
    }

    /// Remove a session; returns whether it existed
    pub fn remove_session(&self, id: &str) -> bool {
        self.inner.remove_session(id)
    }

    /// Configured password for `user`
    pub fn get_user_password(&self, user: &str) -> Option<String> {
        self.inner.accounts.get(user).cloned()
    }

    /// Check a login attempt
    ///
    /// With accounts disabled every login is accepted.
    pub fn check_credentials(&self, user: &str, password: &str) -> bool {
        if !self.inner.accounts_enabled {
            return true;
        }
        self.inner
            .accounts
            .get(user)
            .is_some_and(|expected| expected == password)
    }

    /// Tell every logged-in session that container `id` changed
    pub fn container_changed_ui(&self, id: ObjectId) {
        self.inner.fan_out(|session| session.container_changed_ui(id));
    }

    /// Tell every logged-in session that `ids` changed
    pub fn container_changed_ui_batch(&self, ids: &[ObjectId]) {
        self.inner
            .fan_out(|session| session.container_changed_ui_batch(ids));
    }

    /// Reconcile the timer subscription with the number of sessions
    pub fn check_timer(&self) {
        let mut registry = self.inner.lock();
        self.inner.check_timer(&mut registry);
    }

    /// Evict sessions idle for longer than their timeout at `now_ms`
    ///
    /// `now_ms` is a reading of the session clock ([`clock::now_ms`]).
    ///
    /// Returns the number of sessions evicted.
    pub fn sweep_expired_at(&self, now_ms: i64) -> usize {
        self.inner.sweep_expired_at(now_ms)
    }

    pub fn session_count(&self) -> usize {
        self.inner.session_count.load(Ordering::Acquire)
    }

    pub fn is_timer_subscribed(&self) -> bool {
        matches!(
            self.inner.lock().subscription,
            TimerSubscription::Subscribed(_)
        )
    }
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn create_session(&self, timeout_secs: u64) -> SessionResult<Arc<Session>> {
        let mut registry = self.lock();

        let mut attempts = 0;
        let id = loop {
            let candidate = (self.generate_id)();
            attempts += 1;
            if find_session(&registry, &candidate).is_none() {
                break candidate;
            }
            if attempts >= MAX_ID_ATTEMPTS {
                tracing::error!(
                    attempts,
                    last_id = %candidate,
                    "Session id generator keeps returning ids already in use"
                );
                return Err(SessionError::IdExhausted {
                    attempts,
                    last_id: candidate,
                });
            }
        };

        let session = Arc::new(Session::new(id, timeout_secs, self.max_update_ids));
        registry.sessions.push(Arc::clone(&session));
        self.session_count
            .store(registry.sessions.len(), Ordering::Release);
        self.check_timer(&mut registry);

        tracing::debug!(
            session = session.log_id(),
            timeout_secs,
            sessions = registry.sessions.len(),
            "Session created"
        );
        Ok(session)
    }

    fn remove_session(&self, id: &str) -> bool {
        let mut registry = self.lock();
        let Some(index) = registry.sessions.iter().position(|s| s.id() == id) else {
            return false;
        };

        let session = registry.sessions.remove(index);
        self.session_count
            .store(registry.sessions.len(), Ordering::Release);
        self.check_timer(&mut registry);

        tracing::debug!(session = session.log_id(), "Session removed");
        true
    }

    fn fan_out(&self, notify: impl Fn(&Session)) {
        if self.session_count.load(Ordering::Acquire) == 0 {
            return;
        }
        let registry = self.lock();
        for session in registry.sessions.iter().filter(|s| s.is_logged_in()) {
            notify(session);
        }
    }

    fn check_timer(&self, registry: &mut Registry) {
        let subscribed = match registry.subscription {
            TimerSubscription::Subscribed(id) => Some(id),
            TimerSubscription::Unsubscribed => None,
        };

        match (registry.sessions.is_empty(), subscribed) {
            (false, None) => {
                let Some(this) = self.weak_self.upgrade() else {
                    return;
                };
                let id = self.timer.subscribe(this, self.sweep_interval);
                tracing::debug!(subscription = %id, "Session sweep scheduled");
                registry.subscription = TimerSubscription::Subscribed(id);
            }
            (true, Some(id)) => {
                self.timer.unsubscribe(id);
                tracing::debug!(subscription = %id, "Session sweep stopped");
                registry.subscription = TimerSubscription::Unsubscribed;
            }
            _ => {}
        }
    }

    fn sweep_expired_at(&self, now_ms: i64) -> usize {
        let mut registry = self.lock();
        let before = registry.sessions.len();

        registry.sessions.retain(|session| {
            let expired = session.is_expired_at(now_ms);
            if expired {
                tracing::debug!(
                    session = session.log_id(),
                    idle_ms = now_ms - session.last_access_ms(),
                    "Session timed out"
                );
            }
            !expired
        });

        let evicted = before - registry.sessions.len();
        self.session_count
            .store(registry.sessions.len(), Ordering::Release);
        self.check_timer(&mut registry);

        if evicted > 0 {
            tracing::info!(evicted, remaining = registry.sessions.len(), "Expired sessions swept");
        }
        evicted
    }
}

fn find_session(registry: &Registry, id: &str) -> Option<Arc<Session>> {
    registry.sessions.iter().find(|s| s.id() == id).cloned()
}

impl TimerSubscriber for Inner {
    fn timer_notify(&self) {
        tracing::debug!(
            sessions = self.session_count.load(Ordering::Acquire),
            "Checking UI sessions for expiry"
        );
        self.sweep_expired_at(clock::now_ms());
    }
}

impl TimerSubscriber for SessionManager {
    fn timer_notify(&self) {
        self.inner.timer_notify();
    }
}

impl ChangeListener for SessionManager {
    fn container_changed(&self, ids: &[ObjectId]) {
        match ids {
            [id] => self.container_changed_ui(*id),
            ids => self.container_changed_ui_batch(ids),
        }
    }
}
