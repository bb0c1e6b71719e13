//! A single web UI session
//!
//! Besides login state and a scratch map, each session tracks which content
//! containers changed since the UI last polled. The set is bounded: once it
//! would hold `max_update_ids` entries the session gives up on individual ids
//! and tells the UI to refetch everything instead.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Mutex, MutexGuard};

use hearth_task_processor::{ObjectId, INVALID_OBJECT_ID};

use super::clock;

/// Pending UI changes, as drained by [`Session::take_ui_update_ids`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiUpdates {
    /// Nothing changed
    None,
    /// Too many changes to list; the UI must reload everything
    All,
    /// These containers changed, in ascending order
    Ids(Vec<ObjectId>),
}

impl UiUpdates {
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

/// Wire form polled by the UI: `""`, `"all"` or `"3,7,12"`
impl fmt::Display for UiUpdates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => Ok(()),
            Self::All => f.write_str("all"),
            Self::Ids(ids) => {
                for (i, id) in ids.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{}", id)?;
                }
                Ok(())
            }
        }
    }
}

#[derive(Default)]
struct SessionState {
    scratch: HashMap<String, String>,
    pending: BTreeSet<ObjectId>,
    /// When set, `pending` is empty
    update_all: bool,
}

/// Server-side state of one UI client
pub struct Session {
    id: String,
    timeout_secs: u64,
    max_update_ids: usize,
    logged_in: AtomicBool,
    /// Session clock reading, see [`clock::now_ms`]
    last_access: AtomicI64,
    state: Mutex<SessionState>,
}

impl Session {
    /// Create a session that counts as accessed right now
    pub fn new(id: impl Into<String>, timeout_secs: u64, max_update_ids: usize) -> Self {
        Self {
            id: id.into(),
            timeout_secs,
            max_update_ids,
            logged_in: AtomicBool::new(false),
            last_access: AtomicI64::new(clock::now_ms()),
            state: Mutex::new(SessionState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Shortened id for log lines
    pub fn log_id(&self) -> &str {
        self.id.get(..8).unwrap_or(&self.id)
    }

    pub fn timeout_secs(&self) -> u64 {
        self.timeout_secs
    }

    pub fn is_logged_in(&self) -> bool {
        self.logged_in.load(Ordering::Acquire)
    }

    pub fn set_logged_in(&self, logged_in: bool) {
        self.logged_in.store(logged_in, Ordering::Release);
    }

    /// Record activity now
    pub fn access(&self) {
        self.access_at(clock::now_ms());
    }

    /// Record activity at `now_ms`
    pub fn access_at(&self, now_ms: i64) {
        self.last_access.store(now_ms, Ordering::Release);
    }

    /// Last activity on the session clock
    pub fn last_access_ms(&self) -> i64 {
        self.last_access.load(Ordering::Acquire)
    }

    /// Whether the session has been idle for longer than its timeout at `now_ms`
    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        let timeout_ms = i64::try_from(self.timeout_secs.saturating_mul(1000)).unwrap_or(i64::MAX);
        now_ms.saturating_sub(self.last_access_ms()) > timeout_ms
    }

    /// Store a scratch value, replacing any previous one
    pub fn put(&self, key: impl Into<String>, value: impl Into<String>) {
        self.lock().scratch.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.lock().scratch.get(key).cloned()
    }

    /// Note that container `id` changed
    pub fn container_changed_ui(&self, id: ObjectId) {
        if id == INVALID_OBJECT_ID {
            return;
        }

        let mut state = self.lock();
        if state.update_all || state.pending.contains(&id) {
            return;
        }
        if state.pending.len() + 1 >= self.max_update_ids {
            switch_to_all(&mut state);
        } else {
            state.pending.insert(id);
        }
    }

    /// Note that all of `ids` changed
    ///
    /// Only ids not already pending count toward the cap.
    pub fn container_changed_ui_batch(&self, ids: &[ObjectId]) {
        let mut state = self.lock();
        if state.update_all {
            return;
        }

        let fresh: BTreeSet<ObjectId> = ids
            .iter()
            .copied()
            .filter(|id| *id != INVALID_OBJECT_ID && !state.pending.contains(id))
            .collect();
        if fresh.is_empty() {
            return;
        }

        if state.pending.len() + fresh.len() >= self.max_update_ids {
            switch_to_all(&mut state);
        } else {
            state.pending.extend(fresh);
        }
    }

    /// Drain pending changes
    ///
    /// Reading resets the session, so only call this when the result will be
    /// delivered to the UI.
    pub fn take_ui_update_ids(&self) -> UiUpdates {
        let mut state = self.lock();
        if state.update_all {
            state.update_all = false;
            return UiUpdates::All;
        }
        if state.pending.is_empty() {
            return UiUpdates::None;
        }
        let ids = std::mem::take(&mut state.pending);
        UiUpdates::Ids(ids.into_iter().collect())
    }

    /// Whether a poll would return anything
    pub fn has_ui_update_ids(&self) -> bool {
        let state = self.lock();
        state.update_all || !state.pending.is_empty()
    }

    /// Forget pending changes without reporting them
    pub fn clear_update_ids(&self) {
        tracing::debug!(session = self.log_id(), "Clearing UI update ids");
        let mut state = self.lock();
        state.pending.clear();
        state.update_all = false;
    }
}

fn switch_to_all(state: &mut SessionState) {
    state.update_all = true;
    state.pending.clear();
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.log_id())
            .field("logged_in", &self.is_logged_in())
            .field("timeout_secs", &self.timeout_secs)
            .field("last_access_ms", &self.last_access_ms())
            .finish_non_exhaustive()
    }
}
