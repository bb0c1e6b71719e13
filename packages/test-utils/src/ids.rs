//! Scripted identifier source

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Replays a fixed sequence of ids, then repeats the last one forever
///
/// Useful for forcing id collisions. Pass it where a `Fn() -> String`
/// generator is expected via `move || ids.next_id()`.
pub struct ScriptedIds {
    queue: Mutex<VecDeque<String>>,
    last: Mutex<String>,
    issued: AtomicUsize,
}

impl ScriptedIds {
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            queue: Mutex::new(ids.into_iter().map(Into::into).collect()),
            last: Mutex::new(String::new()),
            issued: AtomicUsize::new(0),
        }
    }

    /// A source that yields `id` every time
    pub fn constant(id: &str) -> Self {
        Self::new([id])
    }

    pub fn next_id(&self) -> String {
        self.issued.fetch_add(1, Ordering::SeqCst);
        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(next) = self
            .queue
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
        {
            *last = next;
        }
        last.clone()
    }

    /// How many ids have been handed out
    pub fn issued(&self) -> usize {
        self.issued.load(Ordering::SeqCst)
    }
}
