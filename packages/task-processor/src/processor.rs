//! Single-worker task processor
//!
//! Producers (web handlers, timers) enqueue tasks from any thread; one
//! dedicated tokio task drains the queue in FIFO order, running at most one
//! task at a time. Request handlers are never blocked by task execution: the
//! queue lock is only held to push, pop or copy entries.

use std::collections::VecDeque;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Instant;

use futures_util::FutureExt;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::TaskError;
use crate::task::{Task, TaskEntry, TaskId, TaskOutcome, TaskView};

/// Handle to the background task queue
///
/// Cloning is cheap; all clones share the same queue and worker.
#[derive(Clone)]
pub struct TaskProcessor {
    inner: Arc<Inner>,
}

struct Inner {
    state: Mutex<QueueState>,
    /// Shared with the worker, which only holds `Inner` weakly
    wakeup: Arc<Notify>,
    /// Cancelled by the worker when its loop has exited
    stopped: CancellationToken,
    worker: Mutex<Option<JoinHandle<()>>>,
}

struct QueueState {
    queue: VecDeque<Arc<TaskEntry>>,
    current: Option<Arc<TaskEntry>>,
    shutting_down: bool,
    next_id: u64,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        // Queue state stays consistent across a panic; every mutation is a
        // single push, pop or assignment.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        // Every handle is gone; wake the worker so it can exit.
        self.wakeup.notify_one();
    }
}

impl TaskProcessor {
    /// Create the processor and spawn its worker on the current tokio runtime
    ///
    /// # Panics
    ///
    /// Panics when called outside of a tokio runtime.
    pub fn start() -> Self {
        let inner = Arc::new(Inner {
            state: Mutex::new(QueueState {
                queue: VecDeque::new(),
                current: None,
                shutting_down: false,
                next_id: 1,
            }),
            wakeup: Arc::new(Notify::new()),
            stopped: CancellationToken::new(),
            worker: Mutex::new(None),
        });

        let handle = tokio::spawn(run_worker(
            Arc::downgrade(&inner),
            Arc::clone(&inner.wakeup),
            inner.stopped.clone(),
        ));
        *inner.worker.lock().unwrap_or_else(|e| e.into_inner()) = Some(handle);

        tracing::debug!("Task processor started");
        Self { inner }
    }

    /// Enqueue a task and wake the worker
    pub fn add_task(&self, task: impl Task + 'static) -> TaskId {
        self.enqueue(Box::new(task), None)
    }

    /// Enqueue a task spawned on behalf of `parent`
    ///
    /// Invalidating the parent also invalidates this task.
    pub fn add_task_with_parent(&self, task: impl Task + 'static, parent: TaskId) -> TaskId {
        self.enqueue(Box::new(task), Some(parent))
    }

    /// Enqueue an already boxed task
    pub fn add_boxed_task(&self, task: Box<dyn Task>) -> TaskId {
        self.enqueue(task, None)
    }

    fn enqueue(&self, task: Box<dyn Task>, parent_id: Option<TaskId>) -> TaskId {
        let mut state = self.inner.lock();
        let id = TaskId::new(state.next_id);
        state.next_id += 1;

        let entry = Arc::new(TaskEntry::new(id, parent_id, task));
        if state.shutting_down {
            tracing::debug!(task_id = %id, kind = %entry.kind, "Task queued after shutdown was requested");
        } else {
            tracing::debug!(task_id = %id, kind = %entry.kind, description = %entry.description, "Task queued");
        }
        state.queue.push_back(entry);
        drop(state);

        self.inner.wakeup.notify_one();
        id
    }

    /// Snapshot of the tasks waiting in the queue, front first
    pub fn task_list(&self) -> Vec<TaskView> {
        self.inner.lock().queue.iter().map(|e| e.view()).collect()
    }

    /// The task the worker is executing right now, if any
    pub fn current_task(&self) -> Option<TaskView> {
        self.inner.lock().current.as_ref().map(|e| e.view())
    }

    /// Number of tasks waiting in the queue
    pub fn queue_len(&self) -> usize {
        self.inner.lock().queue.len()
    }

    /// Cooperatively cancel a task and the tasks it spawned
    ///
    /// Looks at the running task and the queue. Matching tasks that are
    /// cancellable have their token cancelled; they stay in the queue and
    /// skip their work when the worker reaches them. Unknown ids and
    /// non-cancellable tasks are ignored. Returns whether any task was
    /// invalidated.
    pub fn invalidate_task(&self, id: TaskId) -> bool {
        let state = self.inner.lock();
        let mut invalidated = 0usize;

        for entry in state.current.iter().chain(state.queue.iter()) {
            let matches = entry.id == id || entry.parent_id == Some(id);
            if matches && entry.cancellable && entry.is_valid() {
                entry.token.cancel();
                invalidated += 1;
            }
        }

        if invalidated == 0 {
            tracing::debug!(task_id = %id, "Nothing to invalidate");
        } else {
            tracing::info!(task_id = %id, invalidated, "Task invalidated");
        }
        invalidated > 0
    }

    /// Whether `shutdown` has been requested
    pub fn is_shutting_down(&self) -> bool {
        self.inner.lock().shutting_down
    }

    /// Stop the worker and wait for it to exit
    ///
    /// Tasks already queued are still executed; the worker exits once the
    /// queue is empty. Safe to call more than once and from several places.
    pub async fn shutdown(&self) {
        {
            let mut state = self.inner.lock();
            if !state.shutting_down {
                tracing::info!(pending = state.queue.len(), "Task processor shutting down");
                state.shutting_down = true;
            }
        }
        self.inner.wakeup.notify_one();

        let handle = self
            .inner
            .worker
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Task worker terminated abnormally");
            }
        }
        self.inner.stopped.cancelled().await;
    }
}

async fn run_worker(inner: Weak<Inner>, wakeup: Arc<Notify>, stopped: CancellationToken) {
    let _stopped = stopped.drop_guard();

    loop {
        let Some(processor) = inner.upgrade() else {
            tracing::warn!("Task processor dropped without shutdown, abandoning queue");
            break;
        };
        let entry = {
            let mut state = processor.lock();
            match state.queue.pop_front() {
                Some(entry) => {
                    state.current = Some(Arc::clone(&entry));
                    Some(entry)
                }
                None if state.shutting_down => break,
                None => None,
            }
        };
        drop(processor);

        let Some(entry) = entry else {
            // notify_one stores a permit, so a wake-up sent between the
            // check above and this await is not lost.
            wakeup.notified().await;
            continue;
        };

        execute(&entry).await;
        if let Some(processor) = inner.upgrade() {
            processor.lock().current = None;
        }
    }

    tracing::debug!("Task worker stopped");
}

async fn execute(entry: &TaskEntry) {
    let id = entry.id.get();
    let kind = entry.kind.as_str();
    let started = Instant::now();

    tracing::info!(task_id = id, kind, description = %entry.description, valid = entry.is_valid(), "Task started");

    let result = AssertUnwindSafe(entry.task.run(&entry.token))
        .catch_unwind()
        .await
        .unwrap_or_else(|payload| Err(TaskError::Panicked(panic_message(payload.as_ref()))));

    let elapsed_ms = started.elapsed().as_millis() as u64;
    match result {
        Ok(TaskOutcome::Completed) => {
            tracing::info!(task_id = id, kind, elapsed_ms, "Task completed");
        }
        Ok(TaskOutcome::Cancelled) => {
            tracing::info!(task_id = id, kind, elapsed_ms, "Task cancelled");
        }
        Err(e) => e.log(id, kind),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TaskResult;
    use crate::task::TaskKind;
    use async_trait::async_trait;
    use std::time::Duration;
    use tokio::sync::oneshot;
    use tracing_test::traced_test;

    /// Blocks the worker until released
    struct Gate {
        release: Mutex<Option<oneshot::Receiver<()>>>,
    }

    impl Gate {
        fn new() -> (Self, oneshot::Sender<()>) {
            let (tx, rx) = oneshot::channel();
            (
                Self {
                    release: Mutex::new(Some(rx)),
                },
                tx,
            )
        }
    }

    #[async_trait]
    impl Task for Gate {
        fn kind(&self) -> TaskKind {
            TaskKind::Generic
        }

        fn description(&self) -> String {
            "gate".to_string()
        }

        async fn run(&self, _token: &CancellationToken) -> TaskResult<TaskOutcome> {
            let rx = self.release.lock().unwrap().take();
            if let Some(rx) = rx {
                let _ = rx.await;
            }
            Ok(TaskOutcome::Completed)
        }
    }

    async fn wait_for_current(processor: &TaskProcessor) -> TaskView {
        for _ in 0..100 {
            if let Some(view) = processor.current_task() {
                return view;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("worker never picked up a task");
    }

    #[tokio::test]
    async fn test_ids_are_monotonic() {
        let processor = TaskProcessor::start();
        let (gate, release) = Gate::new();

        let first = processor.add_task(gate);
        let second = processor.add_task(Gate::new().0);
        let third = processor.add_task(Gate::new().0);

        assert_eq!(first, TaskId::new(1));
        assert!(first < second && second < third);

        release.send(()).unwrap();
        processor.shutdown().await;
    }

    #[tokio::test]
    async fn test_current_task_cleared_after_run() {
        let processor = TaskProcessor::start();
        let (gate, release) = Gate::new();

        let id = processor.add_task(gate);
        assert_eq!(wait_for_current(&processor).await.id, id);

        release.send(()).unwrap();
        processor.shutdown().await;
        assert!(processor.current_task().is_none());
    }

    #[tokio::test]
    async fn test_task_list_is_a_copy() {
        let processor = TaskProcessor::start();
        let (gate, release) = Gate::new();
        processor.add_task(gate);
        wait_for_current(&processor).await;

        let queued = processor.add_task(Gate::new().0);
        let snapshot = processor.task_list();
        processor.invalidate_task(queued);

        assert_eq!(snapshot.len(), 1);
        assert!(snapshot[0].valid);
        assert!(!processor.task_list()[0].valid);

        release.send(()).unwrap();
        processor.shutdown().await;
    }

    struct Boom;

    #[async_trait]
    impl Task for Boom {
        fn kind(&self) -> TaskKind {
            TaskKind::Generic
        }

        fn description(&self) -> String {
            "boom".to_string()
        }

        async fn run(&self, _token: &CancellationToken) -> TaskResult<TaskOutcome> {
            panic!("kaboom");
        }
    }

    #[tokio::test]
    #[traced_test]
    async fn test_panicking_task_is_logged_as_critical() {
        let processor = TaskProcessor::start();
        processor.add_task(Boom);
        processor.shutdown().await;

        assert!(logs_contain("Critical task failure"));
        assert!(logs_contain("task panicked: kaboom"));
    }

    #[tokio::test]
    #[traced_test]
    async fn test_invalidated_task_is_reported_cancelled() {
        let processor = TaskProcessor::start();
        let (gate, release) = Gate::new();
        processor.add_task(gate);
        wait_for_current(&processor).await;

        let queued = processor.add_task(Gate::new().0);
        assert!(processor.invalidate_task(queued));
        release.send(()).unwrap();
        processor.shutdown().await;

        assert!(logs_contain("Task invalidated"));
        assert!(logs_contain("valid=false"));
    }

    #[tokio::test]
    async fn test_worker_exits_when_every_handle_is_dropped() {
        let processor = TaskProcessor::start();
        let clone = processor.clone();
        let stopped = processor.inner.stopped.clone();

        drop(processor);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!stopped.is_cancelled());

        drop(clone);
        tokio::time::timeout(Duration::from_secs(1), stopped.cancelled())
            .await
            .expect("worker kept running after the last handle was dropped");
    }

    #[tokio::test]
    async fn test_dropped_processor_abandons_running_worker_cleanly() {
        let processor = TaskProcessor::start();
        let stopped = processor.inner.stopped.clone();
        let (gate, release) = Gate::new();
        processor.add_task(gate);
        wait_for_current(&processor).await;

        drop(processor);
        release.send(()).unwrap();

        tokio::time::timeout(Duration::from_secs(1), stopped.cancelled())
            .await
            .expect("worker did not exit after finishing its task");
    }

    #[test]
    fn test_panic_message_extraction() {
        assert_eq!(panic_message(&"static"), "static");
        assert_eq!(panic_message(&String::from("owned")), "owned");
        assert_eq!(panic_message(&42u8), "unknown panic payload");
    }
}
