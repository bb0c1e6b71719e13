//! Online service refresh
//!
//! A [`FetchOnlineContentTask`] pulls fresh content from one service. An
//! [`OnlineRefreshSchedule`] keeps a service refreshed on a timer: a tick
//! disarms the timer and queues one scheduled fetch, and that fetch re-arms
//! the timer once it is done. A slow service therefore never has more than
//! one scheduled fetch waiting in the queue.

use std::sync::{Arc, Mutex, MutexGuard, Weak};

use async_trait::async_trait;
use hearth_timer::{SubscriptionId, Timer, TimerSubscriber};
use tokio_util::sync::CancellationToken;

use crate::content::{ChangeListener, OnlineService};
use crate::error::TaskResult;
use crate::processor::TaskProcessor;
use crate::task::{Task, TaskId, TaskKind, TaskOutcome};

/// Pull fresh content from an online service into the library
pub struct FetchOnlineContentTask {
    service: Arc<dyn OnlineService>,
    listener: Arc<dyn ChangeListener>,
    cancellable: bool,
    /// Re-armed when the fetch ends; `None` for unscheduled refreshes
    schedule: Option<Weak<ScheduleInner>>,
}

impl FetchOnlineContentTask {
    pub fn new(service: Arc<dyn OnlineService>, listener: Arc<dyn ChangeListener>) -> Self {
        Self {
            service,
            listener,
            cancellable: true,
            schedule: None,
        }
    }

    /// Scheduled refreshes keep the library consistent and must not be dropped
    pub fn non_cancellable(mut self) -> Self {
        self.cancellable = false;
        self
    }

    /// Whether this fetch was requested outside of a refresh schedule
    pub fn is_unscheduled_refresh(&self) -> bool {
        self.schedule.is_none()
    }
}

/// Re-arms the schedule on every exit from `run`, panics included
struct Rearm<'a>(&'a Weak<ScheduleInner>);

impl Drop for Rearm<'_> {
    fn drop(&mut self) {
        if let Some(schedule) = self.0.upgrade() {
            schedule.arm();
        }
    }
}

#[async_trait]
impl Task for FetchOnlineContentTask {
    fn kind(&self) -> TaskKind {
        TaskKind::FetchOnlineContent
    }

    fn description(&self) -> String {
        format!("Updating content from {}", self.service.name())
    }

    fn is_cancellable(&self) -> bool {
        self.cancellable
    }

    async fn run(&self, token: &CancellationToken) -> TaskResult<TaskOutcome> {
        let _rearm = self.schedule.as_ref().map(Rearm);

        if token.is_cancelled() {
            return Ok(TaskOutcome::Cancelled);
        }

        let service = self.service.name();
        tracing::info!(service, scheduled = !self.is_unscheduled_refresh(), "Refreshing online service");

        let changed = self.service.refresh(token).await?;
        if !changed.is_empty() {
            self.listener.container_changed(&changed);
        }

        if token.is_cancelled() {
            tracing::info!(service, containers = changed.len(), "Online refresh cancelled");
            return Ok(TaskOutcome::Cancelled);
        }

        tracing::info!(service, containers = changed.len(), "Online refresh completed");
        Ok(TaskOutcome::Completed)
    }
}

/// Timer-driven refresh of one online service
///
/// The timer fires once per [`OnlineService::refresh_interval`], measured
/// from the end of the previous scheduled fetch. Services without an
/// interval can only be refreshed through [`refresh_now`](Self::refresh_now).
///
/// Cloning is cheap; the schedule stays alive while any clone exists.
#[derive(Clone)]
pub struct OnlineRefreshSchedule {
    inner: Arc<ScheduleInner>,
}

#[derive(Default)]
struct ScheduleState {
    armed: Option<SubscriptionId>,
    stopped: bool,
}

struct ScheduleInner {
    processor: TaskProcessor,
    service: Arc<dyn OnlineService>,
    listener: Arc<dyn ChangeListener>,
    timer: Arc<dyn Timer>,
    state: Mutex<ScheduleState>,
    weak_self: Weak<ScheduleInner>,
}

impl OnlineRefreshSchedule {
    /// Create a stopped schedule; call [`start`](Self::start) to arm it
    pub fn new(
        processor: TaskProcessor,
        service: Arc<dyn OnlineService>,
        listener: Arc<dyn ChangeListener>,
        timer: Arc<dyn Timer>,
    ) -> Self {
        let inner = Arc::new_cyclic(|weak_self| ScheduleInner {
            processor,
            service,
            listener,
            timer,
            state: Mutex::new(ScheduleState {
                armed: None,
                stopped: true,
            }),
            weak_self: weak_self.clone(),
        });
        Self { inner }
    }

    /// Arm the timer; returns `false` when the service has no refresh interval
    pub fn start(&self) -> bool {
        self.inner.lock().stopped = false;
        self.inner.arm();
        self.is_armed()
    }

    /// Disarm the timer; a fetch already queued will not re-arm it
    pub fn stop(&self) {
        let mut state = self.inner.lock();
        state.stopped = true;
        self.inner.disarm(&mut state);
        tracing::debug!(service = self.inner.service.name(), "Online refresh schedule stopped");
    }

    /// Queue a fetch right away
    ///
    /// An unscheduled refresh leaves the timer alone. Otherwise the timer is
    /// disarmed and restarts when this fetch ends.
    pub fn refresh_now(&self, unscheduled_refresh: bool) -> TaskId {
        if !unscheduled_refresh {
            let mut state = self.inner.lock();
            self.inner.disarm(&mut state);
        }
        self.inner.enqueue(!unscheduled_refresh)
    }

    pub fn is_armed(&self) -> bool {
        self.inner.lock().armed.is_some()
    }
}

impl ScheduleInner {
    fn lock(&self) -> MutexGuard<'_, ScheduleState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn arm(&self) {
        let Some(interval) = self.service.refresh_interval().filter(|i| !i.is_zero()) else {
            return;
        };

        let mut state = self.lock();
        if state.stopped || state.armed.is_some() {
            return;
        }
        let Some(this) = self.weak_self.upgrade() else {
            return;
        };

        let id = self.timer.subscribe(this, interval);
        state.armed = Some(id);
        tracing::debug!(
            service = self.service.name(),
            subscription = %id,
            interval_secs = interval.as_secs(),
            "Online refresh scheduled"
        );
    }

    fn disarm(&self, state: &mut ScheduleState) {
        if let Some(id) = state.armed.take() {
            self.timer.unsubscribe(id);
        }
    }

    fn enqueue(&self, scheduled: bool) -> TaskId {
        let mut task = FetchOnlineContentTask::new(
            Arc::clone(&self.service),
            Arc::clone(&self.listener),
        );
        if scheduled {
            task = task.non_cancellable();
            task.schedule = Some(self.weak_self.clone());
        }
        self.processor.add_task(task)
    }
}

impl TimerSubscriber for ScheduleInner {
    fn timer_notify(&self) {
        {
            let mut state = self.lock();
            if state.armed.is_none() {
                return;
            }
            self.disarm(&mut state);
        }

        let id = self.enqueue(true);
        tracing::debug!(service = self.service.name(), task_id = %id, "Scheduled online refresh queued");
    }
}
