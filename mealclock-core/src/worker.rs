//! Background reminder projection.
//!
//! Mutations hand a snapshot to a [`ProjectionSink`] and return immediately.
//! [`ProjectionWorker`] keeps only the newest pending request, so bursts of
//! mutations collapse into one projection, and runs backend calls on the
//! blocking pool under a timeout so a stalled notification service never
//! holds up the caller.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::Utc;
use chrono_tz::Tz;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::reminders::{
    project, withdraw, NotificationBackend, ProjectionOutcome, ProjectionTrigger,
    DEFAULT_HORIZON_DAYS,
};
use crate::resolver::Resolver;
use crate::state::AppState;

/// Everything a projection run needs, detached from the live state.
#[derive(Debug, Clone)]
pub struct ProjectionRequest {
    pub state: AppState,
    pub tz: Tz,
    pub trigger: ProjectionTrigger,
}

/// Receives a projection request after each committed mutation.
pub trait ProjectionSink {
    fn request(&self, request: ProjectionRequest);
}

#[derive(Debug, Clone, Copy)]
pub struct WorkerConfig {
    pub horizon_days: u32,
    /// Upper bound for one whole projection run against the backend.
    pub call_timeout: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            horizon_days: DEFAULT_HORIZON_DAYS,
            call_timeout: Duration::from_secs(10),
        }
    }
}

/// A request waiting in the channel, numbered so the sender can tell whether
/// the worker has picked it up yet.
#[derive(Debug, Clone)]
struct Pending {
    seq: u64,
    request: ProjectionRequest,
}

pub struct ProjectionWorker {
    requests: watch::Sender<Option<Pending>>,
    /// Sequence number of the last request the worker took.
    taken: Arc<AtomicU64>,
    outcomes: watch::Receiver<Option<ProjectionOutcome>>,
    task: JoinHandle<()>,
}

impl ProjectionWorker {
    /// Start the worker on the current tokio runtime.
    pub fn spawn<B>(backend: Arc<B>, config: WorkerConfig) -> Self
    where
        B: NotificationBackend + Send + Sync + 'static,
    {
        let (requests, rx) = watch::channel(None);
        let (outcome_tx, outcomes) = watch::channel(None);
        let taken = Arc::new(AtomicU64::new(0));
        let task = tokio::spawn(run(backend, rx, Arc::clone(&taken), outcome_tx, config));
        Self {
            requests,
            taken,
            outcomes,
            task,
        }
    }

    /// Outcome of the most recent finished run.
    pub fn last_outcome(&self) -> Option<ProjectionOutcome> {
        self.outcomes.borrow().clone()
    }

    /// Finish the pending request, if any, then stop.
    pub async fn shutdown(self) -> Option<ProjectionOutcome> {
        let Self {
            requests,
            outcomes,
            task,
            ..
        } = self;
        drop(requests);
        if let Err(e) = task.await {
            log::error!("projection worker stopped abnormally: {e}");
        }
        let last = outcomes.borrow().clone();
        last
    }
}

impl ProjectionSink for ProjectionWorker {
    /// Replace any waiting request with `request`. A notifications on/off
    /// trigger that the worker has not seen yet survives the replacement, so
    /// a later edit cannot swallow a withdrawal or a re-prompt.
    fn request(&self, mut request: ProjectionRequest) {
        self.requests.send_modify(|pending| {
            let taken = self.taken.load(Ordering::Acquire);
            let seq = match pending {
                Some(prev) => {
                    if prev.seq > taken {
                        request.trigger = merge_triggers(prev.request.trigger, request.trigger);
                    }
                    prev.seq + 1
                }
                None => 1,
            };
            *pending = Some(Pending { seq, request });
        });
    }
}

/// The trigger for a waiting request that is replaced by a newer one.
fn merge_triggers(waiting: ProjectionTrigger, newer: ProjectionTrigger) -> ProjectionTrigger {
    use ProjectionTrigger::*;
    match (waiting, newer) {
        (NotificationsEnabled | NotificationsDisabled, StateChanged | Startup) => waiting,
        _ => newer,
    }
}

async fn run<B>(
    backend: Arc<B>,
    mut requests: watch::Receiver<Option<Pending>>,
    taken: Arc<AtomicU64>,
    outcomes: watch::Sender<Option<ProjectionOutcome>>,
    config: WorkerConfig,
) where
    B: NotificationBackend + Send + Sync + 'static,
{
    // A timed-out run keeps going on the blocking pool; the gate stops the
    // next run from interleaving its clear/adds with it.
    let gate = Arc::new(Mutex::new(()));

    while requests.changed().await.is_ok() {
        let request = {
            let pending = requests.borrow_and_update();
            let Some(pending) = pending.as_ref() else {
                continue;
            };
            // Stored under the channel's read lock, so a concurrent
            // `request` sees either the old value or this one.
            taken.store(pending.seq, Ordering::Release);
            pending.request.clone()
        };
        let trigger = request.trigger;

        let backend = Arc::clone(&backend);
        let gate = Arc::clone(&gate);
        let job = tokio::task::spawn_blocking(move || {
            let _serial = gate.lock().unwrap_or_else(PoisonError::into_inner);
            match request.trigger {
                ProjectionTrigger::NotificationsDisabled => withdraw(backend.as_ref()),
                trigger => {
                    let resolver = Resolver::new(&request.state, request.tz);
                    project(
                        backend.as_ref(),
                        &resolver,
                        Utc::now(),
                        config.horizon_days,
                        trigger,
                    )
                }
            }
        });

        let outcome = match tokio::time::timeout(config.call_timeout, job).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                log::error!("projection run failed: {e}");
                ProjectionOutcome::TimedOut
            }
            Err(_) => {
                log::warn!(
                    "notification backend did not answer within {:?}; treating as not scheduled",
                    config.call_timeout
                );
                ProjectionOutcome::TimedOut
            }
        };
        log::debug!("projection ({trigger:?}) finished: {outcome:?}");
        outcomes.send_replace(Some(outcome));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reminders::testing::RecordingBackend;
    use crate::reminders::AuthorizationStatus;
    use crate::time::parse_timezone;
    use chrono::{DateTime, Utc};

    fn request(state: AppState, trigger: ProjectionTrigger) -> ProjectionRequest {
        ProjectionRequest {
            state,
            tz: parse_timezone("UTC").unwrap(),
            trigger,
        }
    }

    /// Backend whose authorization check never returns in time.
    struct StalledBackend;

    impl NotificationBackend for StalledBackend {
        fn authorization_status(&self) -> AuthorizationStatus {
            std::thread::sleep(Duration::from_millis(300));
            AuthorizationStatus::Authorized
        }
        fn request_authorization(&self) -> bool {
            false
        }
        fn cancel_by_prefix(&self, _prefix: &str) {}
        fn schedule(&self, _: &str, _: DateTime<Utc>, _: &str, _: &str) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn pending_request_is_drained_on_shutdown() {
        let backend = Arc::new(RecordingBackend::new(AuthorizationStatus::Authorized));
        let worker = ProjectionWorker::spawn(Arc::clone(&backend), WorkerConfig::default());
        worker.request(request(AppState::default(), ProjectionTrigger::Startup));

        let outcome = worker.shutdown().await;
        assert!(matches!(outcome, Some(ProjectionOutcome::Scheduled { failed: 0, .. })));
        assert!(!backend.pending_ids().is_empty());
    }

    #[tokio::test]
    async fn burst_of_requests_runs_at_most_twice() {
        let backend = Arc::new(RecordingBackend::new(AuthorizationStatus::Authorized));
        let worker = ProjectionWorker::spawn(Arc::clone(&backend), WorkerConfig::default());
        for _ in 0..20 {
            worker.request(request(AppState::default(), ProjectionTrigger::StateChanged));
        }
        worker.shutdown().await;
        // Each run starts with one clear; the burst collapses into the first
        // run plus at most one for the newest request.
        let runs = backend.cancels.lock().unwrap().len();
        assert!((1..=2).contains(&runs), "ran {runs} times");
    }

    #[tokio::test]
    async fn disabling_withdraws_reminders() {
        let backend = Arc::new(RecordingBackend::new(AuthorizationStatus::Authorized));
        let worker = ProjectionWorker::spawn(Arc::clone(&backend), WorkerConfig::default());
        let mut state = AppState::default();
        state.settings.notifications_enabled = false;
        worker.request(request(state, ProjectionTrigger::NotificationsDisabled));

        let outcome = worker.shutdown().await;
        assert_eq!(outcome, Some(ProjectionOutcome::Withdrawn));
        assert_eq!(backend.cancels.lock().unwrap().len(), 1);
    }

    fn disabled_state() -> AppState {
        let mut state = AppState::default();
        state.settings.notifications_enabled = false;
        state
    }

    #[test]
    fn on_off_triggers_outlive_plain_edits() {
        use ProjectionTrigger::*;
        assert_eq!(merge_triggers(NotificationsDisabled, StateChanged), NotificationsDisabled);
        assert_eq!(merge_triggers(NotificationsEnabled, StateChanged), NotificationsEnabled);
        assert_eq!(merge_triggers(NotificationsEnabled, NotificationsDisabled), NotificationsDisabled);
        assert_eq!(merge_triggers(NotificationsDisabled, NotificationsEnabled), NotificationsEnabled);
        assert_eq!(merge_triggers(Startup, StateChanged), StateChanged);
    }

    #[tokio::test]
    async fn edit_after_disabling_still_withdraws() {
        let backend = Arc::new(RecordingBackend::new(AuthorizationStatus::Authorized));
        backend.pending.lock().unwrap().push((
            "mealclock-2030-01-01-lunch".to_string(),
            Utc::now(),
            "Time for Lunch".to_string(),
        ));
        let worker = ProjectionWorker::spawn(Arc::clone(&backend), WorkerConfig::default());
        // Both land before the worker task first runs.
        worker.request(request(disabled_state(), ProjectionTrigger::NotificationsDisabled));
        worker.request(request(disabled_state(), ProjectionTrigger::StateChanged));

        assert_eq!(worker.shutdown().await, Some(ProjectionOutcome::Withdrawn));
        assert!(backend.pending_ids().is_empty());
    }

    #[tokio::test]
    async fn edit_after_enabling_keeps_the_reprompt() {
        let backend = Arc::new(RecordingBackend::new(AuthorizationStatus::Denied));
        let worker = ProjectionWorker::spawn(Arc::clone(&backend), WorkerConfig::default());
        worker.request(request(AppState::default(), ProjectionTrigger::NotificationsEnabled));
        worker.request(request(AppState::default(), ProjectionTrigger::StateChanged));

        let outcome = worker.shutdown().await;
        assert!(matches!(outcome, Some(ProjectionOutcome::Scheduled { failed: 0, .. })));
        assert_eq!(*backend.requests.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn handled_reprompt_is_not_repeated() {
        let mut backend = RecordingBackend::new(AuthorizationStatus::Denied);
        backend.grant_on_request = false;
        let backend = Arc::new(backend);
        let worker = ProjectionWorker::spawn(Arc::clone(&backend), WorkerConfig::default());
        worker.request(request(AppState::default(), ProjectionTrigger::NotificationsEnabled));
        while worker.last_outcome().is_none() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        worker.request(request(AppState::default(), ProjectionTrigger::StateChanged));
        assert_eq!(worker.shutdown().await, Some(ProjectionOutcome::Unauthorized));
        assert_eq!(*backend.requests.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn stalled_backend_times_out() {
        let config = WorkerConfig {
            horizon_days: 1,
            call_timeout: Duration::from_millis(20),
        };
        let worker = ProjectionWorker::spawn(Arc::new(StalledBackend), config);
        worker.request(request(AppState::default(), ProjectionTrigger::Startup));
        assert_eq!(worker.shutdown().await, Some(ProjectionOutcome::TimedOut));
    }
}
