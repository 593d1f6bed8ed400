//! Named background work queue for sync jobs.
//!
//! Requests are queued under an optional name. A named request either
//! replaces a queued entry of the same name or is dropped in favour of it,
//! depending on [`ExistingWorkPolicy`]. A single worker drains the queue, and
//! only while connectivity is available, so at most one job runs at a time.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::orchestrator::SyncOrchestrator;
use crate::api::RemoteApi;

/// Name of the sync requested right after a pair is captured.
pub const IMMEDIATE_SYNC: &str = "immediate_sync";
/// Name of the recurring background sync.
pub const PERIODIC_SYNC: &str = "periodic_sync";
/// Name of the sync requested when the network comes back.
pub const CONNECTIVITY_SYNC: &str = "connectivity_sync";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkKind {
    PushPending,
    RefreshReferences,
}

/// What to do when a request names work that already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExistingWorkPolicy {
    /// Drop the queued (not yet started) entry and queue the new one
    Replace,
    /// Keep the existing queued or running entry and drop the new request
    Keep,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueResult {
    Enqueued,
    Replaced,
    Kept,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedWork {
    pub name: Option<String>,
    pub kind: WorkKind,
}

#[derive(Default)]
struct QueueState {
    queue: VecDeque<QueuedWork>,
    running: Option<QueuedWork>,
    closed: bool,
}

struct Inner {
    state: Mutex<QueueState>,
    notify: Notify,
    connectivity: watch::Receiver<bool>,
}

/// Cloneable handle to the work queue.
#[derive(Clone)]
pub struct SyncScheduler {
    inner: Arc<Inner>,
}

impl SyncScheduler {
    pub fn new(connectivity: watch::Receiver<bool>) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(QueueState::default()),
                notify: Notify::new(),
                connectivity,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, QueueState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue named work, deduplicated according to `policy`.
    pub fn enqueue_unique(
        &self,
        name: &str,
        policy: ExistingWorkPolicy,
        kind: WorkKind,
    ) -> EnqueueResult {
        let result = {
            let mut state = self.state();
            if state.closed {
                return EnqueueResult::Closed;
            }

            let queued_at = state
                .queue
                .iter()
                .position(|work| work.name.as_deref() == Some(name));
            let running = state
                .running
                .as_ref()
                .is_some_and(|work| work.name.as_deref() == Some(name));

            let work = QueuedWork {
                name: Some(name.to_string()),
                kind,
            };
            match (policy, queued_at) {
                (ExistingWorkPolicy::Keep, Some(_)) => EnqueueResult::Kept,
                (ExistingWorkPolicy::Keep, None) if running => EnqueueResult::Kept,
                (ExistingWorkPolicy::Replace, Some(index)) => {
                    state.queue.remove(index);
                    state.queue.push_back(work);
                    EnqueueResult::Replaced
                }
                _ => {
                    state.queue.push_back(work);
                    EnqueueResult::Enqueued
                }
            }
        };

        tracing::debug!(name, ?policy, ?result, "Sync work requested");
        if result != EnqueueResult::Kept {
            self.inner.notify.notify_one();
        }
        result
    }

    /// Queue anonymous work; never deduplicated.
    pub fn enqueue(&self, kind: WorkKind) -> EnqueueResult {
        {
            let mut state = self.state();
            if state.closed {
                return EnqueueResult::Closed;
            }
            state.queue.push_back(QueuedWork { name: None, kind });
        }
        self.inner.notify.notify_one();
        EnqueueResult::Enqueued
    }

    /// Ask for a push as soon as the network allows, superseding any
    /// immediate sync that has not started yet.
    pub fn request_immediate_sync(&self) -> EnqueueResult {
        self.enqueue_unique(
            IMMEDIATE_SYNC,
            ExistingWorkPolicy::Replace,
            WorkKind::PushPending,
        )
    }

    /// Snapshot of queued (not running) work.
    pub fn queued(&self) -> Vec<QueuedWork> {
        self.state().queue.iter().cloned().collect()
    }

    pub fn is_closed(&self) -> bool {
        self.state().closed
    }

    /// Stop accepting work and wake the worker so it can exit.
    pub fn close(&self) {
        self.state().closed = true;
        self.inner.notify.notify_one();
    }

    fn try_take(&self) -> Option<QueuedWork> {
        let mut state = self.state();
        let work = state.queue.pop_front()?;
        state.running = Some(work.clone());
        Some(work)
    }

    fn finish(&self) {
        self.state().running = None;
    }

    /// Wait for the next job that may run now. `None` once closed.
    async fn next_work(&self) -> Option<QueuedWork> {
        let mut connectivity = self.inner.connectivity.clone();
        loop {
            if self.is_closed() {
                return None;
            }

            tokio::select! {
                online = async { connectivity.wait_for(|available| *available).await.is_ok() } => {
                    if !online {
                        tracing::warn!("Connectivity source dropped; sync worker stopping");
                        return None;
                    }
                    if let Some(work) = self.try_take() {
                        return Some(work);
                    }
                    self.inner.notify.notified().await;
                }
                () = self.inner.notify.notified() => {}
            }
        }
    }

    /// Spawn the single worker that drains the queue.
    pub fn spawn_worker<A: RemoteApi>(
        &self,
        orchestrator: Arc<SyncOrchestrator<A>>,
    ) -> JoinHandle<()> {
        let scheduler = self.clone();
        tokio::spawn(async move {
            while let Some(work) = scheduler.next_work().await {
                let name = work.name.as_deref().unwrap_or("one_time_sync");
                tracing::debug!(name, kind = ?work.kind, "Running sync work");

                let result = match work.kind {
                    WorkKind::PushPending => orchestrator.sync_pending().await.map(|outcome| {
                        tracing::debug!(name, ?outcome, "Sync work finished");
                    }),
                    WorkKind::RefreshReferences => {
                        orchestrator.refresh_reference_lists().await.map(|report| {
                            tracing::debug!(
                                name,
                                replaced = report.replaced_count(),
                                "Reference refresh finished"
                            );
                        })
                    }
                };
                if let Err(error) = result {
                    tracing::error!(name, "Sync work failed on local storage: {error}");
                }
                scheduler.finish();
            }
            tracing::debug!("Sync worker stopped");
        })
    }

    /// Spawn the recurring trigger.
    ///
    /// The first run is due `interval - flex` after start, at the opening of
    /// the flex window, and later runs follow every `interval`. The `Keep`
    /// policy guarantees at most one periodic run is pending.
    pub fn spawn_periodic(&self, interval: Duration, flex: Duration) -> JoinHandle<()> {
        let scheduler = self.clone();
        let period = interval.max(Duration::from_millis(1));
        let first_due = tokio::time::Instant::now() + period.saturating_sub(flex);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(first_due, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if scheduler.enqueue_unique(
                    PERIODIC_SYNC,
                    ExistingWorkPolicy::Keep,
                    WorkKind::PushPending,
                ) == EnqueueResult::Closed
                {
                    break;
                }
            }
        })
    }

    /// Spawn the trigger that fires on an offline -> online transition.
    pub fn spawn_connectivity_trigger(&self) -> JoinHandle<()> {
        let scheduler = self.clone();
        let mut connectivity = self.inner.connectivity.clone();
        let mut was_online = *connectivity.borrow_and_update();
        tokio::spawn(async move {
            while connectivity.changed().await.is_ok() {
                let online = *connectivity.borrow_and_update();
                if online && !was_online {
                    tracing::info!("Network available, scheduling sync");
                    if scheduler.enqueue_unique(
                        CONNECTIVITY_SYNC,
                        ExistingWorkPolicy::Keep,
                        WorkKind::PushPending,
                    ) == EnqueueResult::Closed
                    {
                        break;
                    }
                }
                was_online = online;
            }
        })
    }

    /// Start the worker, the periodic and connectivity triggers, and queue
    /// one initial sync.
    pub fn start<A: RemoteApi>(
        &self,
        orchestrator: Arc<SyncOrchestrator<A>>,
        interval: Duration,
        flex: Duration,
    ) -> SchedulerTasks {
        self.enqueue(WorkKind::PushPending);
        SchedulerTasks {
            scheduler: self.clone(),
            worker: self.spawn_worker(orchestrator),
            triggers: vec![
                self.spawn_periodic(interval, flex),
                self.spawn_connectivity_trigger(),
            ],
        }
    }
}

/// Background tasks started by [`SyncScheduler::start`].
pub struct SchedulerTasks {
    scheduler: SyncScheduler,
    worker: JoinHandle<()>,
    triggers: Vec<JoinHandle<()>>,
}

impl SchedulerTasks {
    pub const fn scheduler(&self) -> &SyncScheduler {
        &self.scheduler
    }

    /// Stop the triggers and let the worker finish its current job.
    pub async fn shutdown(self) {
        self.scheduler.close();
        for trigger in self.triggers {
            trigger.abort();
        }
        if let Err(error) = self.worker.await {
            tracing::warn!("Sync worker ended abnormally: {error}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewScanRecord;
    use crate::services::DatabaseService;
    use crate::sync::testing::FakeApi;
    use pretty_assertions::assert_eq;

    fn scheduler(online: bool) -> (SyncScheduler, watch::Sender<bool>) {
        let (tx, rx) = watch::channel(online);
        (SyncScheduler::new(rx), tx)
    }

    fn names(scheduler: &SyncScheduler) -> Vec<Option<String>> {
        scheduler.queued().into_iter().map(|work| work.name).collect()
    }

    #[test]
    fn replace_supersedes_queued_entry() {
        let (scheduler, _tx) = scheduler(false);
        assert_eq!(scheduler.request_immediate_sync(), EnqueueResult::Enqueued);
        assert_eq!(scheduler.request_immediate_sync(), EnqueueResult::Replaced);
        assert_eq!(names(&scheduler), vec![Some(IMMEDIATE_SYNC.to_string())]);
    }

    #[test]
    fn keep_drops_duplicate_request() {
        let (scheduler, _tx) = scheduler(false);
        let first =
            scheduler.enqueue_unique(PERIODIC_SYNC, ExistingWorkPolicy::Keep, WorkKind::PushPending);
        let second =
            scheduler.enqueue_unique(PERIODIC_SYNC, ExistingWorkPolicy::Keep, WorkKind::PushPending);
        assert_eq!(first, EnqueueResult::Enqueued);
        assert_eq!(second, EnqueueResult::Kept);
        assert_eq!(scheduler.queued().len(), 1);
    }

    #[test]
    fn keep_drops_request_while_same_name_is_running() {
        let (scheduler, _tx) = scheduler(true);
        scheduler.enqueue_unique(PERIODIC_SYNC, ExistingWorkPolicy::Keep, WorkKind::PushPending);
        let running = scheduler.try_take().unwrap();
        assert_eq!(running.name.as_deref(), Some(PERIODIC_SYNC));

        let result =
            scheduler.enqueue_unique(PERIODIC_SYNC, ExistingWorkPolicy::Keep, WorkKind::PushPending);
        assert_eq!(result, EnqueueResult::Kept);

        scheduler.finish();
        let result =
            scheduler.enqueue_unique(PERIODIC_SYNC, ExistingWorkPolicy::Keep, WorkKind::PushPending);
        assert_eq!(result, EnqueueResult::Enqueued);
    }

    #[test]
    fn replace_does_not_touch_running_entry() {
        let (scheduler, _tx) = scheduler(true);
        scheduler.request_immediate_sync();
        scheduler.try_take().unwrap();

        assert_eq!(scheduler.request_immediate_sync(), EnqueueResult::Enqueued);
        assert_eq!(scheduler.queued().len(), 1);
    }

    #[test]
    fn names_are_independent_and_anonymous_work_is_not_deduplicated() {
        let (scheduler, _tx) = scheduler(false);
        scheduler.request_immediate_sync();
        scheduler.enqueue_unique(PERIODIC_SYNC, ExistingWorkPolicy::Keep, WorkKind::PushPending);
        scheduler.enqueue(WorkKind::PushPending);
        scheduler.enqueue(WorkKind::PushPending);
        assert_eq!(scheduler.queued().len(), 4);
    }

    #[test]
    fn closed_scheduler_rejects_work() {
        let (scheduler, _tx) = scheduler(true);
        scheduler.close();
        assert_eq!(scheduler.request_immediate_sync(), EnqueueResult::Closed);
        assert_eq!(scheduler.enqueue(WorkKind::PushPending), EnqueueResult::Closed);
    }

    async fn orchestrator_with_pending() -> Arc<SyncOrchestrator<FakeApi>> {
        let db = DatabaseService::open_in_memory().unwrap();
        db.insert_scan_record(&NewScanRecord::new("ST1", 0, "LOT1", 2_000))
            .await
            .unwrap();
        SyncOrchestrator::new(db, FakeApi::default()).into_shared()
    }

    async fn wait_for_push(orchestrator: &SyncOrchestrator<FakeApi>, count: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while orchestrator.api().push_count() < count {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("push did not happen in time");
    }

    #[tokio::test]
    async fn worker_runs_immediate_sync() {
        let (scheduler, _tx) = scheduler(true);
        let orchestrator = orchestrator_with_pending().await;
        let worker = scheduler.spawn_worker(Arc::clone(&orchestrator));

        scheduler.request_immediate_sync();
        wait_for_push(&orchestrator, 1).await;
        tokio::time::timeout(Duration::from_secs(5), async {
            while orchestrator.database().pending_count().await.unwrap() > 0 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("record was not marked synced");

        scheduler.close();
        worker.await.unwrap();
    }

    #[tokio::test]
    async fn worker_waits_for_connectivity() {
        let (scheduler, tx) = scheduler(false);
        let orchestrator = orchestrator_with_pending().await;
        let worker = scheduler.spawn_worker(Arc::clone(&orchestrator));

        scheduler.request_immediate_sync();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(orchestrator.api().push_count(), 0);
        assert_eq!(scheduler.queued().len(), 1);

        tx.send(true).unwrap();
        wait_for_push(&orchestrator, 1).await;

        scheduler.close();
        worker.await.unwrap();
    }

    #[tokio::test]
    async fn connectivity_transition_queues_sync() {
        let (scheduler, tx) = scheduler(false);
        let trigger = scheduler.spawn_connectivity_trigger();

        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(5), async {
            while scheduler.queued().is_empty() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("connectivity sync was not queued");
        assert_eq!(names(&scheduler), vec![Some(CONNECTIVITY_SYNC.to_string())]);

        trigger.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn periodic_trigger_keeps_single_pending_run() {
        let (scheduler, _tx) = scheduler(false);
        let trigger = scheduler.spawn_periodic(Duration::from_secs(3600), Duration::from_secs(900));

        tokio::time::sleep(Duration::from_secs(2700 * 3 + 1)).await;
        assert_eq!(names(&scheduler), vec![Some(PERIODIC_SYNC.to_string())]);

        trigger.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn periodic_trigger_runs_once_per_interval() {
        let (scheduler, _tx) = scheduler(true);
        let trigger = scheduler.spawn_periodic(Duration::from_secs(3600), Duration::from_secs(900));

        // Check mid-minute so the check never shares an instant with a tick.
        tokio::time::sleep(Duration::from_secs(30)).await;
        let mut due_minutes = Vec::new();
        for minute in 1..=359 {
            tokio::time::sleep(Duration::from_secs(60)).await;
            while let Some(work) = scheduler.try_take() {
                assert_eq!(work.name.as_deref(), Some(PERIODIC_SYNC));
                due_minutes.push(minute);
                scheduler.finish();
            }
        }

        assert_eq!(due_minutes, vec![45, 105, 165, 225, 285, 345]);
        trigger.abort();
    }

    #[tokio::test]
    async fn start_runs_initial_sync_and_shuts_down() {
        let (scheduler, _tx) = scheduler(true);
        let orchestrator = orchestrator_with_pending().await;

        let tasks = scheduler.start(
            Arc::clone(&orchestrator),
            Duration::from_secs(3600),
            Duration::from_secs(900),
        );
        wait_for_push(&orchestrator, 1).await;

        tasks.shutdown().await;
        assert!(scheduler.is_closed());
    }
}
