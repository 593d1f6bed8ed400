//! Sync pipeline: batch push of pending records, reference list refresh,
//! and the scheduling/connectivity plumbing that decides when they run.

pub mod connectivity;
mod orchestrator;
pub mod scheduler;

pub use connectivity::{ConnectivityMonitor, ProbeTarget};
pub use orchestrator::{
    RefreshReport, RefreshStatus, SelectorLists, SyncOrchestrator, SyncOutcome,
};
pub use scheduler::{
    EnqueueResult, ExistingWorkPolicy, QueuedWork, SchedulerTasks, SyncScheduler, WorkKind,
    CONNECTIVITY_SYNC, IMMEDIATE_SYNC, PERIODIC_SYNC,
};
