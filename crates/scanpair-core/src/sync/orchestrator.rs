//! Batch push and reference refresh workflows.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::api::RemoteApi;
use crate::models::{ReferenceItem, ReferenceKind};
use crate::services::DatabaseService;
use crate::Result;

/// Result of one push attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// No pending records; no request was made
    NothingPending,
    /// The backend acknowledged the batch and every record is now synced
    Synced { count: usize },
    /// The push failed; the whole batch stays pending for the next trigger
    RetryNeeded { pending: usize, reason: String },
}

impl SyncOutcome {
    pub const fn is_success(&self) -> bool {
        !matches!(self, Self::RetryNeeded { .. })
    }
}

/// Per-list result of a reference refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshStatus {
    /// Table replaced with this many items
    Replaced(usize),
    /// Backend returned an empty list; cache left untouched
    Empty,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshReport {
    pub results: Vec<(ReferenceKind, RefreshStatus)>,
}

impl RefreshReport {
    pub fn replaced_count(&self) -> usize {
        self.results
            .iter()
            .filter(|(_, status)| matches!(status, RefreshStatus::Replaced(_)))
            .count()
    }

    pub fn status(&self, kind: ReferenceKind) -> Option<&RefreshStatus> {
        self.results
            .iter()
            .find(|(entry, _)| *entry == kind)
            .map(|(_, status)| status)
    }
}

/// The three selector lists as read from the local cache.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectorLists {
    pub clients: Vec<ReferenceItem>,
    pub flower_types: Vec<ReferenceItem>,
    pub varieties: Vec<ReferenceItem>,
    /// Present when a refresh was attempted before reading the cache
    pub refresh: Option<RefreshReport>,
}

impl SelectorLists {
    pub fn get(&self, kind: ReferenceKind) -> &[ReferenceItem] {
        match kind {
            ReferenceKind::Client => &self.clients,
            ReferenceKind::FlowerType => &self.flower_types,
            ReferenceKind::Variety => &self.varieties,
        }
    }

    pub fn any_empty(&self) -> bool {
        self.clients.is_empty() || self.flower_types.is_empty() || self.varieties.is_empty()
    }
}

/// Drives push/pull workflows and reconciles results with the local store.
pub struct SyncOrchestrator<A> {
    db: DatabaseService,
    api: A,
    slot: Mutex<()>,
}

impl<A: RemoteApi> SyncOrchestrator<A> {
    pub fn new(db: DatabaseService, api: A) -> Self {
        Self {
            db,
            api,
            slot: Mutex::new(()),
        }
    }

    /// Convenience for sharing with the scheduler.
    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub const fn database(&self) -> &DatabaseService {
        &self.db
    }

    pub const fn api(&self) -> &A {
        &self.api
    }

    /// Push every pending record as one batch.
    ///
    /// Runs are serialized so two triggers never push the same batch at once.
    /// Transport failures are logged and reported as `RetryNeeded`; only local
    /// storage errors are returned as `Err`.
    pub async fn sync_pending(&self) -> Result<SyncOutcome> {
        let _slot = self.slot.lock().await;

        let pending = self.db.unsynced_records().await?;
        if pending.is_empty() {
            tracing::debug!("No pending scan records to sync");
            return Ok(SyncOutcome::NothingPending);
        }

        tracing::info!("Syncing {} pending scan records", pending.len());
        for record in &pending {
            tracing::trace!(
                id = record.id,
                station = %record.station_code,
                merchandise = %record.merchandise_code,
                elapsed_seconds = record.elapsed_seconds,
                "Queued for push"
            );
        }

        match self.api.push_records(&pending).await {
            Ok(outcome) => {
                let ids: Vec<i64> = pending.iter().map(|record| record.id).collect();
                self.db.mark_all_synced(&ids).await?;
                tracing::info!(
                    status_code = outcome.status_code,
                    server_status = %outcome.server_status,
                    "Sync completed: {} records sent",
                    ids.len()
                );
                Ok(SyncOutcome::Synced { count: ids.len() })
            }
            Err(error) => {
                tracing::warn!(
                    status_code = ?error.status_code(),
                    timeout = error.is_timeout(),
                    "Sync failed, {} records stay pending: {}",
                    pending.len(),
                    error
                );
                Ok(SyncOutcome::RetryNeeded {
                    pending: pending.len(),
                    reason: error.to_string(),
                })
            }
        }
    }

    /// Pull all three reference lists, each independently.
    pub async fn refresh_reference_lists(&self) -> Result<RefreshReport> {
        let mut results = Vec::with_capacity(ReferenceKind::ALL.len());

        for kind in ReferenceKind::ALL {
            let status = match self.api.pull_reference_list(kind).await {
                Ok(names) if names.is_empty() => {
                    tracing::warn!("Backend returned an empty {kind} list; keeping cache");
                    RefreshStatus::Empty
                }
                Ok(names) => {
                    let items = self.db.replace_reference_table(kind, &names).await?;
                    tracing::info!("Refreshed {} {kind} entries", items.len());
                    RefreshStatus::Replaced(items.len())
                }
                Err(error) => {
                    tracing::warn!("Failed to refresh {kind} list: {error}");
                    RefreshStatus::Failed(error.to_string())
                }
            };
            results.push((kind, status));
        }

        Ok(RefreshReport { results })
    }

    /// Read the cached lists, refreshing from the backend when any is empty.
    pub async fn load_selectors(&self) -> Result<SelectorLists> {
        let cached = self.read_selectors().await?;
        if !cached.any_empty() {
            tracing::debug!(
                clients = cached.clients.len(),
                flower_types = cached.flower_types.len(),
                varieties = cached.varieties.len(),
                "Serving reference lists from cache"
            );
            return Ok(cached);
        }

        tracing::info!("Reference cache incomplete, refreshing from backend");
        self.refresh_selectors().await
    }

    /// Pull all three lists once, then read the cache.
    pub async fn refresh_selectors(&self) -> Result<SelectorLists> {
        let report = self.refresh_reference_lists().await?;
        let mut lists = self.read_selectors().await?;
        lists.refresh = Some(report);
        Ok(lists)
    }

    async fn read_selectors(&self) -> Result<SelectorLists> {
        Ok(SelectorLists {
            clients: self.db.read_reference_table(ReferenceKind::Client).await?,
            flower_types: self.db.read_reference_table(ReferenceKind::FlowerType).await?,
            varieties: self.db.read_reference_table(ReferenceKind::Variety).await?,
            refresh: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewScanRecord, SyncStatus};
    use crate::sync::testing::FakeApi;
    use pretty_assertions::assert_eq;

    fn orchestrator() -> SyncOrchestrator<FakeApi> {
        SyncOrchestrator::new(DatabaseService::open_in_memory().unwrap(), FakeApi::default())
    }

    async fn insert_pairs(orchestrator: &SyncOrchestrator<FakeApi>, count: usize) -> Vec<i64> {
        let mut ids = Vec::new();
        for index in 0..count {
            ids.push(
                orchestrator
                    .database()
                    .insert_scan_record(&NewScanRecord::new(
                        format!("S{index}"),
                        1_000,
                        format!("LOT{index}"),
                        4_500,
                    ))
                    .await
                    .unwrap(),
            );
        }
        ids
    }

    #[tokio::test]
    async fn nothing_pending_skips_network() {
        let orchestrator = orchestrator();
        let outcome = orchestrator.sync_pending().await.unwrap();
        assert_eq!(outcome, SyncOutcome::NothingPending);
        assert_eq!(orchestrator.api().push_count(), 0);
    }

    #[tokio::test]
    async fn successful_push_marks_whole_batch() {
        let orchestrator = orchestrator();
        let ids = insert_pairs(&orchestrator, 3).await;

        let outcome = orchestrator.sync_pending().await.unwrap();
        assert_eq!(outcome, SyncOutcome::Synced { count: 3 });
        assert_eq!(orchestrator.api().pushed.lock().unwrap()[0], ids);

        let db = orchestrator.database();
        assert!(db.unsynced_records().await.unwrap().is_empty());
        let recent = db.recent_records(10).await.unwrap();
        let recent_ids: Vec<i64> = recent.iter().map(|record| record.id).collect();
        assert_eq!(recent_ids, vec![ids[2], ids[1], ids[0]]);
        assert!(recent
            .iter()
            .all(|record| record.sync_status == SyncStatus::Synced));
    }

    #[tokio::test]
    async fn failed_push_leaves_batch_pending() {
        let orchestrator = orchestrator();
        insert_pairs(&orchestrator, 2).await;
        orchestrator.api().set_push_failing(true);

        let outcome = orchestrator.sync_pending().await.unwrap();
        assert!(matches!(outcome, SyncOutcome::RetryNeeded { pending: 2, .. }));
        assert!(!outcome.is_success());
        assert_eq!(orchestrator.database().pending_count().await.unwrap(), 2);

        orchestrator.api().set_push_failing(false);
        let outcome = orchestrator.sync_pending().await.unwrap();
        assert_eq!(outcome, SyncOutcome::Synced { count: 2 });
        assert_eq!(orchestrator.api().push_count(), 2);
    }

    #[tokio::test]
    async fn already_synced_records_are_not_repushed() {
        let orchestrator = orchestrator();
        insert_pairs(&orchestrator, 1).await;
        orchestrator.sync_pending().await.unwrap();
        let later = insert_pairs(&orchestrator, 1).await;

        orchestrator.sync_pending().await.unwrap();
        let pushed = orchestrator.api().pushed.lock().unwrap().clone();
        assert_eq!(pushed.len(), 2);
        assert_eq!(pushed[1], later);
    }

    #[tokio::test]
    async fn refresh_is_independent_per_list() {
        let orchestrator = orchestrator();
        let api = orchestrator.api();
        api.set_list(ReferenceKind::Client, &["A", "B"]);
        api.fail_list(ReferenceKind::FlowerType);
        api.set_list(ReferenceKind::Variety, &[]);

        let report = orchestrator.refresh_reference_lists().await.unwrap();
        assert_eq!(
            report.status(ReferenceKind::Client),
            Some(&RefreshStatus::Replaced(2))
        );
        assert!(matches!(
            report.status(ReferenceKind::FlowerType),
            Some(RefreshStatus::Failed(_))
        ));
        assert_eq!(
            report.status(ReferenceKind::Variety),
            Some(&RefreshStatus::Empty)
        );
        assert_eq!(report.replaced_count(), 1);

        let clients = orchestrator
            .database()
            .read_reference_table(ReferenceKind::Client)
            .await
            .unwrap();
        assert_eq!(clients.len(), 2);
    }

    #[tokio::test]
    async fn refresh_replaces_instead_of_merging() {
        let orchestrator = orchestrator();
        orchestrator
            .api()
            .set_list(ReferenceKind::Client, &["A", "B"]);
        orchestrator.refresh_reference_lists().await.unwrap();
        orchestrator.api().set_list(ReferenceKind::Client, &["C"]);
        orchestrator.refresh_reference_lists().await.unwrap();

        let clients = orchestrator
            .database()
            .read_reference_table(ReferenceKind::Client)
            .await
            .unwrap();
        assert_eq!(clients.len(), 1);
        assert_eq!(clients[0].id, "1");
        assert_eq!(clients[0].name, "C");
    }

    #[tokio::test]
    async fn load_selectors_serves_full_cache_without_network() {
        let orchestrator = orchestrator();
        let db = orchestrator.database();
        for kind in ReferenceKind::ALL {
            db.replace_reference_table(kind, &["X".to_string()])
                .await
                .unwrap();
        }

        let lists = orchestrator.load_selectors().await.unwrap();
        assert!(!lists.any_empty());
        assert!(lists.refresh.is_none());
        assert_eq!(orchestrator.api().pull_count(), 0);
    }

    #[tokio::test]
    async fn load_selectors_refreshes_when_any_list_is_empty() {
        let orchestrator = orchestrator();
        let api = orchestrator.api();
        api.set_list(ReferenceKind::Client, &["Acme"]);
        api.set_list(ReferenceKind::FlowerType, &["Rose"]);
        api.fail_list(ReferenceKind::Variety);

        let lists = orchestrator.load_selectors().await.unwrap();
        assert_eq!(api.pull_count(), 3);
        assert_eq!(lists.get(ReferenceKind::Client)[0].name, "Acme");
        assert_eq!(lists.get(ReferenceKind::FlowerType)[0].name, "Rose");
        assert!(lists.varieties.is_empty());
        assert!(lists.refresh.is_some());
    }

    #[tokio::test]
    async fn explicit_refresh_pulls_each_list_once_even_if_one_stays_empty() {
        let orchestrator = orchestrator();
        orchestrator.api().set_list(ReferenceKind::Client, &["ACME"]);
        orchestrator.api().set_list(ReferenceKind::FlowerType, &["Rose"]);

        let lists = orchestrator.refresh_selectors().await.unwrap();
        assert_eq!(orchestrator.api().pull_count(), 3);
        assert!(lists.varieties.is_empty());
        assert_eq!(
            lists.refresh.unwrap().status(ReferenceKind::Variety),
            Some(&RefreshStatus::Empty)
        );
    }
}
