use std::path::Path;
use std::sync::Arc;

use scanpair_core::api::HttpSyncClient;
use scanpair_core::config::AppConfig;
use scanpair_core::services::{DatabaseHandle, DatabaseService};
use scanpair_core::sync::{
    ConnectivityMonitor, ProbeTarget, RefreshReport, RefreshStatus, SyncOrchestrator, SyncOutcome,
};
use scanpair_core::util::format_local_timestamp;
use scanpair_core::{ReferenceItem, ScanRecord};
use serde::Serialize;
use tokio::task::JoinHandle;

use crate::error::CliError;

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct RecordListItem {
    pub id: i64,
    pub station_code: String,
    pub merchandise_code: String,
    pub station_scanned_at: String,
    pub merchandise_scanned_at: String,
    pub elapsed_seconds: i64,
    pub status: String,
}

pub async fn open_database(db_path: &Path) -> Result<DatabaseService, CliError> {
    let handle = DatabaseHandle::new(db_path);
    Ok(handle.get().await?.clone())
}

pub fn build_orchestrator(
    config: &AppConfig,
    db: DatabaseService,
) -> Result<Arc<SyncOrchestrator<HttpSyncClient>>, CliError> {
    let api = HttpSyncClient::new(config)?;
    Ok(SyncOrchestrator::new(db, api).into_shared())
}

/// Connectivity monitor backed by a TCP probe of the backend host.
///
/// Without a usable host the monitor reports available and sync attempts
/// surface the real error.
pub fn start_connectivity(config: &AppConfig) -> (ConnectivityMonitor, Option<JoinHandle<()>>) {
    let Some(target) = ProbeTarget::from_url(&config.api_base_url) else {
        tracing::warn!(url = %config.api_base_url, "Cannot derive probe target from base URL");
        return (ConnectivityMonitor::new(true), None);
    };
    let monitor = ConnectivityMonitor::new(false);
    let probe = monitor.spawn_tcp_probe(
        target,
        config.connectivity_probe_interval(),
        config.connect_timeout(),
    );
    (monitor, Some(probe))
}

pub fn record_to_list_item(record: &ScanRecord) -> RecordListItem {
    RecordListItem {
        id: record.id,
        station_code: record.station_code.clone(),
        merchandise_code: record.merchandise_code.clone(),
        station_scanned_at: format_local_timestamp(record.station_scanned_at),
        merchandise_scanned_at: format_local_timestamp(record.merchandise_scanned_at),
        elapsed_seconds: record.elapsed_seconds,
        status: record.sync_status.to_string(),
    }
}

pub fn format_record_line(record: &ScanRecord) -> String {
    format!(
        "#{:<5} [{}] {} -> {} ({}s) {}",
        record.id,
        record.sync_status,
        record.station_code,
        record.merchandise_code,
        record.elapsed_seconds,
        format_local_timestamp(record.merchandise_scanned_at)
    )
}

pub fn format_reference_line(item: &ReferenceItem) -> String {
    format!("{:>4}  {}", item.id, item.name)
}

pub fn describe_sync_outcome(outcome: &SyncOutcome) -> String {
    match outcome {
        SyncOutcome::NothingPending => "Nothing to sync".to_string(),
        SyncOutcome::Synced { count } => format!("Synced {count} record(s)"),
        SyncOutcome::RetryNeeded { pending, reason } => {
            format!("Sync failed, {pending} record(s) still pending: {reason}")
        }
    }
}

pub fn format_refresh_lines(report: &RefreshReport) -> Vec<String> {
    report
        .results
        .iter()
        .map(|(kind, status)| match status {
            RefreshStatus::Replaced(count) => format!("{}: {count} item(s)", kind.label()),
            RefreshStatus::Empty => format!("{}: backend list empty, cache kept", kind.label()),
            RefreshStatus::Failed(reason) => format!("{}: failed ({reason})", kind.label()),
        })
        .collect()
}
