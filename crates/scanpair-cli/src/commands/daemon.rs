use std::path::Path;

use scanpair_core::config::AppConfig;
use scanpair_core::sync::{SyncScheduler, WorkKind};

use crate::commands::common::{build_orchestrator, open_database, start_connectivity};
use crate::error::CliError;

pub async fn run_daemon(config: &AppConfig, db_path: &Path) -> Result<(), CliError> {
    let db = open_database(db_path).await?;
    let orchestrator = build_orchestrator(config, db)?;

    let (monitor, probe) = start_connectivity(config);
    let scheduler = SyncScheduler::new(monitor.subscribe());
    scheduler.enqueue(WorkKind::RefreshReferences);
    let tasks = scheduler.start(orchestrator, config.sync_interval(), config.sync_flex());

    tracing::info!(
        interval_secs = config.sync_interval_secs,
        flex_secs = config.sync_flex_secs,
        "Background sync running, press Ctrl-C to stop"
    );
    tokio::signal::ctrl_c().await?;

    tracing::info!("Stopping background sync");
    tasks.shutdown().await;
    if let Some(probe) = probe {
        probe.abort();
    }
    Ok(())
}
