use std::path::Path;

use scanpair_core::config::AppConfig;
use scanpair_core::sync::SyncOutcome;

use crate::commands::common::{
    build_orchestrator, describe_sync_outcome, format_refresh_lines, open_database,
};
use crate::error::CliError;

pub async fn run_sync(references: bool, config: &AppConfig, db_path: &Path) -> Result<(), CliError> {
    let db = open_database(db_path).await?;
    let orchestrator = build_orchestrator(config, db)?;

    let outcome = orchestrator.sync_pending().await?;
    println!("{}", describe_sync_outcome(&outcome));

    if references {
        let report = orchestrator.refresh_reference_lists().await?;
        for line in format_refresh_lines(&report) {
            println!("{line}");
        }
    }

    match outcome {
        SyncOutcome::RetryNeeded { pending, reason } => Err(CliError::SyncFailed { pending, reason }),
        SyncOutcome::NothingPending | SyncOutcome::Synced { .. } => Ok(()),
    }
}
