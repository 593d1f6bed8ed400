use std::path::Path;
use std::time::Duration;

use scanpair_core::capture::{CaptureFlow, CaptureTiming, MerchandiseSelection, ScanOutcome};
use scanpair_core::config::AppConfig;
use scanpair_core::util::unix_millis_now;

use crate::commands::common::{build_orchestrator, describe_sync_outcome, open_database};
use crate::error::CliError;

#[derive(Debug, PartialEq, Eq)]
pub enum MerchandiseInput {
    Code(String),
    Selection(MerchandiseSelection),
}

pub fn resolve_merchandise(
    merchandise: Option<String>,
    client: Option<String>,
    flower_type: Option<String>,
    variety: Option<String>,
) -> Result<MerchandiseInput, CliError> {
    match (merchandise, client, flower_type, variety) {
        (Some(code), None, None, None) => Ok(MerchandiseInput::Code(code)),
        (None, Some(client), Some(flower_type), Some(variety)) => Ok(MerchandiseInput::Selection(
            MerchandiseSelection::new(client, flower_type, variety),
        )),
        _ => Err(CliError::AmbiguousMerchandise),
    }
}

pub async fn run_pair(
    station: &str,
    merchandise: MerchandiseInput,
    no_sync: bool,
    config: &AppConfig,
    db_path: &Path,
) -> Result<(), CliError> {
    // Both codes are supplied at once, so neither delay applies.
    let mut flow = CaptureFlow::new(CaptureTiming {
        merchandise_delay: Duration::ZERO,
        cooldown: Duration::ZERO,
    });
    let now = unix_millis_now();
    flow.handle_code(station, now)?;
    let outcome = match &merchandise {
        MerchandiseInput::Code(code) => flow.handle_code(code, now)?,
        MerchandiseInput::Selection(selection) => flow.handle_selection(selection, now)?,
    };
    let ScanOutcome::Completed(record) = outcome else {
        return Err(CliError::PairNotCompleted);
    };

    let db = open_database(db_path).await?;
    let id = db.insert_scan_record(&record).await?;
    println!("Stored #{id}: {} -> {}", record.station_code, record.merchandise_code);

    if !no_sync {
        let orchestrator = build_orchestrator(config, db)?;
        let outcome = orchestrator.sync_pending().await?;
        println!("{}", describe_sync_outcome(&outcome));
    }
    Ok(())
}
