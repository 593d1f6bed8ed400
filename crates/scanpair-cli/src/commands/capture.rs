use std::path::Path;
use std::sync::Arc;

use scanpair_core::capture::{
    CaptureFlow, CaptureReport, CaptureService, CaptureTiming, IgnoreReason, MerchandiseSelection,
    ScanOutcome,
};
use scanpair_core::config::AppConfig;
use scanpair_core::sync::{ConnectivityMonitor, SyncScheduler};
use scanpair_core::util::unix_millis_now;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

use crate::commands::common::{
    build_orchestrator, describe_sync_outcome, open_database, start_connectivity,
};
use crate::error::CliError;

/// One line of capture input.
#[derive(Debug, PartialEq, Eq)]
pub enum CaptureInput {
    Code(String),
    Select(MerchandiseSelection),
    Reset,
    Status,
    Quit,
    Empty,
    Unknown(String),
}

pub fn parse_capture_line(line: &str) -> CaptureInput {
    let line = line.trim();
    if line.is_empty() {
        return CaptureInput::Empty;
    }
    let Some(command) = line.strip_prefix(':') else {
        return CaptureInput::Code(line.to_string());
    };

    let (name, rest) = command
        .split_once(char::is_whitespace)
        .unwrap_or((command, ""));
    match name {
        "select" => {
            let parts = rest.split('|').map(str::trim).collect::<Vec<_>>();
            match parts.as_slice() {
                [client, flower_type, variety] => CaptureInput::Select(
                    MerchandiseSelection::new(*client, *flower_type, *variety),
                ),
                _ => CaptureInput::Unknown(line.to_string()),
            }
        }
        "reset" => CaptureInput::Reset,
        "status" => CaptureInput::Status,
        "quit" | "q" => CaptureInput::Quit,
        _ => CaptureInput::Unknown(line.to_string()),
    }
}

/// Read one line, replacing bytes that are not valid UTF-8 so a garbled scan
/// does not end the session. `None` at end of input.
pub async fn read_capture_line<R>(reader: &mut R) -> std::io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    let mut buffer = Vec::new();
    if reader.read_until(b'\n', &mut buffer).await? == 0 {
        return Ok(None);
    }
    Ok(Some(String::from_utf8_lossy(&buffer).into_owned()))
}

pub fn describe_report(report: &CaptureReport) -> String {
    match &report.outcome {
        ScanOutcome::StationAccepted { station_code } => {
            format!("Station {station_code} accepted. Scan the merchandise")
        }
        ScanOutcome::Ignored(IgnoreReason::MerchandiseNotReady { remaining_ms }) => {
            format!("Ignored: merchandise is accepted in {remaining_ms} ms")
        }
        ScanOutcome::Ignored(IgnoreReason::CoolingDown { remaining_ms }) => {
            format!("Ignored: next station is accepted in {remaining_ms} ms")
        }
        ScanOutcome::Completed(record) => {
            let id = report
                .stored_id
                .map_or_else(String::new, |id| format!(" #{id}"));
            format!(
                "Stored{id}: {} -> {} ({}s). Scan a station code",
                record.station_code, record.merchandise_code, record.elapsed_seconds
            )
        }
    }
}

pub async fn run_capture(offline: bool, config: &AppConfig, db_path: &Path) -> Result<(), CliError> {
    let db = open_database(db_path).await?;
    let orchestrator = build_orchestrator(config, db.clone())?;

    let (monitor, probe) = if offline {
        (ConnectivityMonitor::new(false), None)
    } else {
        start_connectivity(config)
    };
    let scheduler = SyncScheduler::new(monitor.subscribe());
    let tasks = (!offline).then(|| {
        scheduler.start(
            Arc::clone(&orchestrator),
            config.sync_interval(),
            config.sync_flex(),
        )
    });

    let flow = CaptureFlow::new(CaptureTiming::from_config(config));
    let mut service = CaptureService::new(flow, db.clone(), scheduler.clone());

    println!("Scan a station code");
    let mut stdin = BufReader::new(tokio::io::stdin());
    while let Some(line) = read_capture_line(&mut stdin).await? {
        let result = match parse_capture_line(&line) {
            CaptureInput::Empty => continue,
            CaptureInput::Quit => break,
            CaptureInput::Reset => {
                service.reset();
                println!("Session reset. Scan a station code");
                continue;
            }
            CaptureInput::Status => {
                println!("{} record(s) pending", db.pending_count().await?);
                continue;
            }
            CaptureInput::Unknown(command) => {
                println!("Unknown command: {command}");
                continue;
            }
            CaptureInput::Code(code) => service.handle_code(&code, unix_millis_now()).await,
            CaptureInput::Select(selection) => {
                service
                    .handle_selection(&selection, unix_millis_now())
                    .await
            }
        };

        match result {
            Ok(report) => println!("{}", describe_report(&report)),
            Err(scanpair_core::Error::Validation(error)) => println!("Rejected: {error}"),
            Err(error) => return Err(error.into()),
        }
    }

    if let Some(tasks) = tasks {
        tasks.shutdown().await;
    }
    if let Some(probe) = probe {
        probe.abort();
    }

    if !offline && monitor.is_available() && db.pending_count().await? > 0 {
        let outcome = orchestrator.sync_pending().await?;
        println!("{}", describe_sync_outcome(&outcome));
    }
    Ok(())
}
