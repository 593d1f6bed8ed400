use std::path::Path;

use serde::Serialize;

use crate::commands::common::{
    format_record_line, open_database, record_to_list_item, RecordListItem,
};
use crate::error::CliError;

#[derive(Debug, Serialize)]
struct StatusReport {
    pending: usize,
    records: Vec<RecordListItem>,
}

pub async fn run_status(limit: usize, as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let db = open_database(db_path).await?;
    let pending = db.pending_count().await?;
    let records = db.recent_records(limit).await?;

    if as_json {
        let report = StatusReport {
            pending,
            records: records.iter().map(record_to_list_item).collect(),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{pending} record(s) pending");
    if records.is_empty() {
        println!("No records yet.");
    }
    for record in &records {
        println!("{}", format_record_line(record));
    }
    Ok(())
}
