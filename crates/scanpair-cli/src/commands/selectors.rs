use std::path::Path;

use scanpair_core::config::AppConfig;
use scanpair_core::sync::SelectorLists;
use scanpair_core::{ReferenceItem, ReferenceKind};
use serde::Serialize;

use crate::commands::common::{
    build_orchestrator, format_reference_line, format_refresh_lines, open_database,
};
use crate::error::CliError;

#[derive(Debug, Serialize)]
struct SelectorsOutput<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    clients: Option<&'a [ReferenceItem]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    flower_types: Option<&'a [ReferenceItem]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    varieties: Option<&'a [ReferenceItem]>,
}

pub fn format_selector_lines(lists: &SelectorLists, only: Option<ReferenceKind>) -> Vec<String> {
    let mut lines = Vec::new();
    for kind in ReferenceKind::ALL
        .into_iter()
        .filter(|kind| only.map_or(true, |only| only == *kind))
    {
        let items = lists.get(kind);
        lines.push(format!("{} ({})", kind.label(), items.len()));
        if items.is_empty() {
            lines.push("     (none cached)".to_string());
        }
        lines.extend(items.iter().map(format_reference_line));
    }
    lines
}

pub async fn run_selectors(
    kind: Option<ReferenceKind>,
    refresh: bool,
    as_json: bool,
    config: &AppConfig,
    db_path: &Path,
) -> Result<(), CliError> {
    let db = open_database(db_path).await?;
    let orchestrator = build_orchestrator(config, db)?;

    let lists = if refresh {
        orchestrator.refresh_selectors().await?
    } else {
        orchestrator.load_selectors().await?
    };
    if let Some(report) = &lists.refresh {
        for line in format_refresh_lines(report) {
            eprintln!("{line}");
        }
    }

    if as_json {
        let include = |wanted: ReferenceKind| kind.map_or(true, |kind| kind == wanted);
        let output = SelectorsOutput {
            clients: include(ReferenceKind::Client).then_some(lists.clients.as_slice()),
            flower_types: include(ReferenceKind::FlowerType)
                .then_some(lists.flower_types.as_slice()),
            varieties: include(ReferenceKind::Variety).then_some(lists.varieties.as_slice()),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        for line in format_selector_lines(&lists, kind) {
            println!("{line}");
        }
    }
    Ok(())
}
