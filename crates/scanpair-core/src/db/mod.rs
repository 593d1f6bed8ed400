//! Database layer for scanpair

mod connection;
mod migrations;
mod reference_repository;
mod scan_repository;

pub use connection::Database;
pub use reference_repository::{ReferenceRepository, SqliteReferenceRepository};
pub use scan_repository::{ScanRecordRepository, SqliteScanRecordRepository};
