//! Scan record repository implementation

#![allow(clippy::cast_possible_wrap)] // SQLite uses i64 for LIMIT

use crate::error::Result;
use crate::models::{NewScanRecord, ScanRecord, SyncStatus};
use rusqlite::{params, Connection};

/// Trait for scan record storage operations
pub trait ScanRecordRepository {
    /// Append a record as pending, returning its assigned id
    fn insert(&self, record: &NewScanRecord) -> Result<i64>;

    /// All pending records, oldest first
    fn unsynced(&self) -> Result<Vec<ScanRecord>>;

    /// Flag one record as synced. Unknown or already-synced ids are a no-op.
    fn mark_synced(&self, id: i64) -> Result<()>;

    /// Flag a batch as synced in one transaction
    fn mark_all_synced(&self, ids: &[i64]) -> Result<usize>;

    /// All pending records plus the `limit` newest synced ones, newest first
    fn recent(&self, limit: usize) -> Result<Vec<ScanRecord>>;

    /// Number of pending records
    fn pending_count(&self) -> Result<usize>;

    /// Look up a record by id
    fn get(&self, id: i64) -> Result<Option<ScanRecord>>;
}

/// `SQLite` implementation of `ScanRecordRepository`
pub struct SqliteScanRecordRepository<'a> {
    conn: &'a Connection,
}

const RECORD_COLUMNS: &str = "id, station_code, station_scanned_at, merchandise_code,
    merchandise_scanned_at, elapsed_seconds, sync_status";

impl<'a> SqliteScanRecordRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Parse a record from a database row
    fn parse_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<ScanRecord> {
        Ok(ScanRecord {
            id: row.get(0)?,
            station_code: row.get(1)?,
            station_scanned_at: row.get(2)?,
            merchandise_code: row.get(3)?,
            merchandise_scanned_at: row.get(4)?,
            elapsed_seconds: row.get(5)?,
            sync_status: SyncStatus::from_flag(row.get(6)?),
        })
    }
}

impl ScanRecordRepository for SqliteScanRecordRepository<'_> {
    fn insert(&self, record: &NewScanRecord) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO scan_records (station_code, station_scanned_at, merchandise_code,
                merchandise_scanned_at, elapsed_seconds, sync_status)
             VALUES (?, ?, ?, ?, ?, ?)",
            params![
                record.station_code,
                record.station_scanned_at,
                record.merchandise_code,
                record.merchandise_scanned_at,
                record.elapsed_seconds,
                SyncStatus::Pending.as_flag(),
            ],
        )?;

        Ok(self.conn.last_insert_rowid())
    }

    fn unsynced(&self) -> Result<Vec<ScanRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {RECORD_COLUMNS} FROM scan_records WHERE sync_status = 0 ORDER BY id ASC"
        ))?;

        let records = stmt
            .query_map([], Self::parse_record)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(records)
    }

    fn mark_synced(&self, id: i64) -> Result<()> {
        self.conn.execute(
            "UPDATE scan_records SET sync_status = 1 WHERE id = ?",
            params![id],
        )?;
        Ok(())
    }

    fn mark_all_synced(&self, ids: &[i64]) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        let mut updated = 0;
        {
            let mut stmt =
                tx.prepare("UPDATE scan_records SET sync_status = 1 WHERE id = ? AND sync_status = 0")?;
            for id in ids {
                updated += stmt.execute(params![id])?;
            }
        }
        tx.commit()?;
        Ok(updated)
    }

    fn recent(&self, limit: usize) -> Result<Vec<ScanRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {RECORD_COLUMNS} FROM scan_records WHERE sync_status = 0
             UNION ALL
             SELECT * FROM (
                SELECT {RECORD_COLUMNS} FROM scan_records
                WHERE sync_status = 1
                ORDER BY id DESC
                LIMIT ?
             )
             ORDER BY id DESC"
        ))?;

        let records = stmt
            .query_map(params![limit as i64], Self::parse_record)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(records)
    }

    fn pending_count(&self) -> Result<usize> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM scan_records WHERE sync_status = 0",
            [],
            |row| row.get::<_, usize>(0),
        )?;
        Ok(count)
    }

    fn get(&self, id: i64) -> Result<Option<ScanRecord>> {
        let result = self.conn.query_row(
            &format!("SELECT {RECORD_COLUMNS} FROM scan_records WHERE id = ?"),
            params![id],
            Self::parse_record,
        );

        match result {
            Ok(record) => Ok(Some(record)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
