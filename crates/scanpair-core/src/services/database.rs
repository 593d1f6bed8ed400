//! Shared database service wrapper used across clients.

use std::path::PathBuf;
use std::sync::Arc;

use rusqlite::Connection;
use tokio::sync::{Mutex, OnceCell};

use crate::db::{
    Database, ReferenceRepository, ScanRecordRepository, SqliteReferenceRepository,
    SqliteScanRecordRepository,
};
use crate::models::{NewScanRecord, ReferenceItem, ReferenceKind, ScanRecord};
use crate::util::unix_millis_now;
use crate::Result;

/// Thread-safe service for DB and repository operations.
///
/// Cloning is cheap; every clone shares the same connection, so concurrent
/// writers are serialized here and by `SQLite` transactions.
#[derive(Clone)]
pub struct DatabaseService {
    db: Arc<Mutex<Database>>,
    db_path: Option<PathBuf>,
}

impl DatabaseService {
    /// Open a database service at the given filesystem path.
    pub fn open_path(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = Database::open(&db_path)?;
        tracing::info!("Opened scan database at {}", db_path.display());
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            db_path: Some(db_path),
        })
    }

    /// Open an in-memory database service (primarily for tests).
    pub fn open_in_memory() -> Result<Self> {
        let db = Database::open_in_memory()?;
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            db_path: None,
        })
    }

    /// Path of the backing file, if any.
    pub const fn path(&self) -> Option<&PathBuf> {
        self.db_path.as_ref()
    }

    /// Run a blocking store operation on the blocking pool while holding the
    /// connection lock.
    async fn run<T, F>(&self, operation: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let db = Arc::clone(&self.db).lock_owned().await;
        tokio::task::spawn_blocking(move || operation(db.connection())).await?
    }

    /// Append a completed pair as pending and return its id.
    pub async fn insert_scan_record(&self, record: &NewScanRecord) -> Result<i64> {
        let owned = record.clone();
        let id = self
            .run(move |conn| SqliteScanRecordRepository::new(conn).insert(&owned))
            .await?;
        tracing::debug!(
            id,
            station = %record.station_code,
            elapsed_seconds = record.elapsed_seconds,
            "Stored scan pair"
        );
        Ok(id)
    }

    pub async fn unsynced_records(&self) -> Result<Vec<ScanRecord>> {
        self.run(|conn| SqliteScanRecordRepository::new(conn).unsynced())
            .await
    }

    pub async fn mark_synced(&self, id: i64) -> Result<()> {
        self.run(move |conn| SqliteScanRecordRepository::new(conn).mark_synced(id))
            .await
    }

    /// Flag every id of an acknowledged batch as synced atomically.
    pub async fn mark_all_synced(&self, ids: &[i64]) -> Result<usize> {
        let ids = ids.to_vec();
        self.run(move |conn| SqliteScanRecordRepository::new(conn).mark_all_synced(&ids))
            .await
    }

    pub async fn recent_records(&self, limit: usize) -> Result<Vec<ScanRecord>> {
        self.run(move |conn| SqliteScanRecordRepository::new(conn).recent(limit))
            .await
    }

    pub async fn pending_count(&self) -> Result<usize> {
        self.run(|conn| SqliteScanRecordRepository::new(conn).pending_count())
            .await
    }

    pub async fn get_scan_record(&self, id: i64) -> Result<Option<ScanRecord>> {
        self.run(move |conn| SqliteScanRecordRepository::new(conn).get(id))
            .await
    }

    /// Replace a reference list with freshly pulled names.
    pub async fn replace_reference_table(
        &self,
        kind: ReferenceKind,
        names: &[String],
    ) -> Result<Vec<ReferenceItem>> {
        let items = ReferenceItem::from_names(names, unix_millis_now());
        self.run(move |conn| {
            SqliteReferenceRepository::new(conn).replace(kind, &items)?;
            Ok(items)
        })
        .await
    }

    pub async fn read_reference_table(&self, kind: ReferenceKind) -> Result<Vec<ReferenceItem>> {
        self.run(move |conn| SqliteReferenceRepository::new(conn).list(kind))
            .await
    }
}

/// Process-wide database handle that opens the store on first use.
///
/// Consumers receive the handle explicitly; the one-time initialization is
/// guarded so concurrent first callers share a single open.
pub struct DatabaseHandle {
    db_path: Option<PathBuf>,
    cell: OnceCell<DatabaseService>,
}

impl DatabaseHandle {
    /// Handle for a file-backed database.
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: Some(db_path.into()),
            cell: OnceCell::new(),
        }
    }

    /// Handle for an in-memory database.
    pub fn in_memory() -> Self {
        Self {
            db_path: None,
            cell: OnceCell::new(),
        }
    }

    /// Open the database if needed and return the shared service.
    pub async fn get(&self) -> Result<&DatabaseService> {
        self.cell
            .get_or_try_init(|| async {
                match &self.db_path {
                    Some(path) => DatabaseService::open_path(path.clone()),
                    None => DatabaseService::open_in_memory(),
                }
            })
            .await
    }

    pub fn is_initialized(&self) -> bool {
        self.cell.initialized()
    }
}
