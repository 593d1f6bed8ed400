//! Reference list repository implementation

use crate::error::Result;
use crate::models::{ReferenceItem, ReferenceKind};
use rusqlite::{params, Connection};

/// Trait for the three cached selector lists
pub trait ReferenceRepository {
    /// Clear a list and repopulate it in one transaction
    fn replace(&self, kind: ReferenceKind, items: &[ReferenceItem]) -> Result<()>;

    /// All cached items of a list, ordered by name
    fn list(&self, kind: ReferenceKind) -> Result<Vec<ReferenceItem>>;
}

/// `SQLite` implementation of `ReferenceRepository`
pub struct SqliteReferenceRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteReferenceRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl ReferenceRepository for SqliteReferenceRepository<'_> {
    fn replace(&self, kind: ReferenceKind, items: &[ReferenceItem]) -> Result<()> {
        let table = kind.table();
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(&format!("DELETE FROM {table}"), [])?;
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT OR REPLACE INTO {table} (id, name, last_synced_at) VALUES (?, ?, ?)"
            ))?;
            for item in items {
                stmt.execute(params![item.id, item.name, item.last_synced_at])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn list(&self, kind: ReferenceKind) -> Result<Vec<ReferenceItem>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT id, name, last_synced_at FROM {} ORDER BY name",
            kind.table()
        ))?;

        let items = stmt
            .query_map([], |row| {
                Ok(ReferenceItem {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    last_synced_at: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(items)
    }
}
