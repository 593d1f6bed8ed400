//! Scan pair record model

use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator used when a merchandise code is composed from reference picks.
pub const MERCHANDISE_SEPARATOR: &str = " - ";

/// Whether the backend has acknowledged a record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    #[default]
    Pending,
    Synced,
}

impl SyncStatus {
    /// Integer flag stored in the `sync_status` column.
    pub const fn as_flag(self) -> i64 {
        match self {
            Self::Pending => 0,
            Self::Synced => 1,
        }
    }

    /// Any non-zero flag counts as synced.
    pub const fn from_flag(flag: i64) -> Self {
        if flag == 0 {
            Self::Pending
        } else {
            Self::Synced
        }
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Synced => write!(f, "synced"),
        }
    }
}

/// A completed station/merchandise pair that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewScanRecord {
    pub station_code: String,
    /// Station scan timestamp (Unix ms)
    pub station_scanned_at: i64,
    pub merchandise_code: String,
    /// Merchandise scan timestamp (Unix ms)
    pub merchandise_scanned_at: i64,
    /// Whole seconds between the two scans
    pub elapsed_seconds: i64,
}

impl NewScanRecord {
    /// Build a pair, deriving `elapsed_seconds` from the two timestamps.
    #[must_use]
    pub fn new(
        station_code: impl Into<String>,
        station_scanned_at: i64,
        merchandise_code: impl Into<String>,
        merchandise_scanned_at: i64,
    ) -> Self {
        Self {
            station_code: station_code.into(),
            station_scanned_at,
            merchandise_code: merchandise_code.into(),
            merchandise_scanned_at,
            elapsed_seconds: elapsed_seconds(station_scanned_at, merchandise_scanned_at),
        }
    }
}

/// A stored scan pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanRecord {
    /// Sequential identifier assigned at insert
    pub id: i64,
    pub station_code: String,
    pub station_scanned_at: i64,
    pub merchandise_code: String,
    pub merchandise_scanned_at: i64,
    pub elapsed_seconds: i64,
    pub sync_status: SyncStatus,
}

impl ScanRecord {
    /// Client/type/variety parts of the merchandise code.
    #[must_use]
    pub fn merchandise_parts(&self) -> MerchandiseParts {
        split_merchandise_code(&self.merchandise_code)
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.sync_status == SyncStatus::Pending
    }
}

/// Merchandise code split on [`MERCHANDISE_SEPARATOR`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MerchandiseParts {
    pub client: String,
    pub flower_type: String,
    pub variety: String,
}

/// Split a merchandise code into client, type and variety.
///
/// Missing parts are empty strings; parts beyond the third are ignored. A raw
/// scanned code without separators becomes the client.
#[must_use]
pub fn split_merchandise_code(code: &str) -> MerchandiseParts {
    let mut parts = code.split(MERCHANDISE_SEPARATOR);
    let mut next = || parts.next().unwrap_or_default().to_string();
    MerchandiseParts {
        client: next(),
        flower_type: next(),
        variety: next(),
    }
}

/// Whole seconds between two Unix-millisecond timestamps, truncated.
///
/// A merchandise timestamp earlier than the station timestamp yields 0.
#[must_use]
pub fn elapsed_seconds(station_scanned_at: i64, merchandise_scanned_at: i64) -> i64 {
    merchandise_scanned_at
        .saturating_sub(station_scanned_at)
        .max(0)
        / 1000
}
