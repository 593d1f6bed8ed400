//! Data models for scanpair

mod reference;
mod scan_record;

pub use reference::{ReferenceItem, ReferenceKind};
pub use scan_record::{
    elapsed_seconds, split_merchandise_code, MerchandiseParts, NewScanRecord, ScanRecord,
    SyncStatus, MERCHANDISE_SEPARATOR,
};
