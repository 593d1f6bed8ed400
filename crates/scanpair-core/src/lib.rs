//! scanpair-core - Core library for scanpair
//!
//! This crate contains the record models, the local SQLite store, the remote
//! sync client, the sync orchestrator/scheduler and the two-step capture flow
//! used by the `scanpair` front-end.

pub mod api;
pub mod capture;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod sync;
pub mod util;

pub use capture::{CaptureFlow, CaptureService, ScanOutcome, ValidationError};
pub use error::{Error, Result};
pub use models::{NewScanRecord, ReferenceItem, ReferenceKind, ScanRecord, SyncStatus};
