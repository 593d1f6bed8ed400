//! Scan capture: validation rules, the two-step state machine, the frame
//! hand-off to a decoder, and the service that stores completed pairs.

pub mod flow;
pub mod frames;
pub mod validation;

pub use flow::{
    CaptureFlow, CaptureState, CaptureTiming, IgnoreReason, MerchandiseSelection, ScanOutcome,
};
pub use frames::{CodeDecoder, DecodedCode, Frame, FramePipeline};
pub use validation::{
    is_valid_merchandise_code, is_valid_station_code, validate_merchandise_code,
    validate_station_code, ValidationError, MAX_STATION_CODE_LEN,
};

use crate::error::Result;
use crate::services::DatabaseService;
use crate::sync::SyncScheduler;

/// Result of feeding one event to a [`CaptureService`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureReport {
    pub outcome: ScanOutcome,
    /// Row id when the event completed and stored a pair
    pub stored_id: Option<i64>,
}

/// Drives a [`CaptureFlow`] and persists each completed pair as pending,
/// then asks the scheduler for an immediate sync.
pub struct CaptureService {
    flow: CaptureFlow,
    db: DatabaseService,
    scheduler: SyncScheduler,
}

impl CaptureService {
    pub const fn new(flow: CaptureFlow, db: DatabaseService, scheduler: SyncScheduler) -> Self {
        Self {
            flow,
            db,
            scheduler,
        }
    }

    pub const fn flow(&self) -> &CaptureFlow {
        &self.flow
    }

    pub fn reset(&mut self) {
        self.flow.reset();
    }

    /// Feed a scanned code observed at `now` (Unix ms).
    pub async fn handle_code(&mut self, code: &str, now: i64) -> Result<CaptureReport> {
        let outcome = self.flow.handle_code(code, now)?;
        self.finish(outcome).await
    }

    /// Feed a code found by the frame decoder.
    pub async fn handle_decoded(&mut self, code: &DecodedCode) -> Result<CaptureReport> {
        self.handle_code(&code.text, code.captured_at).await
    }

    /// Complete the pending station with a picked selection.
    pub async fn handle_selection(
        &mut self,
        selection: &MerchandiseSelection,
        now: i64,
    ) -> Result<CaptureReport> {
        let outcome = self.flow.handle_selection(selection, now)?;
        self.finish(outcome).await
    }

    async fn finish(&self, outcome: ScanOutcome) -> Result<CaptureReport> {
        let stored_id = match &outcome {
            ScanOutcome::Completed(record) => {
                let id = self.db.insert_scan_record(record).await?;
                let request = self.scheduler.request_immediate_sync();
                tracing::info!(id, ?request, "Scan pair stored");
                Some(id)
            }
            ScanOutcome::StationAccepted { .. } | ScanOutcome::Ignored(_) => None,
        };
        Ok(CaptureReport { outcome, stored_id })
    }
}
