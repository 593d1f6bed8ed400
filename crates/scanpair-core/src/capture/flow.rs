//! Two-step capture state machine: station first, then merchandise.
//!
//! The machine is clock-free; callers pass the scan time (Unix ms) with each
//! event so delays are deterministic under test.

use std::time::Duration;

use super::validation::{validate_merchandise_code, validate_station_code, ValidationError};
use crate::config::AppConfig;
use crate::models::{NewScanRecord, MERCHANDISE_SEPARATOR};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureTiming {
    /// Time after a station scan before scanned merchandise is accepted
    pub merchandise_delay: Duration,
    /// Pause after a completed pair
    pub cooldown: Duration,
}

impl CaptureTiming {
    pub const fn from_config(config: &AppConfig) -> Self {
        Self {
            merchandise_delay: Duration::from_millis(config.merchandise_scan_delay_ms),
            cooldown: Duration::from_millis(config.capture_cooldown_ms),
        }
    }
}

impl Default for CaptureTiming {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureState {
    AwaitStation,
    AwaitMerchandise {
        station_code: String,
        station_scanned_at: i64,
        /// Scanned merchandise before this instant is ignored
        accepts_after: i64,
    },
    Cooldown {
        until: i64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    MerchandiseNotReady { remaining_ms: i64 },
    CoolingDown { remaining_ms: i64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    StationAccepted { station_code: String },
    Ignored(IgnoreReason),
    Completed(NewScanRecord),
}

/// Merchandise picked from the three reference lists instead of scanned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerchandiseSelection {
    pub client: String,
    pub flower_type: String,
    pub variety: String,
}

impl MerchandiseSelection {
    pub fn new(
        client: impl Into<String>,
        flower_type: impl Into<String>,
        variety: impl Into<String>,
    ) -> Self {
        Self {
            client: client.into(),
            flower_type: flower_type.into(),
            variety: variety.into(),
        }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        let fields = [
            ("client", &self.client),
            ("type", &self.flower_type),
            ("variety", &self.variety),
        ];
        for (label, value) in fields {
            if value.trim().is_empty() {
                return Err(ValidationError::IncompleteSelection(label));
            }
        }
        Ok(())
    }

    /// Composite merchandise code, e.g. `ACME - Rose - Freedom`.
    pub fn code(&self) -> String {
        [
            self.client.as_str(),
            self.flower_type.as_str(),
            self.variety.as_str(),
        ]
        .join(MERCHANDISE_SEPARATOR)
    }
}

fn millis(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}

#[derive(Debug, Clone)]
pub struct CaptureFlow {
    state: CaptureState,
    timing: CaptureTiming,
}

impl CaptureFlow {
    pub const fn new(timing: CaptureTiming) -> Self {
        Self {
            state: CaptureState::AwaitStation,
            timing,
        }
    }

    pub const fn state(&self) -> &CaptureState {
        &self.state
    }

    pub const fn timing(&self) -> CaptureTiming {
        self.timing
    }

    /// Abandon the current session and wait for a new station.
    pub fn reset(&mut self) {
        self.state = CaptureState::AwaitStation;
    }

    fn leave_cooldown(&mut self, now: i64) -> Option<IgnoreReason> {
        if let CaptureState::Cooldown { until } = self.state {
            if now < until {
                return Some(IgnoreReason::CoolingDown {
                    remaining_ms: until - now,
                });
            }
            self.state = CaptureState::AwaitStation;
        }
        None
    }

    /// Feed a scanned code observed at `now` (Unix ms).
    ///
    /// Invalid codes leave the state unchanged.
    pub fn handle_code(&mut self, code: &str, now: i64) -> Result<ScanOutcome, ValidationError> {
        if let Some(reason) = self.leave_cooldown(now) {
            return Ok(ScanOutcome::Ignored(reason));
        }

        match &self.state {
            CaptureState::AwaitStation | CaptureState::Cooldown { .. } => {
                validate_station_code(code)?;
                self.state = CaptureState::AwaitMerchandise {
                    station_code: code.to_string(),
                    station_scanned_at: now,
                    accepts_after: now.saturating_add(millis(self.timing.merchandise_delay)),
                };
                tracing::debug!(station = code, "Station accepted");
                Ok(ScanOutcome::StationAccepted {
                    station_code: code.to_string(),
                })
            }
            CaptureState::AwaitMerchandise {
                station_code,
                station_scanned_at,
                accepts_after,
            } => {
                if now < *accepts_after {
                    return Ok(ScanOutcome::Ignored(IgnoreReason::MerchandiseNotReady {
                        remaining_ms: accepts_after - now,
                    }));
                }
                validate_merchandise_code(code, station_code)?;
                let record = NewScanRecord::new(station_code.clone(), *station_scanned_at, code, now);
                Ok(self.complete(record, now))
            }
        }
    }

    /// Complete the pending station with a picked selection.
    ///
    /// Unlike scanned merchandise, a selection is not subject to the
    /// activation delay.
    pub fn handle_selection(
        &mut self,
        selection: &MerchandiseSelection,
        now: i64,
    ) -> Result<ScanOutcome, ValidationError> {
        if let Some(reason) = self.leave_cooldown(now) {
            return Ok(ScanOutcome::Ignored(reason));
        }

        let CaptureState::AwaitMerchandise {
            station_code,
            station_scanned_at,
            ..
        } = &self.state
        else {
            return Err(ValidationError::NoStation);
        };
        selection.validate()?;

        let record = NewScanRecord::new(
            station_code.clone(),
            *station_scanned_at,
            selection.code(),
            now,
        );
        Ok(self.complete(record, now))
    }

    fn complete(&mut self, record: NewScanRecord, now: i64) -> ScanOutcome {
        tracing::debug!(
            station = %record.station_code,
            merchandise = %record.merchandise_code,
            elapsed = record.elapsed_seconds,
            "Pair completed"
        );
        self.state = CaptureState::Cooldown {
            until: now.saturating_add(millis(self.timing.cooldown)),
        };
        ScanOutcome::Completed(record)
    }
}

impl Default for CaptureFlow {
    fn default() -> Self {
        Self::new(CaptureTiming::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn flow() -> CaptureFlow {
        CaptureFlow::new(CaptureTiming {
            merchandise_delay: Duration::from_millis(1_500),
            cooldown: Duration::from_millis(1_000),
        })
    }

    #[test]
    fn scanned_pair_completes_after_delay() {
        let mut flow = flow();
        assert_eq!(
            flow.handle_code("ST1", 1_000).unwrap(),
            ScanOutcome::StationAccepted {
                station_code: "ST1".to_string()
            }
        );

        assert_eq!(
            flow.handle_code("LOT9", 2_000).unwrap(),
            ScanOutcome::Ignored(IgnoreReason::MerchandiseNotReady { remaining_ms: 500 })
        );

        let outcome = flow.handle_code("LOT9", 4_500).unwrap();
        let ScanOutcome::Completed(record) = outcome else {
            panic!("expected completed pair, got {outcome:?}");
        };
        assert_eq!(record, NewScanRecord::new("ST1", 1_000, "LOT9", 4_500));
        assert_eq!(record.elapsed_seconds, 3);
        assert_eq!(flow.state(), &CaptureState::Cooldown { until: 5_500 });
    }

    #[test]
    fn invalid_station_does_not_advance() {
        let mut flow = flow();
        assert_eq!(
            flow.handle_code("TOOLONG1", 0),
            Err(ValidationError::StationTooLong)
        );
        assert_eq!(flow.state(), &CaptureState::AwaitStation);
    }

    #[test]
    fn merchandise_equal_to_station_is_rejected() {
        let mut flow = flow();
        flow.handle_code("ST1", 0).unwrap();
        assert_eq!(
            flow.handle_code("ST1", 2_000),
            Err(ValidationError::MerchandiseMatchesStation)
        );
        assert!(matches!(flow.state(), CaptureState::AwaitMerchandise { .. }));
    }

    #[test]
    fn cooldown_ignores_scans_then_accepts_new_station() {
        let mut flow = flow();
        flow.handle_code("ST1", 0).unwrap();
        flow.handle_code("LOT1", 2_000).unwrap();

        assert_eq!(
            flow.handle_code("ST2", 2_400).unwrap(),
            ScanOutcome::Ignored(IgnoreReason::CoolingDown { remaining_ms: 600 })
        );
        assert_eq!(
            flow.handle_code("ST2", 3_000).unwrap(),
            ScanOutcome::StationAccepted {
                station_code: "ST2".to_string()
            }
        );
    }

    #[test]
    fn selection_skips_activation_delay() {
        let mut flow = flow();
        flow.handle_code("ST1", 10_000).unwrap();

        let selection = MerchandiseSelection::new("ACME", "Rose", "Freedom");
        let outcome = flow.handle_selection(&selection, 10_200).unwrap();
        assert_eq!(
            outcome,
            ScanOutcome::Completed(NewScanRecord::new(
                "ST1",
                10_000,
                "ACME - Rose - Freedom",
                10_200
            ))
        );
    }

    #[test]
    fn selection_requires_station_and_all_parts() {
        let mut flow = flow();
        let selection = MerchandiseSelection::new("ACME", "Rose", "Freedom");
        assert_eq!(
            flow.handle_selection(&selection, 0),
            Err(ValidationError::NoStation)
        );

        flow.handle_code("ST1", 0).unwrap();
        let partial = MerchandiseSelection::new("ACME", " ", "Freedom");
        assert_eq!(
            flow.handle_selection(&partial, 100),
            Err(ValidationError::IncompleteSelection("type"))
        );
    }

    #[test]
    fn reset_abandons_session() {
        let mut flow = flow();
        flow.handle_code("ST1", 0).unwrap();
        flow.reset();
        assert_eq!(flow.state(), &CaptureState::AwaitStation);
    }

    #[test]
    fn timing_follows_config() {
        let config = AppConfig {
            merchandise_scan_delay_ms: 250,
            capture_cooldown_ms: 0,
            ..AppConfig::default()
        };
        assert_eq!(
            CaptureTiming::from_config(&config),
            CaptureTiming {
                merchandise_delay: Duration::from_millis(250),
                cooldown: Duration::ZERO,
            }
        );
    }
}
