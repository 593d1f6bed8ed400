//! Wire format of the push and pull endpoints.

use serde::{Deserialize, Serialize};

use super::{ApiError, ApiResult};
use crate::models::{ReferenceKind, ScanRecord};
use crate::util::{compact_text, format_local_timestamp};

/// One pushed record, keyed the way the backend expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushRecord {
    #[serde(rename = "qrPrefrio")]
    pub station_code: String,
    #[serde(rename = "dateTimePrefrio")]
    pub station_date_time: String,
    #[serde(rename = "dateTimeMercancia")]
    pub merchandise_date_time: String,
    pub client: String,
    #[serde(rename = "type")]
    pub flower_type: String,
    pub variety: String,
    #[serde(rename = "segDif")]
    pub elapsed_seconds: i64,
}

impl From<&ScanRecord> for PushRecord {
    fn from(record: &ScanRecord) -> Self {
        let parts = record.merchandise_parts();
        Self {
            station_code: record.station_code.clone(),
            station_date_time: format_local_timestamp(record.station_scanned_at),
            merchandise_date_time: format_local_timestamp(record.merchandise_scanned_at),
            client: parts.client,
            flower_type: parts.flower_type,
            variety: parts.variety,
            elapsed_seconds: record.elapsed_seconds,
        }
    }
}

#[derive(Debug, Deserialize)]
struct PushResponse {
    status: Option<serde_json::Value>,
}

/// Convert a batch into the request body.
pub fn build_push_payload(records: &[ScanRecord]) -> Vec<PushRecord> {
    records.iter().map(PushRecord::from).collect()
}

/// Extract the `status` field of a push response.
pub fn parse_push_response(body: &str) -> ApiResult<String> {
    let response: PushResponse = serde_json::from_str(body).map_err(|error| {
        ApiError::InvalidPayload(format!("push response is not JSON ({error}): {}", compact_text(body)))
    })?;

    match response.status {
        Some(serde_json::Value::String(status)) => Ok(status),
        Some(other) => Ok(other.to_string()),
        None => Err(ApiError::InvalidPayload(
            "push response did not include status".to_string(),
        )),
    }
}

/// Extract the list-of-strings field named after `kind`.
pub fn parse_reference_list(kind: ReferenceKind, body: &str) -> ApiResult<Vec<String>> {
    let value: serde_json::Value = serde_json::from_str(body).map_err(|error| {
        ApiError::InvalidPayload(format!(
            "{} response is not JSON ({error}): {}",
            kind.wire_name(),
            compact_text(body)
        ))
    })?;

    let field = value.get(kind.wire_name()).ok_or_else(|| {
        ApiError::InvalidPayload(format!(
            "response did not include '{}'",
            kind.wire_name()
        ))
    })?;

    serde_json::from_value::<Vec<String>>(field.clone()).map_err(|error| {
        ApiError::InvalidPayload(format!(
            "'{}' is not a list of strings: {error}",
            kind.wire_name()
        ))
    })
}
