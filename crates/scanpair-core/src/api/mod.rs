//! Remote sync client.
//!
//! Translates local records to the backend wire format and back. Every call is
//! a single request; retries are decided by the sync orchestrator.

mod client;
mod wire;

use std::future::Future;

use thiserror::Error;

use crate::models::{ReferenceKind, ScanRecord};

pub use client::HttpSyncClient;
pub use wire::{build_push_payload, parse_push_response, parse_reference_list, PushRecord};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid API configuration: {0}")]
    InvalidConfiguration(String),
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API returned HTTP {code}: {body}")]
    Status { code: u16, body: String },
    #[error("Invalid API payload: {0}")]
    InvalidPayload(String),
}

impl ApiError {
    /// HTTP status code, when the server answered.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { code, .. } => Some(*code),
            Self::Http(error) => error.status().map(|status| status.as_u16()),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Http(error) if error.is_timeout())
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Acknowledgment of a whole pushed batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushOutcome {
    pub status_code: u16,
    /// `status` field of the response body
    pub server_status: String,
}

/// Calls the sync pipeline makes against the backend.
pub trait RemoteApi: Send + Sync + 'static {
    /// Push a batch. Success acknowledges every record; there is no partial ack.
    fn push_records(
        &self,
        records: &[ScanRecord],
    ) -> impl Future<Output = ApiResult<PushOutcome>> + Send;

    /// Pull one reference list.
    fn pull_reference_list(
        &self,
        kind: ReferenceKind,
    ) -> impl Future<Output = ApiResult<Vec<String>>> + Send;
}
