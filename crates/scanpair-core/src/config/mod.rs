//! Runtime configuration for the sync pipeline and capture flow.
//!
//! `AppConfig` is read from a JSON file by the front-end; every field has a
//! default so a partial file is valid. Environment overrides are applied on
//! top and the result is validated before use.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::util::{is_http_url, normalize_text_option};

/// Environment variable overriding [`AppConfig::api_base_url`].
pub const API_BASE_URL_ENV: &str = "SCANPAIR_API_BASE_URL";

const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:8080/public";
const DEFAULT_PUSH_ENDPOINT: &str = "api.php?type=app2barcodes";
const DEFAULT_SELECTORS_ENDPOINT: &str = "api_qr.php";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields, default)]
pub struct AppConfig {
    /// Backend base URL, without trailing slash
    pub api_base_url: String,
    /// Path (and query) of the batch push endpoint, relative to the base URL
    pub push_endpoint: String,
    /// Path of the reference list endpoint, relative to the base URL
    pub selectors_endpoint: String,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    /// Periodic sync interval
    pub sync_interval_secs: u64,
    /// Tolerance window at the end of each periodic interval
    pub sync_flex_secs: u64,
    /// Connectivity probe cadence for background mode
    pub connectivity_probe_secs: u64,
    /// Delay before the merchandise step accepts scanned codes
    pub merchandise_scan_delay_ms: u64,
    /// Pause after a completed pair before the next station scan is accepted
    pub capture_cooldown_ms: u64,
    /// Synced rows shown next to pending ones on the status view
    pub recent_records_limit: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            push_endpoint: DEFAULT_PUSH_ENDPOINT.to_string(),
            selectors_endpoint: DEFAULT_SELECTORS_ENDPOINT.to_string(),
            connect_timeout_secs: 30,
            request_timeout_secs: 30,
            sync_interval_secs: 60 * 60,
            sync_flex_secs: 15 * 60,
            connectivity_probe_secs: 30,
            merchandise_scan_delay_ms: 1_500,
            capture_cooldown_ms: 1_500,
            recent_records_limit: 10,
        }
    }
}

impl AppConfig {
    /// Parse a JSON document, filling missing fields with defaults.
    pub fn from_json(raw: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(raw)?;
        config.validated()
    }

    /// Apply environment overrides from a lookup function.
    ///
    /// Takes the lookup as a parameter so tests do not touch the process env.
    #[must_use]
    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = normalize_text_option(lookup(API_BASE_URL_ENV)) {
            self.api_base_url = url;
        }
        self
    }

    /// Normalize and check values, returning the cleaned config.
    pub fn validated(mut self) -> Result<Self> {
        let base = normalize_text_option(Some(self.api_base_url.clone()))
            .ok_or_else(|| Error::Config("api_base_url must not be empty".to_string()))?;
        if !is_http_url(&base) {
            return Err(Error::Config(
                "api_base_url must include http:// or https://".to_string(),
            ));
        }
        self.api_base_url = base.trim_end_matches('/').to_string();
        self.push_endpoint = self.push_endpoint.trim().trim_start_matches('/').to_string();
        self.selectors_endpoint = self
            .selectors_endpoint
            .trim()
            .trim_start_matches('/')
            .to_string();

        if self.push_endpoint.is_empty() || self.selectors_endpoint.is_empty() {
            return Err(Error::Config("endpoints must not be empty".to_string()));
        }
        if self.connect_timeout_secs == 0 || self.request_timeout_secs == 0 {
            return Err(Error::Config("timeouts must be greater than zero".to_string()));
        }
        if self.sync_interval_secs == 0 {
            return Err(Error::Config(
                "sync_interval_secs must be greater than zero".to_string(),
            ));
        }
        if self.sync_flex_secs >= self.sync_interval_secs {
            return Err(Error::Config(
                "sync_flex_secs must be shorter than sync_interval_secs".to_string(),
            ));
        }
        if self.connectivity_probe_secs == 0 {
            return Err(Error::Config(
                "connectivity_probe_secs must be greater than zero".to_string(),
            ));
        }
        Ok(self)
    }

    pub fn push_url(&self) -> String {
        format!("{}/{}", self.api_base_url, self.push_endpoint)
    }

    pub fn selectors_url(&self) -> String {
        format!("{}/{}", self.api_base_url, self.selectors_endpoint)
    }

    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub const fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval_secs)
    }

    pub const fn sync_flex(&self) -> Duration {
        Duration::from_secs(self.sync_flex_secs)
    }

    pub const fn connectivity_probe_interval(&self) -> Duration {
        Duration::from_secs(self.connectivity_probe_secs)
    }
}
