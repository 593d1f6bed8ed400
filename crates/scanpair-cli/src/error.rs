use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] scanpair_core::Error),
    #[error(transparent)]
    Api(#[from] scanpair_core::api::ApiError),
    #[error(transparent)]
    Validation(#[from] scanpair_core::ValidationError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Provide either a merchandise code or all of --client, --type and --variety")]
    AmbiguousMerchandise,
    #[error("Pair was not completed")]
    PairNotCompleted,
    #[error("Sync failed, {pending} record(s) still pending: {reason}")]
    SyncFailed { pending: usize, reason: String },
}
