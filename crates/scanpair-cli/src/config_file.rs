//! Config file and database location for the CLI.

use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use scanpair_core::config::AppConfig;

use crate::error::CliError;

const APP_DIR: &str = "scanpair";
const CONFIG_FILE_NAME: &str = "config.json";
const DB_FILE_NAME: &str = "scans.db";

/// Environment variable overriding the database location.
pub const DB_PATH_ENV: &str = "SCANPAIR_DB_PATH";

pub fn default_config_path() -> Result<PathBuf, CliError> {
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR).join(CONFIG_FILE_NAME))
        .ok_or_else(|| CliError::Config("Failed to resolve config directory".to_string()))
}

pub fn resolve_config_path(cli_path: Option<PathBuf>) -> Result<PathBuf, CliError> {
    cli_path.map_or_else(default_config_path, Ok)
}

/// Load the config at `path`, falling back to defaults when the file does
/// not exist, then apply environment overrides.
pub fn load_config(path: &Path) -> Result<AppConfig, CliError> {
    load_config_with(path, |key| env::var(key).ok())
}

pub fn load_config_with(
    path: &Path,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<AppConfig, CliError> {
    let config = if path.exists() {
        let raw = std::fs::read_to_string(path).map_err(|error| {
            CliError::Config(format!("Failed to read config at {}: {error}", path.display()))
        })?;
        AppConfig::from_json(&raw).map_err(|error| {
            CliError::Config(format!("Failed to parse config at {}: {error}", path.display()))
        })?
    } else {
        tracing::debug!(path = %path.display(), "No config file, using defaults");
        AppConfig::default()
    };

    Ok(config.with_env_overrides(lookup).validated()?)
}

pub fn save_config(config: &AppConfig, path: &Path) -> Result<(), CliError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let raw = serde_json::to_string_pretty(config)?;
    std::fs::write(path, format!("{raw}\n"))?;
    Ok(())
}

pub fn resolve_db_path(cli_db_path: Option<PathBuf>) -> Result<PathBuf, CliError> {
    resolve_db_path_with(cli_db_path, env::var_os(DB_PATH_ENV), dirs::data_dir())
}

fn resolve_db_path_with(
    cli_db_path: Option<PathBuf>,
    env_db_path: Option<OsString>,
    data_dir: Option<PathBuf>,
) -> Result<PathBuf, CliError> {
    if let Some(path) = cli_db_path.or_else(|| env_db_path.map(PathBuf::from)) {
        return Ok(path);
    }
    data_dir
        .map(|dir| dir.join(APP_DIR).join(DB_FILE_NAME))
        .ok_or_else(|| CliError::Config("Failed to resolve data directory".to_string()))
}
