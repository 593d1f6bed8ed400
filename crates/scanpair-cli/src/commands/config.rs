use std::path::Path;

use scanpair_core::config::AppConfig;
use scanpair_core::util::normalize_text_option;

use crate::cli::ConfigCommands;
use crate::config_file::{load_config, save_config};
use crate::error::CliError;

pub fn run_config(command: ConfigCommands, config_path: &Path) -> Result<(), CliError> {
    match command {
        ConfigCommands::Show => {
            let config = load_config(config_path)?;
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        ConfigCommands::Path => println!("{}", config_path.display()),
        ConfigCommands::Init {
            api_base_url,
            force,
        } => {
            if config_path.exists() && !force {
                return Err(CliError::Config(format!(
                    "{} already exists, pass --force to overwrite",
                    config_path.display()
                )));
            }
            let config = init_config(api_base_url)?;
            save_config(&config, config_path)?;
            println!("Wrote config to {}", config_path.display());
        }
    }
    Ok(())
}

pub fn init_config(api_base_url: Option<String>) -> Result<AppConfig, CliError> {
    let mut config = AppConfig::default();
    if let Some(url) = normalize_text_option(api_base_url) {
        config.api_base_url = url;
    }
    Ok(config.validated()?)
}
