use std::path::PathBuf;

use clap::{Parser, Subcommand};
use scanpair_core::ReferenceKind;

#[derive(Parser)]
#[command(name = "scanpair")]
#[command(about = "Pair station and merchandise scans and sync them to the backend")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// Optional path to the JSON config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Read scanned codes from stdin, one per line, and store completed pairs
    ///
    /// Lines starting with ':' are commands: `:select CLIENT|TYPE|VARIETY`,
    /// `:reset`, `:status` and `:quit`.
    Capture {
        /// Do not sync in the background while capturing
        #[arg(long)]
        offline: bool,
    },
    /// Store a single pair
    Pair {
        /// Station code
        station: String,
        /// Scanned merchandise code
        merchandise: Option<String>,
        /// Client name, for a composed merchandise code
        #[arg(long)]
        client: Option<String>,
        /// Flower type, for a composed merchandise code
        #[arg(long = "type", value_name = "TYPE")]
        flower_type: Option<String>,
        /// Variety, for a composed merchandise code
        #[arg(long)]
        variety: Option<String>,
        /// Store only; leave the pair pending
        #[arg(long)]
        no_sync: bool,
    },
    /// Show pending records and the most recent synced ones
    Status {
        /// Number of synced records to show
        #[arg(short, long)]
        limit: Option<usize>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Push pending records now
    Sync {
        /// Also refresh the reference lists
        #[arg(long)]
        references: bool,
    },
    /// Show the cached reference lists
    Selectors {
        /// Show only one list: client, type or variety
        #[arg(long, value_name = "KIND")]
        kind: Option<ReferenceKind>,
        /// Pull fresh lists from the backend first
        #[arg(long)]
        refresh: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run background sync until interrupted
    Daemon,
    /// Manage the config file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the effective configuration
    Show,
    /// Print the config file location
    Path,
    /// Write a config file with defaults
    Init {
        /// Backend base URL
        #[arg(long, value_name = "URL")]
        api_base_url: Option<String>,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}
