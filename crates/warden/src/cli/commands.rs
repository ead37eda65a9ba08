//! CLI command definitions.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Warden - query the mediator's policy offline
#[derive(Parser, Debug)]
#[command(name = "warden")]
#[command(about = "Query the object-runtime mediator's policy", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file to use instead of the layered defaults
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ask whether an identity may read a path
    CheckRead {
        /// Path as the unit would pass it
        path: String,

        /// Effective identity making the request
        #[arg(long)]
        euid: String,

        /// Guarded primitive
        #[arg(long, default_value = "read_file")]
        op: String,
    },

    /// Ask whether an identity may write a path
    CheckWrite {
        /// Path as the unit would pass it
        path: String,

        /// Effective identity making the request
        #[arg(long)]
        euid: String,

        /// Guarded primitive
        #[arg(long, default_value = "write_file")]
        op: String,
    },

    /// Show which identity owns a program path
    Creator {
        /// Program or instance path
        path: String,
    },

    /// Decide a privileged operation
    Decide {
        /// Operation name, e.g. send_imp or call_out_info
        op: String,

        /// Effective identity of the requester
        #[arg(long)]
        euid: String,

        /// Program to load as the operation's target unit
        #[arg(long, conflicts_with = "identity")]
        unit: Option<String>,

        /// Identity the operation is about
        #[arg(long)]
        identity: Option<String>,

        /// Free-text second argument
        #[arg(long)]
        text: Option<String>,
    },

    /// Print the effective configuration
    ShowConfig {
        /// Output format
        #[arg(long, value_enum, default_value_t = ConfigFormat::Toml)]
        format: ConfigFormat,
    },
}

/// Configuration output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ConfigFormat {
    /// TOML, as the config files are written
    Toml,
    /// Pretty-printed JSON
    Json,
}
