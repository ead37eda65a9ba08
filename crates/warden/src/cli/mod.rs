//! CLI module for the warden binary.

mod commands;
mod run;

pub use commands::{Cli, Commands, ConfigFormat};
pub use run::{check_access, decide, load_config, show_config, show_creator};
