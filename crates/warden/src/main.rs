//! Warden CLI binary.
//!
//! Answers policy questions offline against a configuration:
//! - File read/write checks
//! - Creator attribution of program paths
//! - Privileged-operation decisions
//! - The effective layered configuration

use clap::Parser;

mod cli;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    use cli::{Cli, Commands, check_access, decide, load_config, show_config, show_creator};

    // Parse command-line arguments
    let cli = Cli::parse();

    warden::init_tracing(cli.verbose)?;

    let config = load_config(cli.config.as_deref())?;

    // Execute the requested command
    match cli.command {
        Commands::CheckRead { path, euid, op } => {
            check_access(config, false, &path, &euid, &op)?;
        }

        Commands::CheckWrite { path, euid, op } => {
            check_access(config, true, &path, &euid, &op)?;
        }

        Commands::Creator { path } => {
            show_creator(config, &path)?;
        }

        Commands::Decide {
            op,
            euid,
            unit,
            identity,
            text,
        } => {
            decide(
                config,
                &op,
                &euid,
                unit.as_deref(),
                identity.as_deref(),
                text.as_deref(),
            )?;
        }

        Commands::ShowConfig { format } => {
            show_config(&config, format)?;
        }
    }

    Ok(())
}
