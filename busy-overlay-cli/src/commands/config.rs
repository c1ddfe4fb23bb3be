//! Configuration CLI commands.
//!
//! Provides `config show` and `config path` for inspecting the configuration
//! the other commands would use.

use clap::Subcommand;

use super::common::{default_config_path, resolve_config, ConfigArgs};
use crate::error::CliError;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Show the resolved configuration as INI
    Show {
        #[command(flatten)]
        config: ConfigArgs,
    },

    /// Show the default configuration file path
    Path,
}

/// Run a config subcommand.
pub fn run(command: ConfigCommands) -> Result<(), CliError> {
    match command {
        ConfigCommands::Show { config } => run_show(&config),
        ConfigCommands::Path => run_path(),
    }
}

/// Print the resolved configuration.
fn run_show(args: &ConfigArgs) -> Result<(), CliError> {
    let (config, source) = resolve_config(args)?;

    println!("# source: {}", source);
    print!("{}", config.to_ini_string());

    Ok(())
}

/// Print the default configuration file path.
fn run_path() -> Result<(), CliError> {
    match default_config_path() {
        Some(path) => println!("{}", path.display()),
        None => println!("(no config directory on this platform)"),
    }
    Ok(())
}
