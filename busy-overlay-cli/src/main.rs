//! busy-overlay CLI - Command-line interface
//!
//! Replays request timelines through the overlay controller and prints the
//! resulting show/hide timeline, overlay markup, or configuration.

mod commands;
mod error;
mod script;

use std::path::PathBuf;
use std::process::ExitCode;

use busy_overlay::logging::init_logging;
use clap::{Parser, Subcommand};
use console::style;

use commands::config::ConfigCommands;
use commands::markup::MarkupArgs;
use commands::simulate::SimulateArgs;
use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "busy-overlay", version, about)]
struct Cli {
    /// Log level when RUST_LOG is not set (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "warn", value_name = "LEVEL")]
    log_level: String,

    /// Also write logs to this file
    #[arg(long, global = true, value_name = "FILE")]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Replay a request script and print the overlay timeline
    Simulate(SimulateArgs),

    /// Print the overlay style block and container markup
    Markup(MarkupArgs),

    /// Inspect configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("error:").red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let _logging = init_logging(&cli.log_level, cli.log_file.as_deref())?;
    tracing::debug!(command = ?cli.command, "Starting");

    match cli.command {
        Commands::Simulate(args) => commands::simulate::run(args),
        Commands::Markup(args) => commands::markup::run(args),
        Commands::Config { command } => commands::config::run(command),
    }
}
