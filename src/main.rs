//! Muster: multi-agent task coordination with learned team formation.
//!
//! This is the main entry point for the `muster` CLI. It parses arguments,
//! dispatches to the appropriate command handler, and handles errors with
//! proper exit codes.

mod cli;
mod commands;
pub mod agent;
pub mod analytics;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod events;
pub mod exit_codes;
pub mod fs;
pub mod optimizer;
pub mod phases;
pub mod store;
pub mod task;
pub mod team;

use cli::Cli;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse_args();

    match commands::dispatch(cli) {
        Ok(()) => ExitCode::from(exit_codes::SUCCESS as u8),
        Err(err) => {
            // Print user-actionable error message to stderr
            eprintln!("Error: {}", err);

            // Return appropriate exit code
            ExitCode::from(err.exit_code() as u8)
        }
    }
}
