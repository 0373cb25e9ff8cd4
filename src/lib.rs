pub mod clock;
pub mod commands;
pub mod comparator;
pub mod config;
pub mod diagnostics;
pub mod document;
pub mod error;
pub mod guard;
pub mod navigation;
pub mod orchestrator;
pub mod parsers;
pub mod source;
pub mod storage;
pub mod token;

#[cfg(test)]
mod testing;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(name = "build-reconcile", version, about = "Detect stale client builds and reload them once")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Inject a version token into an entry document
    Stamp(commands::stamp::StampArgs),
    /// Compare the running build with the deployed one and reload if stale
    Check(commands::check::CheckArgs),
    /// Show compiled and running version details
    Diagnose(commands::diagnose::DiagnoseArgs),
}

pub async fn run() -> ExitCode {
    // stdout carries command output
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Stamp(args) => commands::stamp::execute(args),
        Command::Check(args) => commands::check::execute(args).await,
        Command::Diagnose(args) => commands::diagnose::execute(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
