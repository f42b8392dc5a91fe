//! Catalog E2E - browser end-to-end tests for the Library Catalog app
//!
//! Drives Chromium through a set of YAML scenarios against a running
//! instance of the application and reports pass/fail per scenario.

use std::path::PathBuf;

use catalog_e2e::{cli, commands, common::logging};
use clap::Parser;
use commands::Commands;

#[derive(Parser)]
#[command(name = "catalog-e2e", about = "Browser end-to-end tests for the Library Catalog app")]
#[command(version, long_about = None)]
struct Cli {
    /// Configuration file (default: the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Also write detailed logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Debug-level logging
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Held until exit so the file log is flushed
    let log_guard = logging::init_cli(cli.verbose, cli.log_file.as_deref());

    if let Err(e) = cli::dispatch(cli.command, cli.config.as_deref()).await {
        eprintln!("Error: {e}");
        drop(log_guard);
        std::process::exit(1);
    }
}
