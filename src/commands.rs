//! CLI command definitions
//!
//! Defines the clap commands for the catalog E2E runner.

use clap::{Args, Subcommand};
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    /// Run scenarios against the catalog application
    Run(RunArgs),

    /// List scenarios without running them
    List {
        /// Scenario files or directories (default: built-in suite)
        paths: Vec<PathBuf>,

        #[command(flatten)]
        selection: Selection,
    },

    /// Check that the application answers and a browser can be started
    Check {
        /// Override the application base URL
        #[arg(long, env = "CATALOG_E2E_BASE_URL")]
        base_url: Option<String>,

        /// Skip the browser launch check
        #[arg(long)]
        no_browser: bool,
    },

    /// Show the configuration file location and the effective settings
    Config,
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Scenario files or directories (default: built-in suite)
    pub paths: Vec<PathBuf>,

    #[command(flatten)]
    pub selection: Selection,

    /// Scenarios to run concurrently
    #[arg(long, short)]
    pub jobs: Option<usize>,

    /// Extra attempts for scenarios that fail on a timeout or browser error
    #[arg(long)]
    pub retries: Option<u32>,

    /// Override the application base URL
    #[arg(long, env = "CATALOG_E2E_BASE_URL")]
    pub base_url: Option<String>,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,

    /// Skip the connectivity check before launching browsers
    #[arg(long)]
    pub no_preflight: bool,

    /// Write a JSON report to this file
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Print the JSON report to stdout instead of the console summary
    #[arg(long)]
    pub json: bool,
}

/// Which scenarios to pick
#[derive(Args, Debug, Clone, Default)]
pub struct Selection {
    /// Only scenarios whose name contains this text
    #[arg(long, short)]
    pub filter: Option<String>,

    /// Only scenarios with this tag (repeatable; any tag matches)
    #[arg(long = "tag", short)]
    pub tags: Vec<String>,
}
