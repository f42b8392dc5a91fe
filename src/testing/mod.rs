//! E2E scenario runner
//!
//! Reads YAML scenarios, runs each one in its own browser session against
//! the catalog application, and reports pass/fail with the observed values
//! behind every failure.

pub mod catalog;
mod config;
pub mod ids;
pub mod report;
mod runner;
pub mod suite;
pub mod vars;

pub use config::*;
pub use ids::{IdGenerator, SequentialIds, UuidIds};
pub use report::{ScenarioResult, SuiteReport};
pub use runner::{run_scenario, Failure, FailureKind, ScenarioOutcome};
pub use suite::{check_reachable, run_suite, SuiteOptions};
