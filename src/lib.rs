//! Catalog E2E - browser end-to-end tests for the Library Catalog app
//!
//! This library runs YAML-described browser scenarios against a live
//! instance of the application, one isolated Chromium session per scenario.

pub mod browser;
pub mod cli;
pub mod commands;
pub mod common;
pub mod testing;

// Re-export commonly used types for tests
pub use common::{Config, Error, Result};
