//! Error types for the catalog E2E runner
//!
//! Error messages are meant to be read in a CI log, so each one names the
//! thing that failed and, where useful, how to fix it.

use std::io;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the catalog E2E runner
#[derive(Error, Debug)]
pub enum Error {
    // === Environment Errors ===
    #[error("Application unreachable at {url}: {reason}. Is the catalog server running?")]
    Unreachable { url: String, reason: String },

    // === Browser Errors ===
    #[error("Failed to launch browser: {0}")]
    BrowserLaunch(String),

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Element '{0}' not found")]
    ElementNotFound(String),

    // === Timeout Errors ===
    #[error("Timed out after {ms} ms waiting for {what}")]
    Timeout { what: String, ms: u64 },

    #[error("No dialog appeared within {0} ms")]
    DialogTimeout(u64),

    // === Scenario Errors ===
    #[error("Invalid scenario '{name}': {reason}")]
    ScenarioInvalid { name: String, reason: String },

    #[error("Failed to parse scenario: {0}")]
    ScenarioParse(String),

    #[error("{failed} of {total} scenarios failed")]
    SuiteFailed { failed: usize, total: usize },

    #[error("No scenarios selected")]
    NoScenarios,

    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Internal Errors ===
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a timeout error for a described wait
    pub fn timeout(what: impl Into<String>, ms: u64) -> Self {
        Self::Timeout {
            what: what.into(),
            ms,
        }
    }

    /// Create an invalid scenario error
    pub fn scenario_invalid(name: &str, reason: impl Into<String>) -> Self {
        Self::ScenarioInvalid {
            name: name.to_string(),
            reason: reason.into(),
        }
    }

    /// Create an unreachable-application error
    pub fn unreachable(url: &str, reason: impl ToString) -> Self {
        Self::Unreachable {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Whether this is one of the bounded-wait errors
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout { .. } | Error::DialogTimeout(_))
    }
}

impl From<chromiumoxide::error::CdpError> for Error {
    fn from(e: chromiumoxide::error::CdpError) -> Self {
        Error::Browser(e.to_string())
    }
}
