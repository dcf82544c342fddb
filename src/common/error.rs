//! Error types for the scenario runner
//!
//! Case-local errors (dependency, transport, decode, assertion) are folded
//! into the case's result by the runner. Only configuration errors and setup
//! failures escape a run.

use std::io;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the scenario runner
#[derive(Error, Debug)]
pub enum Error {
    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid scenario file '{path}': {reason}")]
    ScenarioParse { path: String, reason: String },

    // === Case Errors ===
    #[error("dependency '{dependency}' {reason}")]
    Dependency { dependency: String, reason: String },

    #[error("request failed: {0}")]
    Transport(String),

    #[error("parse response failed: {0}")]
    Decode(String),

    #[error("{0}")]
    Assertion(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    // === Setup/Teardown Errors ===
    #[error("{action} action failed: {reason}")]
    Cleanup { action: String, reason: String },

    // === Run Errors ===
    #[error("{failed} of {total} test cases failed")]
    RunFailed { failed: usize, total: usize },

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    /// Create a dependency error for a case whose prerequisite did not pass
    pub fn dependency(dependency: &str, reason: &str) -> Self {
        Self::Dependency {
            dependency: dependency.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create a cleanup error for a setup/teardown action
    pub fn cleanup(action: &str, reason: impl Into<String>) -> Self {
        Self::Cleanup {
            action: action.to_string(),
            reason: reason.into(),
        }
    }

    /// Whether another attempt may succeed where this one failed.
    ///
    /// Only connectivity failures qualify; anything that got a response back
    /// is deterministic for the same request.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Transport(_))
    }
}
