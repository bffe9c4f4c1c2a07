//! Error types for Dokimi operations

use std::time::Duration;

/// Result type for Dokimi operations
pub type Result<T> = std::result::Result<T, DokimiError>;

/// Error types for the harness
///
/// Validation and execution failures are normally folded into typed results
/// (`TestResult`, `ExecutionResult`) at the dispatch or fixture-run boundary;
/// these variants surface only where a caller asked for something the harness
/// cannot resolve at all.
#[derive(Debug, thiserror::Error)]
pub enum DokimiError {
    /// Structural validation failed
    #[error("Validation error: {0}")]
    Validation(String),

    /// Backend or mock execution failed
    #[error("Execution error: {0}")]
    Execution(String),

    /// A task exceeded its time limit
    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    /// No such agent in the registry
    #[error("Unknown agent: {0}")]
    UnknownAgent(String),

    /// No such phase in the registry
    #[error("Unknown phase: {0}")]
    UnknownPhase(String),

    /// No such workflow in the registry
    #[error("Unknown workflow: {0}")]
    UnknownWorkflow(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<String> for DokimiError {
    fn from(s: String) -> Self {
        DokimiError::Other(s)
    }
}

impl From<&str> for DokimiError {
    fn from(s: &str) -> Self {
        DokimiError::Other(s.to_string())
    }
}

impl From<anyhow::Error> for DokimiError {
    fn from(err: anyhow::Error) -> Self {
        DokimiError::Other(err.to_string())
    }
}
