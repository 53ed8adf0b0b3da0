//! Error types for shiftopt

use thiserror::Error;

/// Main error type for shiftopt operations
#[derive(Debug, Error)]
pub enum OptimizeError {
    /// Error in service configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Request failed structural validation before solving
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Error inside a solver strategy that could not be degraded to a fallback
    #[error("Solver error: {0}")]
    Solver(String),

    /// Run was cancelled before completion
    #[error("Optimization run was cancelled")]
    Cancelled,

    /// Status lookup for a run id that is neither active nor completed
    #[error("Unknown optimization run: {0}")]
    UnknownRun(String),

    /// Internal error (should not occur in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for shiftopt operations
pub type Result<T> = std::result::Result<T, OptimizeError>;
