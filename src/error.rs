//! Error types for cmdlog
//!
//! Provides a unified error type for all operations.
//!
//! End of stream is *not* an error: a read past the retained content
//! succeeds with an empty result.

use thiserror::Error;

/// Result type alias using LogError
pub type Result<T> = std::result::Result<T, LogError>;

/// Unified error type for cmdlog operations
#[derive(Debug, Error)]
pub enum LogError {
    // -------------------------------------------------------------------------
    // Allocation Errors
    // -------------------------------------------------------------------------
    /// A buffer allocation failed. The whole call failed and nothing from it
    /// was recorded.
    #[error("Out of memory: failed to allocate {requested} bytes")]
    OutOfMemory { requested: usize },

    // -------------------------------------------------------------------------
    // Concurrency Errors
    // -------------------------------------------------------------------------
    /// A lock wait was aborted by cancellation. Resubmitting the identical
    /// call is safe.
    #[error("Interrupted while waiting for the {lock} lock")]
    Interrupted { lock: &'static str },

    // -------------------------------------------------------------------------
    // Transfer Errors
    // -------------------------------------------------------------------------
    /// Moving bytes into a caller-supplied sink failed.
    #[error("Copy fault: {0}")]
    CopyFault(String),

    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Network Errors
    // -------------------------------------------------------------------------
    #[error("Network error: {0}")]
    Network(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl LogError {
    /// Whether the failed call may be resubmitted unchanged
    pub fn is_retryable(&self) -> bool {
        matches!(self, LogError::Interrupted { .. })
    }
}
