//! Error types shared across the tailpin crates.

use thiserror::Error;

/// Result type alias for tailpin operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for tailpin operations.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Wire protocol errors
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Network errors
    #[error("Network error: {0}")]
    Network(String),

    /// Request timeouts
    #[error("Timed out: {0}")]
    Timeout(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Invalid input errors
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Other errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
