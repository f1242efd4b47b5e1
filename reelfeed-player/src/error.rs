//! Error types for reelfeed-player
//!
//! Defines module-specific error types using thiserror for clear error
//! propagation.

use thiserror::Error;

/// Main error type for reelfeed-player
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file loading errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Catalog collaborator fetch errors
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// HTTP server errors
    #[error("HTTP server error: {0}")]
    Http(String),

    /// Streaming engine errors
    #[error("Engine error: {0}")]
    Engine(String),

    /// Session lifecycle errors
    #[error("Session error: {0}")]
    Session(String),

    /// Feed coordination errors
    #[error("Feed error: {0}")]
    Feed(String),

    /// Manifest URL parse errors
    #[error("Invalid manifest URL: {0}")]
    InvalidUrl(String),

    /// Row index outside the current feed snapshot
    #[error("Row index out of bounds: {0}")]
    RowOutOfBounds(usize),

    /// Invalid state for operation
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Other errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convenience Result type using reelfeed-player Error
pub type Result<T> = std::result::Result<T, Error>;
