//! Common error types for the Coohom uploader

use thiserror::Error;

/// Common result type for uploader operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types shared by the uploader crates
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration or credential loading error (fatal at startup)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}
