// src/error.rs

//! Error types for the scriptman library
//!
//! Library code returns `Result<T>` with this crate-wide error enum;
//! the CLI command layer wraps these in `anyhow` for display.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Initialization or configuration problem
    #[error("Initialization error: {0}")]
    InitError(String),

    /// Database error
    #[error("Database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),

    /// I/O error with context
    #[error("I/O error: {0}")]
    IoError(String),

    /// Network or HTTP failure while talking to a registry
    #[error("Download error: {0}")]
    DownloadError(String),

    /// Registry rejected the request for authorization reasons
    #[error("Authorization error: {0}")]
    AuthError(String),

    /// Malformed catalog document, payload name, or directive block
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Requested entity does not exist
    #[error("Not found: {0}")]
    NotFoundError(String),

    /// Entity already exists or the requested transition is not allowed
    #[error("Conflict: {0}")]
    ConflictError(String),

    /// Script payload failed to execute
    #[error("Execution error: {0}")]
    ExecError(String),
}

pub type Result<T> = std::result::Result<T, Error>;
