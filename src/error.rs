//! Error types for the flash library.
//!
//! All fallible operations return [`Result`], whose error type is the
//! [`FlashError`] enum. Lookup misses are never errors: they surface as
//! `None` or empty collections.
//!
//! # Examples
//!
//! ```
//! use flash::error::{FlashError, Result};
//!
//! fn example_operation() -> Result<()> {
//!     Err(FlashError::invalid_argument("Invalid input"))
//! }
//!
//! match example_operation() {
//!     Ok(_) => println!("Success"),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use std::io;

use thiserror::Error;

/// The main error type for flash operations.
#[derive(Error, Debug)]
pub enum FlashError {
    /// I/O errors (file operations, directory walks, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Index-related errors
    #[error("Index error: {0}")]
    Index(String),

    /// Storage-related errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Malformed or truncated binary input
    #[error("Corrupted data: {0}")]
    Corrupted(String),

    /// Two live entries met on the same key where keys must be unique
    #[error("Collision: {0}")]
    Collision(String),

    /// Invalid argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Missing resource
    #[error("Not found: {0}")]
    NotFound(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid blacklist pattern
    #[error("Pattern error: {0}")]
    Pattern(#[from] regex::Error),
}

/// Result type alias for operations that may fail with FlashError.
pub type Result<T> = std::result::Result<T, FlashError>;

impl FlashError {
    /// Create a new index error.
    pub fn index<S: Into<String>>(msg: S) -> Self {
        FlashError::Index(msg.into())
    }

    /// Create a new storage error.
    pub fn storage<S: Into<String>>(msg: S) -> Self {
        FlashError::Storage(msg.into())
    }

    /// Create a new corrupted data error.
    pub fn corrupted<S: Into<String>>(msg: S) -> Self {
        FlashError::Corrupted(msg.into())
    }

    /// Create a new collision error.
    pub fn collision<S: Into<String>>(msg: S) -> Self {
        FlashError::Collision(msg.into())
    }

    /// Create a new invalid argument error.
    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        FlashError::InvalidArgument(msg.into())
    }

    /// Create a new invalid config error.
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        FlashError::Config(msg.into())
    }

    /// Create a new not found error.
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        FlashError::NotFound(msg.into())
    }

    /// Whether this error reports damaged on-disk data.
    pub fn is_corrupted(&self) -> bool {
        matches!(self, FlashError::Corrupted(_))
    }
}
