//! Error types for the message-merge library.
//!
//! This module provides custom error types using `thiserror` for better error handling
//! and more specific error messages throughout the application.

use thiserror::Error;

/// Errors that can occur while merging backup messages with contacts.
///
/// Integrity problems that the pipeline recovers from locally (duplicate join
/// rows, identifiers with no contact match) are not errors; they are counted
/// on [`crate::models::MergeReport`] instead.
#[derive(Error, Debug)]
pub enum MergeError {
    /// A required field was absent on an input row, or the pipeline was
    /// invoked with inputs the adapters should have filtered. Fatal.
    #[error("Precondition violated: {0}")]
    Precondition(String),

    /// Two directory records normalized to the same identifier while the
    /// reject-on-conflict policy was selected.
    #[error("Duplicate normalized identifier in contact directory: {0}")]
    DuplicateIdentifier(String),

    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A backup database that could not be read at all, typically because
    /// the backup was created with encryption enabled.
    #[error("Backup database at {0} is unreadable, it may be encrypted")]
    EncryptedBackup(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid pattern compilation
    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Convenience type alias for Result with `MergeError`
pub type Result<T> = std::result::Result<T, MergeError>;
