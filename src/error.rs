//! Error types for drive.

use thiserror::Error;

/// Common error type for drive.
#[derive(Error, Debug)]
pub enum DriveError {
    /// Database error.
    ///
    /// Database errors from sqlx are automatically converted.
    #[error("database error: {0}")]
    Database(String),

    /// Database connection error.
    #[error("database connection error: {0}")]
    DatabaseConnection(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Object storage error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Validation error for user input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Resource not found.
    #[error("{0} not found")]
    NotFound(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<sqlx::Error> for DriveError {
    fn from(e: sqlx::Error) -> Self {
        DriveError::Database(e.to_string())
    }
}

/// Result type alias for drive operations.
pub type Result<T> = std::result::Result<T, DriveError>;
