//! Error types for the migration engine.

use thiserror::Error;

/// Result type alias for migration operations
pub type MigrationResult<T> = Result<T, MigrationError>;

/// Error types for migration operations
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Script not found in bundle: {path}")]
    ScriptNotFound { path: String },

    #[error("No down script found for version '{version}'")]
    MissingDownScript { version: String },

    #[error("Failed to execute script '{path}': {source}")]
    ScriptExecution {
        path: String,
        source: sqlx::Error,
    },
}
