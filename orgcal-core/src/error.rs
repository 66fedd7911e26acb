//! Error types for the orgcal engine.

use thiserror::Error;

/// Errors that can occur while exporting an outline to a calendar.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Diary expression error: {0}")]
    DiaryExpression(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type alias for export operations.
pub type ExportResult<T> = Result<T, ExportError>;
