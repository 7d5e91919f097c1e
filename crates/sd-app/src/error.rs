//! Error types for the sd-app service layer.

use std::path::PathBuf;

/// Application error type that wraps errors from the backend crates and
/// gives frontends a single error to report.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Index error: {0}")]
    Index(String),

    #[error("Result file error: {0}")]
    Record(String),

    #[error("Failed to read config file: {path}")]
    ConfigFileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write config file: {path}")]
    ConfigFileWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Config error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("CSV error: {0}")]
    Csv(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for sd-app operations.
pub type AppResult<T> = Result<T, AppError>;

impl From<sd_index::IndexError> for AppError {
    fn from(err: sd_index::IndexError) -> Self {
        match err {
            sd_index::IndexError::NotFound { .. } => AppError::NotFound(err.to_string()),
            other => AppError::Index(other.to_string()),
        }
    }
}

impl From<sd_record::RecordError> for AppError {
    fn from(err: sd_record::RecordError) -> Self {
        AppError::Record(err.to_string())
    }
}

impl From<sd_core::SdError> for AppError {
    fn from(err: sd_core::SdError) -> Self {
        AppError::InvalidInput(err.to_string())
    }
}

impl From<csv::Error> for AppError {
    fn from(err: csv::Error) -> Self {
        AppError::Csv(err.to_string())
    }
}
