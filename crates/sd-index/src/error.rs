//! Error types for index construction, selection and queries.

use std::path::PathBuf;

use sd_record::{RecordError, TimeWindow};
use thiserror::Error;

/// Errors raised by the index.
#[derive(Error, Debug)]
pub enum IndexError {
    #[error("{path} is not a valid simulation file: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: RecordError,
    },

    #[error("{what} not found: {name}")]
    NotFound { what: &'static str, name: String },

    #[error("{path} runs from {found}, expected {expected}")]
    TimeWindowMismatch {
        path: PathBuf,
        expected: TimeWindow,
        found: TimeWindow,
    },

    #[error("No valid simulation files found in {searched}")]
    NoValidFiles { searched: String },

    #[error("Time window {window} of reference file {path} was rejected")]
    WindowRejected { path: PathBuf, window: TimeWindow },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Index file {path} could not be (de)serialized: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Invalid filter value '{value}': expected a finite number or '*'")]
    InvalidFilterValue { value: String },

    #[error("Index cannot be saved: {what} is not finite")]
    NonFinite { what: String },

    #[error("Corrupt index: {what}")]
    Corrupt { what: String },

    #[error(transparent)]
    Pattern(#[from] sd_core::SdError),
}

pub type IndexResult<T> = Result<T, IndexError>;

impl IndexError {
    pub(crate) fn not_found(what: &'static str, name: impl Into<String>) -> Self {
        IndexError::NotFound {
            what,
            name: name.into(),
        }
    }
}
