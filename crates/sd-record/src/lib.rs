//! sd-record: decoded simulation result files.
//!
//! A result file is decoded into a [`FileRecord`]: the signal names, where
//! each signal's data lives, and the two value stores. [`Simulation`] wraps a
//! record and answers value lookups for a single file.

pub mod decoder;
pub mod simulation;
pub mod types;

pub use decoder::{Decoder, JsonDecoder, write_record};
pub use simulation::{Separated, Simulation};
pub use types::*;

use std::path::PathBuf;

pub type RecordResult<T> = Result<T, RecordError>;

#[derive(thiserror::Error, Debug)]
pub enum RecordError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{path} is not a simulation result file: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Malformed result file: {what}")]
    Malformed { what: String },

    #[error("Signal '{name}' refers to unknown store {store}")]
    UnknownStore { name: String, store: i32 },

    #[error("'{name}' could not be found in {path}")]
    NotFound { name: String, path: PathBuf },

    #[error("No usable time coordinate in {path}")]
    MissingTimeCoordinate { path: PathBuf },

    #[error(transparent)]
    Pattern(#[from] sd_core::SdError),
}

impl RecordError {
    /// True for errors meaning "this file cannot be indexed", as opposed to a
    /// failed lookup in a valid file.
    pub fn is_decode_failure(&self) -> bool {
        !matches!(self, RecordError::NotFound { .. } | RecordError::Pattern(_))
    }
}
