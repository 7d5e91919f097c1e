//! Decoder boundary between result file formats and the index.

use std::fs;
use std::path::Path;

use crate::types::FileRecord;
use crate::{RecordError, RecordResult};

/// Turns a file on disk into a validated [`FileRecord`].
///
/// Decoders are shared across the decode worker pool, hence `Send + Sync`.
pub trait Decoder: Send + Sync {
    fn decode(&self, path: &Path) -> RecordResult<FileRecord>;
}

impl<F> Decoder for F
where
    F: Fn(&Path) -> RecordResult<FileRecord> + Send + Sync,
{
    fn decode(&self, path: &Path) -> RecordResult<FileRecord> {
        self(path)
    }
}

/// Reads result files stored as a JSON encoded [`FileRecord`].
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonDecoder;

impl Decoder for JsonDecoder {
    fn decode(&self, path: &Path) -> RecordResult<FileRecord> {
        let content = fs::read_to_string(path).map_err(|source| RecordError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let record: FileRecord =
            serde_json::from_str(&content).map_err(|source| RecordError::Json {
                path: path.to_path_buf(),
                source,
            })?;
        record.validate()?;
        Ok(record)
    }
}

/// Write `record` in the format read by [`JsonDecoder`].
pub fn write_record(path: &Path, record: &FileRecord) -> RecordResult<()> {
    record.validate()?;
    let content = serde_json::to_string(record).map_err(|source| RecordError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, content).map_err(|source| RecordError::Io {
        path: path.to_path_buf(),
        source,
    })
}
