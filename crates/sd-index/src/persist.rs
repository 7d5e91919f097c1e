//! Saving and loading indices as JSON.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{IndexError, IndexResult};
use crate::select::FilterValue;
use crate::simdex::Simdex;

/// Version of the on-disk layout.
pub const FORMAT_VERSION: u32 = 1;

#[derive(Serialize)]
struct IndexFileRef<'a> {
    version: u32,
    index: &'a Simdex,
}

#[derive(Deserialize)]
struct IndexFile {
    version: u32,
    index: Simdex,
}

impl Simdex {
    /// Write the complete index (catalogues, matrices, file list, filter
    /// history) to `path`.
    ///
    /// JSON has no encoding for NaN or infinity, so an index holding such a
    /// value is refused before anything is written.
    pub fn save(&self, path: &Path) -> IndexResult<()> {
        self.check_finite()?;
        let content = serde_json::to_string_pretty(&IndexFileRef {
            version: FORMAT_VERSION,
            index: self,
        })
        .map_err(|source| IndexError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, content).map_err(|source| IndexError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Read an index written by [`Simdex::save`].
    pub fn load(path: &Path) -> IndexResult<Simdex> {
        let content = fs::read_to_string(path).map_err(|source| IndexError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let file: IndexFile = serde_json::from_str(&content).map_err(|source| IndexError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        if file.version != FORMAT_VERSION {
            return Err(IndexError::Corrupt {
                what: format!(
                    "unsupported index format version {} (expected {})",
                    file.version, FORMAT_VERSION
                ),
            });
        }
        file.index.check_invariants()?;
        Ok(file.index)
    }

    fn check_finite(&self) -> IndexResult<()> {
        let non_finite = |what: String| Err(IndexError::NonFinite { what });

        if !self.window.start.is_finite() || !self.window.stop.is_finite() {
            return non_finite(format!("time window {}", self.window));
        }
        for (row, name) in self.parameters.names().iter().enumerate() {
            let values = self.parameter_values.row(row);
            if let Some((column, value)) = values.iter().enumerate().find(|(_, v)| !v.is_finite()) {
                return non_finite(format!(
                    "value {} of parameter '{}' in {}",
                    value,
                    name,
                    self.files[column].display()
                ));
            }
        }
        for (name, value) in &self.filter_history {
            if let FilterValue::Exact(v) = value {
                if !v.is_finite() {
                    return non_finite(format!("filter value {} of parameter '{}'", v, name));
                }
            }
        }
        Ok(())
    }
}
