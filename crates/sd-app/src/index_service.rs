//! Index building, updating, loading and saving.

use std::path::{Path, PathBuf};

use sd_index::{AcceptAnyWindow, ScanOptions, ScanProgressEvent, Scanner, Simdex, WindowPolicy};
use sd_record::{Decoder, JsonDecoder, TimeWindow};
use tracing::info;

use crate::error::{AppError, AppResult};

/// What to scan and how.
pub struct IndexRequest<'a> {
    pub dirs: &'a [PathBuf],
    pub options: ScanOptions,
    pub decoder: &'a dyn Decoder,
    pub policy: &'a dyn WindowPolicy,
}

impl<'a> IndexRequest<'a> {
    /// JSON result files, default options, any reference window accepted.
    pub fn new(dirs: &'a [PathBuf]) -> Self {
        Self {
            dirs,
            options: ScanOptions::default(),
            decoder: &JsonDecoder,
            policy: &AcceptAnyWindow,
        }
    }
}

/// Short description of an index for listings.
#[derive(Debug, Clone)]
pub struct IndexSummary {
    pub file_count: usize,
    pub parameter_count: usize,
    pub variable_count: usize,
    pub time_window: TimeWindow,
    /// Filters applied so far, as `(parameter, value)` with `*` for "any".
    pub filters: Vec<(String, String)>,
}

/// Build a new index from the request's directories.
pub fn build_index(
    request: &IndexRequest<'_>,
    progress: Option<&mut dyn FnMut(&ScanProgressEvent)>,
) -> AppResult<Simdex> {
    if request.dirs.is_empty() {
        return Err(AppError::InvalidInput(
            "At least one directory is required".to_string(),
        ));
    }
    let index = match progress {
        Some(progress) => scanner(request).with_progress(progress).build(request.dirs)?,
        None => scanner(request).build(request.dirs)?,
    };
    Ok(index)
}

/// New index holding `base` plus the new files of the request's directories.
pub fn update_index(
    base: &Simdex,
    request: &IndexRequest<'_>,
    progress: Option<&mut dyn FnMut(&ScanProgressEvent)>,
) -> AppResult<Simdex> {
    let index = match progress {
        Some(progress) => scanner(request)
            .with_progress(progress)
            .update(base, request.dirs)?,
        None => scanner(request).update(base, request.dirs)?,
    };
    Ok(index)
}

fn scanner<'s>(request: &'s IndexRequest<'_>) -> Scanner<'s> {
    Scanner::new(request.decoder)
        .with_options(request.options.clone())
        .with_policy(request.policy)
}

/// Load an index file.
pub fn load_index(path: &Path) -> AppResult<Simdex> {
    let index = Simdex::load(path)?;
    info!(path = %path.display(), files = index.file_count(), "index loaded");
    Ok(index)
}

/// Save an index file.
pub fn save_index(path: &Path, index: &Simdex) -> AppResult<()> {
    index.save(path)?;
    info!(path = %path.display(), files = index.file_count(), "index saved");
    Ok(())
}

pub fn summarize(index: &Simdex) -> IndexSummary {
    IndexSummary {
        file_count: index.file_count(),
        parameter_count: index.parameters().len(),
        variable_count: index.variables().len(),
        time_window: index.time_window(),
        filters: index
            .filter_history()
            .iter()
            .map(|(name, value)| (name.clone(), value.to_string()))
            .collect(),
    }
}
