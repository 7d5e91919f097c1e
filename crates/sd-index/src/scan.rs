//! Building an index from directories of result files.
//!
//! Candidate files are decoded (optionally on the rayon pool) and then merged
//! one at a time, in path order, into a single index. A file that cannot be
//! decoded, or that does not run over the reference time window, is skipped
//! and reported; it never aborts the scan.

use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use sd_core::SimId;
use sd_record::{
    Decoder, JsonDecoder, RecordError, RecordResult, Separated, Simulation, TimeWindow,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{IndexError, IndexResult};
use crate::simdex::Simdex;

/// How candidate files are found and read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanOptions {
    /// File extension of candidates, without the dot, compared ignoring case.
    pub extension: String,
    /// Descend into sub-directories.
    pub recursive: bool,
    /// Decode candidates in parallel before merging them in order.
    pub parallel_decode: bool,
    /// Name of the time signal; the first abscissa signal when unset.
    pub time_coordinate: Option<String>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            extension: "json".to_string(),
            recursive: false,
            parallel_decode: true,
            time_coordinate: None,
        }
    }
}

/// Decides whether the reference file's time window is the right one.
pub trait WindowPolicy {
    fn confirm(&self, path: &Path, window: TimeWindow) -> bool;
}

impl<F> WindowPolicy for F
where
    F: Fn(&Path, TimeWindow) -> bool,
{
    fn confirm(&self, path: &Path, window: TimeWindow) -> bool {
        self(path, window)
    }
}

/// Accepts whatever window the reference file has.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAnyWindow;

impl WindowPolicy for AcceptAnyWindow {
    fn confirm(&self, _path: &Path, _window: TimeWindow) -> bool {
        true
    }
}

/// Why a candidate file was left out.
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    Decode(String),
    TimeWindowMismatch {
        expected: TimeWindow,
        found: TimeWindow,
    },
    AlreadyIndexed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScanStage {
    Enumerating,
    Decoding,
    Indexed(SimId),
    Skipped(SkipReason),
    Completed,
}

impl ScanStage {
    pub fn label(&self) -> &'static str {
        match self {
            ScanStage::Enumerating => "Enumerating",
            ScanStage::Decoding => "Decoding",
            ScanStage::Indexed(_) => "Indexed",
            ScanStage::Skipped(_) => "Skipped",
            ScanStage::Completed => "Completed",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScanProgressEvent {
    pub stage: ScanStage,
    pub path: Option<PathBuf>,
    /// Candidates handled so far.
    pub processed: usize,
    /// Candidates found.
    pub total: usize,
}

type ProgressCallback<'a> = &'a mut dyn FnMut(&ScanProgressEvent);

/// A candidate reduced to what the index keeps.
struct Decoded {
    path: PathBuf,
    window: TimeWindow,
    names: Separated,
}

/// Builds and extends indices from directories.
pub struct Scanner<'a> {
    options: ScanOptions,
    decoder: &'a dyn Decoder,
    policy: &'a dyn WindowPolicy,
    progress: Option<ProgressCallback<'a>>,
}

impl<'a> Scanner<'a> {
    pub fn new(decoder: &'a dyn Decoder) -> Self {
        Self {
            options: ScanOptions::default(),
            decoder,
            policy: &AcceptAnyWindow,
            progress: None,
        }
    }

    pub fn with_options(mut self, options: ScanOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_policy(mut self, policy: &'a dyn WindowPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_progress(mut self, progress: ProgressCallback<'a>) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn options(&self) -> &ScanOptions {
        &self.options
    }

    /// Index every valid file found in `dirs`.
    ///
    /// The first file that decodes becomes the reference: its time window,
    /// once confirmed by the policy, is required of every other file.
    pub fn build<P: AsRef<Path>>(&mut self, dirs: &[P]) -> IndexResult<Simdex> {
        let candidates = self.enumerate(dirs)?;
        let total = candidates.len();
        let mut index: Option<Simdex> = None;

        for (processed, result) in self.decode_all(candidates).into_iter().enumerate() {
            let processed = processed + 1;
            let decoded = match result {
                Ok(decoded) => decoded,
                Err((path, reason)) => {
                    self.skip(path, reason, processed, total);
                    continue;
                }
            };

            if index.is_none() {
                if !self.policy.confirm(&decoded.path, decoded.window) {
                    return Err(IndexError::WindowRejected {
                        path: decoded.path,
                        window: decoded.window,
                    });
                }
                info!(
                    path = %decoded.path.display(),
                    window = %decoded.window,
                    "reference file selected"
                );
                index = Some(Simdex::empty(decoded.window));
            }
            if let Some(target) = index.as_mut() {
                self.accept(target, decoded, processed, total);
            }
        }

        let index = index.ok_or_else(|| IndexError::NoValidFiles {
            searched: describe(dirs),
        })?;
        self.emit(ScanStage::Completed, None, total, total);
        info!(files = index.file_count(), "index built");
        Ok(index)
    }

    /// New index holding `base` plus every valid file in `dirs` it does not
    /// have yet. `base` is left untouched.
    pub fn update<P: AsRef<Path>>(&mut self, base: &Simdex, dirs: &[P]) -> IndexResult<Simdex> {
        let mut index = base.clone();
        let candidates: Vec<PathBuf> = self.enumerate(dirs)?;
        let total = candidates.len();

        let (known, fresh): (Vec<PathBuf>, Vec<PathBuf>) =
            candidates.into_iter().partition(|p| base.contains_path(p));
        let mut processed = 0;
        for path in known {
            processed += 1;
            self.skip(path, SkipReason::AlreadyIndexed, processed, total);
        }

        for result in self.decode_all(fresh) {
            processed += 1;
            match result {
                Ok(decoded) => self.accept(&mut index, decoded, processed, total),
                Err((path, reason)) => self.skip(path, reason, processed, total),
            }
        }

        self.emit(ScanStage::Completed, None, total, total);
        info!(
            added = index.file_count() - base.file_count(),
            files = index.file_count(),
            "index updated"
        );
        Ok(index)
    }

    /// Merge a decoded file, or skip it when its window differs.
    fn accept(&mut self, index: &mut Simdex, decoded: Decoded, processed: usize, total: usize) {
        match check_window(index, &decoded) {
            Ok(()) => {
                let id = index.insert(decoded.path.clone(), &decoded.names);
                info!(path = %decoded.path.display(), id = %id, "indexed");
                self.emit(ScanStage::Indexed(id), Some(decoded.path), processed, total);
            }
            Err(reason) => self.skip(decoded.path, reason, processed, total),
        }
    }

    fn skip(&mut self, path: PathBuf, reason: SkipReason, processed: usize, total: usize) {
        match &reason {
            SkipReason::Decode(message) => {
                warn!(path = %path.display(), "not indexed: {}", message)
            }
            SkipReason::TimeWindowMismatch { expected, found } => warn!(
                path = %path.display(),
                "not indexed: runs from {}, expected {}",
                found,
                expected
            ),
            SkipReason::AlreadyIndexed => {
                debug!(path = %path.display(), "already indexed")
            }
        }
        self.emit(ScanStage::Skipped(reason), Some(path), processed, total);
    }

    fn emit(&mut self, stage: ScanStage, path: Option<PathBuf>, processed: usize, total: usize) {
        if let Some(progress) = self.progress.as_mut() {
            progress(&ScanProgressEvent {
                stage,
                path,
                processed,
                total,
            });
        }
    }

    /// Candidate files of all `dirs`, sorted by path.
    fn enumerate<P: AsRef<Path>>(&mut self, dirs: &[P]) -> IndexResult<Vec<PathBuf>> {
        self.emit(ScanStage::Enumerating, None, 0, 0);
        let mut files = Vec::new();
        for dir in dirs {
            collect_candidates(dir.as_ref(), &self.options, &mut files)?;
        }
        files.sort();
        files.dedup();
        Ok(files)
    }

    /// Decode every path, keeping the input order in the output.
    fn decode_all(&mut self, paths: Vec<PathBuf>) -> Vec<Result<Decoded, (PathBuf, SkipReason)>> {
        self.emit(ScanStage::Decoding, None, 0, paths.len());
        let decoder = self.decoder;
        let coordinate = self.options.time_coordinate.as_deref();
        let decode = |path: PathBuf| match decode_one(decoder, &path, coordinate) {
            Ok((window, names)) => Ok(Decoded {
                path,
                window,
                names,
            }),
            Err(e) => Err((path, SkipReason::Decode(e.to_string()))),
        };

        if self.options.parallel_decode {
            paths.into_par_iter().map(decode).collect()
        } else {
            paths.into_iter().map(decode).collect()
        }
    }
}

impl Simdex {
    /// Index the result files of one directory with the default options.
    pub fn from_directory(dir: impl AsRef<Path>) -> IndexResult<Simdex> {
        Scanner::new(&JsonDecoder).build(&[dir.as_ref()])
    }
}

fn decode_one(
    decoder: &dyn Decoder,
    path: &Path,
    coordinate: Option<&str>,
) -> RecordResult<(TimeWindow, Separated)> {
    let simulation = Simulation::open(path, decoder)?;
    let window = simulation.time_window(coordinate)?;
    let names = simulation.separate()?;

    // Indices are persisted as JSON, which cannot hold NaN or infinity.
    if !window.start.is_finite() || !window.stop.is_finite() {
        return Err(RecordError::Malformed {
            what: format!("time window {} is not finite", window),
        });
    }
    let bad = names
        .parameters
        .iter()
        .zip(&names.parameter_values)
        .find(|(_, v)| !v.is_finite());
    if let Some((name, value)) = bad {
        return Err(RecordError::Malformed {
            what: format!("parameter '{}' has non-finite value {}", name, value),
        });
    }
    Ok((window, names))
}

fn check_window(index: &Simdex, decoded: &Decoded) -> Result<(), SkipReason> {
    let expected = index.time_window();
    if expected.matches(&decoded.window) {
        Ok(())
    } else {
        Err(SkipReason::TimeWindowMismatch {
            expected,
            found: decoded.window,
        })
    }
}

fn collect_candidates(
    dir: &Path,
    options: &ScanOptions,
    out: &mut Vec<PathBuf>,
) -> IndexResult<()> {
    let io_error = |source: std::io::Error| IndexError::Io {
        path: dir.to_path_buf(),
        source,
    };
    for entry in fs::read_dir(dir).map_err(io_error)? {
        let path = entry.map_err(io_error)?.path();
        if path.is_dir() {
            if options.recursive {
                collect_candidates(&path, options, out)?;
            }
        } else if has_extension(&path, &options.extension) {
            out.push(std::path::absolute(&path).unwrap_or(path));
        }
    }
    Ok(())
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(extension.trim_start_matches('.')))
}

fn describe<P: AsRef<Path>>(dirs: &[P]) -> String {
    dirs.iter()
        .map(|d| d.as_ref().display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_match_ignores_case_and_dot() {
        assert!(has_extension(Path::new("a/run.JSON"), "json"));
        assert!(has_extension(Path::new("run.json"), ".json"));
        assert!(!has_extension(Path::new("run.json.bak"), "json"));
        assert!(!has_extension(Path::new("json"), "json"));
    }

    #[test]
    fn options_fill_defaults() {
        let options: ScanOptions = serde_json::from_str(r#"{"recursive": true}"#).unwrap();
        assert!(options.recursive);
        assert_eq!(options.extension, "json");
        assert!(options.parallel_decode);
    }
}
