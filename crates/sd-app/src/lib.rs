//! Shared application service layer for simdex.
//!
//! Frontends go through this crate to build, update, load and save indices,
//! to read scan configuration files, and to extract values for reports and
//! plots.

pub mod config;
pub mod error;
pub mod index_service;
pub mod query;

pub use config::{load_options, save_options};
pub use error::{AppError, AppResult};
pub use index_service::{
    IndexRequest, IndexSummary, build_index, load_index, save_index, summarize, update_index,
};
pub use query::{
    FileRow, ParameterRow, Trace, Values, get_values, list_files, parameter_report,
    parameter_report_to_csv, traces_to_csv,
};

// Frontends only depend on this crate.
pub use sd_core::SimId;
pub use sd_index::{
    AcceptAnyWindow, Filter, FilterValue, NameKind, ScanOptions, ScanProgressEvent, ScanStage,
    Simdex, SkipReason, WindowPolicy,
};
pub use sd_record::{JsonDecoder, TimeWindow};
