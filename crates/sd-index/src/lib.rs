//! sd-index: index of simulation result files.
//!
//! Provides:
//! - [`Simdex`]: which files define which parameters and variables, and the
//!   parameter values, as presence/value matrices (rows = names, columns =
//!   files, column 0 reserved)
//! - Directory scanning with per-file failure isolation ([`Scanner`])
//! - Selection: exact/any parameter filters, identical-structure selection,
//!   removal, all returning new indices
//! - Name, value and file lookups
//! - JSON persistence
//!
//! # Example
//!
//! ```no_run
//! use sd_index::{Filter, Simdex};
//!
//! let index = Simdex::from_directory("results").unwrap();
//! let subset = index.filter(&Filter::new().exact("pump.k", 2.0).any("valve.Kv"));
//! for (id, path) in subset.files_listing() {
//!     println!("{id}  {}", path.display());
//! }
//! ```

pub mod catalog;
pub mod error;
pub mod persist;
pub mod query;
pub mod scan;
pub mod select;
pub mod simdex;

pub use catalog::Catalog;
pub use error::{IndexError, IndexResult};
pub use query::{Matches, NameKind};
pub use scan::{
    AcceptAnyWindow, ScanOptions, ScanProgressEvent, ScanStage, Scanner, SkipReason,
    WindowPolicy,
};
pub use select::{Filter, FilterValue};
pub use simdex::Simdex;
