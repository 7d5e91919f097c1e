//! sd-core: shared foundation for simdex.
//!
//! Contains:
//! - ids (1-based simulation file identifiers, 0 reserved)
//! - pattern (case-insensitive name search)
//! - error (shared error types)

pub mod error;
pub mod ids;
pub mod pattern;

pub use error::{SdError, SdResult};
pub use ids::SimId;
pub use pattern::Pattern;
