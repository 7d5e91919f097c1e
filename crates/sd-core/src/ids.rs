use core::fmt;
use core::num::NonZeroU32;
use core::str::FromStr;

use crate::error::{SdError, SdResult};

/// Identifier of one indexed simulation file.
///
/// The id is the file's column in the index matrices. Column 0 is a
/// placeholder shared by every index, so ids start at 1.
///
/// - `u32` keeps memory small
/// - `NonZero` enables `Option<SimId>` to be pointer-optimized
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SimId(NonZeroU32);

impl SimId {
    /// Id of the file stored in matrix column `column`. Column 0 has no id.
    pub fn from_column(column: usize) -> Option<Self> {
        u32::try_from(column).ok().and_then(NonZeroU32::new).map(Self)
    }

    /// Like [`SimId::from_column`] but reports the reserved column as an error.
    pub fn new(value: usize) -> SdResult<Self> {
        Self::from_column(value).ok_or(SdError::InvalidSimId { value })
    }

    /// Matrix column holding this file.
    pub fn column(self) -> usize {
        self.0.get() as usize
    }
}

impl fmt::Debug for SimId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SimId({})", self.0)
    }
}

impl fmt::Display for SimId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SimId {
    type Err = SdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: usize = s
            .trim()
            .parse()
            .map_err(|_| SdError::InvalidSimId { value: 0 })?;
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_round_trip() {
        for c in [1_usize, 2, 42, 10_000] {
            let id = SimId::from_column(c).unwrap();
            assert_eq!(id.column(), c);
        }
    }

    #[test]
    fn column_zero_is_reserved() {
        assert!(SimId::from_column(0).is_none());
        assert!(SimId::new(0).is_err());
        assert!("0".parse::<SimId>().is_err());
    }

    #[test]
    fn parses_and_displays() {
        let id: SimId = " 7 ".parse().unwrap();
        assert_eq!(id.column(), 7);
        assert_eq!(id.to_string(), "7");
    }

    #[test]
    fn option_sim_id_is_small() {
        assert_eq!(
            core::mem::size_of::<SimId>(),
            core::mem::size_of::<Option<SimId>>()
        );
    }
}
