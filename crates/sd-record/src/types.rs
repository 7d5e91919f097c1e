//! Decoded result file data types.

use serde::{Deserialize, Serialize};

use crate::{RecordError, RecordResult};

/// Store id of the abscissa (time coordinate) shared by all series.
pub const ABSCISSA_STORE_ID: i32 = 0;
/// Store id of the parameter store.
pub const PARAMETER_STORE_ID: i32 = 1;
/// Store id of the timeseries store.
pub const TIMESERIES_STORE_ID: i32 = 2;

/// Everything a decoder extracts from one result file.
///
/// `names[i]` is described by `signals[i]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    pub names: Vec<String>,
    pub signals: Vec<SignalInfo>,
    pub parameter_store: ValueStore,
    pub timeseries_store: ValueStore,
}

/// Location of one signal's data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalInfo {
    /// Raw store id: 0 = time coordinate, 1 = parameter, 2 = timeseries.
    pub store: i32,
    /// 1-based row in the selected store.
    pub position: usize,
    /// Stored values have to be negated.
    #[serde(default)]
    pub negated: bool,
}

impl SignalInfo {
    pub fn parameter(position: usize) -> Self {
        Self {
            store: PARAMETER_STORE_ID,
            position,
            negated: false,
        }
    }

    pub fn timeseries(position: usize) -> Self {
        Self {
            store: TIMESERIES_STORE_ID,
            position,
            negated: false,
        }
    }

    pub fn abscissa(position: usize) -> Self {
        Self {
            store: ABSCISSA_STORE_ID,
            position,
            negated: false,
        }
    }

    pub fn negated(mut self) -> Self {
        self.negated = !self.negated;
        self
    }

    pub fn is_abscissa(&self) -> bool {
        self.store == ABSCISSA_STORE_ID
    }

    pub fn sign(&self) -> f64 {
        if self.negated { -1.0 } else { 1.0 }
    }

    /// Store holding this signal, `None` for an unknown store id.
    pub fn kind(&self) -> Option<Store> {
        match self.store {
            PARAMETER_STORE_ID => Some(Store::Parameter),
            ABSCISSA_STORE_ID | TIMESERIES_STORE_ID => Some(Store::Timeseries),
            _ => None,
        }
    }
}

/// The two value stores of a result file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Store {
    /// One constant value per signal.
    Parameter,
    /// One value per time sample, with the final sample written twice.
    Timeseries,
}

/// Row-addressable value storage. Row `position - 1` holds the samples of the
/// signals stored at `position`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValueStore {
    rows: Vec<Vec<f64>>,
}

impl ValueStore {
    pub fn new(rows: Vec<Vec<f64>>) -> Self {
        Self { rows }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn row(&self, position: usize) -> Option<&[f64]> {
        position
            .checked_sub(1)
            .and_then(|i| self.rows.get(i))
            .map(Vec::as_slice)
    }

    /// Parameter read: the first sample of the row.
    pub fn scalar(&self, position: usize) -> Option<f64> {
        self.row(position).and_then(|row| row.first().copied())
    }

    /// Timeseries read: the row without its duplicated final sample.
    pub fn series(&self, position: usize) -> Option<&[f64]> {
        self.row(position)
            .map(|row| &row[..row.len().saturating_sub(1)])
    }
}

/// A value read from one file.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Scalar(f64),
    Series(Vec<f64>),
}

impl Value {
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Value::Scalar(v) => Some(*v),
            Value::Series(_) => None,
        }
    }

    pub fn as_series(&self) -> Option<&[f64]> {
        match self {
            Value::Scalar(_) => None,
            Value::Series(s) => Some(s),
        }
    }

    pub fn into_series(self) -> Option<Vec<f64>> {
        match self {
            Value::Scalar(_) => None,
            Value::Series(s) => Some(s),
        }
    }
}

/// First and last time sample of a run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: f64,
    pub stop: f64,
}

impl TimeWindow {
    /// Window spanned by a time coordinate, `None` when it has no samples.
    pub fn of(time: &[f64]) -> Option<Self> {
        match (time.first(), time.last()) {
            (Some(&start), Some(&stop)) => Some(Self { start, stop }),
            _ => None,
        }
    }

    /// Exact comparison; no tolerance is applied.
    pub fn matches(&self, other: &TimeWindow) -> bool {
        self.start == other.start && self.stop == other.stop
    }
}

impl std::fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} s .. {} s", self.start, self.stop)
    }
}

impl FileRecord {
    /// Check that every signal points at an existing row of a known store.
    pub fn validate(&self) -> RecordResult<()> {
        if self.names.is_empty() {
            return Err(RecordError::Malformed {
                what: "no signal names".to_string(),
            });
        }
        if self.names.len() != self.signals.len() {
            return Err(RecordError::Malformed {
                what: format!(
                    "{} names but {} signal descriptions",
                    self.names.len(),
                    self.signals.len()
                ),
            });
        }

        for (name, signal) in self.names.iter().zip(&self.signals) {
            let store = match signal.kind() {
                Some(Store::Parameter) => &self.parameter_store,
                Some(Store::Timeseries) => &self.timeseries_store,
                None => {
                    return Err(RecordError::UnknownStore {
                        name: name.clone(),
                        store: signal.store,
                    });
                }
            };
            match store.row(signal.position) {
                Some(row) if !row.is_empty() => {}
                _ => {
                    return Err(RecordError::Malformed {
                        what: format!(
                            "signal '{}' points at missing row {} of the {:?} store",
                            name,
                            signal.position,
                            signal.kind()
                        ),
                    });
                }
            }
        }

        if let Some(first) = self.timeseries_store.rows().first() {
            let samples = first.len();
            if self.timeseries_store.rows().iter().any(|r| r.len() != samples) {
                return Err(RecordError::Malformed {
                    what: "timeseries rows differ in length".to_string(),
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_kind_from_id() {
        assert_eq!(SignalInfo::abscissa(1).kind(), Some(Store::Timeseries));
        assert_eq!(SignalInfo::parameter(1).kind(), Some(Store::Parameter));
        assert_eq!(SignalInfo::timeseries(1).kind(), Some(Store::Timeseries));
        let odd = SignalInfo {
            store: 3,
            position: 1,
            negated: false,
        };
        assert_eq!(odd.kind(), None);
    }

    #[test]
    fn series_drops_duplicated_last_sample() {
        let store = ValueStore::new(vec![vec![0.0, 1.0, 2.0, 2.0]]);
        assert_eq!(store.series(1), Some(&[0.0, 1.0, 2.0][..]));
        assert_eq!(store.scalar(1), Some(0.0));
        assert_eq!(store.series(0), None);
        assert_eq!(store.series(2), None);
    }

    #[test]
    fn validate_rejects_bad_position() {
        let record = FileRecord {
            names: vec!["Time".to_string(), "k".to_string()],
            signals: vec![SignalInfo::abscissa(1), SignalInfo::parameter(4)],
            parameter_store: ValueStore::new(vec![vec![1.0, 1.0]]),
            timeseries_store: ValueStore::new(vec![vec![0.0, 1.0, 1.0]]),
        };
        assert!(matches!(
            record.validate(),
            Err(RecordError::Malformed { .. })
        ));
    }

    #[test]
    fn validate_rejects_unknown_store() {
        let record = FileRecord {
            names: vec!["x".to_string()],
            signals: vec![SignalInfo {
                store: 7,
                position: 1,
                negated: false,
            }],
            parameter_store: ValueStore::default(),
            timeseries_store: ValueStore::new(vec![vec![0.0, 0.0]]),
        };
        assert!(matches!(
            record.validate(),
            Err(RecordError::UnknownStore { store: 7, .. })
        ));
    }

    #[test]
    fn window_matches_exactly() {
        let w = TimeWindow::of(&[0.0, 5.0, 10.0]).unwrap();
        assert!(w.matches(&TimeWindow {
            start: 0.0,
            stop: 10.0
        }));
        assert!(!w.matches(&TimeWindow {
            start: 0.0,
            stop: 10.0 + 1e-9
        }));
        assert!(TimeWindow::of(&[]).is_none());
    }
}
