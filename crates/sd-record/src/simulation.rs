//! Single-file view over a decoded result file.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use sd_core::Pattern;

use crate::decoder::Decoder;
use crate::types::{FileRecord, SignalInfo, Store, TimeWindow, Value};
use crate::{RecordError, RecordResult};

/// One simulation result file and its decoded content.
///
/// Holds the full value stores, so a `Simulation` is as large as the file it
/// came from. The index only keeps paths and reopens files on demand.
#[derive(Debug, Clone)]
pub struct Simulation {
    path: PathBuf,
    record: FileRecord,
    lookup: HashMap<String, usize>,
}

/// Names split by store, as consumed by the index merge.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Separated {
    /// Parameter names in file order.
    pub parameters: Vec<String>,
    /// `parameter_values[i]` belongs to `parameters[i]`.
    pub parameter_values: Vec<f64>,
    /// Variable names in file order, the time coordinate included.
    pub variables: Vec<String>,
}

impl Simulation {
    pub fn new(path: impl Into<PathBuf>, record: FileRecord) -> RecordResult<Self> {
        record.validate()?;

        // First occurrence wins for repeated names.
        let mut lookup = HashMap::with_capacity(record.names.len());
        for (i, name) in record.names.iter().enumerate() {
            lookup.entry(name.clone()).or_insert(i);
        }

        Ok(Self {
            path: path.into(),
            record,
            lookup,
        })
    }

    /// Decode `path` and wrap the result.
    pub fn open(path: &Path, decoder: &dyn Decoder) -> RecordResult<Self> {
        let record = decoder.decode(path)?;
        Self::new(path, record)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn record(&self) -> &FileRecord {
        &self.record
    }

    pub fn names(&self) -> &[String] {
        &self.record.names
    }

    fn signal(&self, name: &str) -> RecordResult<&SignalInfo> {
        self.lookup
            .get(name)
            .map(|&i| &self.record.signals[i])
            .ok_or_else(|| RecordError::NotFound {
                name: name.to_string(),
                path: self.path.clone(),
            })
    }

    /// Read the value(s) of a parameter or variable.
    ///
    /// Parameters yield a scalar; variables (the time coordinate included)
    /// yield their series with the duplicated final sample removed. Both are
    /// multiplied by the signal's sign.
    pub fn get_value(&self, name: &str) -> RecordResult<Value> {
        let signal = self.signal(name)?;
        self.read(name, signal)
    }

    fn read(&self, name: &str, signal: &SignalInfo) -> RecordResult<Value> {
        let sign = signal.sign();
        let missing = || RecordError::Malformed {
            what: format!("no data for '{}' at row {}", name, signal.position),
        };
        match signal.kind() {
            Some(Store::Parameter) => {
                let v = self
                    .record
                    .parameter_store
                    .scalar(signal.position)
                    .ok_or_else(missing)?;
                Ok(Value::Scalar(v * sign))
            }
            Some(Store::Timeseries) => {
                let series = self
                    .record
                    .timeseries_store
                    .series(signal.position)
                    .ok_or_else(missing)?;
                Ok(Value::Series(series.iter().map(|v| v * sign).collect()))
            }
            None => Err(RecordError::UnknownStore {
                name: name.to_string(),
                store: signal.store,
            }),
        }
    }

    /// Names (parameters and variables) matching `pattern`, ignoring case, in
    /// file order.
    pub fn exist(&self, pattern: &str) -> RecordResult<Vec<&str>> {
        let pattern = Pattern::new(pattern)?;
        Ok(pattern.select(&self.record.names))
    }

    /// Split the names into parameters (with values) and variables.
    pub fn separate(&self) -> RecordResult<Separated> {
        let mut out = Separated::default();
        for (name, signal) in self.record.names.iter().zip(&self.record.signals) {
            match self.read(name, signal)? {
                Value::Scalar(v) => {
                    out.parameters.push(name.clone());
                    out.parameter_values.push(v);
                }
                Value::Series(_) => out.variables.push(name.clone()),
            }
        }
        Ok(out)
    }

    /// The time coordinate: the named signal when given, otherwise the first
    /// signal stored as abscissa.
    pub fn time(&self, coordinate: Option<&str>) -> RecordResult<Vec<f64>> {
        let name = match coordinate {
            Some(name) => name,
            None => self
                .record
                .names
                .iter()
                .zip(&self.record.signals)
                .find(|(_, s)| s.is_abscissa())
                .map(|(n, _)| n.as_str())
                .ok_or_else(|| RecordError::MissingTimeCoordinate {
                    path: self.path.clone(),
                })?,
        };
        self.get_value(name)?
            .into_series()
            .ok_or_else(|| RecordError::MissingTimeCoordinate {
                path: self.path.clone(),
            })
    }

    /// First and last time sample.
    pub fn time_window(&self, coordinate: Option<&str>) -> RecordResult<TimeWindow> {
        let time = self.time(coordinate)?;
        TimeWindow::of(&time).ok_or_else(|| RecordError::MissingTimeCoordinate {
            path: self.path.clone(),
        })
    }
}
