//! Selection of file subsets: parameter filters, identical structure, removal.
//!
//! Every selection builds a column mask over the receiver and hands it to
//! [`Simdex::from_selection`], which slices the columns and compacts the rows.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use sd_core::SimId;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{IndexError, IndexResult};
use crate::simdex::Simdex;

/// Requirement on one parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum FilterValue {
    /// The file defines the parameter, whatever its value.
    Any,
    /// The file defines the parameter with exactly this value. No tolerance
    /// is applied; round before filtering on computed values.
    Exact(f64),
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterValue::Any => write!(f, "*"),
            FilterValue::Exact(v) => write!(f, "{}", v),
        }
    }
}

impl FromStr for FilterValue {
    type Err = IndexError;

    /// `*` or an empty string selects [`FilterValue::Any`]. Values must be
    /// finite numbers.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || IndexError::InvalidFilterValue {
            value: s.to_string(),
        };
        match s.trim() {
            "" | "*" => Ok(FilterValue::Any),
            v => match v.parse::<f64>() {
                Ok(value) if value.is_finite() => Ok(FilterValue::Exact(value)),
                _ => Err(invalid()),
            },
        }
    }
}

/// AND-combination of parameter requirements, one per parameter name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    predicates: BTreeMap<String, FilterValue>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `name` to be present.
    pub fn any(mut self, name: impl Into<String>) -> Self {
        self.predicates.insert(name.into(), FilterValue::Any);
        self
    }

    /// Require `name` to equal `value`. A non-finite `value` equals no
    /// parameter value, and an index filtered on it cannot be saved.
    pub fn exact(mut self, name: impl Into<String>, value: f64) -> Self {
        self.predicates.insert(name.into(), FilterValue::Exact(value));
        self
    }

    /// Add a requirement, replacing an earlier one on the same name.
    pub fn insert(&mut self, name: impl Into<String>, value: FilterValue) {
        self.predicates.insert(name.into(), value);
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, FilterValue)> {
        self.predicates.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl<S: Into<String>> FromIterator<(S, FilterValue)> for Filter {
    fn from_iter<I: IntoIterator<Item = (S, FilterValue)>>(iter: I) -> Self {
        let mut filter = Filter::new();
        for (name, value) in iter {
            filter.insert(name, value);
        }
        filter
    }
}

impl Simdex {
    /// Files satisfying every requirement of `filter`, as a new index.
    ///
    /// A parameter that is not catalogued is defined by no file, so a
    /// requirement on it selects nothing. The requirements are recorded in
    /// the filter history of the result, replacing earlier entries with the
    /// same parameter name.
    pub fn filter(&self, filter: &Filter) -> Simdex {
        let columns = self.files.len();
        let mut present = vec![true; columns];
        let mut equal = vec![true; columns];

        for (name, value) in filter.iter() {
            let Some(row) = self.parameters.row(name) else {
                present.iter_mut().for_each(|k| *k = false);
                continue;
            };
            let map = self.parameter_map.row(row);
            match value {
                FilterValue::Any => {
                    for (keep, &p) in present.iter_mut().zip(map.iter()) {
                        *keep &= p != 0;
                    }
                }
                FilterValue::Exact(wanted) => {
                    let values = self.parameter_values.row(row);
                    for (keep, (&p, &v)) in equal.iter_mut().zip(map.iter().zip(values.iter())) {
                        *keep &= p != 0 && v == wanted;
                    }
                }
            }
        }

        let keep: Vec<bool> = present.iter().zip(&equal).map(|(&a, &b)| a && b).collect();
        let mut selected = Simdex::from_selection(self, &keep);
        selected
            .filter_history
            .extend(filter.iter().map(|(k, v)| (k.to_string(), v)));

        debug!(
            predicates = filter.len(),
            before = self.file_count(),
            after = selected.file_count(),
            "filtered index"
        );
        selected
    }

    /// Files with exactly the same parameter and variable names as `id`
    /// (values may differ), as a new index. Always contains `id` itself.
    pub fn get_identical(&self, id: SimId) -> IndexResult<Simdex> {
        let reference = self.column_of(id)?;
        let parameters = self.parameter_map.column(reference);
        let variables = self.variable_map.column(reference);

        let keep: Vec<bool> = (0..self.files.len())
            .map(|c| {
                self.parameter_map.column(c).iter().eq(parameters.iter())
                    && self.variable_map.column(c).iter().eq(variables.iter())
            })
            .collect();

        Ok(Simdex::from_selection(self, &keep))
    }

    /// Every file except `id`, as a new index.
    pub fn remove(&self, id: SimId) -> IndexResult<Simdex> {
        let dropped = self.column_of(id)?;
        let keep: Vec<bool> = (0..self.files.len()).map(|c| c != dropped).collect();
        Ok(Simdex::from_selection(self, &keep))
    }

    pub(crate) fn column_of(&self, id: SimId) -> IndexResult<usize> {
        let column = id.column();
        if column < self.files.len() {
            Ok(column)
        } else {
            Err(IndexError::not_found("Simulation id", id.to_string()))
        }
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;
    use sd_record::{Separated, TimeWindow};
    use std::path::PathBuf;

    const NAMES: [&str; 5] = ["a", "b", "c", "d", "e"];

    /// Up to 6 files, each with a random subset of parameters and variables
    /// and small integer parameter values.
    fn files() -> impl Strategy<Value = Vec<(Vec<Option<u8>>, Vec<bool>)>> {
        prop::collection::vec(
            (
                prop::collection::vec(prop::option::of(0_u8..3), NAMES.len()),
                prop::collection::vec(any::<bool>(), NAMES.len()),
            ),
            1..6,
        )
    }

    fn build(files: &[(Vec<Option<u8>>, Vec<bool>)]) -> Simdex {
        let mut index = Simdex::empty(TimeWindow {
            start: 0.0,
            stop: 1.0,
        });
        for (i, (params, vars)) in files.iter().enumerate() {
            let mut sep = Separated::default();
            for (name, value) in NAMES.iter().zip(params) {
                if let Some(v) = value {
                    sep.parameters.push(name.to_string());
                    sep.parameter_values.push(f64::from(*v));
                }
            }
            sep.variables.push("Time".to_string());
            for (name, has) in NAMES.iter().zip(vars) {
                if *has {
                    sep.variables.push(format!("v_{}", name));
                }
            }
            index.insert(PathBuf::from(format!("f{}", i + 1)), &sep);
        }
        index
    }

    proptest! {
        #[test]
        fn cleanup_leaves_no_empty_rows_and_is_idempotent(
            files in files(),
            mask in prop::collection::vec(any::<bool>(), 6),
        ) {
            let index = build(&files);
            let keep: Vec<bool> = (0..index.files().len()).map(|c| mask[c % mask.len()]).collect();
            let selected = Simdex::from_selection(&index, &keep);

            for row in selected.parameter_map().row_iter() {
                prop_assert!(row.iter().skip(1).any(|&p| p == 1));
            }
            for row in selected.variable_map().row_iter() {
                prop_assert!(row.iter().skip(1).any(|&p| p == 1));
            }
            prop_assert!(selected.check_invariants().is_ok());
            prop_assert_eq!(selected.cleanup(), selected.clone());
        }

        #[test]
        fn repeated_filter_is_idempotent(
            files in files(),
            name in 0_usize..5,
            value in prop::option::of(0_u8..3),
        ) {
            let index = build(&files);
            let filter = match value {
                Some(v) => Filter::new().exact(NAMES[name], f64::from(v)),
                None => Filter::new().any(NAMES[name]),
            };
            let once = index.filter(&filter);
            let twice = once.filter(&filter);
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn identical_contains_reference(files in files(), pick in 0_usize..6) {
            let index = build(&files);
            let column = 1 + pick % index.file_count();
            let id = SimId::from_column(column).unwrap();
            let path = index.path(id).unwrap().to_path_buf();
            let same = index.get_identical(id).unwrap();
            prop_assert!(same.contains_path(&path));
        }
    }
}
