//! The index: catalogues plus presence/value matrices over files.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use nalgebra::{DMatrix, DVector, Scalar};
use sd_core::SimId;
use sd_record::{Separated, TimeWindow};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::catalog::Catalog;
use crate::error::{IndexError, IndexResult};
use crate::select::FilterValue;

/// Index over a set of simulation result files.
///
/// Rows of the matrices follow the catalogues, columns follow `files`.
/// Column 0 is a placeholder: its path is empty and its presence cells are 0.
/// Variable values are never stored; they are read back from the files.
///
/// An index is only grown while it is being built. Every selection returns a
/// new, independent index and leaves the receiver untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Simdex {
    pub(crate) files: Vec<PathBuf>,
    pub(crate) window: TimeWindow,

    pub(crate) parameters: Catalog,
    /// 1 where the file defines the parameter.
    pub(crate) parameter_map: DMatrix<u8>,
    /// Parameter value where present, 0 otherwise.
    pub(crate) parameter_values: DMatrix<f64>,

    pub(crate) variables: Catalog,
    /// 1 where the file has the variable.
    pub(crate) variable_map: DMatrix<u8>,

    /// Filters applied to reach this index. Re-filtering on a name replaces
    /// the earlier entry.
    pub(crate) filter_history: BTreeMap<String, FilterValue>,
}

impl Simdex {
    /// Index with no files yet; every later file must run over `window`.
    pub(crate) fn empty(window: TimeWindow) -> Self {
        Self {
            files: vec![PathBuf::new()],
            window,
            parameters: Catalog::new(),
            parameter_map: DMatrix::zeros(0, 1),
            parameter_values: DMatrix::zeros(0, 1),
            variables: Catalog::new(),
            variable_map: DMatrix::zeros(0, 1),
            filter_history: BTreeMap::new(),
        }
    }

    /// Number of indexed files (the placeholder column excluded).
    pub fn file_count(&self) -> usize {
        self.files.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.file_count() == 0
    }

    /// Ids of all indexed files, in column order.
    pub fn sim_ids(&self) -> impl Iterator<Item = SimId> + '_ {
        (1..self.files.len()).filter_map(SimId::from_column)
    }

    /// File paths by column; entry 0 is the empty placeholder.
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn path(&self, id: SimId) -> IndexResult<&Path> {
        self.files
            .get(id.column())
            .map(PathBuf::as_path)
            .ok_or_else(|| IndexError::not_found("Simulation id", id.to_string()))
    }

    pub fn contains_path(&self, path: &Path) -> bool {
        self.files.iter().skip(1).any(|p| p == path)
    }

    /// Time window shared by every indexed file.
    pub fn time_window(&self) -> TimeWindow {
        self.window
    }

    pub fn parameters(&self) -> &[String] {
        self.parameters.names()
    }

    pub fn variables(&self) -> &[String] {
        self.variables.names()
    }

    pub fn parameter_map(&self) -> &DMatrix<u8> {
        &self.parameter_map
    }

    pub fn parameter_values(&self) -> &DMatrix<f64> {
        &self.parameter_values
    }

    pub fn variable_map(&self) -> &DMatrix<u8> {
        &self.variable_map
    }

    pub fn filter_history(&self) -> &BTreeMap<String, FilterValue> {
        &self.filter_history
    }

    /// Add one file's separated names as a new column.
    ///
    /// Known names get their cell in the new column set; unknown names are
    /// appended as new rows, absent from every earlier file.
    pub(crate) fn insert(&mut self, path: PathBuf, file: &Separated) -> SimId {
        let column = self.files.len();

        let known = self.parameters.len();
        let (presence, values) = incoming_column(
            &mut self.parameters,
            &file.parameters,
            file.parameter_values.iter().copied(),
        );
        append_column(&mut self.parameter_map, presence, 0);
        append_column(&mut self.parameter_values, values, 0.0);
        let new_parameters = self.parameters.len() - known;

        let known = self.variables.len();
        let (presence, _) = incoming_column(
            &mut self.variables,
            &file.variables,
            std::iter::repeat(0.0),
        );
        append_column(&mut self.variable_map, presence, 0);
        let new_variables = self.variables.len() - known;

        debug!(
            path = %path.display(),
            column,
            new_parameters,
            new_variables,
            "merged file into index"
        );

        self.files.push(path);
        SimId::from_column(column).unwrap_or_else(|| unreachable!("column 0 is the placeholder"))
    }

    /// New index made of the columns whose `keep` flag is set, compacted.
    ///
    /// Column 0 is always kept. `keep` must have one entry per column.
    pub(crate) fn from_selection(parent: &Simdex, keep: &[bool]) -> Simdex {
        debug_assert_eq!(keep.len(), parent.files.len());
        let columns: Vec<usize> = keep
            .iter()
            .enumerate()
            .filter(|&(c, &k)| c == 0 || k)
            .map(|(c, _)| c)
            .collect();

        let mut selected = Simdex {
            files: columns.iter().map(|&c| parent.files[c].clone()).collect(),
            window: parent.window,
            parameters: parent.parameters.clone(),
            parameter_map: parent.parameter_map.select_columns(columns.iter()),
            parameter_values: parent.parameter_values.select_columns(columns.iter()),
            variables: parent.variables.clone(),
            variable_map: parent.variable_map.select_columns(columns.iter()),
            filter_history: parent.filter_history.clone(),
        };
        selected.compact();
        selected
    }

    /// Copy of this index without the names that no retained file has.
    pub fn cleanup(&self) -> Simdex {
        let mut cleaned = self.clone();
        cleaned.compact();
        cleaned
    }

    /// Drop every parameter and variable row without presence in any file.
    pub(crate) fn compact(&mut self) {
        let keep = occupied_rows(&self.parameter_map);
        if keep.len() != self.parameters.len() {
            self.parameter_map = self.parameter_map.select_rows(keep.iter());
            self.parameter_values = self.parameter_values.select_rows(keep.iter());
            self.parameters = self.parameters.select(&keep);
        }

        let keep = occupied_rows(&self.variable_map);
        if keep.len() != self.variables.len() {
            self.variable_map = self.variable_map.select_rows(keep.iter());
            self.variables = self.variables.select(&keep);
        }
    }

    /// Check the shape and content rules every index obeys.
    pub fn check_invariants(&self) -> IndexResult<()> {
        let columns = self.files.len();
        let corrupt = |what: String| Err(IndexError::Corrupt { what });

        if columns == 0 {
            return corrupt("missing placeholder column".to_string());
        }
        if self.parameter_map.shape() != (self.parameters.len(), columns) {
            return corrupt(format!(
                "parameter map is {:?}, expected {:?}",
                self.parameter_map.shape(),
                (self.parameters.len(), columns)
            ));
        }
        if self.parameter_values.shape() != self.parameter_map.shape() {
            return corrupt(format!(
                "parameter values are {:?}, expected {:?}",
                self.parameter_values.shape(),
                self.parameter_map.shape()
            ));
        }
        if self.variable_map.shape() != (self.variables.len(), columns) {
            return corrupt(format!(
                "variable map is {:?}, expected {:?}",
                self.variable_map.shape(),
                (self.variables.len(), columns)
            ));
        }

        for (kind, map, catalog) in [
            ("parameter", &self.parameter_map, &self.parameters),
            ("variable", &self.variable_map, &self.variables),
        ] {
            if map.iter().any(|&p| p > 1) {
                return corrupt(format!("{} presence cell outside {{0, 1}}", kind));
            }
            if map.column(0).iter().any(|&p| p != 0) {
                return corrupt(format!("placeholder column marks a {}", kind));
            }
            let occupied = occupied_rows(map);
            if occupied.len() != catalog.len() {
                let empty = (0..catalog.len())
                    .find(|r| !occupied.contains(r))
                    .map(|r| catalog.name(r).to_string())
                    .unwrap_or_default();
                return corrupt(format!("{} '{}' is present in no file", kind, empty));
            }
        }

        let stray = self
            .parameter_map
            .iter()
            .zip(self.parameter_values.iter())
            .any(|(&p, &v)| p == 0 && v != 0.0);
        if stray {
            return corrupt("parameter value stored where the parameter is absent".to_string());
        }

        Ok(())
    }
}

/// Presence and value column of an incoming file against `catalog`,
/// appending the names the catalogue has not seen yet.
///
/// The first occurrence of a name repeated within the file wins.
fn incoming_column<I>(
    catalog: &mut Catalog,
    names: &[String],
    values: I,
) -> (DVector<u8>, DVector<f64>)
where
    I: IntoIterator<Item = f64>,
{
    let known = catalog.len();
    let mut presence = vec![0_u8; known];
    let mut column = vec![0.0; known];

    for (name, value) in names.iter().zip(values) {
        let row = catalog.push(name);
        if row == presence.len() {
            presence.push(1);
            column.push(value);
        } else if presence[row] == 0 {
            presence[row] = 1;
            column[row] = value;
        }
    }

    (DVector::from_vec(presence), DVector::from_vec(column))
}

/// Attach `column` as the last column of `matrix`.
///
/// Rows the column has beyond the matrix height are appended first, filled
/// with `fill` in every existing column.
fn append_column<T: Scalar + Copy>(matrix: &mut DMatrix<T>, column: DVector<T>, fill: T) {
    let (rows, columns) = matrix.shape();
    debug_assert!(column.len() >= rows);
    if column.len() > rows {
        matrix.resize_mut(column.len(), columns, fill);
    }
    matrix.resize_mut(column.len(), columns + 1, fill);
    matrix.set_column(columns, &column);
}

/// Rows with at least one presence outside the placeholder column.
fn occupied_rows(map: &DMatrix<u8>) -> Vec<usize> {
    map.row_iter()
        .enumerate()
        .filter(|(_, row)| row.iter().skip(1).any(|&p| p != 0))
        .map(|(r, _)| r)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window() -> TimeWindow {
        TimeWindow {
            start: 0.0,
            stop: 100.0,
        }
    }

    fn separated(params: &[(&str, f64)], vars: &[&str]) -> Separated {
        Separated {
            parameters: params.iter().map(|(n, _)| n.to_string()).collect(),
            parameter_values: params.iter().map(|(_, v)| *v).collect(),
            variables: vars.iter().map(|v| v.to_string()).collect(),
        }
    }

    #[test]
    fn reference_file_fills_second_column() {
        let mut index = Simdex::empty(window());
        let id = index.insert("f1".into(), &separated(&[("a", 1.0), ("b", 2.0)], &["Time", "x"]));

        assert_eq!(id.column(), 1);
        assert_eq!(index.parameter_map.shape(), (2, 2));
        assert_eq!(index.parameter_map.column(0).iter().sum::<u8>(), 0);
        assert!(index.parameter_map.column(1).iter().all(|&p| p == 1));
        assert_eq!(index.parameter_values[(1, 1)], 2.0);
        assert_eq!(index.variable_map.shape(), (2, 2));
        index.check_invariants().unwrap();
    }

    #[test]
    fn merge_appends_new_rows_before_new_column() {
        let mut index = Simdex::empty(window());
        index.insert("f1".into(), &separated(&[("a", 1.0)], &["Time"]));
        index.insert("f2".into(), &separated(&[("c", 7.0), ("a", 3.0)], &["Time", "y"]));

        assert_eq!(index.parameters(), &["a".to_string(), "c".to_string()]);
        assert_eq!(index.parameter_map.shape(), (2, 3));
        // f1 does not have c
        assert_eq!(index.parameter_map[(1, 1)], 0);
        assert_eq!(index.parameter_values[(1, 1)], 0.0);
        // f2 has both
        assert_eq!(index.parameter_map[(0, 2)], 1);
        assert_eq!(index.parameter_values[(0, 2)], 3.0);
        assert_eq!(index.parameter_values[(1, 2)], 7.0);

        assert_eq!(index.variables(), &["Time".to_string(), "y".to_string()]);
        assert_eq!(index.variable_map[(1, 1)], 0);
        assert_eq!(index.variable_map[(1, 2)], 1);
        index.check_invariants().unwrap();
    }

    #[test]
    fn merge_without_new_names_only_adds_column() {
        let mut index = Simdex::empty(window());
        index.insert("f1".into(), &separated(&[("a", 1.0), ("b", 1.0)], &["Time"]));
        index.insert("f2".into(), &separated(&[("b", 5.0)], &["Time"]));

        assert_eq!(index.parameter_map.shape(), (2, 3));
        assert_eq!(index.parameter_map[(0, 2)], 0);
        assert_eq!(index.parameter_values[(1, 2)], 5.0);
    }

    #[test]
    fn repeated_name_in_one_file_is_merged_once() {
        let mut index = Simdex::empty(window());
        index.insert("f1".into(), &separated(&[("a", 1.0), ("a", 9.0)], &["Time", "Time"]));

        assert_eq!(index.parameters().len(), 1);
        assert_eq!(index.parameter_values[(0, 1)], 1.0);
        assert_eq!(index.variables().len(), 1);
    }

    #[test]
    fn selection_keeps_placeholder_and_compacts() {
        let mut index = Simdex::empty(window());
        index.insert("f1".into(), &separated(&[("a", 1.0)], &["Time"]));
        index.insert("f2".into(), &separated(&[("b", 2.0)], &["Time", "z"]));

        let only_first = Simdex::from_selection(&index, &[false, true, false]);
        assert_eq!(only_first.file_count(), 1);
        assert_eq!(only_first.files()[0], PathBuf::new());
        assert_eq!(only_first.parameters(), &["a".to_string()]);
        assert_eq!(only_first.variables(), &["Time".to_string()]);
        only_first.check_invariants().unwrap();

        // parent untouched
        assert_eq!(index.file_count(), 2);
        assert_eq!(index.parameters().len(), 2);
    }

    #[test]
    fn invariants_catch_shape_mismatch() {
        let mut index = Simdex::empty(window());
        index.insert("f1".into(), &separated(&[("a", 1.0)], &["Time"]));
        index.parameter_values = DMatrix::zeros(1, 5);
        assert!(matches!(
            index.check_invariants(),
            Err(IndexError::Corrupt { .. })
        ));
    }

    #[test]
    fn invariants_catch_rows_present_nowhere() {
        let mut index = Simdex::empty(window());
        index.insert("f1".into(), &separated(&[("a", 1.0), ("b", 2.0)], &["Time", "x"]));

        let mut params = index.clone();
        params.parameter_map[(1, 1)] = 0;
        params.parameter_values[(1, 1)] = 0.0;
        assert!(matches!(
            params.check_invariants(),
            Err(IndexError::Corrupt { what }) if what.contains("'b'")
        ));

        let mut vars = index.clone();
        vars.variable_map[(1, 1)] = 0;
        assert!(matches!(
            vars.check_invariants(),
            Err(IndexError::Corrupt { what }) if what.contains("'x'")
        ));
    }

    #[test]
    fn invariants_catch_value_without_presence() {
        let mut index = Simdex::empty(window());
        index.insert("f1".into(), &separated(&[("a", 1.0)], &["Time"]));
        index.insert("f2".into(), &separated(&[("b", 2.0)], &["Time"]));
        index.check_invariants().unwrap();

        index.parameter_values[(0, 2)] = 4.0;
        assert!(matches!(
            index.check_invariants(),
            Err(IndexError::Corrupt { .. })
        ));
    }
}
