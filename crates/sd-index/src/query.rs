//! Lookups over an index: name search, parameter values, file ids.

use std::path::Path;

use sd_core::{Pattern, SimId};

use crate::error::{IndexError, IndexResult};
use crate::simdex::Simdex;

/// Which catalogue(s) a name search covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NameKind {
    Parameters,
    Variables,
    #[default]
    Both,
}

/// Names matching a search, per catalogue, in catalogue order. A catalogue
/// that was not searched yields an empty list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Matches<'a> {
    pub parameters: Vec<&'a str>,
    pub variables: Vec<&'a str>,
}

impl Simdex {
    /// Catalogued names matching `pattern`, ignoring case.
    pub fn exist(&self, pattern: &str, kind: NameKind) -> IndexResult<Matches<'_>> {
        let pattern = Pattern::new(pattern)?;
        let mut matches = Matches::default();
        if matches!(kind, NameKind::Parameters | NameKind::Both) {
            matches.parameters = pattern.select(self.parameters.names());
        }
        if matches!(kind, NameKind::Variables | NameKind::Both) {
            matches.variables = pattern.select(self.variables.names());
        }
        Ok(matches)
    }

    pub fn has_parameter(&self, name: &str) -> bool {
        self.parameters.contains(name)
    }

    pub fn has_variable(&self, name: &str) -> bool {
        self.variables.contains(name)
    }

    /// Value row of a parameter, one entry per column.
    ///
    /// Entry 0 belongs to the placeholder column and is meaningless; files
    /// without the parameter read 0. Use [`Simdex::parameter_listing`] to tell
    /// absent from zero.
    pub fn get_parameter(&self, name: &str) -> IndexResult<Vec<f64>> {
        let row = self.parameter_row(name)?;
        Ok(self.parameter_values.row(row).iter().copied().collect())
    }

    /// Value of a parameter in one file, `None` when the file lacks it.
    pub fn parameter_value(&self, name: &str, id: SimId) -> IndexResult<Option<f64>> {
        let row = self.parameter_row(name)?;
        let column = self.column_of(id)?;
        Ok((self.parameter_map[(row, column)] != 0).then(|| self.parameter_values[(row, column)]))
    }

    /// Ids of the files whose path matches `pattern`, ignoring case.
    pub fn get_simid(&self, pattern: &str) -> IndexResult<Vec<SimId>> {
        let pattern = Pattern::new(pattern)?;
        Ok(self
            .files
            .iter()
            .enumerate()
            .skip(1)
            .filter(|(_, path)| pattern.is_match(&path.to_string_lossy()))
            .filter_map(|(c, _)| SimId::from_column(c))
            .collect())
    }

    /// Ids of the files that have variable `name`.
    pub fn files_with_variable(&self, name: &str) -> IndexResult<Vec<SimId>> {
        let row = self
            .variables
            .row(name)
            .ok_or_else(|| IndexError::not_found("Variable", name))?;
        Ok(self
            .variable_map
            .row(row)
            .iter()
            .enumerate()
            .skip(1)
            .filter(|&(_, &p)| p != 0)
            .filter_map(|(c, _)| SimId::from_column(c))
            .collect())
    }

    /// Every indexed file with its id.
    pub fn files_listing(&self) -> Vec<(SimId, &Path)> {
        self.sim_ids()
            .map(|id| (id, self.files[id.column()].as_path()))
            .collect()
    }

    /// Every indexed file with its value of parameter `name`.
    pub fn parameter_listing(&self, name: &str) -> IndexResult<Vec<(SimId, Option<f64>, &Path)>> {
        let row = self.parameter_row(name)?;
        Ok(self
            .sim_ids()
            .map(|id| {
                let c = id.column();
                let value =
                    (self.parameter_map[(row, c)] != 0).then(|| self.parameter_values[(row, c)]);
                (id, value, self.files[c].as_path())
            })
            .collect())
    }

    fn parameter_row(&self, name: &str) -> IndexResult<usize> {
        self.parameters
            .row(name)
            .ok_or_else(|| IndexError::not_found("Parameter", name))
    }
}
