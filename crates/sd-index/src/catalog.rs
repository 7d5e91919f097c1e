//! Ordered name catalogues.
//!
//! A catalogue assigns every parameter or variable name a matrix row, in
//! order of first appearance, and keeps a reverse map so lookups during merge
//! and filtering are O(1).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Names with stable, contiguous row indices.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct Catalog {
    /// Row -> name.
    names: Vec<String>,

    /// Name -> row.
    rows: HashMap<String, usize>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Row of `name`, if catalogued.
    pub fn row(&self, name: &str) -> Option<usize> {
        self.rows.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.rows.contains_key(name)
    }

    /// Name stored at `row` (panics if out of bounds).
    pub fn name(&self, row: usize) -> &str {
        &self.names[row]
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Row of `name`, appending it when it is new.
    pub fn push(&mut self, name: &str) -> usize {
        if let Some(&row) = self.rows.get(name) {
            return row;
        }
        let row = self.names.len();
        self.names.push(name.to_string());
        self.rows.insert(name.to_string(), row);
        row
    }

    /// Catalogue made of the given rows, renumbered contiguously.
    pub fn select(&self, rows: &[usize]) -> Self {
        rows.iter()
            .map(|&r| self.names[r].clone())
            .collect::<Vec<_>>()
            .into()
    }
}

impl PartialEq for Catalog {
    fn eq(&self, other: &Self) -> bool {
        self.names == other.names
    }
}

impl From<Vec<String>> for Catalog {
    fn from(names: Vec<String>) -> Self {
        let mut catalog = Catalog::new();
        for name in &names {
            catalog.push(name);
        }
        catalog
    }
}

impl From<Catalog> for Vec<String> {
    fn from(catalog: Catalog) -> Self {
        catalog.names
    }
}
