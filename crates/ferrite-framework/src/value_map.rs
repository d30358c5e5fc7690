//! Dense numbering of the values flowing through a graph.

use ferrite_core::{Error, Result};
use std::collections::HashMap;

/// Bidirectional map between value names and dense indices.
///
/// Indices are handed out in insertion order starting at zero, so
/// per-value tables can be plain vectors indexed by them.
#[derive(Debug, Clone, Default)]
pub struct ValueNameIndexMap {
    map: HashMap<String, usize>,
    names: Vec<String>,
}

impl ValueNameIndexMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `name` if new; returns its index either way.
    pub fn add(&mut self, name: &str) -> usize {
        if let Some(&idx) = self.map.get(name) {
            return idx;
        }
        let idx = self.names.len();
        self.map.insert(name.to_string(), idx);
        self.names.push(name.to_string());
        idx
    }

    pub fn index(&self, name: &str) -> Result<usize> {
        self.map.get(name).copied().ok_or_else(|| {
            Error::InvalidArgument(format!("Could not find value with name '{name}'"))
        })
    }

    pub fn name(&self, idx: usize) -> Result<&str> {
        self.names
            .get(idx)
            .map(String::as_str)
            .ok_or_else(|| Error::InvalidArgument(format!("Value index {idx} is out of range")))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
