//! Staged records, keys and projected rows.

use crate::types::FieldValue;
use std::collections::HashMap;

/// Separator between a key's prefix and the rest of the key.
pub const KEY_SEPARATOR: char = ':';

/// Extract the prefix of a key of the form `"<prefix>:<rest>"`.
///
/// Returns `None` when the key has no separator or the prefix is empty;
/// such keys cannot be routed and are skipped.
pub fn key_prefix(key: &str) -> Option<&str> {
    match key.split_once(KEY_SEPARATOR) {
        Some((prefix, _)) if !prefix.is_empty() => Some(prefix),
        _ => None,
    }
}

/// A record staged in the key-value store: a flat field → value map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedRecord {
    pub key: String,
    pub fields: HashMap<String, String>,
}

impl StagedRecord {
    pub fn new(key: impl Into<String>, fields: HashMap<String, String>) -> Self {
        Self {
            key: key.into(),
            fields,
        }
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    /// Redis reports a missing hash as an empty one.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// One row ready to be written to a destination table.
///
/// Columns keep the order of the schema they were projected through.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectedRow {
    pub table: String,
    pub columns: Vec<(String, FieldValue)>,
}

impl ProjectedRow {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: Vec::new(),
        }
    }

    pub fn push(&mut self, column: impl Into<String>, value: FieldValue) {
        self.columns.push((column.into(), value));
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|(c, _)| c.as_str()).collect()
    }

    pub fn get(&self, column: &str) -> Option<&FieldValue> {
        self.columns
            .iter()
            .find(|(c, _)| c == column)
            .map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}
