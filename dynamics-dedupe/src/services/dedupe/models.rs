use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::workflow::RecordRef;

/// A candidate record as returned by duplicate lookup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordProjection {
    pub identifier: RecordRef,
    #[serde(default)]
    pub fields: BTreeMap<String, Value>,
}

impl RecordProjection {
    pub fn new(identifier: RecordRef) -> Self {
        Self {
            identifier,
            fields: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: Value) -> Self {
        self.fields.insert(name.into(), value);
        self
    }
}

/// Server-supplied description of a data column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMeta {
    pub label: String,
    pub field_name: String,
    /// Rendering hint (text, email, phone, url, ...)
    #[serde(default = "default_column_type")]
    pub data_type: String,
}

fn default_column_type() -> String {
    "text".to_string()
}

impl ColumnMeta {
    pub fn new(label: impl Into<String>, field_name: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            field_name: field_name.into(),
            data_type: default_column_type(),
        }
    }
}

/// One page of duplicate candidates plus the columns to render them with
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandidatePage {
    pub rows: Vec<RecordProjection>,
    pub columns: Vec<ColumnMeta>,
}

/// Raw value pair for one field of a merge pair.
///
/// `val1` belongs to the surviving record, `val2` to the duplicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonEntry {
    pub field_name: String,
    pub val1: Value,
    pub val2: Value,
}

/// Keyed comparison entries, as returned for a pair key
pub type ComparisonSet = BTreeMap<String, ComparisonEntry>;

/// Outcome of moving dependents from the losing to the surviving record
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReparentSummary {
    pub relationships: usize,
    pub records_moved: usize,
}
