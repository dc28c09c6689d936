//! Typed view-models for the merge workflow
//!
//! Everything here is built from service responses and never shared between
//! panels by reference: the list panel hands the comparison panel a
//! [`MergePair`], not live rows.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::error::WorkflowError;
use crate::services::dedupe::{ColumnMeta, ComparisonEntry, RecordProjection};

/// Separator between the two identifiers of a composite pair key
pub const PAIR_KEY_SEPARATOR: &str = "--";

/// Name of the row action that starts a merge
pub const MERGE_ACTION: &str = "merge_record";

/// Opaque, non-empty platform record identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RecordRef(String);

impl RecordRef {
    pub fn new(id: impl Into<String>) -> Result<Self, WorkflowError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(WorkflowError::EmptyRecordRef);
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RecordRef {
    type Error = WorkflowError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<RecordRef> for String {
    fn from(value: RecordRef) -> Self {
        value.0
    }
}

impl fmt::Display for RecordRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The duplicate candidate and the original record it will be merged into.
///
/// The original survives; the candidate loses its dependents to it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MergePair {
    candidate: RecordRef,
    original: RecordRef,
}

impl MergePair {
    pub fn new(candidate: RecordRef, original: RecordRef) -> Result<Self, WorkflowError> {
        if candidate == original {
            return Err(WorkflowError::InvalidPairKey {
                key: format!("{}{}{}", candidate, PAIR_KEY_SEPARATOR, original),
                reason: "a record cannot be merged with itself",
            });
        }
        Ok(Self { candidate, original })
    }

    /// Parse a `"<candidateId>--<originalId>"` key
    pub fn parse(key: &str) -> Result<Self, WorkflowError> {
        let invalid = |reason| WorkflowError::InvalidPairKey {
            key: key.to_string(),
            reason,
        };

        let segments: Vec<&str> = key.split(PAIR_KEY_SEPARATOR).collect();
        if segments.len() != 2 {
            return Err(invalid("expected exactly two identifiers"));
        }

        let candidate = RecordRef::new(segments[0]).map_err(|_| invalid("empty candidate id"))?;
        let original = RecordRef::new(segments[1]).map_err(|_| invalid("empty original id"))?;
        Self::new(candidate, original).map_err(|_| invalid("identifiers must be distinct"))
    }

    /// Composite key used in transit
    pub fn key(&self) -> String {
        format!("{}{}{}", self.candidate, PAIR_KEY_SEPARATOR, self.original)
    }

    /// Record that remains after the merge (second key segment)
    pub fn surviving(&self) -> &RecordRef {
        &self.original
    }

    /// Record whose dependents are re-parented (first key segment)
    pub fn losing(&self) -> &RecordRef {
        &self.candidate
    }
}

impl FromStr for MergePair {
    type Err = WorkflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for MergePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

/// A duplicate candidate as displayed in the list
#[derive(Debug, Clone, PartialEq)]
pub struct DuplicateRow {
    pub projection: RecordProjection,
    /// Navigable path to the record: `"/" + identifier`
    pub record_link: String,
}

impl DuplicateRow {
    pub fn from_projection(projection: RecordProjection) -> Self {
        let record_link = format!("/{}", projection.identifier);
        Self {
            projection,
            record_link,
        }
    }

    pub fn identifier(&self) -> &RecordRef {
        &self.projection.identifier
    }

    pub fn value(&self, field: &str) -> Option<&Value> {
        self.projection.fields.get(field)
    }

    /// Plain-text rendering of a field, empty when absent
    pub fn display_value(&self, field: &str) -> String {
        self.value(field).map(display_value).unwrap_or_default()
    }
}

/// An action offered in the trailing column of the duplicate list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowAction {
    pub label: String,
    pub name: String,
}

impl RowAction {
    pub fn merge() -> Self {
        Self {
            label: "Merge".to_string(),
            name: MERGE_ACTION.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    /// Link to the record, labelled with the value of `label_field`
    Link { label: String, label_field: String },
    /// Server-supplied data column
    Data(ColumnMeta),
    Actions(Vec<RowAction>),
}

/// Ordered column layout: link, server columns in server order, actions.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSpec {
    columns: Vec<Column>,
}

impl ColumnSpec {
    pub fn build(label_field: &str, server_columns: Vec<ColumnMeta>) -> Self {
        let mut columns = Vec::with_capacity(server_columns.len() + 2);
        columns.push(Column::Link {
            label: "Record Link".to_string(),
            label_field: label_field.to_string(),
        });
        columns.extend(server_columns.into_iter().map(Column::Data));
        columns.push(Column::Actions(vec![RowAction::merge()]));
        Self { columns }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn data_columns(&self) -> impl Iterator<Item = &ColumnMeta> {
        self.columns.iter().filter_map(|c| match c {
            Column::Data(meta) => Some(meta),
            _ => None,
        })
    }
}

/// Which record a value is taken from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    /// The surviving record (`val1`)
    Master,
    /// The duplicate candidate (`val2`)
    Duplicate,
}

impl Side {
    pub fn label(&self) -> &'static str {
        match self {
            Side::Master => "Master",
            Side::Duplicate => "Duplicate",
        }
    }
}

/// One selectable side of a [`FieldDiff`]
#[derive(Debug, Clone, PartialEq)]
pub struct FieldControl {
    pub field_name: String,
    pub side: Side,
    pub value: Value,
}

/// A field whose value differs between the two records of a pair
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDiff {
    pub field_name: String,
    pub master_control: FieldControl,
    pub duplicate_control: FieldControl,
}

impl FieldDiff {
    /// Build a diff from a raw entry; `None` when no decision is needed
    /// (equal values, or either side absent).
    pub fn from_entry(entry: ComparisonEntry) -> Option<Self> {
        if !is_present(&entry.val1) || !is_present(&entry.val2) || entry.val1 == entry.val2 {
            return None;
        }

        Some(Self {
            master_control: FieldControl {
                field_name: entry.field_name.clone(),
                side: Side::Master,
                value: entry.val1,
            },
            duplicate_control: FieldControl {
                field_name: entry.field_name.clone(),
                side: Side::Duplicate,
                value: entry.val2,
            },
            field_name: entry.field_name,
        })
    }

    pub fn val1(&self) -> &Value {
        &self.master_control.value
    }

    pub fn val2(&self) -> &Value {
        &self.duplicate_control.value
    }

    pub fn control(&self, side: Side) -> &FieldControl {
        match side {
            Side::Master => &self.master_control,
            Side::Duplicate => &self.duplicate_control,
        }
    }
}

/// A value counts as present unless it is null or an empty string.
///
/// `0` and `false` are real values in Dataverse and stay present.
pub fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

/// Plain-text rendering of a JSON field value
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Chosen winning value per field
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeSelection {
    choices: BTreeMap<String, Value>,
}

impl MergeSelection {
    /// Insert or overwrite the choice for `field_name`
    pub fn select(&mut self, field_name: impl Into<String>, value: Value) {
        self.choices.insert(field_name.into(), value);
    }

    pub fn get(&self, field_name: &str) -> Option<&Value> {
        self.choices.get(field_name)
    }

    pub fn len(&self) -> usize {
        self.choices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.choices.is_empty()
    }

    pub fn clear(&mut self) {
        self.choices.clear();
    }
}

/// Field update for the surviving record
#[derive(Debug, Clone, PartialEq)]
pub struct MergeRequest {
    pub record_id: RecordRef,
    pub fields: BTreeMap<String, Value>,
}

impl MergeRequest {
    /// Build the request for `pair`. An empty selection is rejected.
    pub fn build(selection: &MergeSelection, pair: &MergePair) -> Result<Self, WorkflowError> {
        if selection.is_empty() {
            return Err(WorkflowError::Validation(
                "Please select fields to merge".to_string(),
            ));
        }

        Ok(Self {
            record_id: pair.surviving().clone(),
            fields: selection.choices.clone(),
        })
    }

    /// Flattened payload with the record id injected under `id_field`.
    ///
    /// The id field is never user-selectable: a selection keyed with it is
    /// rejected.
    pub fn payload(&self, id_field: &str) -> Result<serde_json::Map<String, Value>, WorkflowError> {
        if self.fields.contains_key(id_field) {
            return Err(WorkflowError::Validation(format!(
                "'{}' identifies the surviving record and cannot be merged",
                id_field
            )));
        }

        let mut payload: serde_json::Map<String, Value> = self
            .fields
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        payload.insert(
            id_field.to_string(),
            Value::String(self.record_id.to_string()),
        );
        Ok(payload)
    }
}
