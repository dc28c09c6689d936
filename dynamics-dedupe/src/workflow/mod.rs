//! Duplicate merge workflow
//!
//! Two cooperating panels drive a merge:
//!
//! - [`DuplicateListPanel`] lists the duplicate candidates of a record and
//!   hands the chosen `(candidate, original)` pair to
//! - [`MergeComparisonPanel`], which diffs the two records field by field,
//!   collects the winning value per field and submits the merge.
//!
//! The panels never render anything themselves. A front-end drives them one
//! event at a time and reacts to the [`WorkflowSignal`]s they return.

pub mod cache;
pub mod comparison_panel;
pub mod error;
pub mod events;
pub mod list_panel;
pub mod types;

#[cfg(test)]
pub mod testing;

pub use comparison_panel::{MergeComparisonPanel, ReparentMode};
pub use events::{Notification, Variant, ViewState, WorkflowSignal};
pub use list_panel::{DEFAULT_LIMIT_SIZE, DuplicateListPanel};
pub use types::{
    Column, ColumnSpec, DuplicateRow, FieldDiff, MergePair, MergeRequest, MergeSelection,
    RecordRef, Side, display_value,
};
