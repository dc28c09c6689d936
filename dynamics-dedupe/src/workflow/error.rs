//! Error taxonomy for the merge workflow

use super::events::Notification;

/// Failures the workflow reports to the user.
///
/// None of these propagate out of a panel operation: the panel converts them
/// into a notification at the call site and leaves its state as described by
/// each variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorkflowError {
    /// Duplicate list or comparison could not be fetched
    #[error("{0}")]
    Fetch(String),

    /// User input is not submittable (e.g. nothing selected)
    #[error("{0}")]
    Validation(String),

    /// The platform rejected the field update
    #[error("{0}")]
    Update(String),

    #[error("invalid merge pair key '{key}': {reason}")]
    InvalidPairKey { key: String, reason: &'static str },

    #[error("record identifier must not be empty")]
    EmptyRecordRef,
}

impl WorkflowError {
    /// Wrap a service error, keeping only the platform-supplied message
    pub fn fetch(err: &anyhow::Error) -> Self {
        Self::Fetch(err.root_cause().to_string())
    }

    pub fn update(err: &anyhow::Error) -> Self {
        Self::Update(err.root_cause().to_string())
    }

    /// The notification shown for this failure
    pub fn notification(&self) -> Notification {
        Notification::error(self.to_string())
    }
}
