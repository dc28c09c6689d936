//! Signals and notifications exchanged between the panels and their host

use std::fmt;

/// Toast variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Variant {
    #[default]
    Success,
    Error,
    Warning,
    Info,
}

impl Variant {
    pub fn label(&self) -> &'static str {
        match self {
            Variant::Success => "success",
            Variant::Error => "error",
            Variant::Warning => "warning",
            Variant::Info => "info",
        }
    }
}

/// A transient user-visible message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub message: String,
    pub variant: Variant,
}

impl Notification {
    /// Variant defaults to success when not given
    pub fn new(title: impl Into<String>, message: impl Into<String>, variant: Option<Variant>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            variant: variant.unwrap_or_default(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new("Success", message, Some(Variant::Success))
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new("Error", message, Some(Variant::Error))
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new("Warning", message, Some(Variant::Warning))
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.variant.label(), self.title, self.message)
    }
}

/// Signals a panel emits to whoever hosts it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowSignal {
    /// Workflow finished or abandoned
    Close,
    /// Navigate back to the duplicate list
    Previous,
}

/// Which half of the two-panel wizard is visible
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewState {
    #[default]
    ListView,
    CompareView,
}
