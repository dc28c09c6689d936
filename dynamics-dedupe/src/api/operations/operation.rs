//! Write operations issued by the merge workflow

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single write against Dynamics 365
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operation {
    /// Update fields of an existing record
    Update {
        /// Entity set name (e.g., "accounts")
        entity: String,
        /// Record ID (GUID)
        id: String,
        /// Updated field data as JSON
        data: Value,
    },
    /// Point a single-valued navigation property at another record
    /// PATCH /entities(id) with body {"<nav>@odata.bind": "/targets(guid)"}
    BindLookup {
        /// Entity set of the record being changed (e.g., "contacts")
        entity: String,
        /// Record ID (GUID)
        id: String,
        /// Navigation property name (e.g., "parentcustomerid_account")
        navigation_property: String,
        /// Target reference (e.g., "/accounts(guid)")
        target_ref: String,
    },
}

/// Result of executing an Operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationResult {
    pub operation: Operation,
    pub success: bool,
    /// Error message if operation failed (platform message when available)
    pub error: Option<String>,
    pub status_code: Option<u16>,
}

impl Operation {
    pub fn update(entity: impl Into<String>, id: impl Into<String>, data: Value) -> Self {
        Self::Update {
            entity: entity.into(),
            id: id.into(),
            data,
        }
    }

    pub fn bind_lookup(
        entity: impl Into<String>,
        id: impl Into<String>,
        navigation_property: impl Into<String>,
        target_ref: impl Into<String>,
    ) -> Self {
        Self::BindLookup {
            entity: entity.into(),
            id: id.into(),
            navigation_property: navigation_property.into(),
            target_ref: target_ref.into(),
        }
    }

    /// Get the entity set name for this operation
    pub fn entity(&self) -> &str {
        match self {
            Self::Update { entity, .. } => entity,
            Self::BindLookup { entity, .. } => entity,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Self::Update { id, .. } => id,
            Self::BindLookup { id, .. } => id,
        }
    }

    pub fn http_method(&self) -> &'static str {
        "PATCH"
    }

    pub fn operation_type(&self) -> &'static str {
        match self {
            Self::Update { .. } => "update",
            Self::BindLookup { .. } => "bind_lookup",
        }
    }

    /// Relative request path, e.g. `accounts(guid)`
    pub fn path(&self) -> String {
        format!("{}({})", self.entity(), self.id())
    }

    /// Request body
    pub fn body(&self) -> Value {
        match self {
            Self::Update { data, .. } => data.clone(),
            Self::BindLookup {
                navigation_property,
                target_ref,
                ..
            } => {
                let mut body = serde_json::Map::new();
                body.insert(
                    format!("{}@odata.bind", navigation_property),
                    Value::String(target_ref.clone()),
                );
                Value::Object(body)
            }
        }
    }
}

impl OperationResult {
    pub fn success(operation: Operation, status_code: u16) -> Self {
        Self {
            operation,
            success: true,
            error: None,
            status_code: Some(status_code),
        }
    }

    pub fn error(operation: Operation, error: String, status_code: Option<u16>) -> Self {
        Self {
            operation,
            success: false,
            error: Some(error),
            status_code,
        }
    }

    /// Turn a failed result into an error carrying the platform message
    pub fn into_result(self) -> anyhow::Result<()> {
        if self.success {
            Ok(())
        } else {
            Err(anyhow::anyhow!(
                self.error.unwrap_or_else(|| "Unknown error".to_string())
            ))
        }
    }
}
