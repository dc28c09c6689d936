//! Per-entity settings: which columns to list, which fields to compare and
//! which child relationships to re-parent.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::api::pluralization::entity_set_name;
use crate::services::dedupe::ColumnMeta;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntityConfig {
    /// Web API collection name, derived from the logical name when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_set: Option<String>,
    /// Primary key attribute, `<logical_name>id` when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_id: Option<String>,
    /// Attribute used to label record links
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_name: Option<String>,
    pub columns: Vec<ColumnConfig>,
    pub compare_fields: Vec<String>,
    pub children: Vec<ChildConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnConfig {
    pub field: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
}

/// A dependent entity pointing at the merged entity through a lookup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChildConfig {
    /// Child logical name (e.g. "contact")
    pub entity: String,
    /// Lookup attribute on the child (e.g. "parentcustomerid")
    pub lookup: String,
    /// Single-valued navigation property used for `@odata.bind`,
    /// defaults to the lookup name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub navigation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_set: Option<String>,
}

/// Entity settings with every default filled in
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedEntity {
    pub logical_name: String,
    pub entity_set: String,
    pub primary_id: String,
    pub primary_name: String,
    pub columns: Vec<ColumnMeta>,
    pub compare_fields: Vec<String>,
    pub children: Vec<ResolvedChild>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedChild {
    pub logical_name: String,
    pub entity_set: String,
    pub primary_id: String,
    pub lookup: String,
    pub navigation: String,
}

impl ResolvedChild {
    /// `_<lookup>_value`, the Web API name of the lookup's raw id
    pub fn lookup_value_field(&self) -> String {
        format!("_{}_value", self.lookup)
    }
}

impl EntityConfig {
    pub fn resolve(&self, logical_name: &str) -> Result<ResolvedEntity> {
        let primary_id = self
            .primary_id
            .clone()
            .unwrap_or_else(|| format!("{}id", logical_name));

        if self.compare_fields.iter().any(|f| f == &primary_id) {
            anyhow::bail!(
                "Entity '{}': the primary id '{}' cannot be a compare field",
                logical_name,
                primary_id
            );
        }

        let columns = self
            .columns
            .iter()
            .map(|c| ColumnMeta {
                label: c.label.clone().unwrap_or_else(|| c.field.clone()),
                field_name: c.field.clone(),
                data_type: c.data_type.clone().unwrap_or_else(|| "text".to_string()),
            })
            .collect();

        let children = self
            .children
            .iter()
            .map(|child| ResolvedChild {
                logical_name: child.entity.clone(),
                entity_set: child
                    .entity_set
                    .clone()
                    .unwrap_or_else(|| entity_set_name(&child.entity)),
                primary_id: format!("{}id", child.entity),
                lookup: child.lookup.clone(),
                navigation: child.navigation.clone().unwrap_or_else(|| child.lookup.clone()),
            })
            .collect();

        Ok(ResolvedEntity {
            logical_name: logical_name.to_string(),
            entity_set: self
                .entity_set
                .clone()
                .unwrap_or_else(|| entity_set_name(logical_name)),
            primary_id,
            primary_name: self.primary_name.clone().unwrap_or_else(|| "name".to_string()),
            columns,
            compare_fields: self.compare_fields.clone(),
            children,
        })
    }
}
