//! OData Query Builder Module
//!
//! Fluent builder for the collection queries the workflow needs: a `$select`
//! list, a `$filter` expression.

use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub entity_set: String,
    pub select: Vec<String>,
    pub filter: Option<String>,
}

impl Query {
    /// Relative path with URL-encoded query options
    pub fn to_path(&self) -> String {
        let params = self.to_query_params();
        if params.is_empty() {
            return self.entity_set.clone();
        }

        let query = params
            .iter()
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        format!("{}?{}", self.entity_set, query)
    }

    pub fn to_query_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if !self.select.is_empty() {
            params.push(("$select", self.select.join(",")));
        }
        if let Some(filter) = &self.filter {
            params.push(("$filter", filter.clone()));
        }
        params
    }
}

pub struct QueryBuilder {
    query: Query,
}

impl QueryBuilder {
    pub fn new(entity_set: impl Into<String>) -> Self {
        Self {
            query: Query {
                entity_set: entity_set.into(),
                ..Default::default()
            },
        }
    }

    pub fn select(mut self, fields: &[&str]) -> Self {
        self.query
            .select
            .extend(fields.iter().map(|f| f.to_string()));
        self
    }

    /// `<field> eq <guid>`; GUID literals are unquoted in OData v4
    pub fn filter_eq_guid(mut self, field: &str, id: &str) -> Self {
        self.query.filter = Some(format!("{} eq {}", field, id));
        self
    }

    pub fn build(self) -> Query {
        self.query
    }
}

/// A page of query results
#[derive(Debug, Clone)]
pub struct QueryResult {
    pub records: Vec<Value>,
    pub next_link: Option<String>,
}

impl QueryResult {
    pub fn from_response(body: Value) -> Self {
        let next_link = body
            .get("@odata.nextLink")
            .and_then(|v| v.as_str())
            .map(str::to_string);
        let records = match body.get("value") {
            Some(Value::Array(items)) => items.clone(),
            _ => Vec::new(),
        };
        Self { records, next_link }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_query_path() {
        let query = QueryBuilder::new("contacts")
            .select(&["contactid"])
            .filter_eq_guid("_parentcustomerid_value", "a1")
            .build();
        assert_eq!(
            query.to_path(),
            "contacts?$select=contactid&$filter=_parentcustomerid_value%20eq%20a1"
        );
    }

    #[test]
    fn test_bare_entity_set() {
        assert_eq!(QueryBuilder::new("accounts").build().to_path(), "accounts");
    }

    #[test]
    fn test_result_parsing() {
        let result = QueryResult::from_response(json!({
            "value": [{"contactid": "c1"}, {"contactid": "c2"}],
            "@odata.nextLink": "https://org/api/data/v9.2/contacts?$skiptoken=x"
        }));
        assert_eq!(result.records.len(), 2);
        assert!(result.next_link.is_some());
    }
}
