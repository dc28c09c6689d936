//! Dynamics 365 implementations of the workflow collaborators

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::stream::{self, StreamExt};
use log::{debug, info, warn};
use serde_json::{Map, Value, json};
use std::sync::Arc;

use super::{
    CandidatePage, Collaborators, ComparisonEntry, ComparisonSet, DuplicateLookupService,
    MergeDataService, NotificationSink, RecordProjection, RecordUpdateService, ReparentSummary,
    ReparentingService,
};
use crate::api::{DynamicsClient, Operation, QueryBuilder};
use crate::config::{ResolvedChild, ResolvedEntity};
use crate::workflow::{MergePair, MergeRequest, RecordRef};

/// Dependent records updated at the same time during re-parenting
const REPARENT_CONCURRENCY: usize = 8;

/// Duplicate lookup, comparison, update and re-parenting for one entity
pub struct DynamicsDedupeService {
    client: Arc<DynamicsClient>,
    entity: Arc<ResolvedEntity>,
}

impl DynamicsDedupeService {
    pub fn new(client: Arc<DynamicsClient>, entity: ResolvedEntity) -> Self {
        Self {
            client,
            entity: Arc::new(entity),
        }
    }

    /// Wire this service into every collaborator slot except notifications
    pub fn collaborators(self, notifications: Arc<dyn NotificationSink>) -> Collaborators {
        let service = Arc::new(self);
        Collaborators {
            lookup: service.clone(),
            merge_data: service.clone(),
            updates: service.clone(),
            reparenting: service,
            notifications,
        }
    }

    pub fn entity(&self) -> &ResolvedEntity {
        &self.entity
    }

    /// Fields fetched for the comparison. The primary id never takes part.
    fn compare_fields(&self) -> Result<Vec<String>> {
        let fields: Vec<String> = if self.entity.compare_fields.is_empty() {
            self.entity
                .columns
                .iter()
                .map(|c| c.field_name.clone())
                .collect()
        } else {
            self.entity.compare_fields.clone()
        };
        let fields = comparable_fields(fields, &self.entity.primary_id);

        if fields.is_empty() {
            anyhow::bail!(
                "No compare_fields or columns configured for entity '{}'",
                self.entity.logical_name
            );
        }
        Ok(fields)
    }
}

/// Attributes of `record` usable as a `RetrieveDuplicates` business entity:
/// plain, non-null attributes plus the `@odata.type` annotation.
pub fn business_entity(logical_name: &str, record: &Value) -> Value {
    let mut entity = Map::new();
    entity.insert(
        "@odata.type".to_string(),
        Value::String(format!("Microsoft.Dynamics.CRM.{}", logical_name)),
    );

    if let Some(fields) = record.as_object() {
        for (key, value) in fields {
            if key.contains('@') || key.starts_with('_') || value.is_null() {
                continue;
            }
            entity.insert(key.clone(), value.clone());
        }
    }

    Value::Object(entity)
}

/// Path for the `RetrieveDuplicates` function. Pages are 1-based.
pub fn retrieve_duplicates_path(
    logical_name: &str,
    business_entity: &Value,
    offset: usize,
    limit_size: usize,
) -> String {
    let page_number = offset / limit_size.max(1) + 1;
    let paging = json!({ "PageNumber": page_number, "Count": limit_size });
    format!(
        "RetrieveDuplicates(BusinessEntity=@p1,MatchingEntityName=@p2,PagingInfo=@p3)?@p1={}&@p2={}&@p3={}",
        urlencoding::encode(&business_entity.to_string()),
        urlencoding::encode(&format!("'{}'", logical_name)),
        urlencoding::encode(&paging.to_string()),
    )
}

/// Drop the primary id, which is injected into the update and never chosen
pub fn comparable_fields(fields: Vec<String>, primary_id: &str) -> Vec<String> {
    fields.into_iter().filter(|f| f != primary_id).collect()
}

/// Project a returned record onto the listed columns
pub fn project_record(entity: &ResolvedEntity, record: &Value) -> Option<RecordProjection> {
    let id = record.get(&entity.primary_id)?.as_str()?;
    let identifier = RecordRef::new(id).ok()?;

    let mut projection = RecordProjection::new(identifier);
    let fields = std::iter::once(entity.primary_name.as_str())
        .chain(entity.columns.iter().map(|c| c.field_name.as_str()));
    for field in fields {
        let value = record.get(field).cloned().unwrap_or(Value::Null);
        projection = projection.with_field(field, value);
    }
    Some(projection)
}

/// Pair up field values: `val1` from the surviving record, `val2` from the duplicate
pub fn build_comparison(fields: &[String], surviving: &Value, duplicate: &Value) -> ComparisonSet {
    fields
        .iter()
        .map(|field| {
            let entry = ComparisonEntry {
                field_name: field.clone(),
                val1: surviving.get(field).cloned().unwrap_or(Value::Null),
                val2: duplicate.get(field).cloned().unwrap_or(Value::Null),
            };
            (field.clone(), entry)
        })
        .collect()
}

#[async_trait]
impl DuplicateLookupService for DynamicsDedupeService {
    async fn fetch_candidates(
        &self,
        record_id: &RecordRef,
        offset: usize,
        limit_size: usize,
    ) -> Result<CandidatePage> {
        let entity = &self.entity;
        let record = self
            .client
            .fetch_record(&entity.entity_set, record_id.as_str(), &[])
            .await?;

        let path = retrieve_duplicates_path(
            &entity.logical_name,
            &business_entity(&entity.logical_name, &record),
            offset,
            limit_size,
        );
        let response = self.client.get_json(&path).await?;

        let records = response
            .get("value")
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default();

        let mut rows = Vec::with_capacity(records.len());
        for record in &records {
            match project_record(entity, record) {
                Some(row) if &row.identifier == record_id => {}
                Some(row) => rows.push(row),
                None => warn!(
                    "Skipping duplicate without '{}' in response",
                    entity.primary_id
                ),
            }
        }

        debug!(
            "RetrieveDuplicates for {} {}: {} candidate(s)",
            entity.logical_name,
            record_id,
            rows.len()
        );

        Ok(CandidatePage {
            rows,
            columns: entity.columns.clone(),
        })
    }
}

#[async_trait]
impl MergeDataService for DynamicsDedupeService {
    async fn fetch_comparison(&self, pair_key: &str) -> Result<ComparisonSet> {
        let pair = MergePair::parse(pair_key)?;
        let fields = self.compare_fields()?;
        let entity_set = &self.entity.entity_set;

        let (surviving, duplicate) = futures::try_join!(
            self.client
                .fetch_record(entity_set, pair.surviving().as_str(), &fields),
            self.client
                .fetch_record(entity_set, pair.losing().as_str(), &fields),
        )?;

        Ok(build_comparison(&fields, &surviving, &duplicate))
    }
}

#[async_trait]
impl RecordUpdateService for DynamicsDedupeService {
    async fn update(&self, request: &MergeRequest) -> Result<()> {
        let operation = Operation::update(
            &self.entity.entity_set,
            request.record_id.as_str(),
            Value::Object(request.payload(&self.entity.primary_id)?),
        );

        self.client.execute(&operation).await?.into_result()
    }
}

impl ReparentingService for DynamicsDedupeService {
    fn reparent(&self, pair_key: &str) -> BoxFuture<'static, Result<ReparentSummary>> {
        let client = Arc::clone(&self.client);
        let entity = Arc::clone(&self.entity);
        let pair = MergePair::parse(pair_key);

        Box::pin(async move {
            let pair = pair?;
            reparent_children(&client, &entity, &pair).await
        })
    }
}

async fn reparent_children(
    client: &DynamicsClient,
    entity: &ResolvedEntity,
    pair: &MergePair,
) -> Result<ReparentSummary> {
    let target_ref = format!("/{}({})", entity.entity_set, pair.surviving());
    let mut summary = ReparentSummary::default();
    let mut failures = Vec::new();

    for child in &entity.children {
        let ids = child_ids(client, child, pair.losing()).await?;
        debug!(
            "{} {} record(s) reference {} through {}",
            ids.len(),
            child.logical_name,
            pair.losing(),
            child.lookup
        );

        let results: Vec<Result<()>> = stream::iter(ids)
            .map(|id| {
                let operation =
                    Operation::bind_lookup(&child.entity_set, id, &child.navigation, &target_ref);
                async move { client.execute(&operation).await?.into_result() }
            })
            .buffer_unordered(REPARENT_CONCURRENCY)
            .collect()
            .await;

        for result in results {
            match result {
                Ok(()) => summary.records_moved += 1,
                Err(err) => failures.push(format!("{}: {}", child.logical_name, err)),
            }
        }
        summary.relationships += 1;
    }

    if !failures.is_empty() {
        anyhow::bail!(
            "{} dependent record(s) could not be re-parented (first error: {})",
            failures.len(),
            failures[0]
        );
    }

    info!(
        "Re-parented {} record(s) from {} to {}",
        summary.records_moved,
        pair.losing(),
        pair.surviving()
    );
    Ok(summary)
}

async fn child_ids(
    client: &DynamicsClient,
    child: &ResolvedChild,
    parent: &RecordRef,
) -> Result<Vec<String>> {
    let query = QueryBuilder::new(&child.entity_set)
        .select(&[child.primary_id.as_str()])
        .filter_eq_guid(&child.lookup_value_field(), parent.as_str())
        .build();

    let records = client
        .query_all(&query)
        .await
        .with_context(|| format!("Failed to list {} records", child.logical_name))?;

    Ok(records
        .iter()
        .filter_map(|r| r.get(&child.primary_id)?.as_str().map(str::to_string))
        .collect())
}
