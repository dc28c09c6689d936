// Collaborator contracts for the merge workflow
//
// The workflow panels only talk to the platform through these traits. The
// Dynamics 365 implementations live in `dynamics`; tests use in-memory fakes.

pub mod dynamics;
pub mod models;

pub use models::{
    CandidatePage, ColumnMeta, ComparisonEntry, ComparisonSet, RecordProjection, ReparentSummary,
};

use anyhow::Result;
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::sync::Arc;

use crate::workflow::{MergeRequest, Notification, RecordRef};

/// Finds likely duplicates of a record
#[async_trait]
pub trait DuplicateLookupService: Send + Sync {
    async fn fetch_candidates(
        &self,
        record_id: &RecordRef,
        offset: usize,
        limit_size: usize,
    ) -> Result<CandidatePage>;
}

/// Produces the field-by-field value pairs for a composite pair key
#[async_trait]
pub trait MergeDataService: Send + Sync {
    async fn fetch_comparison(&self, pair_key: &str) -> Result<ComparisonSet>;
}

/// Applies a field-level update to the surviving record
#[async_trait]
pub trait RecordUpdateService: Send + Sync {
    async fn update(&self, request: &MergeRequest) -> Result<()>;
}

/// Moves dependent records from the losing record to the surviving one.
///
/// Calling `reparent` issues the request; the returned future only reports
/// its completion, so a caller may drop or detach it without awaiting.
pub trait ReparentingService: Send + Sync {
    fn reparent(&self, pair_key: &str) -> BoxFuture<'static, Result<ReparentSummary>>;
}

/// Surfaces transient user-visible messages
pub trait NotificationSink: Send + Sync {
    fn show(&self, notification: Notification);
}

/// Everything the two panels need from the outside world
#[derive(Clone)]
pub struct Collaborators {
    pub lookup: Arc<dyn DuplicateLookupService>,
    pub merge_data: Arc<dyn MergeDataService>,
    pub updates: Arc<dyn RecordUpdateService>,
    pub reparenting: Arc<dyn ReparentingService>,
    pub notifications: Arc<dyn NotificationSink>,
}
