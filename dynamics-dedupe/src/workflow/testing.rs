//! In-memory platform used by the workflow tests

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::sync::{Arc, Mutex};

use super::{MergeRequest, Notification, RecordRef};
use crate::services::dedupe::{
    CandidatePage, Collaborators, ComparisonSet, DuplicateLookupService, MergeDataService,
    NotificationSink, RecordUpdateService, ReparentSummary, ReparentingService,
};

/// Every interaction with the fake platform, in call order
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    FetchCandidates {
        record_id: String,
        offset: usize,
        limit_size: usize,
    },
    FetchComparison(String),
    Update(MergeRequest),
    Reparent(String),
    Notify(Notification),
}

pub struct FakePlatform {
    calls: Mutex<Vec<Call>>,
    pub candidates: Mutex<Result<CandidatePage, String>>,
    pub comparison: Mutex<Result<ComparisonSet, String>>,
    pub update_result: Mutex<Result<(), String>>,
    pub reparent_result: Mutex<Result<ReparentSummary, String>>,
}

impl Default for FakePlatform {
    fn default() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            candidates: Mutex::new(Ok(CandidatePage::default())),
            comparison: Mutex::new(Ok(ComparisonSet::new())),
            update_result: Mutex::new(Ok(())),
            reparent_result: Mutex::new(Ok(ReparentSummary::default())),
        }
    }
}

impl FakePlatform {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn collaborators(self: &Arc<Self>) -> Collaborators {
        Collaborators {
            lookup: self.clone(),
            merge_data: self.clone(),
            updates: self.clone(),
            reparenting: self.clone(),
            notifications: self.clone(),
        }
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Notify(n) => Some(n),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, matches: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|c| matches(c)).count()
    }

    /// Number of requests that could have changed platform state
    pub fn mutations(&self) -> usize {
        self.count(|c| matches!(c, Call::Update(_) | Call::Reparent(_)))
    }
}

#[async_trait]
impl DuplicateLookupService for FakePlatform {
    async fn fetch_candidates(
        &self,
        record_id: &RecordRef,
        offset: usize,
        limit_size: usize,
    ) -> Result<CandidatePage> {
        self.record(Call::FetchCandidates {
            record_id: record_id.to_string(),
            offset,
            limit_size,
        });
        self.candidates.lock().unwrap().clone().map_err(|e| anyhow!(e))
    }
}

#[async_trait]
impl MergeDataService for FakePlatform {
    async fn fetch_comparison(&self, pair_key: &str) -> Result<ComparisonSet> {
        self.record(Call::FetchComparison(pair_key.to_string()));
        self.comparison.lock().unwrap().clone().map_err(|e| anyhow!(e))
    }
}

#[async_trait]
impl RecordUpdateService for FakePlatform {
    async fn update(&self, request: &MergeRequest) -> Result<()> {
        self.record(Call::Update(request.clone()));
        self.update_result.lock().unwrap().clone().map_err(|e| anyhow!(e))
    }
}

impl ReparentingService for FakePlatform {
    fn reparent(&self, pair_key: &str) -> BoxFuture<'static, Result<ReparentSummary>> {
        self.record(Call::Reparent(pair_key.to_string()));
        let result = self.reparent_result.lock().unwrap().clone();
        Box::pin(async move { result.map_err(|e| anyhow!(e)) })
    }
}

impl NotificationSink for FakePlatform {
    fn show(&self, notification: Notification) {
        self.record(Call::Notify(notification));
    }
}
