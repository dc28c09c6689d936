//! Side-by-side comparison of a merge pair and merge submission

use async_trait::async_trait;
use log::{debug, error, info, warn};
use serde_json::Value;
use std::sync::Arc;
use tokio::task::JoinHandle;

use super::cache::{SnapshotCache, SnapshotHandle};
use super::error::WorkflowError;
use super::events::{Notification, Variant, WorkflowSignal};
use super::list_panel::ComparisonControl;
use super::types::{FieldControl, FieldDiff, MergePair, MergeRequest, MergeSelection, Side};
use crate::services::dedupe::{Collaborators, ComparisonSet};

/// How the panel treats the re-parenting request issued after a merge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReparentMode {
    /// Issue the request and report success without waiting for it
    #[default]
    FireAndForget,
    /// Wait for re-parenting and surface its failure
    Await,
}

pub struct MergeComparisonPanel {
    services: Collaborators,
    mode: ReparentMode,
    pair: Option<MergePair>,
    cache: SnapshotCache<String, ComparisonSet>,
    snapshot: Option<SnapshotHandle>,
    diffs: Vec<FieldDiff>,
    selection: MergeSelection,
    pending_reparents: Vec<JoinHandle<()>>,
}

impl MergeComparisonPanel {
    pub fn new(services: Collaborators, mode: ReparentMode) -> Self {
        Self {
            services,
            mode,
            pair: None,
            cache: SnapshotCache::new(),
            snapshot: None,
            diffs: Vec::new(),
            selection: MergeSelection::default(),
            pending_reparents: Vec::new(),
        }
    }

    pub fn pair(&self) -> Option<&MergePair> {
        self.pair.as_ref()
    }

    /// Fields that need a decision, in comparison order
    pub fn diffs(&self) -> &[FieldDiff] {
        &self.diffs
    }

    pub fn selection(&self) -> &MergeSelection {
        &self.selection
    }

    pub fn set_pair(&mut self, pair: MergePair) {
        self.pair = Some(pair);
    }

    /// Fetch the comparison for `pair_key` and rebuild the diff set.
    ///
    /// On success the pair switches to `pair_key` and the selection starts
    /// over. On failure the panel keeps its previous pair, diffs and selection.
    pub async fn load_comparison(&mut self, pair_key: &str) {
        let pair = match MergePair::parse(pair_key) {
            Ok(pair) => pair,
            Err(err) => {
                self.report(&err);
                return;
            }
        };

        let merge_data = Arc::clone(&self.services.merge_data);
        let key = pair_key.to_string();
        let result = self
            .cache
            .fetch(pair_key.to_string(), || async move {
                merge_data.fetch_comparison(&key).await
            })
            .await;

        match result {
            Ok((handle, entries)) => {
                let total = entries.len();
                self.pair = Some(pair);
                self.snapshot = Some(handle);
                self.diffs = entries.into_values().filter_map(FieldDiff::from_entry).collect();
                self.selection.clear();
                debug!(
                    "Comparison for {}: {} of {} field(s) differ",
                    pair_key,
                    self.diffs.len(),
                    total
                );
            }
            Err(err) => {
                error!("Failed to load comparison for {}: {:#}", pair_key, err);
                self.report(&WorkflowError::fetch(&err));
            }
        }
    }

    /// Record `value` as the winner for `field_name`, replacing any earlier choice
    pub fn select_field_value(&mut self, field_name: &str, value: Value) {
        debug!("Selected value for {}: {}", field_name, value);
        self.selection.select(field_name, value);
    }

    /// Activate one side's control for every differing field
    pub fn select_all_from_side(&mut self, side: Side) {
        let controls: Vec<FieldControl> = self
            .diffs
            .iter()
            .map(|diff| diff.control(side).clone())
            .collect();

        for control in &controls {
            self.activate(control);
        }
    }

    /// What clicking a side's control does
    pub fn activate(&mut self, control: &FieldControl) {
        debug!("{} control activated for {}", control.side.label(), control.field_name);
        self.select_field_value(&control.field_name, control.value.clone());
    }

    /// Write the selection to the surviving record, then re-parent dependents.
    ///
    /// Emits [`WorkflowSignal::Close`] on success. Validation and update
    /// failures are reported and keep the panel open with its selection.
    pub async fn submit_merge(&mut self) -> Option<WorkflowSignal> {
        let Some(pair) = self.pair.clone() else {
            self.report(&WorkflowError::Validation(
                "No duplicate record selected".to_string(),
            ));
            return None;
        };

        let request = match MergeRequest::build(&self.selection, &pair) {
            Ok(request) => request,
            Err(err) => {
                self.report(&err);
                return None;
            }
        };

        if let Err(err) = self.services.updates.update(&request).await {
            error!("Merge update for {} failed: {:#}", pair, err);
            self.report(&WorkflowError::update(&err));
            return None;
        }

        info!(
            "Merged {} field(s) into {} from {}",
            request.fields.len(),
            pair.surviving(),
            pair.losing()
        );

        self.refresh_data().await;

        match self.start_reparenting(&pair).await {
            None => self.show_notification("Success", "Successfully Merged", None),
            Some(err) => self.services.notifications.show(Notification::warning(format!(
                "Merged, but re-parenting failed: {}",
                err.root_cause()
            ))),
        }

        Some(WorkflowSignal::Close)
    }

    /// Issue the re-parent request. Returns its failure only when awaited.
    async fn start_reparenting(&mut self, pair: &MergePair) -> Option<anyhow::Error> {
        let key = pair.key();
        let request = self.services.reparenting.reparent(&key);

        match self.mode {
            ReparentMode::FireAndForget => {
                self.pending_reparents.push(tokio::spawn(async move {
                    match request.await {
                        Ok(summary) => debug!(
                            "Re-parented {} record(s) across {} relationship(s) for {}",
                            summary.records_moved, summary.relationships, key
                        ),
                        Err(err) => warn!("Re-parenting for {} failed: {:#}", key, err),
                    }
                }));
                None
            }
            ReparentMode::Await => match request.await {
                Ok(summary) => {
                    debug!(
                        "Re-parented {} record(s) for {}",
                        summary.records_moved, key
                    );
                    None
                }
                Err(err) => {
                    error!("Re-parenting for {} failed: {:#}", key, err);
                    Some(err)
                }
            },
        }
    }

    /// Wait for detached re-parent tasks. Their outcome is only logged.
    pub async fn settle_reparenting(&mut self) {
        let tasks: Vec<JoinHandle<()>> = self.pending_reparents.drain(..).collect();
        for result in futures::future::join_all(tasks).await {
            if let Err(err) = result {
                warn!("Re-parenting task did not complete: {}", err);
            }
        }
    }

    pub fn pending_reparents(&self) -> usize {
        self.pending_reparents.len()
    }

    pub async fn cancel(&mut self) -> WorkflowSignal {
        self.refresh_data().await;
        WorkflowSignal::Close
    }

    pub async fn previous(&mut self) -> WorkflowSignal {
        self.refresh_data().await;
        WorkflowSignal::Previous
    }

    pub fn show_notification(&self, title: &str, message: &str, variant: Option<Variant>) {
        self.services
            .notifications
            .show(Notification::new(title, message, variant));
    }

    /// Drop the current snapshot and selection
    pub fn clear_data(&mut self) {
        if let Some(handle) = self.snapshot.take() {
            self.cache.invalidate(handle);
        }
        self.diffs.clear();
        self.selection.clear();
    }

    /// Mark the current snapshot stale and fetch it again
    pub async fn refresh_data(&mut self) {
        if let Some(handle) = self.snapshot {
            self.cache.invalidate(handle);
        }
        if let Some(pair) = self.pair.clone() {
            self.load_comparison(&pair.key()).await;
        }
    }

    fn report(&self, err: &WorkflowError) {
        self.services.notifications.show(err.notification());
    }
}

#[async_trait]
impl ComparisonControl for MergeComparisonPanel {
    fn set_pair(&mut self, pair: MergePair) {
        MergeComparisonPanel::set_pair(self, pair);
    }

    fn clear_data(&mut self) {
        MergeComparisonPanel::clear_data(self);
    }

    async fn refresh_data(&mut self) {
        MergeComparisonPanel::refresh_data(self).await;
    }

    fn show_notification(&self, title: &str, message: &str, variant: Option<Variant>) {
        MergeComparisonPanel::show_notification(self, title, message, variant);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::dedupe::ComparisonEntry;
    use crate::workflow::testing::{Call, FakePlatform};
    use serde_json::json;
    use std::sync::Arc;

    fn entry(name: &str, val1: Value, val2: Value) -> (String, ComparisonEntry) {
        (
            name.to_string(),
            ComparisonEntry {
                field_name: name.to_string(),
                val1,
                val2,
            },
        )
    }

    fn platform_with_comparison() -> Arc<FakePlatform> {
        let platform = FakePlatform::new();
        *platform.comparison.lock().unwrap() = Ok([
            entry("Email", json!("a@x.com"), json!("b@x.com")),
            entry("Phone", json!("555"), json!("555")),
            entry("Fax", json!("1"), json!(null)),
            entry("Industry", json!("Retail"), json!("Banking")),
        ]
        .into_iter()
        .collect());
        platform
    }

    async fn loaded_panel(platform: &Arc<FakePlatform>, mode: ReparentMode) -> MergeComparisonPanel {
        let mut panel = MergeComparisonPanel::new(platform.collaborators(), mode);
        panel.load_comparison("B--C").await;
        platform.clear_calls();
        panel
    }

    #[tokio::test]
    async fn test_load_keeps_only_differing_present_fields() {
        let platform = platform_with_comparison();
        let panel = loaded_panel(&platform, ReparentMode::FireAndForget).await;

        let names: Vec<&str> = panel.diffs().iter().map(|d| d.field_name.as_str()).collect();
        assert_eq!(names, vec!["Email", "Industry"]);
        assert!(panel.selection().is_empty());
        assert_eq!(panel.pair().unwrap().key(), "B--C");
    }

    #[tokio::test]
    async fn test_load_failure_notifies() {
        let platform = FakePlatform::new();
        *platform.comparison.lock().unwrap() = Err("Record not found".to_string());

        let mut panel = MergeComparisonPanel::new(platform.collaborators(), ReparentMode::default());
        panel.load_comparison("B--C").await;

        assert!(panel.diffs().is_empty());
        let notes = platform.notifications();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].variant, Variant::Error);
        assert_eq!(notes[0].message, "Record not found");
    }

    #[tokio::test]
    async fn test_failed_load_keeps_previous_pair() {
        let platform = platform_with_comparison();
        let mut panel = MergeComparisonPanel::new(platform.collaborators(), ReparentMode::default());
        panel.load_comparison("A--C").await;
        panel.select_field_value("Email", json!("b@x.com"));

        *platform.comparison.lock().unwrap() = Err("Record not found".to_string());
        panel.load_comparison("B--D").await;

        assert_eq!(panel.pair().unwrap().key(), "A--C");
        assert_eq!(panel.selection().get("Email"), Some(&json!("b@x.com")));

        platform.clear_calls();
        panel.submit_merge().await;
        panel.settle_reparenting().await;

        let calls = platform.calls();
        assert!(calls.iter().all(|c| match c {
            Call::Update(request) => request.record_id.as_str() == "C",
            Call::Reparent(key) => key == "A--C",
            Call::FetchComparison(key) => key == "A--C",
            Call::FetchCandidates { .. } | Call::Notify(_) => true,
        }));
        assert_eq!(platform.count(|c| matches!(c, Call::Update(_))), 1);
    }

    #[tokio::test]
    async fn test_load_rejects_malformed_key() {
        let platform = FakePlatform::new();
        let mut panel = MergeComparisonPanel::new(platform.collaborators(), ReparentMode::default());
        panel.load_comparison("just-one-id").await;

        assert_eq!(platform.count(|c| matches!(c, Call::FetchComparison(_))), 0);
        assert_eq!(platform.notifications()[0].variant, Variant::Error);
    }

    #[tokio::test]
    async fn test_empty_submit_is_validation_failure() {
        let platform = platform_with_comparison();
        let mut panel = loaded_panel(&platform, ReparentMode::FireAndForget).await;

        let signal = panel.submit_merge().await;

        assert_eq!(signal, None);
        assert_eq!(platform.mutations(), 0);
        assert_eq!(platform.count(|c| matches!(c, Call::FetchComparison(_))), 0);
        assert_eq!(
            platform.notifications(),
            vec![Notification::error("Please select fields to merge")]
        );
    }

    #[tokio::test]
    async fn test_reselect_overwrites() {
        let platform = platform_with_comparison();
        let mut panel = loaded_panel(&platform, ReparentMode::FireAndForget).await;

        panel.select_field_value("Email", json!("a@x.com"));
        panel.select_field_value("Email", json!("b@x.com"));

        assert_eq!(panel.selection().len(), 1);
        assert_eq!(panel.selection().get("Email"), Some(&json!("b@x.com")));
    }

    #[tokio::test]
    async fn test_select_all_from_master() {
        let platform = platform_with_comparison();
        let mut panel = loaded_panel(&platform, ReparentMode::FireAndForget).await;

        panel.select_all_from_side(Side::Master);

        assert_eq!(panel.selection().len(), panel.diffs().len());
        for diff in panel.diffs() {
            assert_eq!(panel.selection().get(&diff.field_name), Some(diff.val1()));
        }
    }

    #[tokio::test]
    async fn test_select_all_from_duplicate_overrides_master() {
        let platform = platform_with_comparison();
        let mut panel = loaded_panel(&platform, ReparentMode::FireAndForget).await;

        panel.select_all_from_side(Side::Master);
        panel.select_all_from_side(Side::Duplicate);

        assert_eq!(panel.selection().len(), 2);
        assert_eq!(panel.selection().get("Email"), Some(&json!("b@x.com")));
        assert_eq!(panel.selection().get("Industry"), Some(&json!("Banking")));
    }

    #[tokio::test]
    async fn test_submit_success_sequence() {
        let platform = platform_with_comparison();
        let mut panel = loaded_panel(&platform, ReparentMode::FireAndForget).await;

        panel.select_field_value("Email", json!("a@x.com"));
        let signal = panel.submit_merge().await;

        assert_eq!(signal, Some(WorkflowSignal::Close));

        let calls = platform.calls();
        let update = calls.iter().position(|c| matches!(c, Call::Update(_))).unwrap();
        let refresh = calls
            .iter()
            .position(|c| matches!(c, Call::FetchComparison(_)))
            .unwrap();
        let reparent = calls
            .iter()
            .position(|c| matches!(c, Call::Reparent(_)))
            .unwrap();
        let notify = calls.iter().position(|c| matches!(c, Call::Notify(_))).unwrap();
        assert!(update < refresh && refresh < reparent && reparent < notify);

        assert_eq!(calls[reparent], Call::Reparent("B--C".to_string()));
        assert_eq!(
            calls[notify],
            Call::Notify(Notification::success("Successfully Merged"))
        );

        panel.settle_reparenting().await;
        assert_eq!(panel.pending_reparents(), 0);
    }

    #[tokio::test]
    async fn test_update_failure_keeps_panel_open() {
        let platform = platform_with_comparison();
        *platform.update_result.lock().unwrap() =
            Err("FIELD_CUSTOM_VALIDATION_EXCEPTION: Phone is required".to_string());
        let mut panel = loaded_panel(&platform, ReparentMode::FireAndForget).await;

        panel.select_field_value("Email", json!("a@x.com"));
        let signal = panel.submit_merge().await;

        assert_eq!(signal, None);
        assert_eq!(platform.count(|c| matches!(c, Call::Reparent(_))), 0);
        assert_eq!(panel.selection().get("Email"), Some(&json!("a@x.com")));
        assert_eq!(
            platform.notifications(),
            vec![Notification::error(
                "FIELD_CUSTOM_VALIDATION_EXCEPTION: Phone is required"
            )]
        );
    }

    #[tokio::test]
    async fn test_reparent_failure_is_unobserved_by_default() {
        let platform = platform_with_comparison();
        *platform.reparent_result.lock().unwrap() = Err("UNABLE_TO_LOCK_ROW".to_string());
        let mut panel = loaded_panel(&platform, ReparentMode::FireAndForget).await;

        panel.select_field_value("Email", json!("a@x.com"));
        let signal = panel.submit_merge().await;
        panel.settle_reparenting().await;

        assert_eq!(signal, Some(WorkflowSignal::Close));
        assert_eq!(
            platform.notifications(),
            vec![Notification::success("Successfully Merged")]
        );
    }

    #[tokio::test]
    async fn test_reparent_failure_surfaces_when_awaited() {
        let platform = platform_with_comparison();
        *platform.reparent_result.lock().unwrap() = Err("UNABLE_TO_LOCK_ROW".to_string());
        let mut panel = loaded_panel(&platform, ReparentMode::Await).await;

        panel.select_field_value("Email", json!("a@x.com"));
        let signal = panel.submit_merge().await;

        assert_eq!(signal, Some(WorkflowSignal::Close));
        assert_eq!(panel.pending_reparents(), 0);
        let notes = platform.notifications();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].variant, Variant::Warning);
        assert!(notes[0].message.contains("UNABLE_TO_LOCK_ROW"));
    }

    #[tokio::test]
    async fn test_cancel_and_previous_refresh_snapshot() {
        let platform = platform_with_comparison();
        let mut panel = loaded_panel(&platform, ReparentMode::FireAndForget).await;

        assert_eq!(panel.cancel().await, WorkflowSignal::Close);
        assert_eq!(panel.previous().await, WorkflowSignal::Previous);

        assert_eq!(platform.count(|c| matches!(c, Call::FetchComparison(_))), 2);
        assert_eq!(platform.mutations(), 0);
    }

    #[tokio::test]
    async fn test_show_notification_defaults_to_success() {
        let platform = FakePlatform::new();
        let panel = MergeComparisonPanel::new(platform.collaborators(), ReparentMode::default());

        panel.show_notification("Done", "All good", None);

        assert_eq!(platform.notifications()[0].variant, Variant::Success);
    }

    #[tokio::test]
    async fn test_clear_data_drops_snapshot() {
        let platform = platform_with_comparison();
        let mut panel = loaded_panel(&platform, ReparentMode::FireAndForget).await;
        panel.select_field_value("Email", json!("a@x.com"));

        panel.clear_data();

        assert!(panel.diffs().is_empty());
        assert!(panel.selection().is_empty());
        // Pair survives so a refresh can re-fetch it
        assert_eq!(panel.pair().unwrap().key(), "B--C");
    }
}
