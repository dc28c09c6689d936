//! Duplicate candidate list and hand-off to the comparison panel

use async_trait::async_trait;
use log::{debug, error, warn};
use std::sync::Arc;

use super::cache::{SnapshotCache, SnapshotHandle};
use super::error::WorkflowError;
use super::events::{Variant, ViewState, WorkflowSignal};
use super::types::{ColumnSpec, DuplicateRow, MergePair, RecordRef};
use crate::services::dedupe::{CandidatePage, DuplicateLookupService};

/// Page size used when none is configured
pub const DEFAULT_LIMIT_SIZE: usize = 150;

/// What the list panel may ask of the comparison panel it hosts
#[async_trait]
pub trait ComparisonControl: Send {
    /// Point the panel at a new pair without fetching
    fn set_pair(&mut self, pair: MergePair);

    fn clear_data(&mut self);

    async fn refresh_data(&mut self);

    fn show_notification(&self, title: &str, message: &str, variant: Option<Variant>);
}

type PageKey = (RecordRef, usize, usize);

pub struct DuplicateListPanel<C: ComparisonControl> {
    lookup: Arc<dyn DuplicateLookupService>,
    comparison: C,
    /// Field whose value labels the record link
    label_field: String,
    record_id: Option<RecordRef>,
    offset: usize,
    limit_size: usize,
    cache: SnapshotCache<PageKey, CandidatePage>,
    snapshot: Option<SnapshotHandle>,
    rows: Option<Vec<DuplicateRow>>,
    columns: Option<ColumnSpec>,
    view: ViewState,
    selected_pair: Option<MergePair>,
    closed: bool,
}

impl<C: ComparisonControl> DuplicateListPanel<C> {
    pub fn new(
        lookup: Arc<dyn DuplicateLookupService>,
        comparison: C,
        label_field: impl Into<String>,
    ) -> Self {
        Self {
            lookup,
            comparison,
            label_field: label_field.into(),
            record_id: None,
            offset: 0,
            limit_size: DEFAULT_LIMIT_SIZE,
            cache: SnapshotCache::new(),
            snapshot: None,
            rows: None,
            columns: None,
            view: ViewState::ListView,
            selected_pair: None,
            closed: false,
        }
    }

    pub fn rows(&self) -> Option<&[DuplicateRow]> {
        self.rows.as_deref()
    }

    pub fn columns(&self) -> Option<&ColumnSpec> {
        self.columns.as_ref()
    }

    pub fn view(&self) -> ViewState {
        self.view
    }

    pub fn selected_pair(&self) -> Option<&MergePair> {
        self.selected_pair.as_ref()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn comparison(&self) -> &C {
        &self.comparison
    }

    pub fn comparison_mut(&mut self) -> &mut C {
        &mut self.comparison
    }

    /// Fetch duplicates of `record_id` and rebuild rows and columns.
    ///
    /// A fetch failure is fatal to the session: it is reported through the
    /// comparison panel and the workflow closes.
    pub async fn load_duplicates(
        &mut self,
        record_id: RecordRef,
        offset: usize,
        limit_size: usize,
    ) -> Option<WorkflowSignal> {
        self.record_id = Some(record_id);
        self.offset = offset;
        self.limit_size = limit_size;

        match self.fetch_page().await {
            Ok(()) => None,
            Err(err) => {
                self.comparison
                    .show_notification("Error", &err.to_string(), Some(Variant::Error));
                // nothing to refresh on the way out
                if let Some(handle) = self.snapshot.take() {
                    self.cache.invalidate(handle);
                }
                Some(self.close().await)
            }
        }
    }

    async fn fetch_page(&mut self) -> Result<(), WorkflowError> {
        let Some(record_id) = self.record_id.clone() else {
            return Ok(());
        };
        let (offset, limit_size) = (self.offset, self.limit_size);
        let lookup = Arc::clone(&self.lookup);
        let key = (record_id.clone(), offset, limit_size);

        let (handle, page) = self
            .cache
            .fetch(key, || async move {
                lookup.fetch_candidates(&record_id, offset, limit_size).await
            })
            .await
            .map_err(|err| {
                error!("Failed to load duplicates: {:#}", err);
                WorkflowError::fetch(&err)
            })?;

        debug!(
            "Loaded {} duplicate candidate(s) with {} column(s)",
            page.rows.len(),
            page.columns.len()
        );

        self.snapshot = Some(handle);
        self.rows = Some(
            page.rows
                .into_iter()
                .map(DuplicateRow::from_projection)
                .collect(),
        );
        self.columns = Some(ColumnSpec::build(&self.label_field, page.columns));
        self.view = ViewState::ListView;
        Ok(())
    }

    /// Invalidate the last page and fetch it again. No-op before a
    /// successful load.
    async fn refresh(&mut self) -> Result<(), WorkflowError> {
        let Some(handle) = self.snapshot else {
            return Ok(());
        };
        self.cache.invalidate(handle);
        self.fetch_page().await
    }

    /// Hand `row` and the current record to the comparison panel
    pub async fn select_row(&mut self, row: &DuplicateRow) {
        let Some(record_id) = self.record_id.clone() else {
            self.comparison.show_notification(
                "Error",
                "No record loaded",
                Some(Variant::Error),
            );
            return;
        };

        let pair = match MergePair::new(row.identifier().clone(), record_id) {
            Ok(pair) => pair,
            Err(err) => {
                self.comparison
                    .show_notification("Error", &err.to_string(), Some(Variant::Error));
                return;
            }
        };

        debug!("Comparing {}", pair);
        self.comparison.set_pair(pair.clone());
        self.comparison.clear_data();
        self.comparison.refresh_data().await;
        self.selected_pair = Some(pair);
        self.view = ViewState::CompareView;
    }

    pub async fn go_to_previous(&mut self) {
        if let Err(err) = self.refresh().await {
            self.comparison
                .show_notification("Error", &err.to_string(), Some(Variant::Error));
        }
        self.selected_pair = None;
        self.view = ViewState::ListView;
    }

    pub async fn close(&mut self) -> WorkflowSignal {
        if let Err(err) = self.refresh().await {
            warn!("Refresh on close failed: {}", err);
        }
        self.closed = true;
        WorkflowSignal::Close
    }

    /// Route a signal emitted by the comparison panel. Returns the signal to
    /// pass on to the host, if any.
    pub async fn handle_signal(&mut self, signal: WorkflowSignal) -> Option<WorkflowSignal> {
        match signal {
            WorkflowSignal::Previous => {
                self.go_to_previous().await;
                None
            }
            WorkflowSignal::Close => Some(self.close().await),
        }
    }
}
