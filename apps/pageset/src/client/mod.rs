//! Client-side owner of the loaded page and the selection.
//!
//! [`PagedSelection`] is the single execution context that mutates selection
//! state. Page loads are split into [`PagedSelection::begin_load`] and
//! [`PagedSelection::complete_load`] so callers can run the fetch elsewhere
//! (e.g. a spawned task) and hand the result back. Every request gets a
//! monotonically increasing id; only the reply to the latest request is
//! applied, anything older is dropped as stale.

use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::model::{Page, Record};
use crate::selection::{
    MarkerCodec, ResolveReport, SelectionSet, SelectionStore, ValidationError, bulk,
};
use crate::source::{PageSource, SourceError};

pub mod view;

/// Ticket for one in-flight page load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub id: u64,
    pub page: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The page is now loaded and its markers resolved.
    Applied(ResolveReport),
    /// A newer request superseded this one; the reply was discarded.
    Stale { request: PageRequest, latest: u64 },
    /// The fetch or its validation failed; the previous page stays loaded.
    Failed(SourceError),
}

impl LoadOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, LoadOutcome::Applied(_))
    }
}

pub struct PagedSelection {
    source: Arc<dyn PageSource>,
    store: SelectionStore,
    next_request_id: u64,
    latest_request: Option<PageRequest>,
    loading: bool,
    last_error: Option<SourceError>,
}

impl PagedSelection {
    pub fn new(source: Arc<dyn PageSource>, codec: MarkerCodec) -> Self {
        Self {
            source,
            store: SelectionStore::new(codec),
            next_request_id: 1,
            latest_request: None,
            loading: false,
            last_error: None,
        }
    }

    pub fn store(&self) -> &SelectionStore {
        &self.store
    }

    pub fn selection(&self) -> &SelectionSet {
        self.store.selection()
    }

    pub fn current_page(&self) -> &Page {
        self.store.current_page()
    }

    /// Handle to the fetch collaborator, for running fetches off this context.
    pub fn source(&self) -> Arc<dyn PageSource> {
        Arc::clone(&self.source)
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn last_error(&self) -> Option<&SourceError> {
        self.last_error.as_ref()
    }

    pub fn pending_request(&self) -> Option<PageRequest> {
        self.latest_request.filter(|_| self.loading)
    }

    pub fn page_count(&self) -> u64 {
        self.store.current_page().page_count()
    }

    /// Registers a load of `page`; supersedes any request still in flight.
    pub fn begin_load(&mut self, page: u64) -> PageRequest {
        let request = PageRequest {
            id: self.next_request_id,
            page,
        };
        self.next_request_id = self.next_request_id.saturating_add(1);
        if let Some(previous) = self.latest_request.filter(|_| self.loading) {
            trace!(
                target: "pageset::client",
                superseded = previous.id,
                superseded_page = previous.page,
                request = request.id,
                page,
                "page request superseded"
            );
        }
        self.latest_request = Some(request);
        self.loading = true;
        trace!(target: "pageset::client", request = request.id, page, "requesting page");
        request
    }

    /// Applies the reply for `request` if it is still the latest one.
    pub fn complete_load(
        &mut self,
        request: PageRequest,
        result: Result<Page, SourceError>,
    ) -> LoadOutcome {
        let latest = self.latest_request.map(|latest| latest.id).unwrap_or(0);
        if request.id != latest || !self.loading {
            debug!(
                target: "pageset::client",
                request = request.id,
                page = request.page,
                latest,
                "discarding stale page response"
            );
            return LoadOutcome::Stale { request, latest };
        }
        self.loading = false;

        let page = match result.and_then(|page| self.validate(request, page)) {
            Ok(page) => page,
            Err(err) => return self.fail(request, err),
        };

        let cache = self.store.cache();
        let previous_total = cache.has_loaded().then(|| cache.total_count());
        let total = page.total_count;
        let report = match self.store.load_page(page) {
            Ok(report) => report,
            Err(err) => return self.fail(request, err.into()),
        };
        if let Some(previous) = previous_total.filter(|previous| *previous != total) {
            warn!(
                target: "pageset::client",
                previous,
                current = total,
                pending = self.store.selection().pending_count(),
                "record total changed; pending selections were planned against the old total"
            );
        }

        self.last_error = None;
        debug!(
            target: "pageset::client",
            request = request.id,
            page = report.page,
            resolved = report.resolved,
            selected = self.store.count(),
            "page applied"
        );
        LoadOutcome::Applied(report)
    }

    /// Fetches `page` and applies it; the common case without interleaving.
    pub async fn goto_page(&mut self, page: u64) -> LoadOutcome {
        let request = self.begin_load(page);
        let result = self.source.fetch_page(page).await;
        self.complete_load(request, result)
    }

    /// Loads the page after the current one, if the total says there is one.
    pub async fn next_page(&mut self) -> Option<LoadOutcome> {
        let next = self.current_page().number.saturating_add(1);
        if next > self.page_count() {
            return None;
        }
        Some(self.goto_page(next).await)
    }

    pub async fn previous_page(&mut self) -> Option<LoadOutcome> {
        let current = self.current_page().number;
        if current <= 1 {
            return None;
        }
        Some(self.goto_page(current - 1).await)
    }

    fn fail(&mut self, request: PageRequest, err: SourceError) -> LoadOutcome {
        warn!(
            target: "pageset::client",
            request = request.id,
            page = request.page,
            error = %err,
            "page failed to load; keeping previous page"
        );
        self.last_error = Some(err.clone());
        LoadOutcome::Failed(err)
    }

    fn validate(&self, request: PageRequest, page: Page) -> Result<Page, SourceError> {
        if page.number != request.page {
            return Err(SourceError::PageMismatch {
                requested: request.page,
                received: page.number,
            });
        }
        let expected = self.store.codec().page_size();
        if page.size != expected {
            return Err(SourceError::PageSizeMismatch {
                page: page.number,
                expected,
                received: page.size,
            });
        }
        if page.len() > page.size as usize {
            return Err(SourceError::Oversized {
                page: page.number,
                records: page.len(),
                size: page.size,
            });
        }
        Ok(page)
    }

    // Rendering surface.

    pub fn selection_count(&self) -> usize {
        self.store.count()
    }

    pub fn is_row_selected(&self, record: &Record) -> bool {
        self.store.is_row_selected(record)
    }

    pub fn is_all_selected(&self) -> bool {
        self.store.is_all_selected()
    }

    pub fn selected_records(&self) -> Vec<&Record> {
        self.store.selected_records_on_current_page()
    }

    pub fn on_row_toggle(&mut self, record: &Record) -> bool {
        self.store.toggle_row(record)
    }

    /// The widget reports the full set of rows now selected on the page;
    /// `checked` is the state of the row that triggered the change.
    pub fn on_page_selection_change(&mut self, records: &[Record], checked: bool) {
        trace!(
            target: "pageset::client",
            rows = records.len(),
            checked,
            "page selection changed"
        );
        self.store.set_page_selection(records);
    }

    pub fn on_select_all_change(&mut self, checked: bool) {
        self.store.select_all_on_page(checked);
    }

    /// Bulk-selects the first `input` records; `input` is raw user text.
    pub fn on_bulk_select(&mut self, input: Option<&str>) -> Result<usize, ValidationError> {
        let n = bulk::parse_count(input).inspect_err(|err| {
            debug!(target: "pageset::client", error = %err, "bulk selection rejected");
        })?;
        self.store.bulk_select_first_n(n).inspect_err(|err| {
            debug!(target: "pageset::client", error = %err, "bulk selection rejected");
        })
    }

    pub fn on_clear_all(&mut self) {
        self.store.clear_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RecordId;
    use crate::source::MemorySource;

    fn client_with(source: MemorySource) -> (PagedSelection, Arc<MemorySource>) {
        let source = Arc::new(source);
        let codec = MarkerCodec::new(10_000, 12).unwrap();
        (PagedSelection::new(source.clone(), codec), source)
    }

    fn page(number: u64, ids: std::ops::RangeInclusive<i64>) -> Page {
        Page::new(number, 12, ids.map(Record::new).collect(), 100)
    }

    #[test]
    fn stale_reply_is_discarded() {
        let (mut client, _) = client_with(MemorySource::generated(100, 12, 0));
        let slow = client.begin_load(2);
        let fast = client.begin_load(3);

        assert!(client.complete_load(fast, Ok(page(3, 301..=312))).is_applied());
        let outcome = client.complete_load(slow, Ok(page(2, 201..=212)));

        assert_eq!(
            outcome,
            LoadOutcome::Stale {
                request: slow,
                latest: fast.id
            }
        );
        assert_eq!(client.current_page().number, 3);
        assert!(!client.is_loading());
    }

    #[test]
    fn duplicate_reply_for_applied_request_is_stale() {
        let (mut client, _) = client_with(MemorySource::generated(100, 12, 0));
        let request = client.begin_load(1);
        assert!(client.complete_load(request, Ok(page(1, 101..=112))).is_applied());
        assert!(matches!(
            client.complete_load(request, Ok(page(1, 101..=112))),
            LoadOutcome::Stale { .. }
        ));
    }

    #[test]
    fn failed_load_keeps_previous_page_and_selection() {
        let (mut client, _) = client_with(MemorySource::generated(100, 12, 0));
        let first = client.begin_load(1);
        client.complete_load(first, Ok(page(1, 101..=112)));
        client.on_bulk_select(Some("20")).unwrap();
        let before = client.selection().clone();

        let second = client.begin_load(2);
        let outcome = client.complete_load(
            second,
            Err(SourceError::Unavailable {
                page: 2,
                reason: "offline".into(),
            }),
        );

        assert!(matches!(outcome, LoadOutcome::Failed(_)));
        assert!(!client.is_loading());
        assert_eq!(client.current_page().number, 1);
        assert_eq!(client.selection(), &before);
        assert!(client.last_error().is_some());
    }

    #[test]
    fn mismatched_or_malformed_pages_are_rejected() {
        let (mut client, _) = client_with(MemorySource::generated(100, 12, 0));

        let request = client.begin_load(2);
        assert_eq!(
            client.complete_load(request, Ok(page(3, 301..=312))),
            LoadOutcome::Failed(SourceError::PageMismatch {
                requested: 2,
                received: 3
            })
        );

        let request = client.begin_load(2);
        let wrong_size = Page::new(2, 10, vec![Record::new(1)], 100);
        assert!(matches!(
            client.complete_load(request, Ok(wrong_size)),
            LoadOutcome::Failed(SourceError::PageSizeMismatch { .. })
        ));

        let request = client.begin_load(2);
        let negative = Page::new(2, 12, vec![Record::new(-4)], 100);
        assert_eq!(
            client.complete_load(request, Ok(negative)),
            LoadOutcome::Failed(SourceError::NegativeRecordId { page: 2, id: -4 })
        );
        assert!(!client.store().cache().has_loaded());
    }

    #[test]
    fn bulk_select_input_validation_is_atomic() {
        let (mut client, _) = client_with(MemorySource::generated(100, 12, 0));
        let request = client.begin_load(1);
        client.complete_load(request, Ok(page(1, 101..=112)));
        client.on_row_toggle(&Record::new(104));
        let before = client.selection().clone();

        for input in [None, Some(""), Some("abc"), Some("0"), Some("-5")] {
            assert!(client.on_bulk_select(input).is_err(), "{input:?} accepted");
            assert_eq!(client.selection(), &before);
        }
        assert_eq!(client.on_bulk_select(Some("3")), Ok(3));
        assert!(client.selection().contains_record(RecordId(103)));
        assert!(!client.selection().contains_record(RecordId(104)));
    }

    #[test_timeout::tokio_timeout_test]
    async fn navigation_stops_at_the_edges() {
        let (mut client, source) = client_with(MemorySource::generated(30, 12, 0));
        assert!(client.previous_page().await.is_none());
        assert!(client.goto_page(1).await.is_applied());
        assert!(client.next_page().await.is_some_and(|o| o.is_applied()));
        assert!(client.next_page().await.is_some_and(|o| o.is_applied()));
        assert_eq!(client.current_page().number, 3);
        assert!(client.next_page().await.is_none());
        assert!(client.previous_page().await.is_some_and(|o| o.is_applied()));
        assert_eq!(client.current_page().number, 2);
        assert_eq!(source.fetch_count(), 4);
    }
}
