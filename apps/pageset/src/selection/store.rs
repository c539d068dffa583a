use std::collections::BTreeSet;

use tracing::{debug, trace};

use super::bulk;
use super::error::{DecodeError, PageError, ValidationError};
use super::marker::{Marker, MarkerCodec, Placeholder, is_placeholder};
use super::resolver::{self, ResolveReport};
use crate::cache::PageCache;
use crate::model::{Page, Record, RecordId};

/// One member of the selection: a known record or a pending position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SelectionKey {
    Record(RecordId),
    Pending(Marker),
}

impl SelectionKey {
    #[inline]
    pub fn is_pending(self) -> bool {
        matches!(self, SelectionKey::Pending(_))
    }

    /// Signed integer form: record ids as-is, markers as negative placeholders.
    pub fn raw(self) -> i64 {
        match self {
            SelectionKey::Record(id) => id.0,
            SelectionKey::Pending(marker) => marker.placeholder(),
        }
    }

    pub fn from_raw(raw: i64, codec: &MarkerCodec) -> Result<Self, DecodeError> {
        if is_placeholder(raw) {
            codec.decode(raw).map(SelectionKey::Pending)
        } else {
            Ok(SelectionKey::Record(RecordId(raw)))
        }
    }
}

impl From<RecordId> for SelectionKey {
    fn from(id: RecordId) -> Self {
        SelectionKey::Record(id)
    }
}

impl From<Marker> for SelectionKey {
    fn from(marker: Marker) -> Self {
        SelectionKey::Pending(marker)
    }
}

/// Membership set of selected records and pending positions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionSet {
    keys: BTreeSet<SelectionKey>,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn contains(&self, key: SelectionKey) -> bool {
        self.keys.contains(&key)
    }

    pub fn contains_record(&self, id: RecordId) -> bool {
        self.keys.contains(&SelectionKey::Record(id))
    }

    pub fn insert(&mut self, key: impl Into<SelectionKey>) -> bool {
        self.keys.insert(key.into())
    }

    pub fn remove(&mut self, key: impl Into<SelectionKey>) -> bool {
        self.keys.remove(&key.into())
    }

    pub fn clear(&mut self) {
        self.keys.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = SelectionKey> + '_ {
        self.keys.iter().copied()
    }

    pub fn markers(&self) -> impl Iterator<Item = Marker> + '_ {
        self.keys.iter().filter_map(|key| match key {
            SelectionKey::Pending(marker) => Some(*marker),
            SelectionKey::Record(_) => None,
        })
    }

    pub fn record_ids(&self) -> impl Iterator<Item = RecordId> + '_ {
        self.keys.iter().filter_map(|key| match key {
            SelectionKey::Record(id) => Some(*id),
            SelectionKey::Pending(_) => None,
        })
    }

    pub fn pending_count(&self) -> usize {
        self.markers().count()
    }

    /// Pages that still hold unresolved positions.
    pub fn pending_pages(&self) -> BTreeSet<u64> {
        self.markers().map(Marker::page).collect()
    }

    /// Sorted raw view of the selection.
    pub fn raw_ids(&self) -> Vec<Placeholder> {
        let mut raw: Vec<i64> = self.keys.iter().map(|key| key.raw()).collect();
        raw.sort_unstable();
        raw
    }
}

impl FromIterator<SelectionKey> for SelectionSet {
    fn from_iter<T: IntoIterator<Item = SelectionKey>>(iter: T) -> Self {
        Self {
            keys: iter.into_iter().collect(),
        }
    }
}

/// Owns the selection and the page it is interpreted against.
#[derive(Debug, Clone)]
pub struct SelectionStore {
    selection: SelectionSet,
    cache: PageCache,
    codec: MarkerCodec,
}

impl SelectionStore {
    pub fn new(codec: MarkerCodec) -> Self {
        Self {
            selection: SelectionSet::new(),
            cache: PageCache::new(codec.page_size()),
            codec,
        }
    }

    pub fn selection(&self) -> &SelectionSet {
        &self.selection
    }

    pub fn cache(&self) -> &PageCache {
        &self.cache
    }

    pub fn current_page(&self) -> &Page {
        self.cache.current()
    }

    pub fn codec(&self) -> &MarkerCodec {
        &self.codec
    }

    /// Makes `page` the loaded page and resolves the markers pointing into it.
    ///
    /// A page carrying a negative record id is rejected and nothing changes:
    /// negative values belong to placeholders.
    pub fn load_page(&mut self, page: Page) -> Result<ResolveReport, PageError> {
        if let Some(record) = page.records.iter().find(|record| !record.id.is_valid()) {
            return Err(PageError::NegativeRecordId {
                page: page.number,
                id: record.id.0,
            });
        }
        self.cache.load(page);
        let report = resolver::resolve(&mut self.selection, self.cache.current());
        debug_assert!(
            resolver::unresolved_on(&self.selection, self.cache.current()).is_empty(),
            "markers for the loaded page survived resolution"
        );
        Ok(report)
    }

    #[inline]
    pub fn count(&self) -> usize {
        self.selection.len()
    }

    pub fn is_row_selected(&self, record: &Record) -> bool {
        self.selection.contains_record(record.id)
    }

    /// Flips membership of `record`; returns whether it is now selected.
    pub fn toggle_row(&mut self, record: &Record) -> bool {
        let key = SelectionKey::Record(record.id);
        let selected = if self.selection.remove(key) {
            false
        } else {
            self.selection.insert(key);
            true
        };
        trace!(target: "pageset::selection", id = %record.id, selected, "row toggled");
        selected
    }

    /// Replaces the loaded page's contribution with `records`.
    ///
    /// Ids of records not on the loaded page, and every marker, are kept.
    pub fn set_page_selection(&mut self, records: &[Record]) {
        let page = self.cache.current();
        for id in page.ids() {
            self.selection.remove(id);
        }
        for record in records {
            self.selection.insert(record.id);
        }
        trace!(
            target: "pageset::selection",
            page = page.number,
            selected = records.len(),
            "page selection replaced"
        );
    }

    pub fn select_all_on_page(&mut self, checked: bool) {
        let page = self.cache.current();
        for id in page.ids() {
            if checked {
                self.selection.insert(id);
            } else {
                self.selection.remove(id);
            }
        }
        trace!(
            target: "pageset::selection",
            page = page.number,
            checked,
            "select all on page"
        );
    }

    /// True when the loaded page is non-empty and every row on it is selected.
    pub fn is_all_selected(&self) -> bool {
        let page = self.cache.current();
        !page.is_empty() && page.ids().all(|id| self.selection.contains_record(id))
    }

    /// Replaces the whole selection with the first `n` logical positions.
    ///
    /// Uses the loaded page's reported total and the session page size.
    /// Returns the resulting selection size.
    pub fn bulk_select_first_n(&mut self, n: i64) -> Result<usize, ValidationError> {
        let page = self.cache.current();
        let keys = bulk::plan_first_n(n, page.total_count, &self.codec, page)?;
        self.selection = keys.into_iter().collect();
        debug!(
            target: "pageset::selection",
            requested = n,
            total = page.total_count,
            selected = self.selection.len(),
            pending = self.selection.pending_count(),
            "bulk selection applied"
        );
        Ok(self.selection.len())
    }

    pub fn clear_all(&mut self) {
        self.selection.clear();
    }

    pub fn selected_records_on_current_page(&self) -> Vec<&Record> {
        self.cache
            .current()
            .records
            .iter()
            .filter(|record| self.selection.contains_record(record.id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> MarkerCodec {
        MarkerCodec::new(10_000, 12).unwrap()
    }

    fn page(number: u64, ids: std::ops::RangeInclusive<i64>) -> Page {
        Page::new(number, 12, ids.map(Record::new).collect(), 100)
    }

    fn raw(store: &SelectionStore) -> Vec<i64> {
        store.selection().raw_ids()
    }

    #[test]
    fn toggle_row_flips_membership_only_for_that_record() {
        let mut store = SelectionStore::new(codec());
        store.load_page(page(1, 101..=112)).unwrap();
        let row = Record::new(105);
        assert!(store.toggle_row(&row));
        assert!(store.is_row_selected(&row));
        assert!(!store.toggle_row(&row));
        assert!(!store.is_row_selected(&row));
        assert_eq!(store.count(), 0);
    }

    #[test]
    fn set_page_selection_keeps_other_pages() {
        let mut store = SelectionStore::new(codec());
        store.load_page(page(1, 101..=112)).unwrap();
        store.toggle_row(&Record::new(101));
        store.toggle_row(&Record::new(102));

        store.load_page(page(2, 201..=212)).unwrap();
        store.toggle_row(&Record::new(201));
        store.set_page_selection(&[Record::new(203), Record::new(204)]);

        assert_eq!(raw(&store), vec![101, 102, 203, 204]);
    }

    #[test]
    fn set_page_selection_leaves_pending_markers() {
        let mut store = SelectionStore::new(codec());
        store.load_page(page(1, 101..=112)).unwrap();
        store.bulk_select_first_n(14).unwrap();
        store.set_page_selection(&[Record::new(110)]);
        assert_eq!(raw(&store), vec![-20_001, -20_000, 110]);
    }

    #[test]
    fn select_all_and_derived_flag() {
        let mut store = SelectionStore::new(codec());
        assert!(!store.is_all_selected(), "empty page is never all-selected");

        store.load_page(page(1, 101..=112)).unwrap();
        assert!(!store.is_all_selected());
        store.select_all_on_page(true);
        assert!(store.is_all_selected());
        assert_eq!(store.count(), 12);

        store.toggle_row(&Record::new(107));
        assert!(!store.is_all_selected());

        store.select_all_on_page(false);
        assert_eq!(store.count(), 0);
    }

    #[test]
    fn bulk_select_replaces_prior_selection() {
        let mut store = SelectionStore::new(codec());
        store.load_page(page(2, 201..=212)).unwrap();
        store.toggle_row(&Record::new(999));
        let selected = store.bulk_select_first_n(14).unwrap();
        assert_eq!(selected, 14);
        assert!(!store.selection().contains_record(RecordId(999)));
        assert_eq!(store.selection().pending_count(), 12);
        assert!(store.selection().contains_record(RecordId(201)));
        assert!(store.selection().contains_record(RecordId(202)));
    }

    #[test]
    fn bulk_select_clamps_to_total() {
        let mut store = SelectionStore::new(codec());
        store.load_page(page(1, 101..=112)).unwrap();
        assert_eq!(store.bulk_select_first_n(5_000).unwrap(), 100);
        assert_eq!(store.count(), 100);
        assert_eq!(store.selection().pending_pages().len(), 8);
    }

    #[test]
    fn bulk_select_rejection_leaves_selection_untouched() {
        let mut store = SelectionStore::new(codec());
        store.load_page(page(1, 101..=112)).unwrap();
        store.toggle_row(&Record::new(103));
        let before = store.selection().clone();
        assert_eq!(
            store.bulk_select_first_n(0),
            Err(ValidationError::NonPositive(0))
        );
        assert_eq!(
            store.bulk_select_first_n(-5),
            Err(ValidationError::NonPositive(-5))
        );
        assert_eq!(store.selection(), &before);
    }

    #[test]
    fn clear_all_drops_markers_too() {
        let mut store = SelectionStore::new(codec());
        store.load_page(page(1, 101..=112)).unwrap();
        store.bulk_select_first_n(30).unwrap();
        store.clear_all();
        assert_eq!(store.count(), 0);
    }

    #[test]
    fn selected_records_follow_page_order() {
        let mut store = SelectionStore::new(codec());
        store.load_page(page(1, 101..=112)).unwrap();
        store.toggle_row(&Record::new(109));
        store.toggle_row(&Record::new(102));
        store.toggle_row(&Record::new(555));
        let ids: Vec<i64> = store
            .selected_records_on_current_page()
            .iter()
            .map(|record| record.id.0)
            .collect();
        assert_eq!(ids, vec![102, 109]);
    }

    #[test]
    fn raw_keys_roundtrip_through_codec() {
        let codec = codec();
        let marker = codec.marker(3, 4).unwrap();
        let key = SelectionKey::from_raw(marker.placeholder(), &codec).unwrap();
        assert_eq!(key, SelectionKey::Pending(marker));
        assert_eq!(
            SelectionKey::from_raw(42, &codec).unwrap(),
            SelectionKey::Record(RecordId(42))
        );
        assert!(SelectionKey::from_raw(-3, &codec).is_err());
    }

    #[test]
    fn page_with_negative_id_is_rejected_untouched() {
        let mut store = SelectionStore::new(codec());
        store.load_page(page(1, 101..=112)).unwrap();
        store.bulk_select_first_n(13).unwrap();
        let before = store.selection().clone();

        let mut records: Vec<Record> = (201..=212).map(Record::new).collect();
        records[0] = Record::new(-20_000);
        let err = store
            .load_page(Page::new(2, 12, records, 100))
            .unwrap_err();

        assert_eq!(
            err,
            PageError::NegativeRecordId {
                page: 2,
                id: -20_000
            }
        );
        assert_eq!(store.current_page().number, 1);
        assert_eq!(store.selection(), &before);
        assert_eq!(store.selection().raw_ids()[0], -20_000);
        assert!(store.selection().iter().all(|key| {
            SelectionKey::from_raw(key.raw(), store.codec()) == Ok(key)
        }));
    }
}
