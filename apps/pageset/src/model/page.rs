use serde::{Deserialize, Serialize};

use super::{Record, RecordId};

/// One page of the remote record set plus its pagination metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    /// 1-based page number.
    pub number: u64,
    /// Page size for the session; `records.len()` never exceeds it.
    pub size: u32,
    pub records: Vec<Record>,
    /// Total records in the remote set, as reported with this page.
    pub total_count: u64,
}

impl Page {
    pub fn new(number: u64, size: u32, records: Vec<Record>, total_count: u64) -> Self {
        Self {
            number,
            size,
            records,
            total_count,
        }
    }

    /// Placeholder page held before the first load completes.
    pub fn empty(size: u32) -> Self {
        Self::new(1, size, Vec::new(), 0)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn record_at(&self, index: usize) -> Option<&Record> {
        self.records.get(index)
    }

    pub fn contains_id(&self, id: RecordId) -> bool {
        self.records.iter().any(|record| record.id == id)
    }

    pub fn ids(&self) -> impl Iterator<Item = RecordId> + '_ {
        self.records.iter().map(|record| record.id)
    }

    /// Number of pages the reported total spans.
    pub fn page_count(&self) -> u64 {
        if self.size == 0 {
            return 0;
        }
        self.total_count.div_ceil(u64::from(self.size))
    }

    /// Logical position of the first record on this page.
    pub fn first_position(&self) -> u64 {
        self.number
            .saturating_sub(1)
            .saturating_mul(u64::from(self.size))
            .saturating_add(1)
    }
}

/// Maps a 1-based logical position onto `(page, index_in_page)`.
///
/// `position` must be at least 1 and `page_size` non-zero.
pub fn locate(position: u64, page_size: u32) -> (u64, u32) {
    debug_assert!(position >= 1, "logical positions are 1-based");
    debug_assert!(page_size > 0, "page size must be positive");
    let size = u64::from(page_size);
    let offset = position - 1;
    // offset % size < page_size, so the narrowing is lossless
    (offset / size + 1, (offset % size) as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page_with(number: u64, ids: &[i64]) -> Page {
        Page::new(
            number,
            12,
            ids.iter().copied().map(Record::new).collect(),
            100,
        )
    }

    #[test]
    fn locate_splits_positions_across_pages() {
        assert_eq!(locate(1, 12), (1, 0));
        assert_eq!(locate(12, 12), (1, 11));
        assert_eq!(locate(13, 12), (2, 0));
        assert_eq!(locate(20, 12), (2, 7));
        assert_eq!(locate(100, 12), (9, 3));
    }

    #[test]
    fn page_metadata_helpers() {
        let page = page_with(2, &[201, 202, 203]);
        assert_eq!(page.page_count(), 9);
        assert_eq!(page.first_position(), 13);
        assert!(page.contains_id(RecordId(202)));
        assert!(!page.contains_id(RecordId(101)));
        assert_eq!(page.record_at(2).map(|r| r.id), Some(RecordId(203)));
        assert!(page.record_at(3).is_none());
    }

    #[test]
    fn empty_page_has_no_pages() {
        let page = Page::empty(12);
        assert!(page.is_empty());
        assert_eq!(page.number, 1);
        assert_eq!(page.page_count(), 0);
    }
}
