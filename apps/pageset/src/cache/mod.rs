//! Holder for the single page the client keeps in memory.
//!
//! [`PageCache`] swaps pages and reports metadata, nothing more.
//! The only path that replaces the held page is
//! [`SelectionStore::load_page`](crate::selection::SelectionStore::load_page),
//! which resolves pending selections against the new page before returning,
//! so no reader can observe a page whose placeholders are still unresolved.
//!
//! ```
//! # use pageset::cache::PageCache;
//! let cache = PageCache::new(12);
//! assert!(!cache.has_loaded());
//! assert_eq!(cache.current().number, 1);
//! assert!(cache.current().is_empty());
//! ```

use crate::model::Page;

#[derive(Debug, Clone)]
pub struct PageCache {
    page: Page,
    page_size: u32,
    loads: u64,
}

impl PageCache {
    pub fn new(page_size: u32) -> Self {
        Self {
            page: Page::empty(page_size),
            page_size,
            loads: 0,
        }
    }

    /// Currently held page; an empty page 1 before the first load.
    pub fn current(&self) -> &Page {
        &self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn total_count(&self) -> u64 {
        self.page.total_count
    }

    pub fn has_loaded(&self) -> bool {
        self.loads > 0
    }

    /// Number of pages applied so far, repeat visits included.
    pub fn load_count(&self) -> u64 {
        self.loads
    }

    /// Replaces the held page and returns the previous one.
    pub(crate) fn load(&mut self, page: Page) -> Page {
        self.loads = self.loads.saturating_add(1);
        std::mem::replace(&mut self.page, page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Record;

    #[test]
    fn load_replaces_page_wholesale() {
        let mut cache = PageCache::new(3);
        let first = Page::new(1, 3, vec![Record::new(1), Record::new(2)], 5);
        let previous = cache.load(first.clone());
        assert!(previous.is_empty());
        assert_eq!(cache.current(), &first);
        assert_eq!(cache.total_count(), 5);

        let second = Page::new(2, 3, vec![Record::new(4)], 5);
        let previous = cache.load(second);
        assert_eq!(previous, first);
        assert_eq!(cache.current().number, 2);
        assert_eq!(cache.load_count(), 2);
        assert!(cache.has_loaded());
    }
}
