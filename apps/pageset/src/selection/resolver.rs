//! Rewrites pending markers into record ids once their page is loaded.

use tracing::debug;

use super::marker::Marker;
use super::store::{SelectionKey, SelectionSet};
use crate::model::Page;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveReport {
    pub page: u64,
    /// Markers replaced by record ids.
    pub resolved: usize,
    /// Markers for this page pointing past its last record; left in place.
    pub out_of_range: usize,
    /// Markers still waiting on other pages.
    pub pending_elsewhere: usize,
}

/// Resolves every marker on `page.number` whose index is inside the page.
///
/// Markers for other pages, out-of-range markers and record ids are left
/// alone. Running it again with the same page is a no-op.
pub fn resolve(selection: &mut SelectionSet, page: &Page) -> ResolveReport {
    let mut report = ResolveReport {
        page: page.number,
        ..ResolveReport::default()
    };
    let matching: Vec<Marker> = selection
        .markers()
        .filter(|marker| {
            if marker.page() == page.number {
                true
            } else {
                report.pending_elsewhere += 1;
                false
            }
        })
        .collect();

    for marker in matching {
        match page.record_at(marker.index() as usize) {
            Some(record) => {
                selection.remove(SelectionKey::Pending(marker));
                selection.insert(record.id);
                report.resolved += 1;
            }
            None => report.out_of_range += 1,
        }
    }

    if report.resolved > 0 || report.out_of_range > 0 {
        debug!(
            target: "pageset::selection",
            page = report.page,
            resolved = report.resolved,
            out_of_range = report.out_of_range,
            pending_elsewhere = report.pending_elsewhere,
            "resolved pending selections"
        );
    }
    report
}

/// Markers on `page.number` that point at a record present on the page.
///
/// Empty after [`resolve`] has run for `page`.
pub fn unresolved_on(selection: &SelectionSet, page: &Page) -> Vec<Marker> {
    selection
        .markers()
        .filter(|marker| marker.page() == page.number && (marker.index() as usize) < page.len())
        .collect()
}
