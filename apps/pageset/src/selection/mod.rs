//! Selection persistence over a record set the client only sees one page at a time.
//!
//! The selection mixes resolved record ids with [`Marker`]s: pending logical
//! positions on pages that have not been fetched yet. Loading a page through
//! [`SelectionStore::load_page`] swaps the cached page and rewrites the
//! markers that point into it, in one call.
//!
//! ```
//! # use pageset::model::{Page, Record};
//! # use pageset::selection::{MarkerCodec, SelectionStore};
//! let codec = MarkerCodec::new(10_000, 12).unwrap();
//! let mut store = SelectionStore::new(codec);
//! let page1 = Page::new(1, 12, (101..=112).map(Record::new).collect(), 100);
//! store.load_page(page1).unwrap();
//! store.bulk_select_first_n(20).unwrap();
//! assert_eq!(store.count(), 20);
//! assert_eq!(store.selection().pending_count(), 8);
//!
//! let page2 = Page::new(2, 12, (201..=212).map(Record::new).collect(), 100);
//! let report = store.load_page(page2).unwrap();
//! assert_eq!(report.resolved, 8);
//! assert_eq!(store.count(), 20);
//! ```

pub mod bulk;
mod error;
pub mod marker;
pub mod resolver;
mod store;

pub use error::{DecodeError, MarkerError, PageError, ValidationError};
pub use marker::{DEFAULT_MARKER_BASE, Marker, MarkerCodec, Placeholder, is_placeholder};
pub use resolver::{ResolveReport, resolve};
pub use store::{SelectionKey, SelectionSet, SelectionStore};
