//! Records and pages as delivered by the remote source.
//!
//! A [`Page`] is the unit of transfer: the client only ever holds one of them.
//! Positions inside the full remote ordering are 1-based ("logical positions")
//! and map onto `(page, index_in_page)` through [`locate`].

mod page;
mod record;

pub use page::{Page, locate};
pub use record::{Record, RecordId};
