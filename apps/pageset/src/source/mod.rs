//! The fetch collaborator: where pages come from.
//!
//! The client never talks to a transport directly; it asks a [`PageSource`]
//! for a page by number and validates what comes back before applying it.

use async_trait::async_trait;
use thiserror::Error;

use crate::model::Page;
use crate::selection::PageError;

mod memory;

pub use memory::MemorySource;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    #[error("page {page} failed to load: {reason}")]
    Unavailable { page: u64, reason: String },
    #[error("page {page} is outside the record set ({page_count} pages)")]
    PageOutOfRange { page: u64, page_count: u64 },
    #[error("requested page {requested} but the source answered with page {received}")]
    PageMismatch { requested: u64, received: u64 },
    #[error("page {page} reports size {received}, session uses {expected}")]
    PageSizeMismatch {
        page: u64,
        expected: u32,
        received: u32,
    },
    #[error("page {page} carries {records} records, more than its size {size}")]
    Oversized { page: u64, records: usize, size: u32 },
    #[error("page {page} carries negative record id {id}")]
    NegativeRecordId { page: u64, id: i64 },
    #[error("failed to read records from {path}: {reason}")]
    Records { path: String, reason: String },
}

impl From<PageError> for SourceError {
    fn from(err: PageError) -> Self {
        match err {
            PageError::NegativeRecordId { page, id } => SourceError::NegativeRecordId { page, id },
        }
    }
}

/// Asynchronous page provider.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Fetches the 1-based page `number`.
    async fn fetch_page(&self, number: u64) -> Result<Page, SourceError>;
}
