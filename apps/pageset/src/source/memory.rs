use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use rand::Rng;
use tracing::{debug, trace};

use super::{PageSource, SourceError};
use crate::model::{Page, Record};

#[derive(Debug)]
enum Backing {
    /// Records synthesized on demand: position `p` gets id `id_base + p`.
    Generated { total: u64, id_base: i64 },
    Records(Arc<Vec<Record>>),
}

/// In-process page source with optional latency and failure injection.
#[derive(Debug)]
pub struct MemorySource {
    backing: Backing,
    page_size: u32,
    latency: Duration,
    jitter: Duration,
    page_latency: Mutex<HashMap<u64, Duration>>,
    failing: Mutex<HashSet<u64>>,
    fetches: AtomicU64,
}

impl MemorySource {
    pub fn generated(total: u64, page_size: u32, id_base: i64) -> Self {
        Self::with_backing(Backing::Generated { total, id_base }, page_size)
    }

    pub fn from_records(records: Vec<Record>, page_size: u32) -> Self {
        Self::with_backing(Backing::Records(Arc::new(records)), page_size)
    }

    /// Loads a JSON array of records.
    pub fn from_json_file(path: &Path, page_size: u32) -> Result<Self, SourceError> {
        let records_error = |reason: String| SourceError::Records {
            path: path.display().to_string(),
            reason,
        };
        let raw = fs::read_to_string(path).map_err(|err| records_error(err.to_string()))?;
        let records: Vec<Record> =
            serde_json::from_str(&raw).map_err(|err| records_error(err.to_string()))?;
        debug!(
            target: "pageset::source",
            path = %path.display(),
            records = records.len(),
            "loaded records file"
        );
        Ok(Self::from_records(records, page_size))
    }

    fn with_backing(backing: Backing, page_size: u32) -> Self {
        Self {
            backing,
            page_size: page_size.max(1),
            latency: Duration::ZERO,
            jitter: Duration::ZERO,
            page_latency: Mutex::new(HashMap::new()),
            failing: Mutex::new(HashSet::new()),
            fetches: AtomicU64::new(0),
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Adds a uniformly random extra delay in `[0, jitter]` to every fetch.
    pub fn with_jitter(mut self, jitter: Duration) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn with_failing_pages(self, pages: impl IntoIterator<Item = u64>) -> Self {
        self.failing.lock().extend(pages);
        self
    }

    /// Overrides the latency of one page; used to force out-of-order replies.
    pub fn set_page_latency(&self, page: u64, latency: Duration) {
        self.page_latency.lock().insert(page, latency);
    }

    pub fn fail_page(&self, page: u64) {
        self.failing.lock().insert(page);
    }

    pub fn heal_page(&self, page: u64) {
        self.failing.lock().remove(&page);
    }

    pub fn fetch_count(&self) -> u64 {
        self.fetches.load(Ordering::Relaxed)
    }

    pub fn total(&self) -> u64 {
        match &self.backing {
            Backing::Generated { total, .. } => *total,
            Backing::Records(records) => records.len() as u64,
        }
    }

    pub fn page_count(&self) -> u64 {
        self.total().div_ceil(u64::from(self.page_size))
    }

    fn delay_for(&self, number: u64) -> Duration {
        if let Some(latency) = self.page_latency.lock().get(&number) {
            return *latency;
        }
        if self.jitter.is_zero() {
            return self.latency;
        }
        let max = u64::try_from(self.jitter.as_millis()).unwrap_or(u64::MAX);
        let extra = rand::thread_rng().gen_range(0..=max);
        self.latency + Duration::from_millis(extra)
    }

    fn slice(&self, number: u64) -> Result<Page, SourceError> {
        let total = self.total();
        let page_count = self.page_count();
        // an empty set still answers page 1, with no records
        if number == 0 || (number > page_count && !(number == 1 && total == 0)) {
            return Err(SourceError::PageOutOfRange {
                page: number,
                page_count,
            });
        }
        let size = u64::from(self.page_size);
        let start = (number - 1) * size;
        let end = (start + size).min(total);
        let records = match &self.backing {
            Backing::Generated { id_base, .. } => (start + 1..=end)
                .map(|position| {
                    let id = id_base.saturating_add(i64::try_from(position).unwrap_or(i64::MAX));
                    Record::new(id).with_attribute("name", format!("record {position}"))
                })
                .collect(),
            Backing::Records(records) => {
                // start < end <= records.len() on this branch
                records[start as usize..end as usize].to_vec()
            }
        };
        Ok(Page::new(number, self.page_size, records, total))
    }
}

#[async_trait]
impl PageSource for MemorySource {
    async fn fetch_page(&self, number: u64) -> Result<Page, SourceError> {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        let delay = self.delay_for(number);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.failing.lock().contains(&number) {
            trace!(target: "pageset::source", page = number, "injected failure");
            return Err(SourceError::Unavailable {
                page: number,
                reason: "injected failure".to_string(),
            });
        }
        let page = self.slice(number)?;
        trace!(
            target: "pageset::source",
            page = number,
            records = page.len(),
            delay_ms = delay.as_millis() as u64,
            "served page"
        );
        Ok(page)
    }
}
