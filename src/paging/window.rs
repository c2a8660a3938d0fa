//! Page windows, collection configuration and diagnostics.

use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Configuration for a paged collection
///
/// `max_cached_pages` must be at least `ceil(window / page_size)` for the largest window
/// a caller requests in one `get_items` call (plus `2 * preload_pages` when prefetch is on),
/// otherwise pages are evicted right after being loaded and every access refetches.
/// This is not enforced here; `TreeConfig::validate` warns about it.
///
/// Eviction drops the least recently read pages first. Finishing a load is not a read, so
/// pages prefetched around a request rank below the pages that request returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PagedCollectionConfig {
    /// Items per page (> 0)
    pub page_size: usize,
    /// Pages prefetched before and after each requested range
    pub preload_pages: usize,
    /// Loaded pages kept before LRU eviction (>= 1)
    pub max_cached_pages: usize,
    /// Enable background prefetch
    pub prefetch_enabled: bool,
    /// Upper bound on waiting for another caller's in-flight load of the same page
    #[serde(with = "duration_ms")]
    pub inflight_wait_timeout: Duration,
}

impl Default for PagedCollectionConfig {
    fn default() -> Self {
        Self {
            page_size: 50,
            preload_pages: 1,
            max_cached_pages: 10,
            prefetch_enabled: true,
            inflight_wait_timeout: Duration::from_millis(5000),
        }
    }
}

impl PagedCollectionConfig {
    /// Inclusive page range covering `[start, start + count)`. `None` for an empty request.
    pub fn page_range(&self, start: usize, count: usize) -> Option<RangeInclusive<usize>> {
        if count == 0 {
            return None;
        }
        let page_size = self.page_size.max(1);
        let last_index = start.saturating_add(count - 1);
        Some(start / page_size..=last_index / page_size)
    }

    pub fn total_pages(&self, total_items: usize) -> usize {
        let page_size = self.page_size.max(1);
        total_items.div_ceil(page_size)
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

/// Result of one loader call: the page's items plus the collection's total size
#[derive(Debug, Clone)]
pub struct PageData<T> {
    pub items: Vec<T>,
    pub total: usize,
}

impl<T> PageData<T> {
    pub fn new(items: Vec<T>, total: usize) -> Self {
        Self { items, total }
    }
}

/// One cached page
///
/// Created loading; becomes loaded on success and then keeps its items and total until
/// invalidated. A failed load removes the window instead of keeping a failed state.
#[derive(Debug, Clone)]
pub struct PageWindow<T> {
    pub page_index: usize,
    pub items: Arc<Vec<T>>,
    pub total_count: usize,
    pub is_loaded: bool,
    pub is_loading: bool,
    /// Set on creation and refreshed whenever a caller reads the page
    pub last_touched_at: Instant,
    /// Breaks ties between equal `last_touched_at` readings
    pub(crate) touch_seq: u64,
}

impl<T> PageWindow<T> {
    pub(crate) fn loading(page_index: usize, touch_seq: u64) -> Self {
        Self {
            page_index,
            items: Arc::new(Vec::new()),
            total_count: 0,
            is_loaded: false,
            is_loading: true,
            last_touched_at: Instant::now(),
            touch_seq,
        }
    }

    pub(crate) fn touch(&mut self, touch_seq: u64) {
        self.last_touched_at = Instant::now();
        self.touch_seq = touch_seq;
    }

    /// Completing a load does not count as an access; the window keeps the touch it was
    /// created with until a caller reads it.
    pub(crate) fn fill(&mut self, items: Arc<Vec<T>>, total_count: usize) {
        self.items = items;
        self.total_count = total_count;
        self.is_loaded = true;
        self.is_loading = false;
    }

    pub(crate) fn lru_key(&self) -> (Instant, u64) {
        (self.last_touched_at, self.touch_seq)
    }
}

/// Diagnostic summary of a collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CollectionState {
    pub loaded_pages: usize,
    pub total_pages: usize,
    pub total_items: usize,
    /// Page entries currently held, loading ones included
    pub cache_size: usize,
}

/// Data-changed notifications
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectionEvent {
    Reset,
    PagesInvalidated(Vec<usize>),
    PageLoaded(usize),
}
