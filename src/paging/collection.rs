//! Paged collection: virtual index space over a page loader
//!
//! Pages are fetched on demand, shared between concurrent callers while in flight,
//! prefetched around each requested range and evicted least-recently-touched first.

use super::window::{CollectionEvent, CollectionState, PageData, PageWindow, PagedCollectionConfig};
use crate::error::ApiError;
use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::ops::RangeInclusive;
use std::sync::{Arc, Weak};
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Source of pages for a collection.
#[async_trait]
pub trait PageLoader<T>: Send + Sync {
    async fn load_page(&self, page_index: usize, page_size: usize) -> Result<PageData<T>, ApiError>;
}

#[async_trait]
impl<T, F, Fut> PageLoader<T> for F
where
    T: Send + 'static,
    F: Fn(usize, usize) -> Fut + Send + Sync,
    Fut: Future<Output = Result<PageData<T>, ApiError>> + Send,
{
    async fn load_page(&self, page_index: usize, page_size: usize) -> Result<PageData<T>, ApiError> {
        (self)(page_index, page_size).await
    }
}

type PageLoad<T> = Shared<BoxFuture<'static, Option<Arc<Vec<T>>>>>;

struct PageEntry<T> {
    window: PageWindow<T>,
    /// Identifies the load that created this entry
    ticket: u64,
    inflight: Option<PageLoad<T>>,
}

struct PageTable<T> {
    pages: HashMap<usize, PageEntry<T>>,
    total_count: Option<usize>,
    next_ticket: u64,
    touch_seq: u64,
}

impl<T> PageTable<T> {
    fn next_touch(&mut self) -> u64 {
        self.touch_seq += 1;
        self.touch_seq
    }

    fn next_ticket(&mut self) -> u64 {
        self.next_ticket += 1;
        self.next_ticket
    }
}

struct CollectionInner<T> {
    label: String,
    config: PagedCollectionConfig,
    loader: Arc<dyn PageLoader<T>>,
    table: Mutex<PageTable<T>>,
    events: broadcast::Sender<CollectionEvent>,
}

enum PageLookup<T> {
    Ready(Arc<Vec<T>>),
    Wait(PageLoad<T>),
    Load(PageLoad<T>),
}

/// Paged, cached view over `[0, total_count)`.
///
/// Cloning yields another handle to the same cache.
pub struct PagedCollection<T> {
    inner: Arc<CollectionInner<T>>,
}

impl<T> Clone for PagedCollection<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> PagedCollection<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new<L>(label: impl Into<String>, config: PagedCollectionConfig, loader: L) -> Self
    where
        L: PageLoader<T> + 'static,
    {
        Self::with_loader(label, config, Arc::new(loader))
    }

    pub fn with_loader(
        label: impl Into<String>,
        config: PagedCollectionConfig,
        loader: Arc<dyn PageLoader<T>>,
    ) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            inner: Arc::new(CollectionInner {
                label: label.into(),
                config,
                loader,
                table: Mutex::new(PageTable {
                    pages: HashMap::new(),
                    total_count: None,
                    next_ticket: 0,
                    touch_seq: 0,
                }),
                events,
            }),
        }
    }

    pub fn label(&self) -> &str {
        &self.inner.label
    }

    pub fn config(&self) -> &PagedCollectionConfig {
        &self.inner.config
    }

    /// Items in `[start_index, start_index + count)`, in order.
    ///
    /// Returns fewer than `count` items only when the range runs past the total, or when a
    /// page could not be loaded for this call (failed load, or in-flight wait timed out).
    /// Loader errors are logged, never returned.
    pub async fn get_items(&self, start_index: usize, count: usize) -> Vec<T> {
        let Some(pages) = self.inner.config.page_range(start_index, count) else {
            return Vec::new();
        };
        let page_size = self.inner.config.page_size.max(1);
        let end_index = start_index.saturating_add(count);
        let (first_page, last_page) = (*pages.start(), *pages.end());

        let mut items = Vec::new();
        for page_index in pages {
            let page_start = page_index * page_size;
            if let Some(total) = self.total_count() {
                if page_start >= total {
                    break;
                }
            }

            let Some(page_items) = self.inner.ensure_page(page_index).await else {
                continue;
            };

            let from = start_index.max(page_start) - page_start;
            let to = end_index
                .min(page_start + page_items.len())
                .saturating_sub(page_start);
            if from < to {
                items.extend_from_slice(&page_items[from..to]);
            }
        }

        self.prefetch_around(first_page, last_page);
        self.inner.touch_pages(first_page..=last_page);
        self.inner.evict();
        items
    }

    /// Single item at `index`, loading its page if needed.
    pub async fn get_item(&self, index: usize) -> Option<T> {
        self.get_items(index, 1).await.into_iter().next()
    }

    /// Drop every page and the known total.
    pub fn reset(&self) {
        {
            let mut table = self.inner.table.lock();
            table.pages.clear();
            table.total_count = None;
        }
        debug!(collection = %self.inner.label, "Collection reset");
        let _ = self.inner.events.send(CollectionEvent::Reset);
    }

    /// Drop only the listed pages.
    pub fn invalidate_pages(&self, page_indexes: &[usize]) {
        {
            let mut table = self.inner.table.lock();
            for page_index in page_indexes {
                table.pages.remove(page_index);
            }
        }
        debug!(
            collection = %self.inner.label,
            pages = ?page_indexes,
            "Invalidated pages"
        );
        let _ = self
            .inner
            .events
            .send(CollectionEvent::PagesInvalidated(page_indexes.to_vec()));
    }

    pub fn get_state(&self) -> CollectionState {
        let table = self.inner.table.lock();
        let total_items = table.total_count.unwrap_or(0);
        CollectionState {
            loaded_pages: table.pages.values().filter(|e| e.window.is_loaded).count(),
            total_pages: self.inner.config.total_pages(total_items),
            total_items,
            cache_size: table.pages.len(),
        }
    }

    /// Total reported by the most recent successful load.
    pub fn total_count(&self) -> Option<usize> {
        self.inner.table.lock().total_count
    }

    /// Indexes of pages whose load has completed, ascending.
    pub fn loaded_page_indexes(&self) -> Vec<usize> {
        let table = self.inner.table.lock();
        let mut indexes: Vec<usize> = table
            .pages
            .values()
            .filter(|e| e.window.is_loaded)
            .map(|e| e.window.page_index)
            .collect();
        indexes.sort_unstable();
        indexes
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CollectionEvent> {
        self.inner.events.subscribe()
    }

    fn prefetch_around(&self, first_page: usize, last_page: usize) {
        let config = &self.inner.config;
        if !config.prefetch_enabled || config.preload_pages == 0 {
            return;
        }
        // Prefetch is fire-and-forget and needs a runtime to spawn onto.
        if tokio::runtime::Handle::try_current().is_err() {
            return;
        }

        let mut table = self.inner.table.lock();
        let Some(total) = table.total_count else {
            return;
        };
        let total_pages = config.total_pages(total);
        let before = first_page.saturating_sub(config.preload_pages)..first_page;
        let after = last_page.saturating_add(1)..=last_page.saturating_add(config.preload_pages);
        let candidates: Vec<usize> = before
            .chain(after)
            .filter(|page| *page < total_pages && !table.pages.contains_key(page))
            .collect();

        // Entries are registered here, before the requested pages get their final touch,
        // so a finished prefetch never outranks the pages the caller asked for.
        for page_index in candidates {
            let touch = table.next_touch();
            let _ = self.inner.insert_load(&mut table, page_index, touch);
            debug!(collection = %self.inner.label, page_index, "Prefetching page");
        }
    }
}

impl<T> CollectionInner<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Loaded items for `page_index`, joining an in-flight load instead of issuing another.
    async fn ensure_page(self: &Arc<Self>, page_index: usize) -> Option<Arc<Vec<T>>> {
        let lookup = {
            let mut table = self.table.lock();
            let touch = table.next_touch();
            if let Some(entry) = table.pages.get_mut(&page_index) {
                if entry.window.is_loaded {
                    entry.window.touch(touch);
                    PageLookup::Ready(Arc::clone(&entry.window.items))
                } else if let Some(load) = &entry.inflight {
                    PageLookup::Wait(load.clone())
                } else {
                    return None;
                }
            } else {
                let load = self.insert_load(&mut table, page_index, touch);
                PageLookup::Load(load)
            }
        };

        match lookup {
            PageLookup::Ready(items) => {
                debug!(collection = %self.label, page_index, "Page cache hit");
                Some(items)
            }
            PageLookup::Load(load) => load.await,
            PageLookup::Wait(load) => {
                match tokio::time::timeout(self.config.inflight_wait_timeout, load).await {
                    Ok(items) => items,
                    Err(_) => {
                        let err = ApiError::PageUnavailable { page_index };
                        warn!(collection = %self.label, page_index, error = %err, "Gave up waiting on in-flight page");
                        None
                    }
                }
            }
        }
    }

    /// Register a loading entry for `page_index` and start its load.
    ///
    /// Inside a runtime the load runs on its own task, so it finishes and fills the page
    /// even if every caller awaiting it is dropped.
    fn insert_load(
        self: &Arc<Self>,
        table: &mut PageTable<T>,
        page_index: usize,
        touch: u64,
    ) -> PageLoad<T> {
        let ticket = table.next_ticket();
        let load = self.start_load(page_index, ticket);
        table.pages.insert(
            page_index,
            PageEntry {
                window: PageWindow::loading(page_index, touch),
                ticket,
                inflight: Some(load.clone()),
            },
        );
        if let Ok(runtime) = tokio::runtime::Handle::try_current() {
            runtime.spawn(load.clone());
        }
        load
    }

    /// Mark loaded pages in `pages` as just used.
    fn touch_pages(&self, pages: RangeInclusive<usize>) {
        let mut table = self.table.lock();
        for page_index in pages {
            let touch = table.next_touch();
            if let Some(entry) = table.pages.get_mut(&page_index) {
                if entry.window.is_loaded {
                    entry.window.touch(touch);
                }
            }
        }
    }

    /// Future that runs the loader once and records the outcome in the page table.
    ///
    /// Holds only a weak handle so a stuck load does not keep the collection alive.
    fn start_load(self: &Arc<Self>, page_index: usize, ticket: u64) -> PageLoad<T> {
        let weak: Weak<Self> = Arc::downgrade(self);
        let loader = Arc::clone(&self.loader);
        let page_size = self.config.page_size.max(1);
        let label = self.label.clone();

        async move {
            debug!(collection = %label, page_index, page_size, "Loading page");
            let result = loader.load_page(page_index, page_size).await;
            match weak.upgrade() {
                Some(inner) => inner.complete_load(page_index, ticket, result),
                None => result.ok().map(|page| Arc::new(page.items)),
            }
        }
        .boxed()
        .shared()
    }

    fn complete_load(
        &self,
        page_index: usize,
        ticket: u64,
        result: Result<PageData<T>, ApiError>,
    ) -> Option<Arc<Vec<T>>> {
        let mut table = self.table.lock();
        let current = table
            .pages
            .get(&page_index)
            .map(|entry| entry.ticket == ticket)
            .unwrap_or(false);

        match result {
            Ok(page) => {
                let items = Arc::new(page.items);
                if current {
                    table.total_count = Some(page.total);
                    if let Some(entry) = table.pages.get_mut(&page_index) {
                        entry.window.fill(Arc::clone(&items), page.total);
                        entry.inflight = None;
                    }
                    drop(table);
                    let _ = self.events.send(CollectionEvent::PageLoaded(page_index));
                } else {
                    debug!(
                        collection = %self.label,
                        page_index,
                        "Page invalidated while loading, result not cached"
                    );
                }
                Some(items)
            }
            Err(err) => {
                if current {
                    table.pages.remove(&page_index);
                }
                warn!(
                    collection = %self.label,
                    page_index,
                    transient = err.is_transient(),
                    error = %err,
                    "Page load failed"
                );
                None
            }
        }
    }

    /// Drop least-recently-touched loaded pages beyond `max_cached_pages`.
    ///
    /// Loading pages count toward the size but are never removed, so a collection whose
    /// loads never finish can stay above its configured size.
    fn evict(&self) {
        let max_cached = self.config.max_cached_pages.max(1);
        let mut table = self.table.lock();
        if table.pages.len() <= max_cached {
            return;
        }
        let excess = table.pages.len() - max_cached;

        let mut candidates: Vec<_> = table
            .pages
            .values()
            .filter(|e| e.window.is_loaded && !e.window.is_loading)
            .map(|e| (e.window.lru_key(), e.window.page_index))
            .collect();
        candidates.sort_unstable();

        let evicted: Vec<usize> = candidates
            .into_iter()
            .take(excess)
            .map(|(_, page_index)| page_index)
            .collect();
        for page_index in &evicted {
            table.pages.remove(page_index);
        }
        debug!(collection = %self.label, evicted = ?evicted, "Evicted pages");
    }
}
