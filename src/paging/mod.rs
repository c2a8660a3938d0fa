//! Virtualized paging
//!
//! A `PagedCollection` presents a contiguous index space over data fetched page by page,
//! caching pages, sharing in-flight loads, prefetching neighbours and evicting by LRU.

pub mod collection;
pub mod window;

pub use collection::{PageLoader, PagedCollection};
pub use window::{CollectionEvent, CollectionState, PageData, PageWindow, PagedCollectionConfig};
