//! coursetree: lazily materialized course hierarchy
//!
//! Builds a browsable tree (organizations, course families, courses, course content and
//! membership groups) over a remote course API. Content hierarchy is derived from materialized
//! paths, large sibling lists are paged through a cached virtual index space, and mutations
//! invalidate exactly the cached regions they touch.

pub mod config;
pub mod error;
pub mod expand_state;
pub mod hierarchy;
pub mod logging;
pub mod paging;
pub mod remote;
pub mod tooling;
pub mod tree;
pub mod types;

pub use error::ApiError;
pub use paging::{PagedCollection, PagedCollectionConfig};
pub use tree::{TreeNode, TreeProvider};
