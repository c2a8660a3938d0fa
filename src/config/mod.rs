//! Configuration
//!
//! `TreeConfig` is assembled from defaults, the global file, the workspace file and
//! `COURSETREE__*` environment variables (see `merge::service`).

pub mod facade;
pub mod merge;
pub mod paths;
pub mod sources;
pub mod validation;

use crate::logging::LoggingConfig;
use crate::paging::PagedCollectionConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub use facade::ConfigLoader;
pub use paths::xdg_root as xdg;
pub use validation::ValidationResult;

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

/// Course API connection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_page_size() -> usize {
    50
}

fn default_preload_pages() -> usize {
    1
}

fn default_max_cached_pages() -> usize {
    10
}

fn default_true() -> bool {
    true
}

fn default_inflight_wait_timeout_ms() -> u64 {
    5000
}

/// Paging settings shared by every collection the tree creates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PagingConfig {
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    #[serde(default = "default_preload_pages")]
    pub preload_pages: usize,

    #[serde(default = "default_max_cached_pages")]
    pub max_cached_pages: usize,

    #[serde(default = "default_true")]
    pub prefetch_enabled: bool,

    #[serde(default = "default_inflight_wait_timeout_ms")]
    pub inflight_wait_timeout_ms: u64,
}

impl Default for PagingConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            preload_pages: default_preload_pages(),
            max_cached_pages: default_max_cached_pages(),
            prefetch_enabled: default_true(),
            inflight_wait_timeout_ms: default_inflight_wait_timeout_ms(),
        }
    }
}

impl PagingConfig {
    pub fn collection_config(&self) -> PagedCollectionConfig {
        PagedCollectionConfig {
            page_size: self.page_size,
            preload_pages: self.preload_pages,
            max_cached_pages: self.max_cached_pages,
            prefetch_enabled: self.prefetch_enabled,
            inflight_wait_timeout: Duration::from_millis(self.inflight_wait_timeout_ms),
        }
    }
}

fn default_eager_threshold() -> usize {
    100
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterializerConfig {
    /// Sibling counts up to this are materialized eagerly; above it they are paged
    #[serde(default = "default_eager_threshold")]
    pub eager_threshold: usize,
}

impl Default for MaterializerConfig {
    fn default() -> Self {
        Self {
            eager_threshold: default_eager_threshold(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpandStateConfig {
    /// JSON file holding expand/collapse flags; None means the XDG data default
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl ExpandStateConfig {
    pub fn resolve_file(&self) -> Result<PathBuf, crate::error::ApiError> {
        match &self.file {
            Some(path) => Ok(path.clone()),
            None => xdg::expand_state_file(),
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TreeConfig {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub paging: PagingConfig,

    #[serde(default)]
    pub materializer: MaterializerConfig,

    #[serde(default)]
    pub expand_state: ExpandStateConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl TreeConfig {
    pub fn validate(&self) -> ValidationResult {
        validation::validate_tree_config(self)
    }
}
