//! Configuration checks.

use super::TreeConfig;

/// Outcome of validating a configuration.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub checks: Vec<(String, bool)>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_check(&mut self, description: &str, passed: bool) {
        self.checks.push((description.to_string(), passed));
    }

    pub fn add_error(&mut self, error: String) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: String) {
        self.warnings.push(warning);
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn total_checks(&self) -> usize {
        self.checks.len()
    }

    pub fn passed_checks(&self) -> usize {
        self.checks.iter().filter(|(_, passed)| *passed).count()
    }

    fn require(&mut self, description: &str, passed: bool, error: impl FnOnce() -> String) {
        self.add_check(description, passed);
        if !passed {
            self.add_error(error());
        }
    }
}

pub fn validate_tree_config(config: &TreeConfig) -> ValidationResult {
    let mut result = ValidationResult::new();
    let paging = &config.paging;

    result.require("paging.page_size > 0", paging.page_size > 0, || {
        "paging.page_size must be greater than 0".to_string()
    });
    result.require(
        "paging.max_cached_pages >= 1",
        paging.max_cached_pages >= 1,
        || "paging.max_cached_pages must be at least 1".to_string(),
    );
    result.require(
        "paging.inflight_wait_timeout_ms > 0",
        paging.inflight_wait_timeout_ms > 0,
        || "paging.inflight_wait_timeout_ms must be greater than 0".to_string(),
    );
    result.require(
        "materializer.eager_threshold > 0",
        config.materializer.eager_threshold > 0,
        || "materializer.eager_threshold must be greater than 0".to_string(),
    );
    result.require(
        "api.base_url is set",
        !config.api.base_url.trim().is_empty(),
        || "api.base_url must not be empty".to_string(),
    );

    // One requested page plus prefetch on both sides must fit, or pages thrash.
    let window_pages = if paging.prefetch_enabled {
        1 + paging.preload_pages * 2
    } else {
        1
    };
    let fits = paging.max_cached_pages >= window_pages;
    result.add_check("paging cache holds one prefetched window", fits);
    if !fits {
        result.add_warning(format!(
            "paging.max_cached_pages ({}) is below the {} pages touched by one prefetched request; pages will be evicted and refetched",
            paging.max_cached_pages, window_pages
        ));
    }

    result
}
