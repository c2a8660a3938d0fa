//! Expand/collapse state
//!
//! The persisted store is read once when the tree starts. After that `ExpandStateMirror` is the
//! source of truth for rendering, and writes go through to the store without re-reading it.

pub mod file;

use crate::error::ApiError;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

pub use file::JsonFileExpandStateStore;

/// Key-value store for per-node expand flags, keyed `"<kindPrefix>-<nodeId>"`.
#[async_trait]
pub trait ExpandStateStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<bool>, ApiError>;
    async fn set(&self, key: &str, expanded: bool) -> Result<(), ApiError>;
    async fn get_all(&self) -> Result<HashMap<String, bool>, ApiError>;
}

/// Non-persistent store.
#[derive(Debug, Default)]
pub struct MemoryExpandStateStore {
    entries: RwLock<HashMap<String, bool>>,
}

impl MemoryExpandStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, bool)>,
        K: Into<String>,
    {
        Self {
            entries: RwLock::new(entries.into_iter().map(|(k, v)| (k.into(), v)).collect()),
        }
    }
}

#[async_trait]
impl ExpandStateStore for MemoryExpandStateStore {
    async fn get(&self, key: &str) -> Result<Option<bool>, ApiError> {
        Ok(self.entries.read().get(key).copied())
    }

    async fn set(&self, key: &str, expanded: bool) -> Result<(), ApiError> {
        self.entries.write().insert(key.to_string(), expanded);
        Ok(())
    }

    async fn get_all(&self) -> Result<HashMap<String, bool>, ApiError> {
        Ok(self.entries.read().clone())
    }
}

/// In-memory copy of the expand state.
pub struct ExpandStateMirror {
    store: Arc<dyn ExpandStateStore>,
    state: RwLock<HashMap<String, bool>>,
}

impl ExpandStateMirror {
    /// Read the whole store once. A failing store yields an empty (all collapsed) mirror.
    pub async fn load(store: Arc<dyn ExpandStateStore>) -> Self {
        let state = match store.get_all().await {
            Ok(state) => {
                debug!(entries = state.len(), "Loaded expand state");
                state
            }
            Err(e) => {
                warn!(error = %e, "Failed to load expand state; starting collapsed");
                HashMap::new()
            }
        };
        Self {
            store,
            state: RwLock::new(state),
        }
    }

    pub fn is_expanded(&self, key: &str) -> bool {
        self.state.read().get(key).copied().unwrap_or(false)
    }

    /// Update memory, then write through. A failed write leaves memory authoritative.
    pub async fn set_expanded(&self, key: &str, expanded: bool) {
        self.state.write().insert(key.to_string(), expanded);
        if let Err(e) = self.store.set(key, expanded).await {
            warn!(key, error = %e, "Failed to persist expand state");
        }
    }

    pub fn expanded_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .state
            .read()
            .iter()
            .filter(|(_, expanded)| **expanded)
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        keys
    }
}
