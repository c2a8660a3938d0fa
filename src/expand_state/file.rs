//! JSON file backed expand-state store.

use super::ExpandStateStore;
use crate::error::ApiError;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

/// Persists a flat JSON object `{ "<key>": bool }`; the file is created on first write.
pub struct JsonFileExpandStateStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process.
    lock: Mutex<()>,
}

impl JsonFileExpandStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> Result<BTreeMap<String, bool>, ApiError> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = std::fs::read_to_string(&self.path).map_err(|e| {
            ApiError::StorageError(format!(
                "Failed to read expand state {}: {}",
                self.path.display(),
                e
            ))
        })?;
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&content).map_err(|e| {
            ApiError::StorageError(format!(
                "Failed to parse expand state {}: {}",
                self.path.display(),
                e
            ))
        })
    }

    fn write_map(&self, map: &BTreeMap<String, bool>) -> Result<(), ApiError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ApiError::StorageError(format!(
                    "Failed to create expand state directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }
        let content = serde_json::to_string_pretty(map)?;
        std::fs::write(&self.path, content).map_err(|e| {
            ApiError::StorageError(format!(
                "Failed to write expand state {}: {}",
                self.path.display(),
                e
            ))
        })
    }
}

#[async_trait]
impl ExpandStateStore for JsonFileExpandStateStore {
    async fn get(&self, key: &str) -> Result<Option<bool>, ApiError> {
        let _guard = self.lock.lock();
        Ok(self.read_map()?.get(key).copied())
    }

    async fn set(&self, key: &str, expanded: bool) -> Result<(), ApiError> {
        let _guard = self.lock.lock();
        let mut map = self.read_map()?;
        map.insert(key.to_string(), expanded);
        self.write_map(&map)
    }

    async fn get_all(&self) -> Result<HashMap<String, bool>, ApiError> {
        let _guard = self.lock.lock();
        Ok(self.read_map()?.into_iter().collect())
    }
}
