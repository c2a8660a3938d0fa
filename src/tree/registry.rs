//! Keyed map of the paged collections owned by one tree provider.

use crate::paging::{CollectionState, PagedCollection};
use crate::tree::node::TreeNode;
use crate::types::CacheKey;
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::debug;

struct RegistryEntry {
    collection: PagedCollection<TreeNode>,
    /// Course whose scoped invalidation drops this entry
    course_id: String,
}

#[derive(Default)]
pub struct CollectionRegistry {
    entries: RwLock<HashMap<CacheKey, RegistryEntry>>,
}

impl CollectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &CacheKey) -> Option<PagedCollection<TreeNode>> {
        self.entries
            .read()
            .get(key)
            .map(|entry| entry.collection.clone())
    }

    /// Return the collection under `key`, creating it with `create` if absent.
    pub fn get_or_insert_with<F>(
        &self,
        key: CacheKey,
        course_id: &str,
        create: F,
    ) -> PagedCollection<TreeNode>
    where
        F: FnOnce() -> PagedCollection<TreeNode>,
    {
        let mut entries = self.entries.write();
        entries
            .entry(key)
            .or_insert_with(|| RegistryEntry {
                collection: create(),
                course_id: course_id.to_string(),
            })
            .collection
            .clone()
    }

    /// Drop the collections owned by `course_id`. With `membership_only`, only group and
    /// member collections go. Returns the number dropped.
    pub fn invalidate_course(&self, course_id: &str, membership_only: bool) -> usize {
        let removed: Vec<(CacheKey, RegistryEntry)> = {
            let mut entries = self.entries.write();
            let keys: Vec<CacheKey> = entries
                .iter()
                .filter(|(key, entry)| {
                    entry.course_id == course_id && (!membership_only || key.kind.is_membership())
                })
                .map(|(key, _)| key.clone())
                .collect();
            keys.into_iter()
                .filter_map(|key| entries.remove(&key).map(|entry| (key, entry)))
                .collect()
        };
        for (key, entry) in &removed {
            debug!(cache_key = %key, course_id, "Dropping cached collection");
            // Outstanding handles (e.g. a load-more in progress) must not keep serving old pages.
            entry.collection.reset();
        }
        removed.len()
    }

    /// Drop every collection. Returns the number dropped.
    pub fn clear(&self) -> usize {
        let drained: Vec<RegistryEntry> = self.entries.write().drain().map(|(_, e)| e).collect();
        for entry in &drained {
            entry.collection.reset();
        }
        drained.len()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Diagnostic snapshot, sorted by key.
    pub fn states(&self) -> Vec<(CacheKey, CollectionState)> {
        let mut states: Vec<(CacheKey, CollectionState)> = self
            .entries
            .read()
            .iter()
            .map(|(key, entry)| (key.clone(), entry.collection.get_state()))
            .collect();
        states.sort_by(|a, b| a.0.cmp(&b.0));
        states
    }
}
