//! Bounded LRU of built viewer profiles

use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::Arc;

use super::InteractionProfile;

/// Process-wide, shared through `Arc`. Reads promote the entry; inserts at
/// capacity evict the least recently used one before returning.
pub struct PreferenceCache {
    entries: Mutex<LruCache<String, Arc<InteractionProfile>>>,
}

impl PreferenceCache {
    /// A zero capacity is raised to one
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn get(&self, viewer_id: &str) -> Option<Arc<InteractionProfile>> {
        self.entries.lock().get(viewer_id).cloned()
    }

    pub fn set(&self, viewer_id: impl Into<String>, profile: Arc<InteractionProfile>) {
        self.entries.lock().put(viewer_id.into(), profile);
    }

    pub fn contains(&self, viewer_id: &str) -> bool {
        self.entries.lock().contains(viewer_id)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.entries.lock().cap().get()
    }
}
