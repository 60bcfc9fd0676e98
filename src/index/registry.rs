//! Per-user index cache.
//!
//! [`IndexRegistry`] lazily materializes one [`VectorIndex`] per user from
//! the persisted store and keeps it for the lifetime of the process (or
//! until evicted/invalidated). It is an explicit, injectable object rather
//! than process-global state: [`crate::memory::MemoryStore`] owns one.
//!
//! The map lock is never held across backend I/O. Two requests racing on a
//! user's first access may both rebuild the index; the last writer wins,
//! which duplicates work but never corrupts — the index is a cache.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::Result;

use super::VectorIndex;
use crate::memory::backend::MemoryBackend;

struct Slot {
    index: Arc<Mutex<VectorIndex>>,
    last_used: u64,
}

struct Inner {
    slots: HashMap<String, Slot>,
    tick: u64,
}

/// Cache of per-user vector indices with an optional LRU user-count bound.
pub struct IndexRegistry {
    dimension: usize,
    load_limit: usize,
    max_users: Option<usize>,
    inner: Mutex<Inner>,
}

impl IndexRegistry {
    /// `load_limit` caps how many persisted embedded entries seed a fresh
    /// index; `max_users` bounds the cache by user count (`None` = unbounded).
    pub fn new(dimension: usize, load_limit: usize, max_users: Option<usize>) -> Self {
        Self {
            dimension,
            load_limit,
            max_users,
            inner: Mutex::new(Inner {
                slots: HashMap::new(),
                tick: 0,
            }),
        }
    }

    /// Return the cached index for `user_id`, or build one from storage.
    ///
    /// A cached index is returned unchanged — no re-sync with storage.
    /// Otherwise up to `load_limit` entries with a non-null embedding are
    /// fetched and bulk-added (entries without embeddings are skipped).
    pub fn get_or_create(
        &self,
        user_id: &str,
        backend: &dyn MemoryBackend,
    ) -> Result<Arc<Mutex<VectorIndex>>> {
        if let Some(index) = self.lookup(user_id) {
            return Ok(index);
        }

        // Build outside the map lock; racing builders are acceptable.
        let entries = backend.find_embedded(user_id, self.load_limit)?;
        let mut index = VectorIndex::new(self.dimension);

        let mut projections = Vec::with_capacity(entries.len());
        let mut vectors = Vec::with_capacity(entries.len());
        for entry in &entries {
            if let Some(embedding) = &entry.embedding {
                projections.push(entry.to_index_entry());
                vectors.push(embedding.clone());
            }
        }
        let loaded = projections.len();
        index.add(projections, vectors);

        tracing::debug!(user_id, loaded, "vector index built from storage");
        Ok(self.install(user_id, index))
    }

    fn lookup(&self, user_id: &str) -> Option<Arc<Mutex<VectorIndex>>> {
        let mut inner = self.inner.lock().expect("registry lock poisoned");
        inner.tick += 1;
        let tick = inner.tick;
        inner.slots.get_mut(user_id).map(|slot| {
            slot.last_used = tick;
            Arc::clone(&slot.index)
        })
    }

    /// Insert a freshly built index, overwriting any racing insert.
    fn install(&self, user_id: &str, index: VectorIndex) -> Arc<Mutex<VectorIndex>> {
        let index = Arc::new(Mutex::new(index));
        let mut inner = self.inner.lock().expect("registry lock poisoned");
        inner.tick += 1;
        let tick = inner.tick;

        if let Some(cap) = self.max_users {
            if !inner.slots.contains_key(user_id) && inner.slots.len() >= cap {
                evict_least_recent(&mut inner.slots);
            }
        }

        inner.slots.insert(
            user_id.to_string(),
            Slot {
                index: Arc::clone(&index),
                last_used: tick,
            },
        );
        index
    }

    /// Drop the cached index for `user_id`. No-op if absent; the next
    /// `get_or_create` rebuilds from storage.
    pub fn invalidate(&self, user_id: &str) {
        let mut inner = self.inner.lock().expect("registry lock poisoned");
        if inner.slots.remove(user_id).is_some() {
            tracing::info!(user_id, "vector index invalidated");
        }
    }

    /// Drop every cached index.
    pub fn clear(&self) {
        let mut inner = self.inner.lock().expect("registry lock poisoned");
        inner.slots.clear();
    }

    /// Number of users with a cached index.
    pub fn len(&self) -> usize {
        self.inner.lock().expect("registry lock poisoned").slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `user_id` currently has a cached index (does not touch LRU order).
    pub fn contains(&self, user_id: &str) -> bool {
        self.inner
            .lock()
            .expect("registry lock poisoned")
            .slots
            .contains_key(user_id)
    }
}

fn evict_least_recent(slots: &mut HashMap<String, Slot>) {
    let victim = slots
        .iter()
        .min_by_key(|(_, slot)| slot.last_used)
        .map(|(user, _)| user.clone());
    if let Some(user) = victim {
        slots.remove(&user);
        tracing::debug!(user_id = %user, "evicted least-recently-used vector index");
    }
}
