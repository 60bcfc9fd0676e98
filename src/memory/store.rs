//! Write path — embedding, persistence, and index append.
//!
//! [`MemoryStore::store`] is a deliberate dual-write: the entry is
//! persisted first, then appended to the user's cached vector index. The
//! two steps are not transactional; if the index append fails after the
//! persisted write succeeded, the inconsistency is logged and accepted
//! (the index is a cache and rebuilds from storage on invalidation).

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tracing::{error, info};

use super::backend::MemoryBackend;
use super::types::{MemoryEntry, MemoryKind};
use crate::config::EngramConfig;
use crate::embedding::EmbeddingProvider;
use crate::error::{EngramError, Result};
use crate::index::registry::IndexRegistry;

/// The memory subsystem's single entry point.
///
/// Owns the persistence backend, the embedding provider, and the per-user
/// index registry. `Send + Sync`; one instance serves the whole process.
pub struct MemoryStore {
    backend: Arc<dyn MemoryBackend>,
    embedder: Arc<dyn EmbeddingProvider>,
    registry: IndexRegistry,
    config: EngramConfig,
}

impl MemoryStore {
    pub fn new(
        backend: Arc<dyn MemoryBackend>,
        embedder: Arc<dyn EmbeddingProvider>,
        config: EngramConfig,
    ) -> Self {
        let registry = IndexRegistry::new(
            embedder.dimensions(),
            config.retrieval.index_load_limit,
            config.registry.max_users,
        );
        Self {
            backend,
            embedder,
            registry,
            config,
        }
    }

    /// The index registry. Hosts invalidate through this when persisted
    /// data changes outside the store (e.g. bulk imports).
    pub fn registry(&self) -> &IndexRegistry {
        &self.registry
    }

    pub(crate) fn backend(&self) -> &dyn MemoryBackend {
        self.backend.as_ref()
    }

    pub(crate) fn config(&self) -> &EngramConfig {
        &self.config
    }

    /// Embed `text`, falling back to a zero vector on provider failure.
    /// Embedding generation never aborts the calling operation.
    pub(crate) fn embed_or_zero(&self, text: &str) -> Vec<f32> {
        match self.embedder.embed(text) {
            Ok(vector) => vector,
            Err(err) => {
                error!(error = %err, "embedding generation failed, using zero vector");
                vec![0.0; self.embedder.dimensions()]
            }
        }
    }

    /// Store a memory entry: embed, persist, then append to the cached
    /// vector index (creating it via the registry if absent).
    ///
    /// Fails with [`EngramError::InvalidInput`] on empty content and
    /// [`EngramError::Persistence`] if the persisted write fails. A failed
    /// index append after a successful persist is logged, not raised.
    pub fn store(
        &self,
        user_id: &str,
        content: &str,
        kind: MemoryKind,
        metadata: serde_json::Value,
    ) -> Result<MemoryEntry> {
        if content.is_empty() {
            return Err(EngramError::InvalidInput(
                "content cannot be empty".into(),
            ));
        }

        let embedding = self.embed_or_zero(content);

        // Materialize the user's index before the persisted write: a load
        // after the insert would already contain the new entry, and the
        // append below would double-count it.
        let index = match self.registry.get_or_create(user_id, self.backend.as_ref()) {
            Ok(index) => Some(index),
            Err(err) => {
                error!(user_id, error = %err, "index unavailable, entry will be persisted only");
                None
            }
        };

        let entry = MemoryEntry {
            id: uuid::Uuid::now_v7().to_string(),
            user_id: user_id.to_string(),
            content: content.to_string(),
            kind,
            embedding: Some(embedding.clone()),
            metadata,
            created_at: Utc::now(),
        };

        self.backend
            .insert_entry(&entry)
            .map_err(EngramError::persistence)?;

        // Secondary write: best-effort, no rollback of the persisted entry.
        // If the index failed to load above, the entry is only persisted;
        // the next successful index load picks it up from storage.
        if let Some(index) = index {
            let mut index = index.lock().expect("index lock poisoned");
            index.add(vec![entry.to_index_entry()], vec![embedding]);
        }

        Ok(entry)
    }

    /// A user's most recent entries, newest first, optionally one kind.
    pub fn recent(
        &self,
        user_id: &str,
        kind: Option<&MemoryKind>,
        limit: usize,
    ) -> Result<Vec<MemoryEntry>> {
        self.backend
            .find_recent(user_id, kind, limit)
            .map_err(EngramError::persistence)
    }

    /// Delete one entry owned by `user_id`. Returns whether a row was
    /// removed. The user's cached index is invalidated so the next access
    /// rebuilds without the deleted entry (the index itself is append-only).
    pub fn delete(&self, user_id: &str, memory_id: &str) -> Result<bool> {
        let deleted = self
            .backend
            .delete_entry(user_id, memory_id)
            .map_err(EngramError::persistence)?;
        if deleted {
            self.registry.invalidate(user_id);
        }
        Ok(deleted)
    }

    /// Delete all of a user's entries and preferences, and drop their
    /// cached index. Returns the number of entries removed.
    pub fn forget_user(&self, user_id: &str) -> Result<usize> {
        let removed = self
            .backend
            .delete_user(user_id)
            .map_err(EngramError::persistence)?;
        self.registry.invalidate(user_id);
        info!(user_id, removed, "user memories forgotten");
        Ok(removed)
    }

    /// The user's stored preference mapping. A missing record or a read
    /// failure yields an empty mapping; read failures are logged.
    pub fn preferences(&self, user_id: &str) -> BTreeMap<String, Vec<String>> {
        match self.backend.load_preferences(user_id) {
            Ok(Some(prefs)) => prefs.preferences,
            Ok(None) => BTreeMap::new(),
            Err(err) => {
                error!(user_id, error = %err, "failed to load preferences");
                BTreeMap::new()
            }
        }
    }

    /// Patch one metadata key on a persisted entry, preserving the rest.
    pub(crate) fn patch_metadata(
        &self,
        entry: &MemoryEntry,
        key: &str,
        value: serde_json::Value,
    ) -> anyhow::Result<()> {
        let mut metadata = entry.metadata.clone();
        if !metadata.is_object() {
            metadata = json!({});
        }
        metadata
            .as_object_mut()
            .expect("metadata is an object")
            .insert(key.to_string(), value);
        self.backend.update_metadata(&entry.id, &metadata)
    }
}
