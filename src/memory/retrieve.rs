//! Read path — vector search with a recency fallback.
//!
//! Semantic search over the pseudo-embeddings is sparse by construction,
//! so [`MemoryStore::retrieve`] always pads under-full results with the
//! most recent persisted entries. Vector matches come first, padding after,
//! and the result is truncated to exactly `limit`.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::store::MemoryStore;
use super::types::MemoryKind;
use crate::error::{EngramError, Result};
use crate::index::SearchHit;

/// A single retrieval result.
///
/// `distance`/`similarity` are present for vector matches; padding entries
/// carry `recent: true` instead.
#[derive(Debug, Clone, Serialize)]
pub struct RetrievedMemory {
    pub id: String,
    pub content: String,
    #[serde(rename = "type")]
    pub kind: MemoryKind,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity: Option<f32>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub recent: bool,
}

impl From<SearchHit> for RetrievedMemory {
    fn from(hit: SearchHit) -> Self {
        Self {
            id: hit.entry.id,
            content: hit.entry.content,
            kind: hit.entry.kind,
            metadata: hit.entry.metadata,
            created_at: hit.entry.created_at,
            distance: Some(hit.distance),
            similarity: Some(hit.similarity),
            recent: false,
        }
    }
}

impl MemoryStore {
    /// Retrieve up to `limit` memories relevant to `query`.
    ///
    /// An empty query returns an empty result immediately — no fallback.
    /// Otherwise the query is embedded, the user's index searched for
    /// `limit` candidates, the optional `kind` filter applied post-hoc,
    /// and any shortfall padded with the most recent persisted entries
    /// (skipping ids already matched).
    pub fn retrieve(
        &self,
        user_id: &str,
        query: &str,
        kind: Option<&MemoryKind>,
        limit: usize,
    ) -> Result<Vec<RetrievedMemory>> {
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let query_vector = self.embed_or_zero(query);

        let index = self
            .registry()
            .get_or_create(user_id, self.backend())
            .map_err(EngramError::persistence)?;
        let hits = {
            let index = index.lock().expect("index lock poisoned");
            index.search(&query_vector, limit)
        };

        let mut results: Vec<RetrievedMemory> = hits
            .into_iter()
            .filter(|hit| kind.map_or(true, |k| hit.entry.kind == *k))
            .map(RetrievedMemory::from)
            .collect();

        if results.len() < limit {
            let recents = self
                .backend()
                .find_recent(user_id, kind, limit)
                .map_err(EngramError::persistence)?;
            for entry in recents {
                if results.iter().any(|r| r.id == entry.id) {
                    continue;
                }
                results.push(RetrievedMemory {
                    id: entry.id,
                    content: entry.content,
                    kind: entry.kind,
                    metadata: entry.metadata,
                    created_at: entry.created_at,
                    distance: None,
                    similarity: None,
                    recent: true,
                });
            }
        }

        results.truncate(limit);
        Ok(results)
    }

    /// [`retrieve`](Self::retrieve) with the configured default limit.
    pub fn retrieve_default(
        &self,
        user_id: &str,
        query: &str,
        kind: Option<&MemoryKind>,
    ) -> Result<Vec<RetrievedMemory>> {
        self.retrieve(user_id, query, kind, self.config().retrieval.default_limit)
    }
}
