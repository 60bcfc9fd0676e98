//! In-process nearest-neighbor index over pseudo-embeddings.
//!
//! [`VectorIndex`] is a flat, append-only L2 index: one instance per user,
//! holding the [`IndexEntry`] projections of that user's embedded memory
//! entries and their vectors. There is no update or deletion — the index is
//! a cache rebuilt from storage via the [`registry`].

pub mod registry;

use serde::Serialize;

use crate::memory::types::IndexEntry;

/// A search candidate: an entry plus its distance to the query.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    /// The matched entry.
    #[serde(flatten)]
    pub entry: IndexEntry,
    /// Squared L2 distance to the query vector.
    pub distance: f32,
    /// `1 - distance / 2`, deliberately not clamped: extreme distances
    /// produce values outside `[0, 1]`. Clamping would change ranking
    /// behavior for existing consumers.
    pub similarity: f32,
}

/// Append-only flat L2 index for one user's memories.
///
/// Internal ids are assigned sequentially from 0 and never reused; the
/// entry at position `i` of `vectors` carries id `i`.
pub struct VectorIndex {
    dimension: usize,
    entries: Vec<IndexEntry>,
    vectors: Vec<Vec<f32>>,
}

impl VectorIndex {
    /// Create an empty index for vectors of `dimension` length.
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            entries: Vec::new(),
            vectors: Vec::new(),
        }
    }

    /// Number of indexed vectors.
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// The id the next added entry will receive.
    pub fn next_id(&self) -> usize {
        self.entries.len()
    }

    /// Expected vector dimensionality.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Append a batch of entries and their vectors.
    ///
    /// No-op when either side is empty or the lengths disagree — a
    /// mismatched batch is a caller bug, logged rather than applied.
    /// Each entry receives the next sequential internal id.
    pub fn add(&mut self, entries: Vec<IndexEntry>, vectors: Vec<Vec<f32>>) {
        if entries.is_empty() || vectors.is_empty() {
            return;
        }
        if entries.len() != vectors.len() {
            tracing::warn!(
                entries = entries.len(),
                vectors = vectors.len(),
                "mismatched index batch dropped"
            );
            return;
        }
        self.entries.extend(entries);
        self.vectors.extend(vectors);
    }

    /// Return up to `k` entries ordered by ascending squared L2 distance to
    /// `query`, ties broken by insertion order. Empty index yields an empty
    /// result; fewer than `k` vectors yields all of them.
    pub fn search(&self, query: &[f32], k: usize) -> Vec<SearchHit> {
        if self.vectors.is_empty() || k == 0 {
            return Vec::new();
        }

        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(id, v)| (id, squared_l2(query, v)))
            .collect();
        // Stable sort keeps insertion order on equal distances.
        scored.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);

        scored
            .into_iter()
            .map(|(id, distance)| SearchHit {
                entry: self.entries[id].clone(),
                distance,
                similarity: 1.0 - distance / 2.0,
            })
            .collect()
    }
}

/// Squared Euclidean distance over the shared prefix of two vectors.
fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    use crate::memory::types::MemoryKind;

    const DIM: usize = 8;

    fn entry(id: &str) -> IndexEntry {
        IndexEntry {
            id: id.to_string(),
            content: format!("content {id}"),
            kind: MemoryKind::General,
            metadata: json!({}),
            created_at: Utc::now(),
        }
    }

    fn spike(pos: usize, value: f32) -> Vec<f32> {
        let mut v = vec![0.0; DIM];
        v[pos] = value;
        v
    }

    #[test]
    fn empty_index_returns_nothing() {
        let index = VectorIndex::new(DIM);
        assert!(index.search(&spike(0, 1.0), 5).is_empty());
        assert!(index.search(&vec![0.0; DIM], 0).is_empty());
    }

    #[test]
    fn exact_match_has_distance_zero_similarity_one() {
        let mut index = VectorIndex::new(DIM);
        index.add(
            vec![entry("a"), entry("b")],
            vec![vec![0.0; DIM], spike(0, 10.0)],
        );

        let hits = index.search(&vec![0.0; DIM], 1);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].entry.id, "a");
        assert_eq!(hits[0].distance, 0.0);
        assert_eq!(hits[0].similarity, 1.0);
    }

    #[test]
    fn similarity_is_not_clamped() {
        let mut index = VectorIndex::new(DIM);
        index.add(vec![entry("far")], vec![spike(0, 10.0)]);

        let hits = index.search(&vec![0.0; DIM], 1);
        assert_eq!(hits[0].distance, 100.0);
        assert_eq!(hits[0].similarity, -49.0);
    }

    #[test]
    fn results_ordered_by_distance_then_insertion() {
        let mut index = VectorIndex::new(DIM);
        index.add(
            vec![entry("far"), entry("tie1"), entry("tie2"), entry("near")],
            vec![spike(0, 5.0), spike(1, 2.0), spike(2, 2.0), spike(0, 1.0)],
        );

        let hits = index.search(&vec![0.0; DIM], 4);
        let ids: Vec<&str> = hits.iter().map(|h| h.entry.id.as_str()).collect();
        assert_eq!(ids, vec!["near", "tie1", "tie2", "far"]);
    }

    #[test]
    fn fewer_than_k_returns_all() {
        let mut index = VectorIndex::new(DIM);
        index.add(vec![entry("a")], vec![spike(0, 1.0)]);
        assert_eq!(index.search(&vec![0.0; DIM], 10).len(), 1);
    }

    #[test]
    fn add_assigns_monotonic_ids_across_batches() {
        let mut index = VectorIndex::new(DIM);
        assert_eq!(index.next_id(), 0);

        index.add(vec![entry("a"), entry("b")], vec![spike(0, 1.0), spike(1, 1.0)]);
        assert_eq!(index.next_id(), 2);

        index.add(vec![entry("c")], vec![spike(2, 1.0)]);
        assert_eq!(index.next_id(), 3);

        // Both batches are searchable.
        let hits = index.search(&vec![0.0; DIM], 10);
        assert_eq!(hits.len(), 3);
    }

    #[test]
    fn add_ignores_empty_or_mismatched_batches() {
        let mut index = VectorIndex::new(DIM);
        index.add(vec![], vec![]);
        index.add(vec![entry("a")], vec![]);
        index.add(vec![entry("a"), entry("b")], vec![spike(0, 1.0)]);
        assert!(index.is_empty());
        assert_eq!(index.next_id(), 0);
    }
}
