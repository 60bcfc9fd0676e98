//! Contract the memory subsystem needs from the persisted document store.
//!
//! Everything here is keyed by `user_id`, `kind`, and `created_at`. The
//! bundled implementation is [`crate::db::SqliteBackend`]; hosts with a
//! different document store implement this trait instead.

use anyhow::Result;
use chrono::{DateTime, Utc};

use super::types::{MemoryEntry, MemoryKind, UserPreferences};

/// Persistence operations over [`MemoryEntry`] and [`UserPreferences`].
///
/// All methods are synchronous; async hosts wrap calls in
/// `tokio::task::spawn_blocking`. Errors are `anyhow` — the public API in
/// [`crate::memory::MemoryStore`] decides which failures surface and which
/// are logged and swallowed.
pub trait MemoryBackend: Send + Sync {
    /// Insert a new memory entry.
    fn insert_entry(&self, entry: &MemoryEntry) -> Result<()>;

    /// Up to `limit` of a user's entries that carry an embedding, oldest
    /// first. Seeds a freshly built vector index.
    fn find_embedded(&self, user_id: &str, limit: usize) -> Result<Vec<MemoryEntry>>;

    /// Up to `limit` of a user's entries ordered by descending creation
    /// time, optionally restricted to one kind.
    fn find_recent(
        &self,
        user_id: &str,
        kind: Option<&MemoryKind>,
        limit: usize,
    ) -> Result<Vec<MemoryEntry>>;

    /// All of a user's entries created before `cutoff`, excluding
    /// summaries. Feeds the consolidator.
    fn find_consolidation_candidates(
        &self,
        user_id: &str,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<MemoryEntry>>;

    /// Replace the metadata object of one entry.
    fn update_metadata(&self, id: &str, metadata: &serde_json::Value) -> Result<()>;

    /// Delete one entry if it exists and belongs to `user_id`. Returns
    /// whether a row was removed.
    fn delete_entry(&self, user_id: &str, id: &str) -> Result<bool>;

    /// Delete all of a user's entries and their preference record.
    /// Returns the number of entries removed.
    fn delete_user(&self, user_id: &str) -> Result<usize>;

    /// Load the user's preference record, if any.
    fn load_preferences(&self, user_id: &str) -> Result<Option<UserPreferences>>;

    /// Insert or replace the user's preference record.
    fn save_preferences(&self, prefs: &UserPreferences) -> Result<()>;
}
