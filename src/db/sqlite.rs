//! [`MemoryBackend`] implementation over SQLite.

use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, Row};

use super::{bytes_to_vector, vector_to_bytes};
use crate::memory::backend::MemoryBackend;
use crate::memory::types::{MemoryEntry, MemoryKind, UserPreferences};

/// SQLite-backed document store for memory entries and preferences.
///
/// Serializes all access through a `Mutex<Connection>`; the lock is only
/// held for the duration of a statement, never across external calls.
pub struct SqliteBackend {
    conn: Mutex<Connection>,
}

impl SqliteBackend {
    /// Open (or create) the database file at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            conn: Mutex::new(super::open_database(path)?),
        })
    }

    /// In-memory database, for tests and ephemeral deployments.
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            conn: Mutex::new(super::open_memory_database()?),
        })
    }

    /// Wrap an already-initialized connection.
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().expect("sqlite connection lock poisoned")
    }
}

/// Timestamps are stored as RFC 3339 with fixed microsecond precision so
/// that lexicographic order matches chronological order.
fn ts_to_sql(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn ts_from_sql(raw: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(raw)
        .with_context(|| format!("bad timestamp in store: {raw}"))?
        .with_timezone(&Utc))
}

const ENTRY_COLUMNS: &str = "id, user_id, content, kind, embedding, metadata, created_at";

fn bad_column(idx: usize, err: impl std::error::Error + Send + Sync + 'static) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(err))
}

fn row_to_entry(row: &Row<'_>) -> rusqlite::Result<MemoryEntry> {
    let kind: String = row.get(3)?;
    let embedding: Option<Vec<u8>> = row.get(4)?;
    let metadata_json: String = row.get(5)?;
    let metadata =
        serde_json::from_str(&metadata_json).map_err(|err| bad_column(5, err))?;
    let created_raw: String = row.get(6)?;
    let created_at = DateTime::parse_from_rfc3339(&created_raw)
        .map_err(|err| bad_column(6, err))?
        .with_timezone(&Utc);

    Ok(MemoryEntry {
        id: row.get(0)?,
        user_id: row.get(1)?,
        content: row.get(2)?,
        kind: MemoryKind::from(kind),
        embedding: embedding.map(|bytes| bytes_to_vector(&bytes)),
        metadata,
        created_at,
    })
}

fn collect_entries(
    conn: &Connection,
    sql: &str,
    params: &[&dyn rusqlite::ToSql],
) -> Result<Vec<MemoryEntry>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, row_to_entry)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

impl MemoryBackend for SqliteBackend {
    fn insert_entry(&self, entry: &MemoryEntry) -> Result<()> {
        let conn = self.lock();
        conn.execute(
            "INSERT INTO memory_entries (id, user_id, content, kind, embedding, metadata, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                entry.id,
                entry.user_id,
                entry.content,
                entry.kind.as_str(),
                entry.embedding.as_deref().map(vector_to_bytes),
                serde_json::to_string(&entry.metadata)?,
                ts_to_sql(entry.created_at),
            ],
        )
        .context("failed to insert memory entry")?;
        Ok(())
    }

    fn find_embedded(&self, user_id: &str, limit: usize) -> Result<Vec<MemoryEntry>> {
        let conn = self.lock();
        collect_entries(
            &conn,
            &format!(
                "SELECT {ENTRY_COLUMNS} FROM memory_entries \
                 WHERE user_id = ?1 AND embedding IS NOT NULL \
                 ORDER BY created_at ASC, id ASC LIMIT ?2"
            ),
            &[&user_id, &(limit as i64)],
        )
    }

    fn find_recent(
        &self,
        user_id: &str,
        kind: Option<&MemoryKind>,
        limit: usize,
    ) -> Result<Vec<MemoryEntry>> {
        let conn = self.lock();
        match kind {
            Some(kind) => collect_entries(
                &conn,
                &format!(
                    "SELECT {ENTRY_COLUMNS} FROM memory_entries \
                     WHERE user_id = ?1 AND kind = ?2 \
                     ORDER BY created_at DESC, id DESC LIMIT ?3"
                ),
                &[&user_id, &kind.as_str(), &(limit as i64)],
            ),
            None => collect_entries(
                &conn,
                &format!(
                    "SELECT {ENTRY_COLUMNS} FROM memory_entries \
                     WHERE user_id = ?1 \
                     ORDER BY created_at DESC, id DESC LIMIT ?2"
                ),
                &[&user_id, &(limit as i64)],
            ),
        }
    }

    fn find_consolidation_candidates(
        &self,
        user_id: &str,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<MemoryEntry>> {
        let conn = self.lock();
        collect_entries(
            &conn,
            &format!(
                "SELECT {ENTRY_COLUMNS} FROM memory_entries \
                 WHERE user_id = ?1 AND created_at < ?2 AND kind != 'summary' \
                 ORDER BY created_at ASC, id ASC"
            ),
            &[&user_id, &ts_to_sql(cutoff)],
        )
    }

    fn update_metadata(&self, id: &str, metadata: &serde_json::Value) -> Result<()> {
        let conn = self.lock();
        let rows = conn
            .execute(
                "UPDATE memory_entries SET metadata = ?1 WHERE id = ?2",
                params![serde_json::to_string(metadata)?, id],
            )
            .context("failed to update metadata")?;
        anyhow::ensure!(rows > 0, "no memory entry with id {id}");
        Ok(())
    }

    fn delete_entry(&self, user_id: &str, id: &str) -> Result<bool> {
        let conn = self.lock();
        let rows = conn
            .execute(
                "DELETE FROM memory_entries WHERE id = ?1 AND user_id = ?2",
                params![id, user_id],
            )
            .context("failed to delete memory entry")?;
        Ok(rows > 0)
    }

    fn delete_user(&self, user_id: &str) -> Result<usize> {
        let conn = self.lock();
        let rows = conn
            .execute(
                "DELETE FROM memory_entries WHERE user_id = ?1",
                params![user_id],
            )
            .context("failed to delete user entries")?;
        conn.execute(
            "DELETE FROM user_preferences WHERE user_id = ?1",
            params![user_id],
        )
        .context("failed to delete user preferences")?;
        Ok(rows)
    }

    fn load_preferences(&self, user_id: &str) -> Result<Option<UserPreferences>> {
        use rusqlite::OptionalExtension;

        let conn = self.lock();
        let row: Option<(String, String)> = conn
            .query_row(
                "SELECT preferences, updated_at FROM user_preferences WHERE user_id = ?1",
                params![user_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .context("failed to load preferences")?;

        row.map(|(preferences_json, updated_at)| {
            Ok(UserPreferences {
                user_id: user_id.to_string(),
                preferences: serde_json::from_str(&preferences_json)
                    .context("bad preferences JSON in store")?,
                updated_at: ts_from_sql(&updated_at)?,
            })
        })
        .transpose()
    }

    fn save_preferences(&self, prefs: &UserPreferences) -> Result<()> {
        let conn = self.lock();
        conn.execute(
            "INSERT INTO user_preferences (user_id, preferences, updated_at) \
             VALUES (?1, ?2, ?3) \
             ON CONFLICT(user_id) DO UPDATE SET \
                 preferences = excluded.preferences, \
                 updated_at = excluded.updated_at",
            params![
                prefs.user_id,
                serde_json::to_string(&prefs.preferences)?,
                ts_to_sql(prefs.updated_at),
            ],
        )
        .context("failed to save preferences")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    fn backend() -> SqliteBackend {
        SqliteBackend::open_in_memory().unwrap()
    }

    fn entry(user: &str, content: &str, kind: MemoryKind, embedded: bool) -> MemoryEntry {
        MemoryEntry {
            id: uuid::Uuid::now_v7().to_string(),
            user_id: user.to_string(),
            content: content.to_string(),
            kind,
            embedding: embedded.then(|| vec![0.25f32, -0.5, 1.0]),
            metadata: json!({"source": "test"}),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn insert_and_find_round_trip() {
        let backend = backend();
        let original = entry("u1", "remember me", MemoryKind::General, true);
        backend.insert_entry(&original).unwrap();

        let found = backend.find_embedded("u1", 10).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, original.id);
        assert_eq!(found[0].content, "remember me");
        assert_eq!(found[0].kind, MemoryKind::General);
        assert_eq!(found[0].embedding.as_deref(), Some(&[0.25f32, -0.5, 1.0][..]));
        assert_eq!(found[0].metadata, json!({"source": "test"}));
    }

    #[test]
    fn find_embedded_skips_null_embeddings_and_other_users() {
        let backend = backend();
        backend
            .insert_entry(&entry("u1", "embedded", MemoryKind::General, true))
            .unwrap();
        backend
            .insert_entry(&entry("u1", "bare", MemoryKind::General, false))
            .unwrap();
        backend
            .insert_entry(&entry("u2", "other user", MemoryKind::General, true))
            .unwrap();

        let found = backend.find_embedded("u1", 10).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].content, "embedded");
    }

    #[test]
    fn find_embedded_honors_limit() {
        let backend = backend();
        for i in 0..5 {
            backend
                .insert_entry(&entry("u1", &format!("m{i}"), MemoryKind::General, true))
                .unwrap();
        }
        assert_eq!(backend.find_embedded("u1", 3).unwrap().len(), 3);
    }

    #[test]
    fn find_recent_orders_newest_first_and_filters_kind() {
        let backend = backend();
        let mut old = entry("u1", "old general", MemoryKind::General, false);
        old.created_at = Utc::now() - Duration::hours(2);
        backend.insert_entry(&old).unwrap();
        backend
            .insert_entry(&entry("u1", "new preference", MemoryKind::Preference, false))
            .unwrap();
        backend
            .insert_entry(&entry("u1", "new general", MemoryKind::General, false))
            .unwrap();

        let all = backend.find_recent("u1", None, 10).unwrap();
        let contents: Vec<&str> = all.iter().map(|e| e.content.as_str()).collect();
        assert_eq!(contents, vec!["new preference", "new general", "old general"]);

        let general = backend
            .find_recent("u1", Some(&MemoryKind::General), 10)
            .unwrap();
        assert_eq!(general.len(), 2);
        assert!(general.iter().all(|e| e.kind == MemoryKind::General));
    }

    #[test]
    fn consolidation_candidates_exclude_summaries_and_fresh_entries() {
        let backend = backend();
        let cutoff = Utc::now() - Duration::days(7);

        let mut old_general = entry("u1", "old", MemoryKind::General, false);
        old_general.created_at = Utc::now() - Duration::days(10);
        backend.insert_entry(&old_general).unwrap();

        let mut old_summary = entry("u1", "old summary", MemoryKind::Summary, false);
        old_summary.created_at = Utc::now() - Duration::days(10);
        backend.insert_entry(&old_summary).unwrap();

        backend
            .insert_entry(&entry("u1", "fresh", MemoryKind::General, false))
            .unwrap();

        let candidates = backend.find_consolidation_candidates("u1", cutoff).unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].content, "old");
    }

    #[test]
    fn update_metadata_replaces_object() {
        let backend = backend();
        let e = entry("u1", "patch me", MemoryKind::General, false);
        backend.insert_entry(&e).unwrap();

        backend
            .update_metadata(&e.id, &json!({"archived": true}))
            .unwrap();
        let found = backend.find_recent("u1", None, 1).unwrap();
        assert_eq!(found[0].metadata, json!({"archived": true}));

        assert!(backend.update_metadata("missing", &json!({})).is_err());
    }

    #[test]
    fn delete_entry_checks_ownership() {
        let backend = backend();
        let e = entry("u1", "mine", MemoryKind::General, false);
        backend.insert_entry(&e).unwrap();

        assert!(!backend.delete_entry("u2", &e.id).unwrap());
        assert!(backend.delete_entry("u1", &e.id).unwrap());
        assert!(!backend.delete_entry("u1", &e.id).unwrap());
    }

    #[test]
    fn delete_user_removes_entries_and_preferences() {
        let backend = backend();
        backend
            .insert_entry(&entry("u1", "a", MemoryKind::General, false))
            .unwrap();
        backend
            .insert_entry(&entry("u1", "b", MemoryKind::General, false))
            .unwrap();
        let mut prefs = UserPreferences::new("u1");
        prefs.preferences.insert("likes".into(), vec!["tea".into()]);
        backend.save_preferences(&prefs).unwrap();

        assert_eq!(backend.delete_user("u1").unwrap(), 2);
        assert!(backend.find_recent("u1", None, 10).unwrap().is_empty());
        assert!(backend.load_preferences("u1").unwrap().is_none());
    }

    #[test]
    fn preferences_upsert_round_trip() {
        let backend = backend();
        assert!(backend.load_preferences("u1").unwrap().is_none());

        let mut prefs = UserPreferences::new("u1");
        prefs.preferences.insert("likes".into(), vec!["tea".into()]);
        backend.save_preferences(&prefs).unwrap();

        prefs
            .preferences
            .get_mut("likes")
            .unwrap()
            .push("coffee".into());
        backend.save_preferences(&prefs).unwrap();

        let loaded = backend.load_preferences("u1").unwrap().unwrap();
        assert_eq!(
            loaded.preferences["likes"],
            vec!["tea".to_string(), "coffee".to_string()]
        );
    }
}
