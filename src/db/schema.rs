//! SQL DDL for the engram tables.
//!
//! Defines `memory_entries` and `user_preferences`. All DDL uses
//! `IF NOT EXISTS` for idempotent initialization. Embeddings are stored as
//! little-endian f32 BLOBs; timestamps as RFC 3339 TEXT (which also sorts
//! chronologically).

use rusqlite::Connection;

const SCHEMA_SQL: &str = r#"
-- Persisted memory records, one row per store() call
CREATE TABLE IF NOT EXISTS memory_entries (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    content TEXT NOT NULL,
    kind TEXT NOT NULL DEFAULT 'general',
    embedding BLOB,
    metadata TEXT NOT NULL DEFAULT '{}',
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_entries_user ON memory_entries(user_id);
CREATE INDEX IF NOT EXISTS idx_entries_user_kind ON memory_entries(user_id, kind);
CREATE INDEX IF NOT EXISTS idx_entries_user_created ON memory_entries(user_id, created_at);

-- One preference record per user
CREATE TABLE IF NOT EXISTS user_preferences (
    user_id TEXT PRIMARY KEY,
    preferences TEXT NOT NULL DEFAULT '{}',
    updated_at TEXT NOT NULL
);
"#;

/// Initialize all schema tables. Idempotent (uses IF NOT EXISTS).
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)
}
