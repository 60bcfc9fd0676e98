//! Core memory type definitions.
//!
//! Defines [`MemoryKind`] (the well-known entry tags plus custom ones),
//! [`MemoryEntry`] (a persisted record), [`IndexEntry`] (its in-memory
//! projection inside a vector index), and [`UserPreferences`].

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Tag classifying a memory entry.
///
/// The four well-known kinds cover the write paths inside this crate;
/// anything else round-trips through [`MemoryKind::Custom`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MemoryKind {
    /// Free-form memory, the default for `store`.
    General,
    /// A conversation snippet captured from a chat turn.
    Conversation,
    /// A preference statement produced by the extractor.
    Preference,
    /// A consolidation summary; never re-consolidated.
    Summary,
    /// Caller-defined tag.
    Custom(String),
}

impl MemoryKind {
    /// Storage-compatible string representation.
    pub fn as_str(&self) -> &str {
        match self {
            Self::General => "general",
            Self::Conversation => "conversation",
            Self::Preference => "preference",
            Self::Summary => "summary",
            Self::Custom(tag) => tag,
        }
    }
}

impl Default for MemoryKind {
    fn default() -> Self {
        Self::General
    }
}

impl std::fmt::Display for MemoryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for MemoryKind {
    fn from(s: String) -> Self {
        match s.as_str() {
            "general" => Self::General,
            "conversation" => Self::Conversation,
            "preference" => Self::Preference,
            "summary" => Self::Summary,
            _ => Self::Custom(s),
        }
    }
}

impl From<&str> for MemoryKind {
    fn from(s: &str) -> Self {
        Self::from(s.to_string())
    }
}

impl From<MemoryKind> for String {
    fn from(kind: MemoryKind) -> Self {
        kind.as_str().to_string()
    }
}

/// A persisted memory record, matching the `memory_entries` table schema.
///
/// Immutable after insertion except for `metadata` patches (e.g. the
/// consolidator marking `archived`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryEntry {
    /// UUID v7 (time-sortable) primary key.
    pub id: String,
    /// Owning user.
    pub user_id: String,
    /// Full text content.
    pub content: String,
    /// Entry tag.
    #[serde(rename = "type")]
    pub kind: MemoryKind,
    /// Pseudo-embedding of `content`, or `None` for entries stored without one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
    /// Open key/value mapping (always a JSON object).
    pub metadata: serde_json::Value,
    /// UTC creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl MemoryEntry {
    /// Project this record into its in-memory index form (drops the vector).
    pub fn to_index_entry(&self) -> IndexEntry {
        IndexEntry {
            id: self.id.clone(),
            content: self.content.clone(),
            kind: self.kind.clone(),
            metadata: self.metadata.clone(),
            created_at: self.created_at,
        }
    }
}

/// Transient projection of a [`MemoryEntry`] held inside a vector index.
///
/// Derived, never persisted; rebuilt from storage on demand.
#[derive(Debug, Clone, Serialize)]
pub struct IndexEntry {
    pub id: String,
    pub content: String,
    #[serde(rename = "type")]
    pub kind: MemoryKind,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Per-user preference record, one per user.
///
/// `preferences` maps a category name to an ordered list of distinct
/// values. Extraction passes merge into it by category-wise union, so a
/// repeated pass is a no-op.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPreferences {
    pub user_id: String,
    pub preferences: BTreeMap<String, Vec<String>>,
    pub updated_at: DateTime<Utc>,
}

impl UserPreferences {
    /// Fresh record with no categories.
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            preferences: BTreeMap::new(),
            updated_at: Utc::now(),
        }
    }

    /// Union `extracted` into this record, preserving existing order and
    /// appending only values not already present in each category.
    pub fn merge(&mut self, extracted: &BTreeMap<String, Vec<String>>) {
        for (category, values) in extracted {
            let list = self.preferences.entry(category.clone()).or_default();
            for value in values {
                if !list.contains(value) {
                    list.push(value.clone());
                }
            }
        }
        self.updated_at = Utc::now();
    }
}
