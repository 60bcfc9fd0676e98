#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use chrono::{Duration, Utc};
use engram::completion::{ChatMessage, Completion, CompletionProvider, TokenUsage};
use engram::config::EngramConfig;
use engram::db::SqliteBackend;
use engram::embedding::hash::HashEmbeddingProvider;
use engram::embedding::EmbeddingProvider;
use engram::memory::types::{MemoryEntry, MemoryKind};
use engram::memory::{MemoryBackend, MemoryStore};

/// A fresh store over an in-memory database with default config.
pub fn test_store() -> MemoryStore {
    test_store_with(EngramConfig::default()).0
}

/// Same, but returns the backend handle too for direct inserts/inspection.
pub fn test_store_with(config: EngramConfig) -> (MemoryStore, Arc<SqliteBackend>) {
    let backend = Arc::new(SqliteBackend::open_in_memory().unwrap());
    let embedder: Arc<dyn EmbeddingProvider> =
        Arc::new(HashEmbeddingProvider::new(config.embedding.dimension));
    let store = MemoryStore::new(backend.clone(), embedder, config);
    (store, backend)
}

/// A persisted entry built directly against the backend, bypassing the
/// store (used to control `created_at` and the presence of an embedding).
pub fn raw_entry(
    user_id: &str,
    content: &str,
    kind: MemoryKind,
    embedded: bool,
    days_ago: i64,
) -> MemoryEntry {
    let embedding = embedded.then(|| {
        HashEmbeddingProvider::new(engram::embedding::EMBEDDING_DIM)
            .embed(content)
            .unwrap()
    });
    MemoryEntry {
        id: uuid_like(),
        user_id: user_id.to_string(),
        content: content.to_string(),
        kind,
        embedding,
        metadata: serde_json::json!({}),
        created_at: Utc::now() - Duration::days(days_ago),
    }
}

fn uuid_like() -> String {
    uuid::Uuid::now_v7().to_string()
}

pub fn user_msg(content: &str) -> ChatMessage {
    ChatMessage::user(content)
}

/// Scripted completion provider for consolidation tests.
pub struct StubCompletion {
    reply: Option<String>,
    /// One joined prompt per call, for asserting what was summarized.
    pub calls: Mutex<Vec<String>>,
}

impl StubCompletion {
    /// Always answers with `reply`.
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: Some(reply.to_string()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Always fails.
    pub fn failing() -> Self {
        Self {
            reply: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl CompletionProvider for StubCompletion {
    fn complete(
        &self,
        _model: &str,
        messages: &[ChatMessage],
        _temperature: f32,
        _max_tokens: u32,
    ) -> anyhow::Result<Completion> {
        let prompt = messages
            .iter()
            .map(|m| format!("{}: {}", m.role, m.content))
            .collect::<Vec<_>>()
            .join("\n");
        self.calls.lock().unwrap().push(prompt);

        match &self.reply {
            Some(content) => Ok(Completion {
                content: content.clone(),
                usage: TokenUsage::default(),
            }),
            None => anyhow::bail!("summarization service unavailable"),
        }
    }
}

/// Backend wrapper whose reads can be switched off, for exercising the
/// persist-succeeds/index-append-fails path.
pub struct FlakyBackend {
    inner: Arc<SqliteBackend>,
    pub fail_reads: Mutex<bool>,
}

impl FlakyBackend {
    pub fn new(inner: Arc<SqliteBackend>) -> Self {
        Self {
            inner,
            fail_reads: Mutex::new(false),
        }
    }

    pub fn set_fail_reads(&self, fail: bool) {
        *self.fail_reads.lock().unwrap() = fail;
    }

    fn check_reads(&self) -> anyhow::Result<()> {
        if *self.fail_reads.lock().unwrap() {
            anyhow::bail!("injected read failure");
        }
        Ok(())
    }
}

impl MemoryBackend for FlakyBackend {
    fn insert_entry(&self, entry: &MemoryEntry) -> anyhow::Result<()> {
        self.inner.insert_entry(entry)
    }

    fn find_embedded(&self, user_id: &str, limit: usize) -> anyhow::Result<Vec<MemoryEntry>> {
        self.check_reads()?;
        self.inner.find_embedded(user_id, limit)
    }

    fn find_recent(
        &self,
        user_id: &str,
        kind: Option<&MemoryKind>,
        limit: usize,
    ) -> anyhow::Result<Vec<MemoryEntry>> {
        self.check_reads()?;
        self.inner.find_recent(user_id, kind, limit)
    }

    fn find_consolidation_candidates(
        &self,
        user_id: &str,
        cutoff: chrono::DateTime<Utc>,
    ) -> anyhow::Result<Vec<MemoryEntry>> {
        self.check_reads()?;
        self.inner.find_consolidation_candidates(user_id, cutoff)
    }

    fn update_metadata(&self, id: &str, metadata: &serde_json::Value) -> anyhow::Result<()> {
        self.inner.update_metadata(id, metadata)
    }

    fn delete_entry(&self, user_id: &str, id: &str) -> anyhow::Result<bool> {
        self.inner.delete_entry(user_id, id)
    }

    fn delete_user(&self, user_id: &str) -> anyhow::Result<usize> {
        self.inner.delete_user(user_id)
    }

    fn load_preferences(
        &self,
        user_id: &str,
    ) -> anyhow::Result<Option<engram::memory::types::UserPreferences>> {
        self.check_reads()?;
        self.inner.load_preferences(user_id)
    }

    fn save_preferences(
        &self,
        prefs: &engram::memory::types::UserPreferences,
    ) -> anyhow::Result<()> {
        self.inner.save_preferences(prefs)
    }
}
