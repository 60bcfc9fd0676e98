//! Deterministic vector memory for chatbot backends.
//!
//! Engram gives a chat backend a lightweight "long-term memory": store
//! conversation snippets per user, retrieve them by similarity with a
//! recency fallback, distill preference statements out of chat turns, and
//! periodically consolidate old entries into summaries so memory stays
//! bounded.
//!
//! There is no embedding model. Vectors come from a deterministic
//! digest-based pseudo-embedder (1536 dimensions), searched by a flat,
//! append-only L2 index held in memory per user and rebuilt from SQLite on
//! demand. The similarity signal is weak by design; retrieval always pads
//! with recent entries so callers get useful context either way.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use engram::config::EngramConfig;
//! use engram::db::SqliteBackend;
//! use engram::embedding;
//! use engram::memory::{types::MemoryKind, MemoryStore};
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = EngramConfig::load()?;
//! let backend = Arc::new(SqliteBackend::open(config.resolved_db_path())?);
//! let embedder: Arc<dyn embedding::EmbeddingProvider> =
//!     embedding::create_provider(&config.embedding)?.into();
//! let store = MemoryStore::new(backend, embedder, config);
//!
//! store.store("user-1", "loves hiking in the alps", MemoryKind::General,
//!     serde_json::json!({}))?;
//! let memories = store.retrieve("user-1", "outdoor hobbies", None, 5)?;
//! # let _ = memories;
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - [`config`] — Configuration loading from TOML files and environment variables
//! - [`db`] — SQLite persistence backend and schema
//! - [`embedding`] — Deterministic text-to-vector pipeline
//! - [`index`] — Per-user append-only vector index and its registry
//! - [`memory`] — Store, retrieval, preference extraction, consolidation
//! - [`completion`] — Chat-completion client used by the consolidator

pub mod completion;
pub mod config;
pub mod db;
pub mod embedding;
pub mod error;
pub mod index;
pub mod logging;
pub mod memory;

pub use error::{EngramError, Result};
