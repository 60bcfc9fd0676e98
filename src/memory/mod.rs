//! Core memory engine: store, retrieve, preferences, and consolidation.
//!
//! [`MemoryStore`] is the single entry point. It owns the persistence
//! backend, the embedding provider, and the per-user index registry, and
//! exposes the operations the chat/memory request handlers call.

pub mod backend;
pub mod consolidate;
pub mod preferences;
pub mod retrieve;
pub mod store;
pub mod types;

pub use backend::MemoryBackend;
pub use consolidate::ConsolidateReport;
pub use preferences::PreferenceRule;
pub use retrieve::RetrievedMemory;
pub use store::MemoryStore;
