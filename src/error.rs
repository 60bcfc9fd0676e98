//! Error taxonomy for the memory subsystem.
//!
//! Only [`EngramError::InvalidInput`] and primary persistence failures are
//! surfaced to callers. External-service failures (embedding, chat
//! completion) and secondary writes are logged at their call sites and
//! swallowed; see the per-module docs.

use thiserror::Error;

/// Errors surfaced by the public memory API.
#[derive(Debug, Error)]
pub enum EngramError {
    /// A required text argument was empty or otherwise unusable.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A primary read or write against the persisted store failed.
    #[error("persistence failure: {0}")]
    Persistence(#[source] anyhow::Error),
}

impl EngramError {
    /// Wrap a backend error as a persistence failure.
    pub(crate) fn persistence(err: anyhow::Error) -> Self {
        Self::Persistence(err)
    }
}

/// Convenience alias used across the public API.
pub type Result<T> = std::result::Result<T, EngramError>;
