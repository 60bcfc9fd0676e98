//! Chat-completion client interface.
//!
//! The consolidator's summarization calls go through the
//! [`CompletionProvider`] trait; [`http::OpenRouterClient`] is the bundled
//! implementation. Methods are synchronous — async hosts should wrap calls
//! in `tokio::task::spawn_blocking`.

pub mod http;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// One role/content message in a completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".into(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".into(),
            content: content.into(),
        }
    }
}

/// Token accounting reported by the completion service.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct TokenUsage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

/// Generated text plus usage counts.
#[derive(Debug, Clone)]
pub struct Completion {
    pub content: String,
    pub usage: TokenUsage,
}

/// Trait for chat-completion services.
///
/// Implementations may fail or time out; callers inside this crate treat
/// such failures as non-fatal and log them.
pub trait CompletionProvider: Send + Sync {
    fn complete(
        &self,
        model: &str,
        messages: &[ChatMessage],
        temperature: f32,
        max_tokens: u32,
    ) -> Result<Completion>;
}
