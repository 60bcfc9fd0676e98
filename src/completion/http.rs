//! OpenRouter-compatible HTTP completion client.
//!
//! Speaks the OpenAI `/chat/completions` wire shape over a blocking
//! `reqwest` client, so it works against OpenRouter or any compatible
//! gateway.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::{ChatMessage, Completion, CompletionProvider, TokenUsage};
use crate::config::CompletionConfig;

/// Blocking HTTP client for an OpenAI-compatible completion endpoint.
pub struct OpenRouterClient {
    http: reqwest::blocking::Client,
    base_url: String,
    api_key: String,
}

impl OpenRouterClient {
    pub fn new(config: &CompletionConfig) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<TokenUsage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl CompletionProvider for OpenRouterClient {
    fn complete(
        &self,
        model: &str,
        messages: &[ChatMessage],
        temperature: f32,
        max_tokens: u32,
    ) -> Result<Completion> {
        let request = CompletionRequest {
            model,
            messages,
            temperature,
            max_tokens,
        };

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .context("completion request failed")?
            .error_for_status()
            .context("completion request rejected")?;

        let body: CompletionResponse = response
            .json()
            .context("failed to parse completion response")?;

        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();

        Ok(Completion {
            content,
            usage: body.usage.unwrap_or_default(),
        })
    }
}
