// src/completions.rs
//
// Thin client for an OpenAI-compatible chat completions endpoint
// (OpenRouter by default). One call, one prompt, one text answer.

use log::{debug, error};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_MODEL: &str = "anthropic/claude-sonnet-4";

#[derive(Debug, Error)]
pub enum CompletionError {
    /// Upstream returned 402: the provider account is out of funds.
    #[error("completion provider quota exhausted")]
    Quota,
    #[error("completion request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("completion provider returned {status}: {body}")]
    Api { status: StatusCode, body: String },
    #[error("completion response missing message content")]
    InvalidResponse,
}

#[derive(Clone)]
pub struct CompletionClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    /// Sent as HTTP-Referer/X-Title, which OpenRouter uses for attribution.
    referer: Option<String>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl CompletionClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            referer: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_referer(mut self, referer: impl Into<String>) -> Self {
        self.referer = Some(referer.into());
        self
    }

    /// Sends a single-turn user prompt and returns the assistant text.
    pub async fn chat(&self, prompt: &str) -> Result<String, CompletionError> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let payload = json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
            "temperature": 0.7,
            "max_tokens": 1500,
        });

        let mut request = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&payload);
        if let Some(referer) = &self.referer {
            request = request
                .header("HTTP-Referer", referer)
                .header("X-Title", "VibeGuide");
        }

        let response = request.send().await?;
        let status = response.status();
        if status == StatusCode::PAYMENT_REQUIRED {
            error!("completions: provider reported quota exhausted");
            return Err(CompletionError::Quota);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("completions: provider returned {status}: {body}");
            return Err(CompletionError::Api { status, body });
        }

        let parsed: ChatResponse = response.json().await?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or(CompletionError::InvalidResponse)?;
        debug!("completions: received {} chars", content.len());
        Ok(content)
    }
}
