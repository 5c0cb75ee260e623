//! Language model gateway: an opaque prompt-in/reply-out seam.
//!
//! Three backends implement [`Generate`]: a live OpenAI-format client, a
//! mock with canned replies for offline use and tests, and a sentinel for
//! misconfigured providers (which answers rather than erroring, so a turn
//! always completes).

use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::BotConfig;

/// Canned replies served by the mock backend.
pub const CANNED_REPLIES: &[&str] = &[
    "Makes sense. Want me to keep it short and friendly?",
    "Noted. I won't guess things I don't know; here's what I can do instead.",
    "Alright! Quick idea you can try right now: break it into two tiny steps.",
    "Thanks for sharing. I remember your preference - let me adapt to that.",
    "Got it! Based on what you told me before, here's a simple next step.",
];

#[async_trait]
pub trait Generate: Send + Sync {
    /// Produce a reply for the prompt. Live-backend faults propagate as
    /// errors; no retries happen here.
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// Build the gateway selected by the configured provider.
pub fn gateway_from_config(config: &BotConfig) -> Box<dyn Generate> {
    let provider = config.llm_provider.trim().to_ascii_uppercase();
    match provider.as_str() {
        "MOCK" => Box::new(MockLlm::default()),
        "OPENAI" => Box::new(LlmClient::new(
            config.llm_api_url.clone(),
            config.llm_api_key.clone().unwrap_or_default(),
            config.llm_model.clone(),
        )),
        _ => Box::new(UnknownProvider { name: provider }),
    }
}

// ============================================================================
// Mock backend
// ============================================================================

/// Chooses which canned reply to serve. Injectable so tests can pin the
/// selection; the default derives an index from the clock.
pub trait ReplyPicker: Send + Sync {
    fn pick(&self, count: usize) -> usize;
}

pub struct ClockPicker;

impl ReplyPicker for ClockPicker {
    fn pick(&self, count: usize) -> usize {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.subsec_nanos())
            .unwrap_or(0);
        nanos as usize % count.max(1)
    }
}

/// Always picks the same slot; for tests.
pub struct FixedPicker(pub usize);

impl ReplyPicker for FixedPicker {
    fn pick(&self, count: usize) -> usize {
        self.0 % count.max(1)
    }
}

pub struct MockLlm {
    picker: Box<dyn ReplyPicker>,
}

impl MockLlm {
    pub fn with_picker(picker: Box<dyn ReplyPicker>) -> Self {
        Self { picker }
    }
}

impl Default for MockLlm {
    fn default() -> Self {
        Self {
            picker: Box::new(ClockPicker),
        }
    }
}

#[async_trait]
impl Generate for MockLlm {
    async fn complete(&self, _prompt: &str) -> Result<String> {
        let idx = self.picker.pick(CANNED_REPLIES.len()) % CANNED_REPLIES.len();
        Ok(CANNED_REPLIES[idx].to_string())
    }
}

// ============================================================================
// Misconfigured provider
// ============================================================================

pub struct UnknownProvider {
    pub name: String,
}

#[async_trait]
impl Generate for UnknownProvider {
    async fn complete(&self, _prompt: &str) -> Result<String> {
        // A sentinel reply, not an error: the turn still completes
        Ok(format!("Error: unknown LLM provider '{}'", self.name))
    }
}

// ============================================================================
// Live OpenAI-format backend
// ============================================================================

#[derive(Clone)]
pub struct LlmClient {
    api_url: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<Message>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

impl LlmClient {
    pub fn new(api_url: String, api_key: String, model: String) -> Self {
        Self {
            api_url,
            api_key,
            model,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Generate for LlmClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/chat/completions", self.api_url);

        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![Message {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            temperature: 0.7,
            max_tokens: 500,
        };

        let mut req = self.client.post(&url).json(&request);

        // Add API key header if provided (not needed for local models)
        if !self.api_key.is_empty() {
            req = req.header("Authorization", format!("Bearer {}", self.api_key));
        }

        let response = req.send().await.context("Failed to send LLM request")?;

        // Check for HTTP errors and include response body for debugging
        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read body".to_string());
            anyhow::bail!("LLM API returned error {}: {}", status, body);
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .context("Failed to parse LLM response")?;

        let content = completion
            .choices
            .first()
            .map(|c| c.message.content.trim().to_string())
            .ok_or_else(|| anyhow::anyhow!("No response from LLM"))?;

        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fixed_picker_makes_mock_deterministic() {
        let llm = MockLlm::with_picker(Box::new(FixedPicker(1)));
        assert_eq!(llm.complete("anything").await.unwrap(), CANNED_REPLIES[1]);
        assert_eq!(llm.complete("else").await.unwrap(), CANNED_REPLIES[1]);
    }

    #[tokio::test]
    async fn test_clock_picker_stays_in_bounds() {
        let llm = MockLlm::default();
        let reply = llm.complete("anything").await.unwrap();
        assert!(CANNED_REPLIES.contains(&reply.as_str()));
    }

    #[tokio::test]
    async fn test_unknown_provider_returns_sentinel_not_error() {
        let gateway = UnknownProvider {
            name: "LLAMAFARM".to_string(),
        };
        let reply = gateway.complete("hi").await.expect("must not be Err");
        assert!(reply.contains("unknown LLM provider"));
        assert!(reply.contains("LLAMAFARM"));
    }

    #[tokio::test]
    async fn test_gateway_dispatch_is_case_insensitive() {
        let config = BotConfig {
            llm_provider: "mock".to_string(),
            ..BotConfig::default()
        };
        let gateway = gateway_from_config(&config);
        let reply = gateway.complete("hi").await.unwrap();
        assert!(CANNED_REPLIES.contains(&reply.as_str()));

        let config = BotConfig {
            llm_provider: "bogus".to_string(),
            ..BotConfig::default()
        };
        let gateway = gateway_from_config(&config);
        let reply = gateway.complete("hi").await.unwrap();
        assert!(reply.starts_with("Error: unknown LLM provider"));
    }
}
