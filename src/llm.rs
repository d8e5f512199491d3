//! LLM provider abstraction and implementations.
//!
//! Defines the [`LlmProvider`] trait and concrete implementations:
//! - **[`GithubModelsProvider`]** — GitHub Models' OpenAI-compatible chat endpoint.
//! - **[`OpenAiProvider`]** — the OpenAI chat completions API.
//! - **[`AnthropicProvider`]** — the Anthropic messages API.
//!
//! # Provider Selection
//!
//! Use [`create_provider`] to instantiate the provider named in the
//! configuration. Credentials are read from the environment at construction
//! time, so a missing key fails at startup rather than mid-run.
//!
//! # Retry Strategy
//!
//! All providers use exponential backoff for transient errors:
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors and timeouts → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use std::time::Duration;

use crate::config::LlmConfig;

const GITHUB_MODELS_URL: &str = "https://models.inference.ai.azure.com/chat/completions";
const OPENAI_URL: &str = "https://api.openai.com/v1/chat/completions";
const ANTHROPIC_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Sampling temperature for every analysis call. Low on purpose: the output
/// is parsed as JSON, and variety is not a feature here.
const TEMPERATURE: f64 = 0.1;

/// A text-in/text-out summarization oracle.
///
/// Implementations take a system instruction plus a payload and return the
/// model's raw response text. They are `Send + Sync` so a concurrent
/// pipeline can share one across tasks.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name as configured (e.g. `"github"`).
    fn name(&self) -> &str;
    /// Model identifier in use (e.g. `"gpt-4o-mini"`).
    fn model(&self) -> &str;
    /// Submit one prompt and return the raw response text.
    async fn invoke(&self, system_prompt: &str, user_prompt: &str) -> Result<String>;
}

/// Create the provider named in the configuration.
///
/// # Errors
///
/// Returns an error for unknown provider names or when the provider's
/// API key is not present in the environment.
pub fn create_provider(config: &LlmConfig) -> Result<Box<dyn LlmProvider>> {
    match config.provider.as_str() {
        "github" => Ok(Box::new(GithubModelsProvider::new(config)?)),
        "openai" => Ok(Box::new(OpenAiProvider::new(config)?)),
        "anthropic" => Ok(Box::new(AnthropicProvider::new(config)?)),
        other => bail!("Unknown LLM provider: {}", other),
    }
}

fn http_client(config: &LlmConfig) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?)
}

fn require_env(var: &str) -> Result<String> {
    std::env::var(var).map_err(|_| anyhow!("{} environment variable not set", var))
}

/// Send a request, retrying transient failures with exponential backoff.
///
/// `make_request` builds a fresh request per attempt (request builders are
/// consumed on send).
async fn send_with_retry<F>(make_request: F, max_retries: u32, label: &str) -> Result<serde_json::Value>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let mut last_err = None;

    for attempt in 0..=max_retries {
        if attempt > 0 {
            let delay = Duration::from_secs(1 << (attempt - 1).min(5));
            tokio::time::sleep(delay).await;
        }

        match make_request().send().await {
            Ok(response) => {
                let status = response.status();

                if status.is_success() {
                    return Ok(response.json().await?);
                }

                // Rate limited or server error — retry
                if status.as_u16() == 429 || status.is_server_error() {
                    let body = response.text().await.unwrap_or_default();
                    last_err = Some(anyhow!("{} API error {}: {}", label, status, body));
                    continue;
                }

                // Client error (not 429) — don't retry
                let body = response.text().await.unwrap_or_default();
                bail!("{} API error {}: {}", label, status, body);
            }
            Err(e) => {
                last_err = Some(e.into());
                continue;
            }
        }
    }

    Err(last_err.unwrap_or_else(|| anyhow!("{} request failed after retries", label)))
}

/// Pull the assistant text out of an OpenAI-style chat completion response.
fn parse_chat_response(json: &serde_json::Value) -> Result<String> {
    json.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| anyhow!("Invalid chat response: missing choices[0].message.content"))
}

// ============ GitHub Models Provider ============

/// Provider for GitHub Models, which exposes an OpenAI-compatible chat
/// endpoint authenticated with a GitHub token (`GITHUB_TOKEN`).
pub struct GithubModelsProvider {
    model: String,
    token: String,
    http: reqwest::Client,
    max_retries: u32,
}

impl GithubModelsProvider {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        Ok(Self {
            model: config.model.clone().unwrap_or_else(|| "gpt-4o-mini".to_string()),
            token: require_env("GITHUB_TOKEN")?,
            http: http_client(config)?,
            max_retries: config.max_retries,
        })
    }
}

#[async_trait]
impl LlmProvider for GithubModelsProvider {
    fn name(&self) -> &str {
        "github"
    }
    fn model(&self) -> &str {
        &self.model
    }

    async fn invoke(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "temperature": TEMPERATURE,
            "messages": [
                { "role": "system", "content": system_prompt },
                { "role": "user", "content": user_prompt },
            ],
        });

        let json = send_with_retry(
            || {
                self.http
                    .post(GITHUB_MODELS_URL)
                    .header("Authorization", format!("Bearer {}", self.token))
                    .json(&body)
            },
            self.max_retries,
            "GitHub Models",
        )
        .await?;

        parse_chat_response(&json)
    }
}

// ============ OpenAI Provider ============

/// Provider for the OpenAI chat completions API (`OPENAI_API_KEY`).
pub struct OpenAiProvider {
    model: String,
    api_key: String,
    http: reqwest::Client,
    max_retries: u32,
}

impl OpenAiProvider {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        Ok(Self {
            model: config
                .model
                .clone()
                .unwrap_or_else(|| "gpt-4-turbo-preview".to_string()),
            api_key: require_env("OPENAI_API_KEY")?,
            http: http_client(config)?,
            max_retries: config.max_retries,
        })
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }
    fn model(&self) -> &str {
        &self.model
    }

    async fn invoke(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "temperature": TEMPERATURE,
            "messages": [
                { "role": "system", "content": system_prompt },
                { "role": "user", "content": user_prompt },
            ],
        });

        let json = send_with_retry(
            || {
                self.http
                    .post(OPENAI_URL)
                    .header("Authorization", format!("Bearer {}", self.api_key))
                    .json(&body)
            },
            self.max_retries,
            "OpenAI",
        )
        .await?;

        parse_chat_response(&json)
    }
}

// ============ Anthropic Provider ============

/// Provider for the Anthropic messages API (`ANTHROPIC_API_KEY`).
pub struct AnthropicProvider {
    model: String,
    api_key: String,
    max_output_tokens: u32,
    http: reqwest::Client,
    max_retries: u32,
}

impl AnthropicProvider {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        Ok(Self {
            model: config
                .model
                .clone()
                .unwrap_or_else(|| "claude-3-sonnet-20240229".to_string()),
            api_key: require_env("ANTHROPIC_API_KEY")?,
            max_output_tokens: config.max_output_tokens,
            http: http_client(config)?,
            max_retries: config.max_retries,
        })
    }
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }
    fn model(&self) -> &str {
        &self.model
    }

    async fn invoke(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "max_tokens": self.max_output_tokens,
            "temperature": TEMPERATURE,
            "system": system_prompt,
            "messages": [
                { "role": "user", "content": user_prompt },
            ],
        });

        let json = send_with_retry(
            || {
                self.http
                    .post(ANTHROPIC_URL)
                    .header("x-api-key", &self.api_key)
                    .header("anthropic-version", ANTHROPIC_VERSION)
                    .json(&body)
            },
            self.max_retries,
            "Anthropic",
        )
        .await?;

        json.get("content")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("text"))
            .and_then(|t| t.as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| anyhow!("Invalid Anthropic response: missing content[0].text"))
    }
}

// ============ Response payload extraction ============

/// Locate the structured payload inside free-form model output.
///
/// Tries, in order: an explicit ```json fence, any fence, the whole
/// response. Best effort — the caller decides whether the result actually
/// parses.
pub fn extract_fenced_payload(response: &str) -> &str {
    if let Some(inner) = between(response, "```json", "```") {
        return inner.trim();
    }
    if let Some(inner) = between(response, "```", "```") {
        return inner.trim();
    }
    response.trim()
}

fn between<'a>(text: &'a str, open: &str, close: &str) -> Option<&'a str> {
    let start = text.find(open)? + open.len();
    let end = text[start..].find(close)? + start;
    Some(&text[start..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_tagged_fence() {
        let response = "Here is the analysis:\n```json\n{\"files\": []}\n```\nDone.";
        assert_eq!(extract_fenced_payload(response), "{\"files\": []}");
    }

    #[test]
    fn extracts_untagged_fence() {
        let response = "```\n{\"a\": 1}\n```";
        assert_eq!(extract_fenced_payload(response), "{\"a\": 1}");
    }

    #[test]
    fn falls_back_to_whole_response() {
        assert_eq!(extract_fenced_payload("  {\"a\": 1}  "), "{\"a\": 1}");
    }

    #[test]
    fn unterminated_fence_falls_through() {
        // No closing fence: the whole (trimmed) response is the payload.
        let response = "```json\n{\"a\": 1}";
        assert_eq!(extract_fenced_payload(response), response.trim());
    }

    #[test]
    fn parse_chat_response_reads_content() {
        let json = serde_json::json!({
            "choices": [{ "message": { "role": "assistant", "content": "hello" } }]
        });
        assert_eq!(parse_chat_response(&json).unwrap(), "hello");
    }

    #[test]
    fn parse_chat_response_rejects_empty_choices() {
        let json = serde_json::json!({ "choices": [] });
        assert!(parse_chat_response(&json).is_err());
    }
}
