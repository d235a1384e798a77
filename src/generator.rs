// src/generator.rs
//! Generation collaborator: provider abstraction over the LLM.
//!
//! The composer only sees the [`Generator`] trait — a prompt goes in, free
//! text comes out. Provider failures are ordinary `Err` values; the caller
//! treats them like any other unusable attempt.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Default model for the Anthropic provider.
pub const DEFAULT_CLAUDE_MODEL: &str = "claude-3-opus-20240229";
/// Token ceiling for a single completion.
pub const CLAUDE_MAX_TOKENS: u32 = 2048;

pub const ENV_ANTHROPIC_API_KEY: &str = "ANTHROPIC_API_KEY";
/// `GENERATOR_MODE=mock` forces the deterministic mock (tests/local runs).
pub const ENV_GENERATOR_MODE: &str = "GENERATOR_MODE";

/// Text-completion capability used for both article summaries and post
/// drafts.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
    /// Provider name for diagnostics.
    fn name(&self) -> &'static str;
}

/// Convenient alias used by callers.
pub type DynGenerator = Arc<dyn Generator>;

/// Factory: mock when `GENERATOR_MODE=mock`, disabled without an API key,
/// otherwise the real Anthropic provider.
pub fn build_generator() -> DynGenerator {
    if std::env::var(ENV_GENERATOR_MODE)
        .map(|v| v == "mock")
        .unwrap_or(false)
    {
        return Arc::new(MockGenerator::with_reply(
            "REASONING: deterministic mock reply\nPOST: Mock post about steady protocol progress.",
        ));
    }

    match std::env::var(ENV_ANTHROPIC_API_KEY) {
        Ok(key) if !key.is_empty() => Arc::new(AnthropicProvider::new(key, None)),
        _ => {
            tracing::warn!("no Anthropic API key configured, generator disabled");
            Arc::new(DisabledGenerator)
        }
    }
}

// ------------------------------------------------------------
// Anthropic Messages API provider
// ------------------------------------------------------------

pub struct AnthropicProvider {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl AnthropicProvider {
    /// `model_override`: pass Some("claude-…") to override the default.
    pub fn new(api_key: String, model_override: Option<&str>) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("crypto-content-composer/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(60))
            .build()
            .expect("reqwest client");
        Self {
            http,
            api_key,
            model: model_override.unwrap_or(DEFAULT_CLAUDE_MODEL).to_string(),
        }
    }
}

#[async_trait]
impl Generator for AnthropicProvider {
    async fn complete(&self, prompt: &str) -> Result<String> {
        #[derive(Serialize)]
        struct Msg<'a> {
            role: &'a str,
            content: &'a str,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            max_tokens: u32,
            messages: Vec<Msg<'a>>,
        }
        #[derive(Deserialize)]
        struct Resp {
            content: Vec<Block>,
        }
        #[derive(Deserialize)]
        struct Block {
            #[serde(default)]
            text: String,
        }

        let req = Req {
            model: &self.model,
            max_tokens: CLAUDE_MAX_TOKENS,
            messages: vec![Msg {
                role: "user",
                content: prompt,
            }],
        };

        let resp = self
            .http
            .post("https://api.anthropic.com/v1/messages")
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&req)
            .send()
            .await
            .context("anthropic request")?;

        let status = resp.status();
        if !status.is_success() {
            bail!("anthropic returned {status}");
        }

        let body: Resp = resp.json().await.context("anthropic response body")?;
        let text = body
            .content
            .first()
            .map(|b| b.text.trim().to_string())
            .unwrap_or_default();
        if text.is_empty() {
            bail!("anthropic returned an empty completion");
        }
        Ok(text)
    }

    fn name(&self) -> &'static str {
        "anthropic"
    }
}

// ------------------------------------------------------------
// Disabled + mock providers
// ------------------------------------------------------------

/// Always errors; used when no provider is configured.
pub struct DisabledGenerator;

#[async_trait]
impl Generator for DisabledGenerator {
    async fn complete(&self, _prompt: &str) -> Result<String> {
        bail!("generator disabled")
    }

    fn name(&self) -> &'static str {
        "disabled"
    }
}

/// Deterministic generator for tests: replays a scripted list of replies,
/// repeating the last one when the script runs out.
pub struct MockGenerator {
    replies: Vec<String>,
    cursor: std::sync::Mutex<usize>,
}

impl MockGenerator {
    pub fn with_reply(reply: &str) -> Self {
        Self::with_replies(vec![reply.to_string()])
    }

    pub fn with_replies(replies: Vec<String>) -> Self {
        Self {
            replies,
            cursor: std::sync::Mutex::new(0),
        }
    }

    /// How many completions were requested so far.
    pub fn calls(&self) -> usize {
        *self.cursor.lock().expect("mock cursor poisoned")
    }
}

#[async_trait]
impl Generator for MockGenerator {
    async fn complete(&self, _prompt: &str) -> Result<String> {
        let mut cursor = self.cursor.lock().expect("mock cursor poisoned");
        let idx = (*cursor).min(self.replies.len().saturating_sub(1));
        *cursor += 1;
        match self.replies.get(idx) {
            Some(r) => Ok(r.clone()),
            None => bail!("mock generator has no scripted replies"),
        }
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
