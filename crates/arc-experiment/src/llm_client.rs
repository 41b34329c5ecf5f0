//! OpenAI-compatible chat client for the model backend.
//!
//! Works against any server exposing `/v1/chat/completions` (vLLM, an API
//! gateway, or a hosted provider when an API key is supplied). The client
//! makes no assumptions about the reply beyond it being text; parsing is
//! the kernel's job.

use std::sync::Arc;

use anyhow::{Context, Result};
use futures::future::join_all;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tracing::warn;

/// A chat message with role and content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Sampling parameters for a single completion call.
#[derive(Debug, Clone, Copy)]
pub struct SamplingConfig {
    /// Temperature (0.0-2.0)
    pub temperature: f32,
    /// Nucleus sampling parameter (0.0-1.0)
    pub top_p: f32,
    /// Maximum tokens to generate
    pub max_tokens: u32,
}

impl SamplingConfig {
    /// Deterministic decoding for single-shot prompts.
    pub fn greedy() -> Self {
        Self {
            temperature: 0.0,
            top_p: 1.0,
            max_tokens: 1000,
        }
    }

    /// High-temperature decoding for self-consistency sampling: each sample
    /// should follow a different reasoning path.
    pub fn consistency() -> Self {
        Self {
            temperature: 1.0,
            top_p: 0.95,
            max_tokens: 1000,
        }
    }

    /// Randomize temperature and top-p within a band around this config,
    /// adding diversity across parallel samples.
    pub fn jittered(self) -> Self {
        let mut rng = rand::rng();
        let temperature = (self.temperature + rng.random_range(-0.2..0.2)).clamp(0.1, 1.2);
        let top_p = rng.random_range(0.9..0.98);
        Self {
            temperature,
            top_p,
            ..self
        }
    }
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self::greedy()
    }
}

/// Request body for /v1/chat/completions.
#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
}

/// Response from /v1/chat/completions.
#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

/// A single choice in the response.
#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// Chat completions client.
#[derive(Clone)]
pub struct LlmClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl LlmClient {
    /// Create a new client.
    ///
    /// # Arguments
    /// * `base_url` - Server base URL (e.g., "http://localhost:8000")
    /// * `api_key` - Bearer token, if the backend requires one
    pub fn new(base_url: &str, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    /// Send one chat completion request and return the reply text.
    pub async fn chat(
        &self,
        model: &str,
        messages: &[ChatMessage],
        sampling: SamplingConfig,
    ) -> Result<String> {
        let request = ChatRequest {
            model,
            messages,
            max_tokens: sampling.max_tokens,
            temperature: sampling.temperature,
            top_p: sampling.top_p,
        };

        let url = format!("{}/v1/chat/completions", self.base_url);
        let mut builder = self.client.post(&url).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .context("failed to send request to model backend")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("chat request failed with status {}: {}", status, body);
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .context("failed to parse chat completion response")?;

        chat_response
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .context("no choices in chat completion response")
    }

    /// Collect `n` independent samples for the same prompt, with at most
    /// `max_concurrent` requests in flight and jittered sampling per call.
    ///
    /// A failed call is logged and skipped: for self-consistency voting a
    /// lost sample is just a missing vote, not a fatal error.
    pub async fn sample_many(
        &self,
        model: &str,
        messages: &[ChatMessage],
        sampling: SamplingConfig,
        n: usize,
        max_concurrent: usize,
    ) -> Vec<String> {
        let semaphore = Arc::new(Semaphore::new(max_concurrent.max(1)));

        let calls = (0..n).map(|i| {
            let client = self.clone();
            let semaphore = Arc::clone(&semaphore);
            let model = model.to_string();
            let messages = messages.to_vec();
            let sampling = sampling.jittered();

            async move {
                let _permit = semaphore.acquire().await.ok()?;
                match client.chat(&model, &messages, sampling).await {
                    Ok(reply) => Some(reply),
                    Err(err) => {
                        warn!(sample = i, error = %err, "sample failed, skipping");
                        None
                    }
                }
            }
        });

        join_all(calls).await.into_iter().flatten().collect()
    }

    /// Check if the backend is reachable.
    pub async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/health", self.base_url);
        match self.client.get(&url).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }
}
