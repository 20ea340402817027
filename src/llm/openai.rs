//! OpenAI-compatible chat completions with function calling.
//!
//! Works against OpenAI directly and against OpenRouter (provider
//! `"openrouter"` defaults to `https://openrouter.ai/api/v1`). The tool is forced through
//! `tool_choice`, so a well-behaved model always answers with a call.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use super::{LlmClient, LlmReply, ToolSpec};
use crate::config::LlmConfig;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o";
const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";
const OPENROUTER_MODEL: &str = "openai/gpt-4o";

/// Base URL and model used when the config leaves them unset.
fn provider_defaults(provider: &str) -> (&'static str, &'static str) {
    match provider {
        "openrouter" => (OPENROUTER_BASE_URL, OPENROUTER_MODEL),
        _ => (DEFAULT_BASE_URL, DEFAULT_MODEL),
    }
}

// ---------------------------------------------------------------------------
// API types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<ChatMessage>,
    tools: Vec<serde_json::Value>,
    tool_choice: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ToolCall>>,
}

#[derive(Debug, Deserialize)]
struct ToolCall {
    function: FunctionCall,
}

#[derive(Debug, Deserialize)]
struct FunctionCall {
    name: String,
    /// JSON-encoded arguments string.
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct OpenAiClient {
    http: Client,
    api_key: SecretString,
    base_url: String,
    model: String,
    max_tokens: u32,
}

impl OpenAiClient {
    pub fn new(config: &LlmConfig, api_key: SecretString) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build OpenAI HTTP client")?;
        let (default_base_url, default_model) = provider_defaults(&config.provider);

        Ok(Self {
            http,
            api_key,
            base_url: config
                .base_url
                .as_deref()
                .unwrap_or(default_base_url)
                .trim_end_matches('/')
                .to_string(),
            model: config.model.clone().unwrap_or_else(|| default_model.to_string()),
            max_tokens: config.max_tokens,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn build_request(&self, system: &str, prompt: &str, tool: &ToolSpec) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            messages: vec![
                ChatMessage { role: "system", content: system.to_string() },
                ChatMessage { role: "user", content: prompt.to_string() },
            ],
            tools: vec![json!({
                "type": "function",
                "function": {
                    "name": tool.name,
                    "description": tool.description,
                    "parameters": tool.parameters,
                }
            })],
            tool_choice: json!({
                "type": "function",
                "function": { "name": tool.name }
            }),
        }
    }

    fn into_reply(body: ChatResponse) -> LlmReply {
        let Some(choice) = body.choices.into_iter().next() else {
            return LlmReply::Text(String::new());
        };

        match choice.message.tool_calls.into_iter().flatten().next() {
            Some(call) => {
                // Arguments that aren't JSON stay as a raw string and fail
                // schema validation downstream.
                let arguments = serde_json::from_str(&call.function.arguments)
                    .unwrap_or(serde_json::Value::String(call.function.arguments));
                LlmReply::ToolCall { name: call.function.name, arguments }
            }
            None => LlmReply::Text(choice.message.content.unwrap_or_default()),
        }
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn generate_structured(
        &self,
        system: &str,
        prompt: &str,
        tool: &ToolSpec,
    ) -> Result<LlmReply> {
        let request = self.build_request(system, prompt, tool);

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .context("OpenAI request failed")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("OpenAI API error {status}: {error_text}");
        }

        let body: ChatResponse = response
            .json()
            .await
            .context("Failed to parse OpenAI response")?;

        if let Some(usage) = &body.usage {
            debug!(
                model = %self.model,
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "OpenAI call complete"
            );
        }

        Ok(Self::into_reply(body))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
