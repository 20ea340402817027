//! LLM integration for structured match predictions.
//!
//! Defines the `LlmClient` trait (one forced tool call per request) and
//! provides implementations for OpenAI-compatible chat completions
//! (OpenAI, OpenRouter) and the Anthropic Messages API.

pub mod anthropic;
pub mod openai;

use anyhow::Result;
use async_trait::async_trait;
use secrecy::SecretString;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::LlmConfig;

/// A tool the model is required to call, described by a JSON Schema.
#[derive(Debug, Clone)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// What the model sent back.
#[derive(Debug, Clone, PartialEq)]
pub enum LlmReply {
    /// A structured call. `arguments` is whatever the model produced and
    /// has not been checked against the schema.
    ToolCall {
        name: String,
        arguments: serde_json::Value,
    },
    /// Free text instead of a tool call.
    Text(String),
}

/// Abstraction over LLM providers that support forced tool calls.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send `prompt` and require the reply to be a call to `tool`.
    ///
    /// Errors only on transport or HTTP-status failures; a reply that
    /// ignores the tool comes back as `LlmReply::Text`.
    async fn generate_structured(
        &self,
        system: &str,
        prompt: &str,
        tool: &ToolSpec,
    ) -> Result<LlmReply>;
}

/// Build the configured provider client.
pub fn build_client(config: &LlmConfig, api_key: SecretString) -> Result<Arc<dyn LlmClient>> {
    match config.provider.as_str() {
        "anthropic" => {
            let client = anthropic::AnthropicClient::new(config, api_key)?;
            info!(model = %client.model(), "Using Anthropic LLM provider");
            Ok(Arc::new(client))
        }
        "openai" | "openrouter" => {
            let client = openai::OpenAiClient::new(config, api_key)?;
            info!(model = %client.model(), "Using OpenAI-compatible LLM provider");
            Ok(Arc::new(client))
        }
        other => {
            warn!(provider = other, "Unknown LLM provider, defaulting to OpenAI");
            Ok(Arc::new(openai::OpenAiClient::new(config, api_key)?))
        }
    }
}
