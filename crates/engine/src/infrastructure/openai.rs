//! Judgment client for an OpenAI-compatible chat completions API.
//!
//! One reqwest client backs both judgment functions: the primary "NPC"
//! judge (structured JSON verdict, schema-validated on receipt) and the
//! secondary "narrator" (free text only).

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use affinitas_domain::{ChatRole, NpcJudgment};

use crate::infrastructure::ports::{JudgePort, JudgmentRequest, LlmError, NarratorPort};

/// Client for an OpenAI-compatible `/v1/chat/completions` endpoint.
#[derive(Clone)]
pub struct OpenAiClient {
    client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

/// Default judgment endpoint (a local Ollama works out of the box).
pub const DEFAULT_LLM_BASE_URL: &str = "http://localhost:11434";

/// Default model name.
pub const DEFAULT_LLM_MODEL: &str = "llama3.2";

impl OpenAiClient {
    /// Build the client. Fails when the underlying HTTP client cannot be
    /// initialized (broken TLS backend, unresolvable proxy).
    pub fn new(
        base_url: &str,
        model: &str,
        api_key: Option<String>,
    ) -> Result<Self, reqwest::Error> {
        // Judgment calls can be slow; the turn blocks on them entirely.
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key,
        })
    }

    /// Create client from environment variables (`LLM_BASE_URL`,
    /// `LLM_MODEL`, `LLM_API_KEY`), falling back to defaults.
    pub fn from_env() -> Result<Self, reqwest::Error> {
        let base_url =
            std::env::var("LLM_BASE_URL").unwrap_or_else(|_| DEFAULT_LLM_BASE_URL.to_string());
        let model = std::env::var("LLM_MODEL").unwrap_or_else(|_| DEFAULT_LLM_MODEL.to_string());
        let api_key = std::env::var("LLM_API_KEY").ok();
        Self::new(&base_url, &model, api_key)
    }

    async fn chat(&self, request: ChatRequest) -> Result<String, LlmError> {
        let mut builder = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| LlmError::RequestFailed(e.to_string()))?;

        if !response.status().is_success() {
            let error_text = response
                .text()
                .await
                .map_err(|e| LlmError::RequestFailed(e.to_string()))?;
            return Err(LlmError::RequestFailed(error_text));
        }

        let api_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        api_response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| LlmError::InvalidResponse("no choices in response".to_string()))
    }
}

#[async_trait]
impl JudgePort for OpenAiClient {
    async fn judge(&self, request: JudgmentRequest) -> Result<NpcJudgment, LlmError> {
        let mut messages = Vec::with_capacity(request.history.len() + 1);
        messages.push(ChatMessage {
            role: "system",
            content: request.persona,
        });
        for entry in request.history {
            messages.push(ChatMessage {
                role: wire_role(entry.role()),
                content: entry.content().to_string(),
            });
        }

        let content = self
            .chat(ChatRequest {
                model: self.model.clone(),
                messages,
                response_format: Some(ResponseFormat { r#type: "json_object" }),
            })
            .await?;

        parse_judgment(&content)
    }
}

#[async_trait]
impl NarratorPort for OpenAiClient {
    async fn narrate(&self, prompt: String) -> Result<String, LlmError> {
        let content = self
            .chat(ChatRequest {
                model: self.model.clone(),
                messages: vec![ChatMessage {
                    role: "user",
                    content: prompt,
                }],
                response_format: None,
            })
            .await?;
        Ok(content.trim().to_string())
    }
}

/// Validate the judge's structured output. Malformed output is a
/// processing failure, never coerced into a default verdict.
fn parse_judgment(content: &str) -> Result<NpcJudgment, LlmError> {
    serde_json::from_str(content).map_err(|e| LlmError::InvalidResponse(e.to_string()))
}

fn wire_role(role: ChatRole) -> &'static str {
    match role {
        ChatRole::User => "user",
        ChatRole::Ai => "assistant",
        ChatRole::System => "system",
    }
}

// =============================================================================
// Wire types
// =============================================================================

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Serialize)]
struct ResponseFormat {
    r#type: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}
