//! LLM Client
//!
//! A provider-neutral seam plus an OpenAI-compatible chat-completions
//! implementation that asks for `json_object` output.

use crate::PlannerError;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(90);
const MAX_ERROR_BODY: usize = 512;

/// Raw completion plus usage, when the provider reports it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LlmResponse {
    pub content: String,
    pub prompt_tokens: Option<u64>,
    pub completion_tokens: Option<u64>,
}

impl LlmResponse {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send system + user prompts, expecting a JSON object back.
    async fn chat_json(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<LlmResponse, PlannerError>;

    /// Model name for logging
    fn model_name(&self) -> &str;

    /// Provider name for logging
    fn provider_name(&self) -> &str;
}

#[derive(Clone)]
pub struct OpenAiClient {
    api_key: String,
    client: reqwest::Client,
    model: String,
    base_url: String,
}

impl OpenAiClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self, PlannerError> {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| PlannerError::Transport(e.to_string()))?;
        Ok(Self {
            api_key: api_key.into(),
            client,
            model: model.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Point at another OpenAI-compatible endpoint.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatUsage {
    prompt_tokens: Option<u64>,
    completion_tokens: Option<u64>,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

impl ChatResponse {
    fn into_response(self) -> Result<LlmResponse, PlannerError> {
        let content = self
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(PlannerError::EmptyResponse)?;
        Ok(LlmResponse {
            content,
            prompt_tokens: self.usage.as_ref().and_then(|u| u.prompt_tokens),
            completion_tokens: self.usage.as_ref().and_then(|u| u.completion_tokens),
        })
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn chat_json(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<LlmResponse, PlannerError> {
        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(&self.api_key)
            .json(&json!({
                "model": &self.model,
                "temperature": 0,
                "response_format": {"type": "json_object"},
                "messages": [
                    {"role": "system", "content": system_prompt},
                    {"role": "user", "content": user_prompt}
                ]
            }))
            .send()
            .await
            .map_err(|e| PlannerError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(PlannerError::Status {
                status,
                body: body.chars().take(MAX_ERROR_BODY).collect(),
            });
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| PlannerError::Transport(e.to_string()))?;
        body.into_response()
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn provider_name(&self) -> &str {
        "openai"
    }
}
