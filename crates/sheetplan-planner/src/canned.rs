//! Scripted LLM client for tests
use crate::{LlmClient, LlmResponse, PlannerError};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;

/// Replies in the order they were queued and records every prompt.
/// An exhausted queue answers with a transport error.
#[derive(Default)]
pub struct CannedLlmClient {
    replies: Mutex<VecDeque<Result<LlmResponse, PlannerError>>>,
    calls: Mutex<Vec<(String, String)>>,
}

impl CannedLlmClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reply(self, content: impl Into<String>) -> Self {
        self.reply(content);
        self
    }

    pub fn reply(&self, content: impl Into<String>) {
        self.replies
            .lock()
            .push_back(Ok(LlmResponse::text(content)));
    }

    pub fn reply_with_usage(&self, content: impl Into<String>, prompt: u64, completion: u64) {
        self.replies.lock().push_back(Ok(LlmResponse {
            content: content.into(),
            prompt_tokens: Some(prompt),
            completion_tokens: Some(completion),
        }));
    }

    pub fn fail(&self, error: PlannerError) {
        self.replies.lock().push_back(Err(error));
    }

    /// `(system, user)` prompts received so far.
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl LlmClient for CannedLlmClient {
    async fn chat_json(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<LlmResponse, PlannerError> {
        self.calls
            .lock()
            .push((system_prompt.to_string(), user_prompt.to_string()));
        self.replies
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(PlannerError::Transport("no canned reply left".to_string())))
    }

    fn model_name(&self) -> &str {
        "canned"
    }

    fn provider_name(&self) -> &str {
        "canned"
    }
}
