//! The LLM dependency behind a trait object so the ReAct loop can be tested
//! against a scripted double instead of a live endpoint.

use anyhow::Result;
use async_trait::async_trait;
use hostwatch_llm::{ChatMessage, ChatResponse, LlmClient};

#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn chat(&self, messages: &[ChatMessage], tools: Option<&serde_json::Value>) -> Result<ChatResponse>;
}

#[async_trait]
impl ChatClient for LlmClient {
    async fn chat(&self, messages: &[ChatMessage], tools: Option<&serde_json::Value>) -> Result<ChatResponse> {
        LlmClient::chat(self, messages, tools).await
    }
}

/// Replays a fixed sequence of responses, one per call, ignoring the
/// messages it's given. Exists for tests only.
pub struct ScriptedClient {
    responses: std::sync::Mutex<std::collections::VecDeque<ChatResponse>>,
}

impl ScriptedClient {
    pub fn new(responses: Vec<ChatResponse>) -> Self {
        Self { responses: std::sync::Mutex::new(responses.into_iter().collect()) }
    }
}

#[async_trait]
impl ChatClient for ScriptedClient {
    async fn chat(&self, _messages: &[ChatMessage], _tools: Option<&serde_json::Value>) -> Result<ChatResponse> {
        let mut queue = self.responses.lock().unwrap();
        queue.pop_front().ok_or_else(|| anyhow::anyhow!("ScriptedClient: no more scripted responses"))
    }
}
