//! A thin client over a single OpenAI-compatible chat-completions endpoint
//! with native tool calling. One configured base URL, one API key, one
//! model — no provider routing or fallback.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Role in a chat conversation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
    Tool,
}

/// A single message in a chat conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: ChatRole::System, content: Some(content.into()), tool_calls: vec![], tool_call_id: None }
    }
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: ChatRole::User, content: Some(content.into()), tool_calls: vec![], tool_call_id: None }
    }
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self { role: ChatRole::Tool, content: Some(content.into()), tool_calls: vec![], tool_call_id: Some(tool_call_id.into()) }
    }
}

/// A tool call requested by the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    #[serde(default)]
    pub id: String,
    #[serde(default = "default_tool_call_type")]
    pub r#type: String,
    pub function: ToolCallFunction,
}

fn default_tool_call_type() -> String {
    "function".to_string()
}

/// The function name and arguments within a tool call. Arguments are
/// normalized to a parsed JSON value regardless of whether the wire
/// response carried them as an object or a JSON-encoded string.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallFunction {
    pub name: String,
    #[serde(default)]
    pub arguments: serde_json::Value,
}

/// Response from a chat-completions call.
#[derive(Debug, Clone)]
pub struct ChatResponse {
    pub content: String,
    pub tool_calls: Vec<ToolCall>,
    pub finish_reason: String,
}

/// The single tool this system ever declares to the model: a shell
/// command with a (Chinese) human-readable justification.
pub fn execute_shell_command_tool() -> serde_json::Value {
    json!([{
        "type": "function",
        "function": {
            "name": "execute_shell_command",
            "description": "Execute a shell command on the host and return its output.",
            "parameters": {
                "type": "object",
                "properties": {
                    "command": { "type": "string", "description": "The shell command to run." },
                    "reason": { "type": "string", "description": "为何要执行该命令（中文）。" }
                },
                "required": ["command", "reason"]
            }
        }
    }])
}

#[derive(Debug, Clone)]
pub struct LlmClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl LlmClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    /// Sends `messages` to the configured endpoint, optionally declaring
    /// `tools`, at temperature `0.1`. Returns the parsed assistant
    /// response: text content, any tool calls, and the finish reason.
    pub async fn chat(&self, messages: &[ChatMessage], tools: Option<&serde_json::Value>) -> Result<ChatResponse> {
        let mut payload = json!({
            "model": self.model,
            "messages": messages_to_wire(messages),
            "temperature": 0.1,
        });
        if let Some(tools) = tools {
            payload["tools"] = tools.clone();
        }

        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        tracing::debug!(model = %self.model, message_count = messages.len(), "llm: sending chat request");
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .context("LLM request failed")?;

        let status = response.status();
        let body: serde_json::Value = response.json().await.context("LLM response was not JSON")?;
        if !status.is_success() {
            tracing::warn!(%status, "llm: endpoint returned non-success status");
            anyhow::bail!("LLM endpoint returned {status}: {body}");
        }

        parse_chat_response(&body)
    }
}

fn messages_to_wire(messages: &[ChatMessage]) -> Vec<serde_json::Value> {
    messages
        .iter()
        .map(|m| {
            let role = match m.role {
                ChatRole::System => "system",
                ChatRole::User => "user",
                ChatRole::Assistant => "assistant",
                ChatRole::Tool => "tool",
            };
            let mut msg = json!({ "role": role, "content": m.content });
            if !m.tool_calls.is_empty() {
                let calls: Vec<serde_json::Value> = m
                    .tool_calls
                    .iter()
                    .map(|tc| {
                        json!({
                            "id": tc.id,
                            "type": "function",
                            "function": {
                                "name": tc.function.name,
                                "arguments": tc.function.arguments.to_string(),
                            }
                        })
                    })
                    .collect();
                msg["tool_calls"] = json!(calls);
            }
            if let Some(ref id) = m.tool_call_id {
                msg["tool_call_id"] = json!(id);
            }
            msg
        })
        .collect()
}

/// Parses an OpenAI-compatible `/chat/completions` response body.
fn parse_chat_response(body: &serde_json::Value) -> Result<ChatResponse> {
    let choice = body.get("choices").and_then(|c| c.get(0));
    let message = choice.and_then(|c| c.get("message"));

    let content = message
        .and_then(|m| m.get("content"))
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string();

    let finish_reason = choice
        .and_then(|c| c.get("finish_reason"))
        .and_then(|v| v.as_str())
        .unwrap_or("stop")
        .to_string();

    let tool_calls = message
        .and_then(|m| m.get("tool_calls"))
        .and_then(|v| v.as_array())
        .map(|calls| {
            calls
                .iter()
                .enumerate()
                .filter_map(|(i, tc)| {
                    let id = tc.get("id").and_then(|v| v.as_str()).unwrap_or("").to_string();
                    let func = tc.get("function")?;
                    let name = func.get("name")?.as_str()?.to_string();
                    let arguments = func
                        .get("arguments")
                        .map(|v| match v.as_str() {
                            Some(s) => serde_json::from_str(s).unwrap_or(json!({})),
                            None => v.clone(),
                        })
                        .unwrap_or(json!({}));
                    Some(ToolCall {
                        id: if id.is_empty() { format!("call_{i}") } else { id },
                        r#type: "function".to_string(),
                        function: ToolCallFunction { name, arguments },
                    })
                })
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();

    Ok(ChatResponse { content, tool_calls, finish_reason })
}
