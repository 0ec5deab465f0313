//! The bounded ReAct loop: one user turn in, at most 5 LLM calls, tool
//! pairing preserved in the message slice.

use std::collections::HashMap;
use std::io::Write as _;
use std::sync::Arc;

use hostwatch_llm::{execute_shell_command_tool, ChatMessage, ChatRole};
use hostwatch_logring::LogRing;
use hostwatch_risk::{is_command_safe, is_read_only, redact};
use hostwatch_sandbox::execute;

use crate::client::ChatClient;
use crate::filesave::save_fenced_files;

const MAX_TOOL_ROUNDS: usize = 5;

/// Confirms execution of a non-read-only command by prompting the operator
/// on stdin, default Y. Swapped out in tests.
pub trait Confirmer: Send + Sync {
    fn confirm(&self, command: &str) -> bool;
}

pub struct StdinConfirmer;

impl Confirmer for StdinConfirmer {
    fn confirm(&self, command: &str) -> bool {
        print!("即将执行：{command}  是否继续？[Y/n] ");
        let _ = std::io::stdout().flush();
        let mut line = String::new();
        if std::io::stdin().read_line(&mut line).is_err() {
            return true;
        }
        let answer = line.trim().to_lowercase();
        answer.is_empty() || answer == "y" || answer == "yes"
    }
}

pub struct ChatSession {
    pub messages: Vec<ChatMessage>,
    static_responses: HashMap<String, String>,
    quick_commands: HashMap<String, String>,
}

impl ChatSession {
    pub fn new(system_prompt: String) -> Self {
        Self {
            messages: vec![ChatMessage::system(system_prompt)],
            static_responses: HashMap::new(),
            quick_commands: HashMap::new(),
        }
    }

    pub fn with_static_responses(mut self, table: HashMap<String, String>) -> Self {
        self.static_responses = table;
        self
    }

    pub fn with_quick_commands(mut self, table: HashMap<String, String>) -> Self {
        self.quick_commands = table;
        self
    }

    /// Runs one user turn. Returns the text to render to the operator, or
    /// `None` when a quick command already printed its own raw output.
    pub async fn turn(
        &mut self,
        line: &str,
        client: &Arc<dyn ChatClient>,
        ring: &LogRing,
        confirmer: &dyn Confirmer,
    ) -> Option<String> {
        if let Some(response) = self.static_responses.get(line) {
            return Some(response.clone());
        }

        if let Some(command) = self.quick_commands.get(line) {
            let output = execute(command).await;
            return Some(output);
        }

        let redacted = redact(line);
        self.messages.push(ChatMessage::user(redacted));

        let tools = execute_shell_command_tool();
        let mut final_content = String::new();

        for round in 0..MAX_TOOL_ROUNDS {
            let effective_tools = if round < MAX_TOOL_ROUNDS - 1 { Some(&tools) } else { None };

            tracing::debug!(round, message_count = self.messages.len(), "chat: calling LLM");
            let response = match client.chat(&self.messages, effective_tools).await {
                Ok(response) => response,
                Err(err) => {
                    tracing::warn!(round, %err, "chat: LLM call failed");
                    ring.append(format!("chat: LLM call failed: {err}"));
                    return Some(format!("AI 请求失败：{err}"));
                }
            };

            if response.tool_calls.is_empty() {
                final_content = response.content;
                break;
            }

            self.messages.push(ChatMessage {
                role: ChatRole::Assistant,
                content: if response.content.is_empty() { None } else { Some(response.content.clone()) },
                tool_calls: response.tool_calls.clone(),
                tool_call_id: None,
            });

            for call in &response.tool_calls {
                tracing::debug!(tool = %call.function.name, id = %call.id, "chat: dispatching tool call");
                let tool_output = self.run_tool_call(call, confirmer).await;
                self.messages.push(ChatMessage::tool_result(&call.id, tool_output));
            }
        }

        if !final_content.is_empty() {
            save_fenced_files(&final_content, ring);
        }

        Some(final_content)
    }

    async fn run_tool_call(&self, call: &hostwatch_llm::ToolCall, confirmer: &dyn Confirmer) -> String {
        if call.function.name != "execute_shell_command" {
            return "Error: unknown tool.".to_string();
        }

        let Some(command) = call.function.arguments.get("command").and_then(|v| v.as_str()) else {
            return "Error: missing command argument.".to_string();
        };
        let command = command.trim();
        if command.is_empty() {
            return "Error: empty command.".to_string();
        }

        if !is_command_safe(command) {
            tracing::warn!(command, "chat: tool call blocked by deny list");
            return "Error: Blocked.".to_string();
        }

        if !is_read_only(command) && !confirmer.confirm(command) {
            tracing::debug!(command, "chat: operator denied non-read-only command");
            return "User denied.".to_string();
        }

        let output = execute(command).await;
        if output.trim().is_empty() {
            "(No output)".to_string()
        } else {
            output
        }
    }
}
