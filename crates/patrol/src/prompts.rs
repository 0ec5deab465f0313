//! The patrol analysis prompt contract: the model must respond with
//! exactly two lines, or the literal failure string, never an explanation.

use std::time::Duration;

use hostwatch_llm::{ChatMessage, LlmClient};

pub const PATROL_SYSTEM_PROMPT: &str = "\
你是一名紧急响应工程师。你会收到一份或多份异常证据。只输出两行，不要任何其他解释：\n\
原因：<一句话说明原因>\n\
修复：<一条可执行的修复命令>\n\
如果证据是僵尸进程列表，解读第二列 PPID，并给出 `kill -9 <PPID>` 作为修复命令。\n\
如果证据只有表头、没有数据行，输出“误报，无异常”。\n\
绝不编造数据，绝不添加额外说明。";

const ANALYSIS_TIMEOUT: Duration = Duration::from_secs(30);
pub const AI_TRANSPORT_FAILURE: &str = "AI 连接失败";

/// Sends the joined evidence blocks to the LLM under the patrol system
/// prompt and returns its two-line verdict. Any transport failure, empty
/// response, or timeout is replaced by the literal [`AI_TRANSPORT_FAILURE`]
/// string so the alert still reaches the operator.
pub async fn analyze(llm: &LlmClient, evidence_blocks: &[String]) -> String {
    let joined = evidence_blocks.join("\n\n");
    let messages = vec![ChatMessage::system(PATROL_SYSTEM_PROMPT), ChatMessage::user(joined)];

    tracing::debug!(anomaly_count = evidence_blocks.len(), "patrol: requesting LLM analysis");
    match tokio::time::timeout(ANALYSIS_TIMEOUT, llm.chat(&messages, None)).await {
        Ok(Ok(response)) if !response.content.trim().is_empty() => response.content,
        Ok(Ok(_)) => {
            tracing::warn!("patrol: LLM analysis returned empty content");
            AI_TRANSPORT_FAILURE.to_string()
        }
        Ok(Err(err)) => {
            tracing::warn!(%err, "patrol: LLM analysis call failed");
            AI_TRANSPORT_FAILURE.to_string()
        }
        Err(_) => {
            tracing::warn!("patrol: LLM analysis timed out");
            AI_TRANSPORT_FAILURE.to_string()
        }
    }
}
