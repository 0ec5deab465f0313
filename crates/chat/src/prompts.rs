//! The chat system prompt contract plus the knowledge-file injection policy.

use std::fs;
use std::path::Path;

use hostwatch_logring::LogRing;

const BASE_SYSTEM_PROMPT: &str = "\
你是一名资深 Linux 运维工程师，负责协助用户诊断和修复主机问题。\n\
用中文回答。遇到复杂问题，先收集信息，再给出下一步操作，不要一次性堆砌所有可能性。\n\
绝不能编造命令输出：如果某条命令返回 `exit status 1` 或空结果，必须如实告知用户“未找到”或“执行失败”，\n\
不要假装命令成功并编造内容。\n\
只读类命令（如 ls、cat、ps、df 等）可以直接执行，无需确认。";

/// 64 KiB: large enough for a real knowledge document, small enough to stay
/// well under typical context windows once combined with the rest of the
/// prompt and conversation history.
const KNOWLEDGE_FILE_CEILING_BYTES: u64 = 64 * 1024;

/// Builds the system prompt, injecting the knowledge file's contents under
/// an "internal knowledge base" heading when one is configured and under
/// the size ceiling. Oversize files are skipped (not truncated) and the
/// skip is logged, so the chat session still functions.
pub fn build_system_prompt(knowledge_file: Option<&str>, ring: &LogRing) -> String {
    let mut prompt = BASE_SYSTEM_PROMPT.to_string();

    let Some(path) = knowledge_file else {
        return prompt;
    };
    let path = Path::new(path);

    match fs::metadata(path) {
        Ok(meta) if meta.len() > KNOWLEDGE_FILE_CEILING_BYTES => {
            ring.append(format!(
                "chat: knowledge file {} exceeds {} bytes, skipping injection",
                path.display(),
                KNOWLEDGE_FILE_CEILING_BYTES
            ));
        }
        Ok(_) => match fs::read_to_string(path) {
            Ok(contents) => {
                prompt.push_str("\n\n## 内部知识库\n\n");
                prompt.push_str(&contents);
            }
            Err(err) => {
                ring.append(format!("chat: failed to read knowledge file {}: {err}", path.display()));
            }
        },
        Err(err) => {
            ring.append(format!("chat: knowledge file {} not found: {err}", path.display()));
        }
    }

    prompt
}
