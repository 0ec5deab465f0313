//! Executes shell commands on the host and renders a faithful text
//! representation of the result, enforcing the destructive-command deny
//! list and an output size ceiling. The sandbox itself never fails: every
//! outcome, including a spawn error, is expressed as returned text.

use hostwatch_risk::is_command_safe;

pub mod stats;

const MAX_OUTPUT_BYTES: usize = 4000;

/// Runs `command` via `sh -c` and returns the combined stdout+stderr,
/// wrapped with a `(Command failed: …)` suffix on nonzero exit and
/// truncated to [`MAX_OUTPUT_BYTES`] with a `...(Output truncated)`
/// marker when it overflows.
///
/// Commands matching the destructive-command deny list are rejected
/// before a process is ever spawned.
pub async fn execute(command: &str) -> String {
    if !is_command_safe(command) {
        tracing::warn!(command, "sandbox: command blocked by deny list");
        return "Error: Blocked.".to_string();
    }

    let output = tokio::process::Command::new("sh")
        .arg("-c")
        .arg(command)
        .output()
        .await;

    let rendered = match output {
        Ok(output) => {
            let stdout = String::from_utf8_lossy(&output.stdout);
            let stderr = String::from_utf8_lossy(&output.stderr);
            let combined = if stderr.is_empty() {
                stdout.to_string()
            } else if stdout.is_empty() {
                stderr.to_string()
            } else {
                format!("{stdout}\n{stderr}")
            };

            if output.status.success() {
                combined
            } else {
                let error = format!("exit status {}", exit_code_text(&output.status));
                format!("{combined}(Command failed: {error})")
            }
        }
        Err(err) => format!("(Command failed: {err})"),
    };

    truncate(rendered)
}

fn exit_code_text(status: &std::process::ExitStatus) -> String {
    match status.code() {
        Some(code) => code.to_string(),
        None => "signal".to_string(),
    }
}

fn truncate(text: String) -> String {
    if text.len() <= MAX_OUTPUT_BYTES {
        return text;
    }
    let mut end = MAX_OUTPUT_BYTES;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}\n...(Output truncated)", &text[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn successful_command_returns_stdout() {
        let result = execute("echo hello").await;
        assert_eq!(result, "hello\n");
    }

    #[tokio::test]
    async fn failing_command_is_wrapped() {
        let result = execute("sh -c 'echo oops 1>&2; exit 1'").await;
        assert!(result.contains("oops"));
        assert!(result.contains("(Command failed: "));
        assert!(result.ends_with(")"));
    }

    #[tokio::test]
    async fn empty_failure_still_wraps() {
        let result = execute("false").await;
        assert_eq!(result, "(Command failed: exit status 1)");
    }

    #[tokio::test]
    async fn long_output_is_truncated() {
        let result = execute("yes x | head -c 10000").await;
        assert!(result.ends_with("...(Output truncated)"));
        assert!(result.len() < 10000);
    }

    #[tokio::test]
    async fn deny_list_blocks_without_spawning() {
        let result = execute("rm -rf /").await;
        assert_eq!(result, "Error: Blocked.");
    }

    #[tokio::test]
    async fn deny_list_blocks_fork_bomb() {
        let result = execute(":(){ :|:& };:").await;
        assert_eq!(result, "Error: Blocked.");
    }
}
