//! The interactive REPL: rustyline with file-backed history, Ctrl-C
//! returning to the prompt and exiting on an empty line.

use std::sync::Arc;

use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use hostwatch_logring::LogRing;

use crate::client::ChatClient;
use crate::react::{ChatSession, StdinConfirmer};

const HISTORY_FILE: &str = ".hostwatch_history";

pub async fn run(mut session: ChatSession, client: Arc<dyn ChatClient>, ring: Arc<LogRing>) -> anyhow::Result<()> {
    let mut editor = DefaultEditor::new()?;
    let _ = editor.load_history(HISTORY_FILE);
    let confirmer = StdinConfirmer;
    let mut last_line_was_empty = true;

    loop {
        match editor.readline("hostwatch> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    last_line_was_empty = true;
                    continue;
                }
                last_line_was_empty = false;
                let _ = editor.add_history_entry(line);

                if let Some(reply) = session.turn(line, &client, &ring, &confirmer).await {
                    println!("{reply}");
                }
            }
            // Ctrl-C returns to the prompt, unless it was already empty, in
            // which case it ends the session — mirroring a shell's behavior
            // of a second interrupt confirming the intent to quit.
            Err(ReadlineError::Interrupted) => {
                if last_line_was_empty {
                    break;
                }
                last_line_was_empty = true;
                continue;
            }
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                ring.append(format!("chat: readline error: {err}"));
                break;
            }
        }
    }

    let _ = editor.save_history(HISTORY_FILE);
    Ok(())
}
