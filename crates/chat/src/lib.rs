//! The interactive ReAct chat loop: system prompt construction, the
//! bounded tool-calling loop, the file-save heuristic, and the REPL driver.

pub mod client;
pub mod filesave;
pub mod prompts;
pub mod react;
pub mod repl;

pub use client::{ChatClient, ScriptedClient};
pub use react::{ChatSession, Confirmer, StdinConfirmer};
