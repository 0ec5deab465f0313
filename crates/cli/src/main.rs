use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use hostwatch_chat::prompts::build_system_prompt;
use hostwatch_chat::ChatSession;
use hostwatch_config::{AppConfig, CliOverrides};
use hostwatch_dashboard::{AppState, Hook};
use hostwatch_llm::LlmClient;
use hostwatch_logring::LogRing;
use hostwatch_patrol::PatrolEngine;

const LOG_FILE_PREFIX: &str = "qwq.log";
const DEFAULT_CONFIG_PATH: &str = "config.json";

#[derive(Debug, Parser)]
#[command(name = "hostwatch", version, about = "Single-host AIOps control loop agent")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH, global = true)]
    config: String,
    #[arg(long, global = true)]
    webhook: Option<String>,
    #[arg(long, global = true)]
    user: Option<String>,
    #[arg(long, global = true)]
    password: Option<String>,
    #[arg(long, global = true)]
    knowledge: Option<String>,
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Interactive ReAct chat session.
    Chat,
    /// Run the patrol engine's two-cadence ticker loop until terminated.
    Patrol,
    /// Send one daily-status report and exit.
    Status,
    /// Run the dashboard HTTP server alongside the patrol engine.
    Web,
}

fn load_config(cli: &Cli) -> Result<AppConfig> {
    let mut config = AppConfig::load_from(&cli.config)?;
    config.apply_overrides(CliOverrides {
        webhook: cli.webhook.clone(),
        web_user: cli.user.clone(),
        web_password: cli.password.clone(),
        knowledge_file: cli.knowledge.clone(),
        debug: cli.debug,
    });
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let ring = Arc::new(LogRing::new(".", LOG_FILE_PREFIX));

    let result = match cli.command {
        Commands::Chat => run_chat(config, ring).await,
        Commands::Patrol => run_patrol(config, ring).await,
        Commands::Status => run_status(config, ring).await,
        Commands::Web => run_web(config, ring).await,
    };

    if let Err(err) = &result {
        eprintln!("hostwatch: {err}");
    }
    result
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        let mut sigint = signal(SignalKind::interrupt()).expect("failed to install SIGINT handler");
        tokio::select! {
            _ = sigterm.recv() => {},
            _ = sigint.recv() => {},
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
    println!("hostwatch: shutting down");
}

async fn run_chat(config: AppConfig, ring: Arc<LogRing>) -> Result<()> {
    config.require_api_key()?;
    let llm = LlmClient::new(config.llm.base_url.clone(), config.llm.api_key.clone(), config.llm.model.clone());
    let system_prompt = build_system_prompt(config.knowledge_file.as_deref(), &ring);
    let session = ChatSession::new(system_prompt);
    let client: Arc<dyn hostwatch_chat::ChatClient> = Arc::new(llm);

    tokio::select! {
        result = hostwatch_chat::repl::run(session, client, ring) => result,
        () = shutdown_signal() => Ok(()),
    }
}

async fn run_patrol(config: AppConfig, ring: Arc<LogRing>) -> Result<()> {
    config.require_api_key()?;
    let engine = Arc::new(PatrolEngine::new(config, ring));
    let (shutdown_tx, shutdown_rx) = tokio::sync::broadcast::channel(1);

    tokio::select! {
        () = engine.run(shutdown_rx) => {},
        () = shutdown_signal() => { let _ = shutdown_tx.send(()); },
    }
    Ok(())
}

async fn run_status(config: AppConfig, ring: Arc<LogRing>) -> Result<()> {
    config.require_api_key()?;
    let engine = PatrolEngine::new(config, ring);
    engine.send_system_status().await;
    Ok(())
}

async fn run_web(config: AppConfig, ring: Arc<LogRing>) -> Result<()> {
    config.require_api_key()?;
    let port = AppConfig::http_port();
    let web_auth = config.web_auth().map(|(u, p)| (u.to_string(), p.to_string()));

    let engine = Arc::new(PatrolEngine::new(config, ring.clone()));
    let (shutdown_tx, shutdown_rx) = tokio::sync::broadcast::channel(1);

    let patrol_engine = engine.clone();
    let on_patrol: Hook = {
        let engine = patrol_engine.clone();
        Arc::new(move || {
            let engine = engine.clone();
            Box::pin(async move { engine.perform_patrol().await }) as futures::future::BoxFuture<'static, ()>
        })
    };
    let on_status_report: Hook = {
        let engine = patrol_engine.clone();
        Arc::new(move || {
            let engine = engine.clone();
            Box::pin(async move { engine.send_system_status().await }) as futures::future::BoxFuture<'static, ()>
        })
    };

    let state = AppState { ring, basic_auth: web_auth, on_patrol, on_status_report };

    tokio::select! {
        result = hostwatch_dashboard::serve(state, port) => result?,
        () = engine.run(shutdown_rx) => {},
        () = shutdown_signal() => { let _ = shutdown_tx.send(()); },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_global_flags_with_subcommand() {
        let cli = Cli::parse_from(["hostwatch", "--webhook", "https://example.com", "chat"]);
        assert_eq!(cli.webhook.as_deref(), Some("https://example.com"));
        assert!(matches!(cli.command, Commands::Chat));
    }

    #[test]
    fn cli_defaults_config_path() {
        let cli = Cli::parse_from(["hostwatch", "status"]);
        assert_eq!(cli.config, DEFAULT_CONFIG_PATH);
    }

    #[test]
    fn load_config_applies_cli_overrides_over_file_and_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.json");
        std::fs::write(&config_path, r#"{"webhook": "https://from-file", "web": {"web_user": "file-user"}}"#).unwrap();

        let cli = Cli::parse_from([
            "hostwatch",
            "--config",
            config_path.to_str().unwrap(),
            "--webhook",
            "https://from-flag",
            "--debug",
            "chat",
        ]);

        let config = load_config(&cli).unwrap();
        // CLI flag beats the file's value.
        assert_eq!(config.webhook, "https://from-flag");
        // Unoverridden file value survives.
        assert_eq!(config.web.web_user, "file-user");
        // Flag with no file counterpart still applies.
        assert!(config.debug);
    }

    #[test]
    fn load_config_falls_back_to_defaults_when_file_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let missing_path = dir.path().join("absent.json");

        let cli = Cli::parse_from(["hostwatch", "--config", missing_path.to_str().unwrap(), "status"]);

        let config = load_config(&cli).unwrap();
        assert_eq!(config.webhook, "");
        assert!(!config.debug);
    }
}
