use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

const DEFAULT_BASE_URL: &str = "https://api.siliconflow.cn/v1";
const DEFAULT_MODEL: &str = "Qwen/Qwen2.5-7B-Instruct";
const DEFAULT_REPORT_INTERVAL_HOURS: u64 = 8;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration file is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("critical: API Key not found")]
    MissingApiKey,
    #[error("failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct WebConfig {
    pub web_user: String,
    pub web_password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PatrolRule {
    pub name: String,
    pub command: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct HttpRule {
    pub name: String,
    pub url: String,
    pub code: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub webhook: String,
    pub telegram_token: String,
    pub telegram_chat_id: String,
    pub web: WebConfig,
    pub knowledge_file: Option<String>,
    pub debug: bool,
    pub report_interval_hours: u64,
    pub patrol_rules: Vec<PatrolRule>,
    pub http_rules: Vec<HttpRule>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            llm: LlmConfig::default(),
            webhook: String::new(),
            telegram_token: String::new(),
            telegram_chat_id: String::new(),
            web: WebConfig::default(),
            knowledge_file: None,
            debug: false,
            report_interval_hours: DEFAULT_REPORT_INTERVAL_HOURS,
            patrol_rules: Vec::new(),
            http_rules: Vec::new(),
        }
    }
}

/// Removes stray backslashes from a webhook URL, a copy-paste artifact
/// from some DingTalk webhook-URL UIs.
fn strip_backslashes(raw: &str) -> String {
    raw.replace('\\', "")
}

/// Overrides taken from the command line, applied after the config file
/// is loaded — the highest-precedence layer.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub webhook: Option<String>,
    pub web_user: Option<String>,
    pub web_password: Option<String>,
    pub knowledge_file: Option<String>,
    pub debug: bool,
}

impl AppConfig {
    /// Loads configuration from `path`. A missing file is not an error —
    /// defaults are used. A present-but-malformed file is fatal.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let raw = fs::read_to_string(path)?;
            serde_json::from_str::<AppConfig>(&raw)?
        } else {
            AppConfig::default()
        };

        config.webhook = strip_backslashes(&config.webhook);
        Ok(config)
    }

    /// Applies CLI-flag overrides, the highest-precedence configuration
    /// layer.
    pub fn apply_overrides(&mut self, overrides: CliOverrides) {
        if let Some(webhook) = overrides.webhook {
            self.webhook = strip_backslashes(&webhook);
        }
        if let Some(user) = overrides.web_user {
            self.web.web_user = user;
        }
        if let Some(password) = overrides.web_password {
            self.web.web_password = password;
        }
        if let Some(knowledge) = overrides.knowledge_file {
            self.knowledge_file = Some(knowledge);
        }
        if overrides.debug {
            self.debug = true;
        }
    }

    /// The dashboard's listener port: `PORT` environment variable, else
    /// the fixed default.
    pub fn http_port() -> u16 {
        std::env::var("PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(8080)
    }

    /// Fails with [`ConfigError::MissingApiKey`] unless an LLM API key is
    /// configured. Called once at startup by every mode that talks to the
    /// LLM.
    pub fn require_api_key(&self) -> Result<(), ConfigError> {
        if self.llm.api_key.trim().is_empty() {
            Err(ConfigError::MissingApiKey)
        } else {
            Ok(())
        }
    }

    pub fn web_auth(&self) -> Option<(&str, &str)> {
        if self.web.web_user.is_empty() || self.web.web_password.is_empty() {
            None
        } else {
            Some((&self.web.web_user, &self.web.web_password))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load_from(dir.path().join("absent.json")).unwrap();
        assert_eq!(config.llm.model, DEFAULT_MODEL);
        assert_eq!(config.report_interval_hours, DEFAULT_REPORT_INTERVAL_HOURS);
        assert!(config.require_api_key().is_err());
    }

    #[test]
    fn partial_file_overrides_only_given_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"llm": {"api_key": "secret"}}"#).unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.llm.api_key, "secret");
        assert_eq!(config.llm.base_url, DEFAULT_BASE_URL);
        assert!(config.require_api_key().is_ok());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{not json").unwrap();

        let result = AppConfig::load_from(&path);
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn webhook_backslashes_stripped_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"webhook": "https:\/\/example.com\/hook"}"#).unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.webhook, "https://example.com/hook");
    }

    #[test]
    fn cli_overrides_take_precedence() {
        let mut config = AppConfig::default();
        config.webhook = "https://old".to_string();
        config.apply_overrides(CliOverrides {
            webhook: Some("https://new".to_string()),
            debug: true,
            ..Default::default()
        });
        assert_eq!(config.webhook, "https://new");
        assert!(config.debug);
    }

    #[test]
    fn web_auth_requires_both_fields() {
        let mut config = AppConfig::default();
        assert!(config.web_auth().is_none());
        config.web.web_user = "admin".to_string();
        assert!(config.web_auth().is_none());
        config.web.web_password = "hunter2".to_string();
        assert!(config.web_auth().is_some());
    }
}
