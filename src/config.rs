use anyhow::{Context, Result};
use std::path::PathBuf;

pub const DEFAULT_OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";

#[derive(Debug, Clone)]
pub struct Config {
    // Storage
    pub data_dir: PathBuf,

    // Server
    pub port: u16,
    /// Required in `X-API-Key` on mutating routes when set
    pub api_key: Option<String>,

    // Fallback translator (OpenAI); disabled without a key
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub openai_api_url: String,

    // History
    pub history_limit: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let config = Self {
            data_dir: std::env::var("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("data")),

            port: std::env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(8080),
            api_key: non_empty_var("API_KEY"),

            openai_api_key: non_empty_var("OPENAI_API_KEY"),
            openai_model: std::env::var("OPENAI_MODEL")
                .unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            openai_api_url: std::env::var("OPENAI_API_URL")
                .unwrap_or_else(|_| DEFAULT_OPENAI_API_URL.to_string()),

            history_limit: std::env::var("HISTORY_LIMIT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(200),
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        reqwest::Url::parse(&self.openai_api_url)
            .with_context(|| format!("OPENAI_API_URL is not a valid URL: {}", self.openai_api_url))?;
        if self.data_dir.as_os_str().is_empty() {
            anyhow::bail!("DATA_DIR must not be empty");
        }
        Ok(())
    }
}

/// Unset and blank variables both read as `None`.
fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: &[&str] = &[
        "DATA_DIR",
        "PORT",
        "API_KEY",
        "OPENAI_API_KEY",
        "OPENAI_MODEL",
        "OPENAI_API_URL",
        "HISTORY_LIMIT",
    ];

    fn clear_env() {
        for var in VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_defaults() {
        clear_env();
        let config = Config::from_env().unwrap();

        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert_eq!(config.port, 8080);
        assert_eq!(config.api_key, None);
        assert_eq!(config.openai_api_key, None);
        assert_eq!(config.openai_model, "gpt-4o-mini");
        assert_eq!(config.openai_api_url, DEFAULT_OPENAI_API_URL);
        assert_eq!(config.history_limit, 200);
    }

    #[test]
    #[serial]
    fn test_overrides() {
        clear_env();
        std::env::set_var("DATA_DIR", "/tmp/lexicon");
        std::env::set_var("PORT", "9000");
        std::env::set_var("API_KEY", "editor-key");
        std::env::set_var("OPENAI_API_KEY", "sk-test");
        std::env::set_var("HISTORY_LIMIT", "50");

        let config = Config::from_env().unwrap();
        clear_env();

        assert_eq!(config.data_dir, PathBuf::from("/tmp/lexicon"));
        assert_eq!(config.port, 9000);
        assert_eq!(config.api_key.as_deref(), Some("editor-key"));
        assert_eq!(config.openai_api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.history_limit, 50);
    }

    #[test]
    #[serial]
    fn test_invalid_numbers_fall_back_to_defaults() {
        clear_env();
        std::env::set_var("PORT", "not-a-port");
        std::env::set_var("HISTORY_LIMIT", "-3");

        let config = Config::from_env().unwrap();
        clear_env();

        assert_eq!(config.port, 8080);
        assert_eq!(config.history_limit, 200);
    }

    #[test]
    #[serial]
    fn test_blank_api_key_disables_auth() {
        clear_env();
        std::env::set_var("API_KEY", "   ");

        let config = Config::from_env().unwrap();
        clear_env();

        assert_eq!(config.api_key, None);
    }

    #[test]
    #[serial]
    fn test_invalid_openai_url_is_rejected() {
        clear_env();
        std::env::set_var("OPENAI_API_URL", "not a url");

        let result = Config::from_env();
        clear_env();

        assert!(result.is_err());
    }
}
