//! Runtime configuration.
//!
//! Defaults mirror the backend's shipped settings: mock responses on,
//! `gpt-4o` with a 500 token reply budget. Values can come from a TOML file
//! or from environment variables.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1/chat/completions";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    pub api_key: Option<String>,
    pub model: String,
    /// Reply budget for the pipeline path.
    pub max_tokens: u32,
    /// Per-iteration budget for the agent loop.
    pub agent_max_tokens: u32,
    pub base_url: String,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gpt-4o".to_string(),
            max_tokens: 500,
            agent_max_tokens: 1000,
            base_url: DEFAULT_OPENAI_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Serve canned replies instead of calling the model.
    pub use_mock: bool,
    pub db_path: PathBuf,
    pub openai: OpenAiConfig,
    /// Upper bound on a single `process` call, mock delays included.
    pub request_timeout_secs: u64,
    /// Fixed seed for mock reply selection and delays.
    pub mock_seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            use_mock: true,
            db_path: PathBuf::from("db/wowli.sqlite"),
            openai: OpenAiConfig::default(),
            request_timeout_secs: 60,
            mock_seed: None,
        }
    }
}

impl Config {
    /// Defaults overlaid with any `WOWLI_*` / `OPENAI_API_KEY` variables.
    pub fn from_env() -> Result<Self> {
        let mut config = Config::default();

        if let Ok(v) = env::var("WOWLI_USE_MOCK") {
            config.use_mock = parse_bool(&v)
                .ok_or_else(|| Error::Config(format!("WOWLI_USE_MOCK: not a boolean: {v}")))?;
        }
        if let Ok(v) = env::var("WOWLI_DB_PATH") {
            config.db_path = PathBuf::from(v);
        }
        if let Ok(v) = env::var("OPENAI_API_KEY") {
            if !v.trim().is_empty() {
                config.openai.api_key = Some(v);
            }
        }
        if let Ok(v) = env::var("WOWLI_MODEL") {
            config.openai.model = v;
        }
        if let Ok(v) = env::var("WOWLI_OPENAI_URL") {
            config.openai.base_url = v;
        }
        if let Ok(v) = env::var("WOWLI_REQUEST_TIMEOUT_SECS") {
            config.request_timeout_secs = v
                .parse()
                .map_err(|_| Error::Config(format!("WOWLI_REQUEST_TIMEOUT_SECS: not a number: {v}")))?;
        }
        if let Ok(v) = env::var("WOWLI_MOCK_SEED") {
            config.mock_seed = Some(
                v.parse()
                    .map_err(|_| Error::Config(format!("WOWLI_MOCK_SEED: not a number: {v}")))?,
            );
        }

        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(raw).map_err(|e| Error::Config(format!("invalid TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_toml_str(&raw)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.request_timeout_secs == 0 {
            return Err(Error::Config("request_timeout_secs must be positive".to_string()));
        }
        if !self.use_mock && self.openai.api_key.is_none() {
            return Err(Error::Config(
                "live mode needs an OpenAI API key (OPENAI_API_KEY)".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
