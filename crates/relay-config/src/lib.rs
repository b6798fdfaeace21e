use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

use relay_core::ChatDefaults;
use serde::{Deserialize, Serialize};
use tracing::info;

// ─────────────────────────────────────────────────────────────────────────────
// Defaults
// ─────────────────────────────────────────────────────────────────────────────

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
pub const DEFAULT_MODEL: &str = "llama3.2";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";
pub const DEFAULT_TEMPERATURE: f64 = 0.7;
pub const DEFAULT_MAX_TOKENS: u32 = 2000;
pub const DEFAULT_CHAT_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_STATUS_TIMEOUT_SECS: u64 = 3;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful healthcare assistant.

Guidelines:
- Provide general health information and guidance
- Do not provide specific medical diagnoses or treatment plans
- Always recommend consulting with a healthcare professional for specific medical concerns
- Be empathetic and supportive
- Provide evidence-based information when possible
- Clearly state when you don't know something
- Focus on general wellness advice and educational information
- Maintain user privacy and confidentiality";

/// Names the JSON config file read by [`RelayConfig::load`].
pub const CONFIG_PATH_VAR: &str = "RELAY_CONFIG";

// ─────────────────────────────────────────────────────────────────────────────
// Error
// ─────────────────────────────────────────────────────────────────────────────

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

// ─────────────────────────────────────────────────────────────────────────────
// Config
// ─────────────────────────────────────────────────────────────────────────────

/// Process-wide relay settings, fixed at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub ollama_url: String,
    pub model: String,
    pub system_prompt: String,
    pub temperature: f64,
    pub max_tokens: u32,
    pub chat_timeout_secs: u64,
    pub status_timeout_secs: u64,
    pub bind_addr: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            ollama_url: DEFAULT_OLLAMA_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            chat_timeout_secs: DEFAULT_CHAT_TIMEOUT_SECS,
            status_timeout_secs: DEFAULT_STATUS_TIMEOUT_SECS,
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
        }
    }
}

impl RelayConfig {
    /// Builds the config from the optional file named by `RELAY_CONFIG`,
    /// then applies environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let base = match env::var(CONFIG_PATH_VAR) {
            Ok(path) => {
                info!("Loading relay config from {}", path);
                Self::from_file(Path::new(&path))?
            }
            Err(_) => Self::default(),
        };

        base.with_overrides(|key| env::var(key).ok())
    }

    /// Reads a JSON config file. Missing fields keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config: RelayConfig = serde_json::from_str(&content)?;
        Ok(config.normalized())
    }

    /// Applies overrides from `lookup`, keyed by environment variable name.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("OLLAMA_API_URL") {
            self.ollama_url = url;
        }
        if let Some(model) = lookup("OLLAMA_MODEL") {
            self.model = model;
        }
        if let Some(prompt) = lookup("RELAY_SYSTEM_PROMPT") {
            self.system_prompt = prompt;
        }
        if let Some(addr) = lookup("RELAY_BIND_ADDR") {
            self.bind_addr = addr;
        }
        if let Some(raw) = lookup("RELAY_TEMPERATURE") {
            self.temperature = parse_value("RELAY_TEMPERATURE", raw)?;
        }
        if let Some(raw) = lookup("RELAY_MAX_TOKENS") {
            self.max_tokens = parse_value("RELAY_MAX_TOKENS", raw)?;
        }
        if let Some(raw) = lookup("RELAY_CHAT_TIMEOUT") {
            self.chat_timeout_secs = parse_value("RELAY_CHAT_TIMEOUT", raw)?;
        }
        if let Some(raw) = lookup("RELAY_STATUS_TIMEOUT") {
            self.status_timeout_secs = parse_value("RELAY_STATUS_TIMEOUT", raw)?;
        }

        Ok(self.normalized())
    }

    fn normalized(mut self) -> Self {
        let trimmed = self.ollama_url.trim_end_matches('/').len();
        self.ollama_url.truncate(trimmed);
        self
    }

    pub fn chat_defaults(&self) -> ChatDefaults {
        ChatDefaults {
            system_prompt: self.system_prompt.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }

    pub fn chat_timeout(&self) -> Duration {
        Duration::from_secs(self.chat_timeout_secs)
    }

    pub fn status_timeout(&self) -> Duration {
        Duration::from_secs(self.status_timeout_secs)
    }
}

fn parse_value<T: std::str::FromStr>(key: &'static str, raw: String) -> Result<T, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue { key, value: raw })
}
