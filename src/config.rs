//! Teleassist configuration management
//!
//! Configuration is layered: built-in defaults, then an optional TOML file,
//! then environment variables (after loading `.env`). Secrets are normally
//! supplied through the environment only.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable holding the Telegram bot token
pub const ENV_TELEGRAM_TOKEN: &str = "TELEGRAM_TOKEN";
/// Environment variable holding the MongoDB connection string
pub const ENV_MONGODB_URI: &str = "MONGODB_URI";
/// Environment variable holding the Gemini API key
pub const ENV_GEMINI_API_KEY: &str = "GEMINI_API_KEY";
/// Environment variable holding the SerpAPI key
pub const ENV_SERPAPI_KEY: &str = "SERPAPI_KEY";

/// Main Teleassist configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Telegram channel configuration
    pub telegram: TelegramConfig,

    /// Generative-AI backend configuration
    pub ai: AiConfig,

    /// Web search backend configuration
    pub search: SearchConfig,

    /// Document store configuration
    pub storage: StorageConfig,

    /// File processing limits
    pub files: FilesConfig,

    /// Health endpoint configuration
    pub health: HealthConfig,
}

/// Telegram channel configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    /// Bot token (usually from `TELEGRAM_TOKEN`)
    pub bot_token: String,

    /// Bot API base URL
    pub api_base: String,

    /// Long-poll timeout passed to `getUpdates`, in seconds
    pub poll_timeout_secs: u64,

    /// Delay before polling again after a failed `getUpdates`, in seconds
    pub retry_delay_secs: u64,

    /// Discard updates that queued up while the bot was offline
    pub drop_pending_updates: bool,

    /// Allowed user IDs (empty = all allowed)
    pub allowed_users: Vec<i64>,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            api_base: "https://api.telegram.org".to_string(),
            poll_timeout_secs: 30,
            retry_delay_secs: 5,
            drop_pending_updates: true,
            allowed_users: Vec::new(),
        }
    }
}

/// Generative-AI (Gemini) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    /// API key (usually from `GEMINI_API_KEY`)
    pub api_key: String,

    /// REST base URL, up to and including the API version
    pub base_url: String,

    /// Model used for text prompts
    pub chat_model: String,

    /// Model used for image and audio prompts
    pub vision_model: String,

    /// Sampling temperature
    pub temperature: f32,

    /// Output token ceiling
    pub max_output_tokens: u32,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            chat_model: "gemini-1.5-flash".to_string(),
            vision_model: "gemini-1.5-flash".to_string(),
            temperature: 0.7,
            max_output_tokens: 2048,
            timeout_secs: 60,
        }
    }
}

/// Web search (SerpAPI) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// API key (usually from `SERPAPI_KEY`)
    pub api_key: String,

    /// SerpAPI base URL
    pub base_url: String,

    /// Search engine parameter
    pub engine: String,

    /// Number of results to return
    pub num_results: usize,

    /// Country code (`gl`)
    pub country: String,

    /// Interface language (`hl`)
    pub language: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://serpapi.com".to_string(),
            engine: "google".to_string(),
            num_results: 5,
            country: "us".to_string(),
            language: "en".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Document store backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    /// MongoDB (default)
    #[default]
    Mongodb,

    /// Process memory, lost on restart
    Memory,
}

/// Document store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Backend selection
    pub backend: StorageBackend,

    /// Connection string (usually from `MONGODB_URI`)
    pub uri: String,

    /// Database name
    pub database: String,

    /// Server selection timeout in seconds
    pub connect_timeout_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Mongodb,
            uri: String::new(),
            database: "telegram_bot".to_string(),
            connect_timeout_secs: 5,
        }
    }
}

/// File processing limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilesConfig {
    /// Largest document accepted for download, in bytes
    pub max_bytes: u64,

    /// Characters of extracted text forwarded to the AI
    pub max_prompt_chars: usize,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            max_bytes: 20 * 1024 * 1024,
            max_prompt_chars: 4000,
        }
    }
}

/// Health endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    /// Serve `/health` and `/status`
    pub enabled: bool,

    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            host: "127.0.0.1".to_string(),
            port: 18790,
        }
    }
}

impl AppConfig {
    /// Parse a TOML configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))
    }

    /// Load configuration: explicit file, else the default file if present,
    /// else defaults; then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match default_config_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                _ => Self::default(),
            },
        };

        // Missing .env is not an error
        let _ = dotenv::dotenv();

        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Overlay secrets from an environment lookup. Empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(token) = get(ENV_TELEGRAM_TOKEN) {
            self.telegram.bot_token = token;
        }
        if let Some(uri) = get(ENV_MONGODB_URI) {
            self.storage.uri = uri;
        }
        if let Some(key) = get(ENV_GEMINI_API_KEY) {
            self.ai.api_key = key;
        }
        if let Some(key) = get(ENV_SERPAPI_KEY) {
            self.search.api_key = key;
        }
    }

    /// Check that everything needed to run the bot is present
    pub fn validate(&self) -> Result<()> {
        if self.telegram.bot_token.is_empty() {
            return Err(Error::Config(format!(
                "Telegram bot token missing (set {})",
                ENV_TELEGRAM_TOKEN
            )));
        }
        if self.storage.backend == StorageBackend::Mongodb && self.storage.uri.is_empty() {
            return Err(Error::Config(format!(
                "MongoDB URI missing (set {} or use the memory backend)",
                ENV_MONGODB_URI
            )));
        }
        if self.search.num_results == 0 {
            return Err(Error::Config("search.num_results must be at least 1".to_string()));
        }
        if self.ai.api_key.is_empty() {
            tracing::warn!("{} not set; AI requests will be rejected", ENV_GEMINI_API_KEY);
        }
        if self.search.api_key.is_empty() {
            tracing::warn!("{} not set; web search will be rejected", ENV_SERPAPI_KEY);
        }
        Ok(())
    }

    /// Copy with secrets masked, for display
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        copy.telegram.bot_token = mask(&copy.telegram.bot_token);
        copy.ai.api_key = mask(&copy.ai.api_key);
        copy.search.api_key = mask(&copy.search.api_key);
        copy.storage.uri = mask(&copy.storage.uri);
        copy
    }
}

/// Default config file location (`<config_dir>/teleassist/config.toml`)
pub fn default_config_path() -> Option<PathBuf> {
    dirs_next::config_dir().map(|p| p.join("teleassist").join("config.toml"))
}

fn mask(secret: &str) -> String {
    if secret.is_empty() {
        String::new()
    } else {
        let visible: String = secret.chars().take(4).collect();
        format!("{}****", visible)
    }
}
