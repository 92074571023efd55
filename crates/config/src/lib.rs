//! Configuration loading, validation, and management for the codetutor
//! backend.
//!
//! Loads configuration from `~/.codetutor/config.toml` with environment
//! variable overrides for every secret. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.codetutor/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// OpenAI API key (env: `OPENAI_API_KEY`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openai_api_key: Option<String>,

    /// Gemini API key (env: `GEMINI_API_KEY`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gemini_api_key: Option<String>,

    /// The engine every unauthorized user is downgraded to, and the default
    /// when the request names none.
    #[serde(default = "default_engine")]
    pub default_engine: String,

    /// Seconds a user must wait between chargeable calls.
    #[serde(default = "default_rate_limit_window_secs")]
    pub rate_limit_window_secs: u64,

    /// GitHub logins granted the authorized tier on sight.
    #[serde(default)]
    pub super_users: Vec<String>,

    /// Bound on LLM reply length.
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,

    /// GitHub OAuth application credentials
    #[serde(default)]
    pub github: GithubConfig,

    /// Gateway configuration
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// User-record store configuration
    #[serde(default)]
    pub store: StoreConfig,
}

fn default_engine() -> String {
    "gemini-1.5-flash".into()
}
fn default_rate_limit_window_secs() -> u64 {
    60
}
fn default_max_output_tokens() -> u32 {
    1024
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("openai_api_key", &redact(&self.openai_api_key))
            .field("gemini_api_key", &redact(&self.gemini_api_key))
            .field("default_engine", &self.default_engine)
            .field("rate_limit_window_secs", &self.rate_limit_window_secs)
            .field("super_users", &self.super_users)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("github", &self.github)
            .field("gateway", &self.gateway)
            .field("store", &self.store)
            .finish()
    }
}

/// GitHub OAuth application credentials.
///
/// The dev pair is used when the login request comes from a localhost
/// referer, so a second OAuth app can point at the local frontend.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct GithubConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id_dev: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret_dev: Option<String>,
}

impl std::fmt::Debug for GithubConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GithubConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &redact(&self.client_secret))
            .field("client_id_dev", &self.client_id_dev)
            .field("client_secret_dev", &redact(&self.client_secret_dev))
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    /// The production frontend origin. Localhost origins are always allowed
    /// in addition to this.
    #[serde(default = "default_allowed_origin")]
    pub allowed_origin: String,
}

fn default_port() -> u16 {
    8787
}
fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_allowed_origin() -> String {
    "https://codetutor.dacubeking.com".into()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            allowed_origin: default_allowed_origin(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// "sqlite" or "memory".
    #[serde(default = "default_store_backend")]
    pub backend: String,

    /// SQLite database path.
    #[serde(default = "default_store_path")]
    pub path: String,
}

fn default_store_backend() -> String {
    "sqlite".into()
}
fn default_store_path() -> String {
    "users.db".into()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_store_backend(),
            path: default_store_path(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.codetutor/config.toml),
    /// then apply environment variable overrides:
    ///
    /// - `OPENAI_API_KEY`, `GEMINI_API_KEY`
    /// - `GITHUB_CLIENT_ID`, `GITHUB_CLIENT_SECRET`
    /// - `GITHUB_CLIENT_ID_DEV`, `GITHUB_CLIENT_SECRET_DEV`
    /// - `CODETUTOR_DEFAULT_ENGINE`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;

        if config.openai_api_key.is_none() {
            config.openai_api_key = std::env::var("OPENAI_API_KEY").ok();
        }
        if config.gemini_api_key.is_none() {
            config.gemini_api_key = std::env::var("GEMINI_API_KEY").ok();
        }
        if config.github.client_id.is_none() {
            config.github.client_id = std::env::var("GITHUB_CLIENT_ID").ok();
        }
        if config.github.client_secret.is_none() {
            config.github.client_secret = std::env::var("GITHUB_CLIENT_SECRET").ok();
        }
        if config.github.client_id_dev.is_none() {
            config.github.client_id_dev = std::env::var("GITHUB_CLIENT_ID_DEV").ok();
        }
        if config.github.client_secret_dev.is_none() {
            config.github.client_secret_dev = std::env::var("GITHUB_CLIENT_SECRET_DEV").ok();
        }
        if let Ok(engine) = std::env::var("CODETUTOR_DEFAULT_ENGINE") {
            config.default_engine = engine;
        }

        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".codetutor")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rate_limit_window_secs == 0 {
            return Err(ConfigError::ValidationError(
                "rate_limit_window_secs must be at least 1".into(),
            ));
        }

        if self.max_output_tokens == 0 {
            return Err(ConfigError::ValidationError(
                "max_output_tokens must be at least 1".into(),
            ));
        }

        match self.store.backend.as_str() {
            "sqlite" | "memory" => {}
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "unknown store backend '{other}' (expected \"sqlite\" or \"memory\")"
                )));
            }
        }

        Ok(())
    }

    /// Whether the given login belongs to a configured super user.
    pub fn is_super_user(&self, login: &str) -> bool {
        self.super_users.iter().any(|u| u == login)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            gemini_api_key: None,
            default_engine: default_engine(),
            rate_limit_window_secs: default_rate_limit_window_secs(),
            super_users: vec![],
            max_output_tokens: default_max_output_tokens(),
            github: GithubConfig::default(),
            gateway: GatewayConfig::default(),
            store: StoreConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
