//! Configuration loading and validation for anvil.
//!
//! Loads configuration from `~/.anvil/config.toml` with environment
//! variable overrides, and validates all settings at startup.
//!
//! The working directory for shell and file tools is explicit configuration
//! here, never process-wide mutable state, so sessions stay independent and
//! testable in isolation.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// The root configuration structure.
///
/// Maps directly to `~/.anvil/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Which backend to use: "anthropic" or "local"
    #[serde(default = "default_backend")]
    pub backend: String,

    /// Anthropic Messages API settings
    #[serde(default)]
    pub anthropic: AnthropicConfig,

    /// OpenAI-compatible settings (llama.cpp server, vLLM, OpenAI, ...)
    #[serde(default)]
    pub local: LocalConfig,

    /// Maximum tokens per model response
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Message count at which context compaction triggers
    #[serde(default = "default_max_context_messages")]
    pub max_context_messages: usize,

    /// Working directory for shell commands and relative file paths
    #[serde(default = "default_working_directory")]
    pub working_directory: String,

    /// Bound on a single tool execution, in seconds
    #[serde(default = "default_tool_timeout_secs")]
    pub tool_timeout_secs: u64,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct AnthropicConfig {
    /// API key; usually supplied via `ANTHROPIC_API_KEY`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_anthropic_model")]
    pub model: String,

    #[serde(default = "default_anthropic_base_url")]
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalConfig {
    #[serde(default = "default_local_base_url")]
    pub base_url: String,

    /// llama.cpp servers ignore the key but the field must be present
    #[serde(default = "default_local_api_key")]
    pub api_key: String,

    #[serde(default = "default_local_model")]
    pub model: String,
}

fn default_backend() -> String {
    "local".into()
}
fn default_max_tokens() -> u32 {
    8192
}
fn default_max_context_messages() -> usize {
    40
}
fn default_working_directory() -> String {
    ".".into()
}
fn default_tool_timeout_secs() -> u64 {
    30
}
fn default_anthropic_model() -> String {
    "claude-sonnet-4-20250514".into()
}
fn default_anthropic_base_url() -> String {
    "https://api.anthropic.com".into()
}
fn default_local_base_url() -> String {
    "http://localhost:8080/v1".into()
}
fn default_local_api_key() -> String {
    "sk-no-key".into()
}
fn default_local_model() -> String {
    "local".into()
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_anthropic_model(),
            base_url: default_anthropic_base_url(),
        }
    }
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            base_url: default_local_base_url(),
            api_key: default_local_api_key(),
            model: default_local_model(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            anthropic: AnthropicConfig::default(),
            local: LocalConfig::default(),
            max_tokens: default_max_tokens(),
            max_context_messages: default_max_context_messages(),
            working_directory: default_working_directory(),
            tool_timeout_secs: default_tool_timeout_secs(),
        }
    }
}

impl std::fmt::Debug for AnthropicConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicConfig")
            .field(
                "api_key",
                &match self.api_key {
                    Some(_) => "[REDACTED]",
                    None => "None",
                },
            )
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("backend", &self.backend)
            .field("anthropic", &self.anthropic)
            .field("local", &self.local)
            .field("max_tokens", &self.max_tokens)
            .field("max_context_messages", &self.max_context_messages)
            .field("working_directory", &self.working_directory)
            .field("tool_timeout_secs", &self.tool_timeout_secs)
            .finish()
    }
}

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

impl AppConfig {
    /// Load configuration from the default path (`~/.anvil/config.toml`)
    /// with environment variable overrides:
    ///
    /// - `ANVIL_BACKEND` — backend selection ("anthropic" or "local")
    /// - `ANVIL_MODEL` — model for the selected backend
    /// - `ANTHROPIC_API_KEY` — Anthropic key
    /// - `ANVIL_LOCAL_BASE_URL` — OpenAI-compatible endpoint
    /// - `ANVIL_WORKING_DIR` — tool working directory
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        if !config_path.exists() {
            Self::write_default(&config_path);
        }
        let mut config = Self::load_from(&config_path)?;

        if let Ok(backend) = std::env::var("ANVIL_BACKEND") {
            config.backend = backend;
        }
        if config.anthropic.api_key.is_none() {
            config.anthropic.api_key = std::env::var("ANTHROPIC_API_KEY").ok();
        }
        if let Ok(model) = std::env::var("ANVIL_MODEL") {
            if config.backend == "anthropic" {
                config.anthropic.model = model;
            } else {
                config.local.model = model;
            }
        }
        if let Ok(base_url) = std::env::var("ANVIL_LOCAL_BASE_URL") {
            config.local.base_url = base_url;
        }
        if let Ok(dir) = std::env::var("ANVIL_WORKING_DIR") {
            config.working_directory = dir;
        }

        config.validate()?;
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
        dirs_home().join(".anvil")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.backend.as_str() {
            "anthropic" | "local" => {}
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "unknown backend '{other}' (expected 'anthropic' or 'local')"
                )));
            }
        }
        if self.max_context_messages == 0 {
            return Err(ConfigError::ValidationError(
                "max_context_messages must be positive".into(),
            ));
        }
        if self.tool_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "tool_timeout_secs must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }

    /// Write a default config file on first run. Best-effort: a read-only
    /// home directory is not an error, the defaults apply either way.
    fn write_default(path: &Path) {
        if let Some(parent) = path.parent()
            && std::fs::create_dir_all(parent).is_err()
        {
            return;
        }
        match std::fs::write(path, Self::default_toml()) {
            Ok(()) => tracing::info!("Wrote default config to {}", path.display()),
            Err(e) => tracing::warn!("Could not write default config: {e}"),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("."))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("."))
    }
}
