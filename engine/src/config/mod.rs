//! Configuration management
//!
//! This module handles loading, validation, and management of the MedAssist
//! configuration. Configuration is stored in TOML format at
//! ~/.medassist/config.toml.
//!
//! # Configuration Sections
//!
//! - **core**: Log level
//! - **assistant**: Remote backend model, endpoint, credential variable, timeout,
//!   persona instruction, history budget and disclaimer enforcement
//! - **conversation**: Greeting and "chat cleared" texts
//!
//! The backend key itself never lives in this file. `assistant.api_key_env` names
//! the environment variable it is read from (the OS keychain is consulted when
//! that variable is unset).
//!
//! # Examples
//!
//! ```no_run
//! use medassist_engine::config::Config;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let (config, _origin) = Config::load_or_create()?;
//! println!("Model: {}", config.assistant.model);
//! # Ok(())
//! # }
//! ```

use sdk::errors::EngineError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Where a loaded configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigOrigin {
    /// Read from an existing file
    Loaded(PathBuf),

    /// Defaults written to this path on first run
    Created(PathBuf),
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Core settings
    #[serde(default)]
    pub core: CoreConfig,

    /// Remote assistant settings
    #[serde(default)]
    pub assistant: AssistantConfig,

    /// Conversation texts
    #[serde(default)]
    pub conversation: ConversationConfig,
}

/// Core configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Remote assistant configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantConfig {
    /// Base URL for the Gemini API
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model name
    #[serde(default = "default_model")]
    pub model: String,

    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Upper bound for a single backend call (seconds)
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Append the clinical disclaimer to remote replies that lack it
    #[serde(default = "default_true")]
    pub enforce_disclaimer: bool,

    /// Persona instruction sent with every exchange
    #[serde(default = "default_system_instruction")]
    pub system_instruction: String,

    /// Estimated token budget for the hidden session history
    #[serde(default = "default_context_limit_tokens")]
    pub context_limit_tokens: usize,
}

impl AssistantConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Conversation texts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationConfig {
    /// First message of every new conversation
    #[serde(default = "default_greeting")]
    pub greeting: String,

    /// The single message left after the conversation is cleared
    #[serde(default = "default_cleared_message")]
    pub cleared_message: String,
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_model() -> String {
    "gemini-1.5-flash".to_string()
}

fn default_api_key_env() -> String {
    "GEMINI_API_KEY".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_context_limit_tokens() -> usize {
    8000
}

fn default_system_instruction() -> String {
    "You are an AI Clinical Assistant for the 'AI Medical Imaging & Diagnostic Intelligence Platform'. \
     You help healthcare professionals with medical queries, patient data interpretation, and clinical protocols. \
     Be professional, concise, and always include a clinical disclaimer that your responses are for assistance and not final diagnoses."
        .to_string()
}

fn default_greeting() -> String {
    "Hello, Dr. Doe. I am your AI Virtual Health Assistant. I have clinical tools and real-time database access active. How can I help today?"
        .to_string()
}

fn default_cleared_message() -> String {
    "Chat cleared. How else can I assist with your clinical workflow?".to_string()
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            request_timeout_secs: default_request_timeout_secs(),
            enforce_disclaimer: true,
            system_instruction: default_system_instruction(),
            context_limit_tokens: default_context_limit_tokens(),
        }
    }
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            greeting: default_greeting(),
            cleared_message: default_cleared_message(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            core: CoreConfig::default(),
            assistant: AssistantConfig::default(),
            conversation: ConversationConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the default location (~/.medassist/config.toml)
    ///
    /// If the configuration file doesn't exist, writes a default configuration.
    /// The returned [`ConfigOrigin`] says which happened so the caller can report
    /// it once logging is up.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration file cannot be read or written
    /// - TOML parsing fails
    /// - Validation fails
    pub fn load_or_create() -> Result<(Self, ConfigOrigin), EngineError> {
        Self::load_or_create_at(&Self::default_config_path()?)
    }

    /// Load configuration from `path`, writing the defaults there first if it is missing
    pub fn load_or_create_at(path: &Path) -> Result<(Self, ConfigOrigin), EngineError> {
        if path.exists() {
            Ok((
                Self::load_from_path(path)?,
                ConfigOrigin::Loaded(path.to_path_buf()),
            ))
        } else {
            Ok((
                Self::create_default(path)?,
                ConfigOrigin::Created(path.to_path_buf()),
            ))
        }
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, EngineError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("Failed to read config file: {}", e)))?;

        Self::from_toml_str(&contents)
    }

    /// Parse and validate configuration text
    pub fn from_toml_str(contents: &str) -> Result<Self, EngineError> {
        let config: Config = toml::from_str(contents)
            .map_err(|e| EngineError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Create default configuration and save to path
    fn create_default(path: &Path) -> Result<Self, EngineError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                EngineError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let config = Self::default();

        let toml_string = toml::to_string_pretty(&config)
            .map_err(|e| EngineError::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, toml_string)
            .map_err(|e| EngineError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(config)
    }

    /// Get the default configuration file path (~/.medassist/config.toml)
    pub fn default_config_path() -> Result<PathBuf, EngineError> {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(".medassist").join("config.toml"))
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), EngineError> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.core.log_level.as_str()) {
            return Err(EngineError::Config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.core.log_level,
                valid_log_levels.join(", ")
            )));
        }

        if self.assistant.model.trim().is_empty() {
            return Err(EngineError::Config(
                "assistant.model must not be empty".to_string(),
            ));
        }

        if !(self.assistant.base_url.starts_with("http://")
            || self.assistant.base_url.starts_with("https://"))
        {
            return Err(EngineError::Config(format!(
                "assistant.base_url must be an http(s) URL, got '{}'",
                self.assistant.base_url
            )));
        }

        if self.assistant.api_key_env.trim().is_empty() {
            return Err(EngineError::Config(
                "assistant.api_key_env must name an environment variable".to_string(),
            ));
        }

        if self.assistant.request_timeout_secs == 0 {
            return Err(EngineError::Config(
                "assistant.request_timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.assistant.context_limit_tokens < 100 {
            return Err(EngineError::Config(
                "assistant.context_limit_tokens must be at least 100".to_string(),
            ));
        }

        if self.conversation.greeting.trim().is_empty()
            || self.conversation.cleared_message.trim().is_empty()
        {
            return Err(EngineError::Config(
                "conversation texts must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}
