//! Configuration for the ECC pipeline
//!
//! Loaded from TOML. Every section has defaults so the demo runs without a
//! config file; secrets are never read from the file, only the name of the
//! environment variable that holds them.

use crate::goals::{GoalError, GoalRegistry, StrategicGoal};
use crate::llm::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Upper bound for any configured retry delay, in seconds
pub const MAX_RETRY_DELAY_SECS: f64 = 3600.0;

/// Default config locations, searched in order
pub const DEFAULT_CONFIG_PATHS: [&str; 2] = ["ecc.toml", "config/ecc.toml"];

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EccConfig {
    #[serde(default)]
    pub app: AppSection,
    #[serde(default)]
    pub llm: LlmSection,
    #[serde(default)]
    pub retry: RetrySection,
    #[serde(default)]
    pub pipeline: PipelineSection,
    #[serde(default = "default_tools")]
    pub tools: HashMap<String, ToolConfig>,
    /// Overrides the built-in goal registry when non-empty
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub goals: Vec<StrategicGoal>,
}

impl Default for EccConfig {
    fn default() -> Self {
        Self {
            app: AppSection::default(),
            llm: LlmSection::default(),
            retry: RetrySection::default(),
            pipeline: PipelineSection::default(),
            tools: default_tools(),
            goals: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppSection {
    /// Application name used for session bookkeeping
    #[serde(default = "default_app_name")]
    pub name: String,
    /// User the sessions are created for
    #[serde(default = "default_user_id")]
    pub user_id: String,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            user_id: default_user_id(),
        }
    }
}

fn default_app_name() -> String {
    "ecc".to_string()
}

fn default_user_id() -> String {
    "default-user".to_string()
}

/// Inference backend settings shared by every stage
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LlmSection {
    /// Provider name ("gemini", "openai", "mock")
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Model identifier
    #[serde(default = "default_model")]
    pub model: String,
    /// Environment variable containing the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Override for the provider's API base URL
    pub base_url: Option<String>,
    /// Optional temperature (0.0 to 2.0)
    pub temperature: Option<f32>,
    /// Optional max output tokens
    pub max_tokens: Option<u32>,
    /// Per-request HTTP timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            base_url: None,
            temperature: None,
            max_tokens: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_provider() -> String {
    "gemini".to_string()
}

fn default_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_api_key_env() -> String {
    "GOOGLE_API_KEY".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

/// HTTP retry policy applied to every inference call
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrySection {
    /// Total attempts including the first one
    #[serde(default = "default_attempts")]
    pub attempts: u32,
    /// Delay before the first retry, in seconds
    #[serde(default = "default_initial_delay_secs")]
    pub initial_delay_secs: f64,
    /// Exponential backoff base
    #[serde(default = "default_exp_base")]
    pub exp_base: f64,
    /// Ceiling for a single backoff delay, in seconds
    #[serde(default = "default_max_delay_secs")]
    pub max_delay_secs: f64,
    /// HTTP status codes considered transient
    #[serde(default = "default_http_status_codes")]
    pub http_status_codes: Vec<u16>,
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            attempts: default_attempts(),
            initial_delay_secs: default_initial_delay_secs(),
            exp_base: default_exp_base(),
            max_delay_secs: default_max_delay_secs(),
            http_status_codes: default_http_status_codes(),
        }
    }
}

fn default_attempts() -> u32 {
    5
}

fn default_initial_delay_secs() -> f64 {
    1.0
}

fn default_exp_base() -> f64 {
    2.0
}

fn default_max_delay_secs() -> f64 {
    60.0
}

fn default_http_status_codes() -> Vec<u16> {
    vec![429, 500, 503, 504]
}

impl RetrySection {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.attempts == 0 {
            return Err(ConfigError::InvalidConfig(
                "retry.attempts must be at least 1".to_string(),
            ));
        }
        if !self.exp_base.is_finite() || self.exp_base < 1.0 {
            return Err(ConfigError::InvalidConfig(
                "retry.exp_base must be >= 1.0".to_string(),
            ));
        }
        for (name, value) in [
            ("initial_delay_secs", self.initial_delay_secs),
            ("max_delay_secs", self.max_delay_secs),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidConfig(format!(
                    "retry.{name} must be a non-negative number"
                )));
            }
            if value > MAX_RETRY_DELAY_SECS {
                return Err(ConfigError::InvalidConfig(format!(
                    "retry.{name} {value} exceeds {MAX_RETRY_DELAY_SECS} seconds"
                )));
            }
        }
        if let Some(code) = self
            .http_status_codes
            .iter()
            .find(|code| !(100..=599).contains(*code))
        {
            return Err(ConfigError::InvalidConfig(format!(
                "retry.http_status_codes contains invalid status {code}"
            )));
        }
        Ok(())
    }

    /// Convert to the runtime policy. Delays outside what `validate` accepts
    /// are clamped to `[0, MAX_RETRY_DELAY_SECS]`.
    pub fn to_policy(&self) -> RetryPolicy {
        RetryPolicy {
            attempts: self.attempts,
            initial_delay: delay_from_secs(self.initial_delay_secs),
            exp_base: self.exp_base,
            max_delay: delay_from_secs(self.max_delay_secs),
            retryable_status_codes: self.http_status_codes.iter().copied().collect(),
        }
    }
}

fn delay_from_secs(secs: f64) -> Duration {
    let secs = if secs.is_nan() {
        0.0
    } else {
        secs.clamp(0.0, MAX_RETRY_DELAY_SECS)
    };
    Duration::try_from_secs_f64(secs).unwrap_or(Duration::ZERO)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PipelineSection {
    /// Model round-trips allowed per stage while tools are being called
    #[serde(default = "default_max_tool_iterations")]
    pub max_tool_iterations: usize,
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            max_tool_iterations: default_max_tool_iterations(),
        }
    }
}

fn default_max_tool_iterations() -> usize {
    10
}

/// Tool configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ToolConfig {
    /// Simple form: tool_name = "identifier"
    Simple(String),
    /// Complex form: tool_name = { impl = "identifier", config = { ... } }
    Complex {
        #[serde(rename = "impl")]
        implementation: String,
        #[serde(default)]
        config: HashMap<String, serde_json::Value>,
    },
}

fn default_tools() -> HashMap<String, ToolConfig> {
    ["get_open_loops", "log_action_items", "web_search"]
        .into_iter()
        .map(|name| (name.to_string(), ToolConfig::Simple("builtin".to_string())))
        .collect()
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),
    #[error("Invalid goal table: {0}")]
    InvalidGoals(#[from] GoalError),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl EccConfig {
    /// Load configuration from a TOML file and validate it
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: EccConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from an explicit path, else the first default location that
    /// exists, else built-in defaults
    pub fn discover(explicit: Option<&Path>) -> Result<(Self, Option<PathBuf>), ConfigError> {
        if let Some(path) = explicit {
            return Ok((Self::load_from_file(path)?, Some(path.to_path_buf())));
        }

        for candidate in DEFAULT_CONFIG_PATHS {
            let path = PathBuf::from(candidate);
            if path.exists() {
                return Ok((Self::load_from_file(&path)?, Some(path)));
            }
        }

        debug!("No configuration file found, using built-in defaults");
        Ok((Self::default(), None))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_identifier("app.name", &self.app.name)?;
        validate_identifier("app.user_id", &self.app.user_id)?;
        self.retry.validate()?;

        if self.llm.model.trim().is_empty() {
            return Err(ConfigError::InvalidConfig(
                "llm.model must not be empty".to_string(),
            ));
        }
        if let Some(temperature) = self.llm.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                return Err(ConfigError::InvalidConfig(format!(
                    "llm.temperature {temperature} outside [0.0, 2.0]"
                )));
            }
        }
        if self.pipeline.max_tool_iterations == 0 {
            return Err(ConfigError::InvalidConfig(
                "pipeline.max_tool_iterations must be at least 1".to_string(),
            ));
        }

        self.goal_registry()?;
        Ok(())
    }

    /// Goal registry for this run: the configured table or the built-in one
    pub fn goal_registry(&self) -> Result<GoalRegistry, ConfigError> {
        if self.goals.is_empty() {
            Ok(GoalRegistry::builtin().clone())
        } else {
            Ok(GoalRegistry::from_goals(self.goals.clone())?)
        }
    }

    /// Get LLM API key from environment variable
    pub fn get_llm_api_key(&self) -> Result<String, ConfigError> {
        std::env::var(&self.llm.api_key_env)
            .map_err(|_| ConfigError::EnvVarNotFound(self.llm.api_key_env.clone()))
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry.to_policy()
    }
}

/// Identifiers must match [a-zA-Z0-9._-]+
fn validate_identifier(field: &str, value: &str) -> Result<(), ConfigError> {
    let valid_chars = value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-');

    if value.is_empty() || !valid_chars {
        return Err(ConfigError::InvalidIdentifier(format!(
            "{field} '{value}' must match pattern [a-zA-Z0-9._-]+"
        )));
    }

    Ok(())
}

/// What happened when looking for a `.env` file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvFile {
    Loaded(PathBuf),
    NotFound,
    Invalid(String),
}

impl EnvFile {
    fn from_result(result: Result<PathBuf, dotenvy::Error>) -> Self {
        match result {
            Ok(path) => EnvFile::Loaded(path),
            Err(e) if e.not_found() => EnvFile::NotFound,
            Err(e) => EnvFile::Invalid(e.to_string()),
        }
    }

    /// Report the outcome. Call once a subscriber is installed.
    pub fn log(&self) {
        match self {
            EnvFile::Loaded(path) => info!(path = %path.display(), "Loaded environment file"),
            EnvFile::NotFound => info!("No .env file found, continuing with process env"),
            EnvFile::Invalid(e) => warn!(error = %e, "Failed to parse .env file, ignoring it"),
        }
    }
}

/// Load a `.env` file if present. A missing file is not an error.
///
/// Runs before logging is set up so the file may carry `RUST_LOG`; the
/// returned outcome is logged by the caller afterwards.
pub fn load_env() -> EnvFile {
    EnvFile::from_result(dotenvy::dotenv())
}

/// Load a specific env file, same outcome reporting as [`load_env`]
pub fn load_env_from(path: &Path) -> EnvFile {
    EnvFile::from_result(dotenvy::from_path(path).map(|()| path.to_path_buf()))
}
