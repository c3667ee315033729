//! Report pipeline configuration.
//!
//! Covers sampling, worker pool limits, generation settings and the
//! template fallback policy. Values are explicit; nothing is read from the
//! environment unless [`ReportConfig::from_env`] is called.

use std::time::Duration;

use thiserror::Error;
use tokio::sync::Semaphore;

use crate::agents::AnalystAgentConfig;
use crate::dataset::{DEFAULT_SAMPLE_CAP, DEFAULT_SAMPLE_SEED};

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable has an invalid value.
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    /// Configuration validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Configuration for one report run.
#[derive(Debug, Clone)]
pub struct ReportConfig {
    // Sampling
    /// Maximum number of rows handed to the agents.
    pub sample_cap: usize,
    /// Seed for the row draw when the dataset exceeds the cap.
    pub seed: u64,

    // Execution
    /// Maximum number of analysis tasks in flight.
    pub max_concurrent_tasks: usize,
    /// Timeout for a single generate call.
    pub task_timeout: Duration,

    // Generation
    /// Model identifier; empty uses the provider default.
    pub model: String,
    /// Temperature for LLM generation.
    pub temperature: f64,
    /// Maximum tokens per reply.
    pub max_tokens: u32,

    /// Use the template narrative when the agent pipeline fails.
    pub fallback_on_error: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            sample_cap: DEFAULT_SAMPLE_CAP,
            seed: DEFAULT_SAMPLE_SEED,

            max_concurrent_tasks: 3,
            task_timeout: Duration::from_secs(120),

            model: String::new(),
            temperature: 0.7,
            max_tokens: 2000,

            fallback_on_error: false,
        }
    }
}

impl ReportConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `ICP_SAMPLE_CAP`: Rows sent to the agents (default: 50)
    /// - `ICP_SEED`: Sampling seed (default: 42)
    /// - `ICP_MAX_CONCURRENT_TASKS`: Worker pool size (default: 3)
    /// - `ICP_TASK_TIMEOUT_SECS`: Per-call timeout in seconds (default: 120)
    /// - `ICP_MODEL`: Model override (default: provider default)
    /// - `ICP_TEMPERATURE`: LLM temperature (default: 0.7)
    /// - `ICP_MAX_TOKENS`: Maximum reply tokens (default: 2000)
    /// - `ICP_FALLBACK_ON_ERROR`: Template fallback on failure (default: false)
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable cannot be parsed or the result is invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(val) = lookup("ICP_SAMPLE_CAP") {
            config.sample_cap = parse_env_value(&val, "ICP_SAMPLE_CAP")?;
        }

        if let Some(val) = lookup("ICP_SEED") {
            config.seed = parse_env_value(&val, "ICP_SEED")?;
        }

        if let Some(val) = lookup("ICP_MAX_CONCURRENT_TASKS") {
            config.max_concurrent_tasks = parse_env_value(&val, "ICP_MAX_CONCURRENT_TASKS")?;
        }

        if let Some(val) = lookup("ICP_TASK_TIMEOUT_SECS") {
            let secs: u64 = parse_env_value(&val, "ICP_TASK_TIMEOUT_SECS")?;
            config.task_timeout = Duration::from_secs(secs);
        }

        if let Some(val) = lookup("ICP_MODEL") {
            config.model = val.trim().to_string();
        }

        if let Some(val) = lookup("ICP_TEMPERATURE") {
            config.temperature = parse_env_value(&val, "ICP_TEMPERATURE")?;
        }

        if let Some(val) = lookup("ICP_MAX_TOKENS") {
            config.max_tokens = parse_env_value(&val, "ICP_MAX_TOKENS")?;
        }

        if let Some(val) = lookup("ICP_FALLBACK_ON_ERROR") {
            config.fallback_on_error = parse_env_bool(&val, "ICP_FALLBACK_ON_ERROR")?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationFailed` if any values are invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_cap == 0 {
            return Err(ConfigError::ValidationFailed(
                "sample_cap must be greater than 0".to_string(),
            ));
        }

        if self.max_concurrent_tasks == 0 {
            return Err(ConfigError::ValidationFailed(
                "max_concurrent_tasks must be greater than 0".to_string(),
            ));
        }

        if self.max_concurrent_tasks > Semaphore::MAX_PERMITS {
            return Err(ConfigError::ValidationFailed(format!(
                "max_concurrent_tasks must be at most {}",
                Semaphore::MAX_PERMITS
            )));
        }

        if self.task_timeout.is_zero() {
            return Err(ConfigError::ValidationFailed(
                "task_timeout must be greater than 0".to_string(),
            ));
        }

        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::ValidationFailed(
                "temperature must be between 0.0 and 2.0".to_string(),
            ));
        }

        if self.max_tokens == 0 {
            return Err(ConfigError::ValidationFailed(
                "max_tokens must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Settings handed to each analyst agent.
    pub fn agent_config(&self) -> AnalystAgentConfig {
        AnalystAgentConfig {
            model: self.model.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            timeout: self.task_timeout,
        }
    }

    pub fn with_sample_cap(mut self, cap: usize) -> Self {
        self.sample_cap = cap;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_max_concurrent_tasks(mut self, max: usize) -> Self {
        self.max_concurrent_tasks = max;
        self
    }

    pub fn with_task_timeout(mut self, timeout: Duration) -> Self {
        self.task_timeout = timeout;
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_temperature(mut self, temp: f64) -> Self {
        self.temperature = temp;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_fallback_on_error(mut self, enabled: bool) -> Self {
        self.fallback_on_error = enabled;
        self
    }
}

/// Parse an environment variable value into a type.
fn parse_env_value<T: std::str::FromStr>(value: &str, key: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("could not parse '{}'", value),
    })
}

/// Parse an environment variable as a boolean.
fn parse_env_bool(value: &str, key: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("expected boolean value, got '{}'", value),
        }),
    }
}
