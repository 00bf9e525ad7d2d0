//! TOML-based configuration for mergewise.
//!
//! Sensitive values (the oracle API token) are stored as `_env` fields that
//! reference environment variable names. The actual secrets are resolved at
//! runtime via [`AppConfig::resolve_env_vars`].

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::errors::ConfigError;

/// Environment variable that overrides `oracle.model` when set.
pub const MODEL_OVERRIDE_ENV: &str = "HF_MODEL_ID";

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level application configuration loaded from a TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Repository location.
    #[serde(default)]
    pub repository: RepositoryConfig,

    /// Text-generation oracle settings.
    #[serde(default)]
    pub oracle: OracleConfig,

    /// AI merge behaviour.
    #[serde(default)]
    pub merge: MergeConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

// ---------------------------------------------------------------------------
// Repository
// ---------------------------------------------------------------------------

/// Where the git work tree lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryConfig {
    /// Path to the work tree root (default `.`).
    #[serde(default = "default_repo_path")]
    pub path: PathBuf,
}

fn default_repo_path() -> PathBuf {
    PathBuf::from(".")
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            path: default_repo_path(),
        }
    }
}

// ---------------------------------------------------------------------------
// Oracle
// ---------------------------------------------------------------------------

/// Hugging Face text-generation endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleConfig {
    /// Base URL; the model id is appended as a path segment.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Model id (e.g. `TinyLlama/TinyLlama-1.1B-Chat-v1.0`).
    #[serde(default = "default_model")]
    pub model: String,

    /// Environment variable holding the API token.
    #[serde(default = "default_token_env")]
    pub token_env: String,

    /// Upper bound on generated tokens per call.
    #[serde(default = "default_max_new_tokens")]
    pub max_new_tokens: u32,

    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Top-k sampling cutoff.
    #[serde(default = "default_top_k")]
    pub top_k: u32,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Resolved token (populated by `resolve_env_vars`).
    #[serde(skip)]
    pub token: Option<String>,
}

fn default_endpoint() -> String {
    "https://api-inference.huggingface.co/models".into()
}
fn default_model() -> String {
    "TinyLlama/TinyLlama-1.1B-Chat-v1.0".into()
}
fn default_token_env() -> String {
    "HF_TOKEN".into()
}
fn default_max_new_tokens() -> u32 {
    1000
}
fn default_temperature() -> f32 {
    0.1
}
fn default_top_k() -> u32 {
    50
}
fn default_timeout() -> u64 {
    120
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            token_env: default_token_env(),
            max_new_tokens: default_max_new_tokens(),
            temperature: default_temperature(),
            top_k: default_top_k(),
            timeout_secs: default_timeout(),
            token: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Merge
// ---------------------------------------------------------------------------

/// AI merge settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeConfig {
    /// Fix-prompt attempts after a candidate fails validation (default 2).
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_max_retries() -> u32 {
    2
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
        }
    }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Minimum tracing level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Optional directory for a daily rolling log file.
    #[serde(default)]
    pub directory: Option<PathBuf>,
}

fn default_log_level() -> String {
    "warn".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            directory: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Loading & resolving
// ---------------------------------------------------------------------------

impl AppConfig {
    /// Load an [`AppConfig`] from a TOML file at the given path.
    ///
    /// This does **not** resolve environment variables -- call
    /// [`resolve_env_vars`](Self::resolve_env_vars) afterwards.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading configuration");

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let contents = std::fs::read_to_string(path)?;
        let config: AppConfig =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        debug!("configuration parsed successfully");
        Ok(config)
    }

    /// Resolve `*_env` fields and the model override.
    ///
    /// A missing token only logs a warning; the oracle client reports it when
    /// a request is actually made.
    pub fn resolve_env_vars(&mut self) -> Result<(), ConfigError> {
        info!("resolving environment variable references in config");

        self.oracle.token = resolve_optional_env(&self.oracle.token_env, "oracle.token_env");

        if let Ok(model) = std::env::var(MODEL_OVERRIDE_ENV) {
            if !model.is_empty() {
                debug!(model = %model, "model overridden from environment");
                self.oracle.model = model;
            }
        }

        Ok(())
    }

    /// Validate that all required fields are present and sane.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.oracle.endpoint.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "oracle.endpoint".into(),
                detail: "endpoint must not be empty".into(),
            });
        }
        if self.oracle.model.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "oracle.model".into(),
                detail: "model must not be empty".into(),
            });
        }
        if !(0.0..=2.0).contains(&self.oracle.temperature) {
            return Err(ConfigError::InvalidValue {
                field: "oracle.temperature".into(),
                detail: "temperature must be between 0.0 and 2.0".into(),
            });
        }
        if self.oracle.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "oracle.timeout_secs".into(),
                detail: "timeout must be > 0".into(),
            });
        }

        Ok(())
    }

    /// Load, resolve, and validate in one call.
    ///
    /// A missing file yields the defaults rather than an error.
    pub fn load_and_resolve<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut config = match Self::load_from_file(path) {
            Ok(config) => config,
            Err(ConfigError::FileNotFound(p)) => {
                debug!(path = %p, "no configuration file, using defaults");
                Self::default()
            }
            Err(e) => return Err(e),
        };
        config.resolve_env_vars()?;
        config.validate()?;
        Ok(config)
    }
}

/// Try to read an environment variable by name. Returns `Some(value)` on
/// success; logs a warning and returns `None` if the variable is unset.
fn resolve_optional_env(env_name: &str, field: &str) -> Option<String> {
    match std::env::var(env_name) {
        Ok(val) if !val.is_empty() => {
            debug!(field, env_name, "resolved env var");
            Some(val)
        }
        Ok(_) => {
            warn!(field, env_name, "env var is set but empty");
            None
        }
        Err(_) => {
            warn!(field, env_name, "env var not set");
            None
        }
    }
}
