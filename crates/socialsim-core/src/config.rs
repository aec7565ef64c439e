//! Configuration loading and typed config structures for SocialSim.
//!
//! The configuration lives in `socialsim.yaml`. Every field has a default,
//! so an empty file (or no file at all) yields a working setup. Text
//! generator credentials are not part of this file; they come from the
//! environment (see `socialsim-llm`).

use std::path::Path;

use serde::Deserialize;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A value parsed but is out of range.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// Explanation of what is wrong with the configuration.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SimulationConfig {
    /// Scheduler and run-loop settings.
    #[serde(default)]
    pub engine: EngineConfig,

    /// Sampling settings for each kind of text-generation request.
    #[serde(default)]
    pub generation: GenerationConfig,

    /// HTTP listener settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Prompt template settings.
    #[serde(default)]
    pub prompts: PromptConfig,
}

impl SimulationConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges that serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let engine = &self.engine;
        if engine.metric_interval == 0 {
            return Err(invalid("engine.metric_interval must be at least 1"));
        }
        if engine.history_window == 0 {
            return Err(invalid("engine.history_window must be at least 1"));
        }
        if engine.metric_window == 0 {
            return Err(invalid("engine.metric_window must be at least 1"));
        }
        if engine.turn_timeout_ms == 0 {
            return Err(invalid("engine.turn_timeout_ms must be at least 1"));
        }
        if engine.default_cadence_secs == 0 {
            return Err(invalid("engine.default_cadence_secs must be at least 1"));
        }
        if engine.max_generated_personas == 0 {
            return Err(invalid("engine.max_generated_personas must be at least 1"));
        }
        Ok(())
    }
}

fn invalid(reason: &str) -> ConfigError {
    ConfigError::Invalid {
        reason: reason.to_owned(),
    }
}

/// Scheduler and run-loop settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EngineConfig {
    /// Trailing history records shown to the acting persona.
    #[serde(default = "default_history_window")]
    pub history_window: usize,

    /// Trailing history records shown to the metric evaluator.
    #[serde(default = "default_metric_window")]
    pub metric_window: usize,

    /// Metrics are evaluated on rounds divisible by this value.
    #[serde(default = "default_metric_interval")]
    pub metric_interval: u64,

    /// Deadline for a single text-generation call.
    #[serde(default = "default_turn_timeout_ms")]
    pub turn_timeout_ms: u64,

    /// Cadence used when `start` is called without one.
    #[serde(default = "default_cadence_secs")]
    pub default_cadence_secs: u64,

    /// Characters of another persona's personality shown in the roster
    /// summary of a turn prompt.
    #[serde(default = "default_excerpt_chars")]
    pub persona_excerpt_chars: usize,

    /// Upper bound on personas produced by one generation request.
    #[serde(default = "default_max_generated_personas")]
    pub max_generated_personas: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            history_window: default_history_window(),
            metric_window: default_metric_window(),
            metric_interval: default_metric_interval(),
            turn_timeout_ms: default_turn_timeout_ms(),
            default_cadence_secs: default_cadence_secs(),
            persona_excerpt_chars: default_excerpt_chars(),
            max_generated_personas: default_max_generated_personas(),
        }
    }
}

/// Sampling temperatures and counts for text-generation requests.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GenerationConfig {
    /// Temperature for persona turns.
    #[serde(default = "default_turn_temperature")]
    pub turn_temperature: f32,

    /// Temperature for metric evaluation.
    #[serde(default = "default_metric_temperature")]
    pub metric_temperature: f32,

    /// Temperature for persona generation.
    #[serde(default = "default_persona_temperature")]
    pub persona_temperature: f32,

    /// Temperature for metric drafting.
    #[serde(default = "default_metric_temperature")]
    pub draft_temperature: f32,

    /// Personas generated when the caller does not ask for a count.
    #[serde(default = "default_persona_count")]
    pub default_persona_count: usize,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            turn_temperature: default_turn_temperature(),
            metric_temperature: default_metric_temperature(),
            persona_temperature: default_persona_temperature(),
            draft_temperature: default_metric_temperature(),
            default_persona_count: default_persona_count(),
        }
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerConfig {
    /// The host address to bind to.
    #[serde(default = "default_host")]
    pub host: String,

    /// The TCP port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Prompt template settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PromptConfig {
    /// Directory holding template overrides. Templates missing from the
    /// directory fall back to the built-in versions.
    #[serde(default)]
    pub templates_dir: Option<String>,
}

const fn default_history_window() -> usize {
    20
}

const fn default_metric_window() -> usize {
    10
}

const fn default_metric_interval() -> u64 {
    5
}

const fn default_turn_timeout_ms() -> u64 {
    60_000
}

const fn default_cadence_secs() -> u64 {
    3
}

const fn default_excerpt_chars() -> usize {
    60
}

const fn default_max_generated_personas() -> usize {
    12
}

const fn default_turn_temperature() -> f32 {
    0.85
}

const fn default_metric_temperature() -> f32 {
    0.3
}

const fn default_persona_temperature() -> f32 {
    0.8
}

const fn default_persona_count() -> usize {
    4
}

fn default_host() -> String {
    String::from("0.0.0.0")
}

const fn default_port() -> u16 {
    8080
}
