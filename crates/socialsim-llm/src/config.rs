//! Backend configuration loaded from environment variables.
//!
//! Credentials never live in `socialsim.yaml`. A missing API key is not an
//! error here: the backend reports itself unconfigured and the engine
//! refuses to start a run until one is supplied.

use crate::error::LlmError;

/// Default base URL: `DashScope`'s OpenAI-compatible endpoint.
pub const DEFAULT_API_URL: &str = "https://dashscope.aliyuncs.com/compatible-mode/v1";

/// Default model identifier.
pub const DEFAULT_MODEL: &str = "qwen-plus";

/// Default completion length cap.
pub const DEFAULT_MAX_TOKENS: u32 = 2000;

/// Configuration for a single LLM backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    /// The wire format to speak.
    pub backend_type: BackendType,
    /// Base API URL without a trailing slash.
    pub api_url: String,
    /// API key; empty means unconfigured.
    pub api_key: String,
    /// Model identifier.
    pub model: String,
    /// Completion length cap sent with every request.
    pub max_tokens: u32,
}

/// Supported LLM backend types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendType {
    /// `OpenAI`-compatible API (works with `OpenAI`, `DeepSeek`, Ollama, `DashScope`).
    OpenAi,
    /// Anthropic Messages API (different request format).
    Anthropic,
}

impl BackendType {
    /// Parse a backend alias, case-insensitively.
    ///
    /// # Errors
    ///
    /// [`LlmError::Config`] for an unknown alias.
    pub fn parse(alias: &str) -> Result<Self, LlmError> {
        match alias.trim().to_lowercase().as_str() {
            "openai" | "deepseek" | "ollama" | "qwen" | "dashscope" => Ok(Self::OpenAi),
            "anthropic" | "claude" => Ok(Self::Anthropic),
            other => Err(LlmError::Config(format!("unknown backend type: {other}"))),
        }
    }
}

impl BackendConfig {
    /// Load configuration from environment variables.
    ///
    /// All variables are optional:
    /// - `LLM_BACKEND` -- backend alias (default `openai`)
    /// - `LLM_API_URL` -- API base URL (default `DashScope` compatible mode)
    /// - `LLM_API_KEY` -- API key, falling back to `DASHSCOPE_API_KEY`
    /// - `LLM_MODEL` -- model name (default `qwen-plus`)
    /// - `LLM_MAX_TOKENS` -- completion cap (default 2000)
    ///
    /// # Errors
    ///
    /// [`LlmError::Config`] for an unknown backend or an unparseable
    /// `LLM_MAX_TOKENS`.
    pub fn from_env() -> Result<Self, LlmError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Same as [`BackendConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, LlmError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let backend_type = var("LLM_BACKEND")
            .map_or(Ok(BackendType::OpenAi), |alias| BackendType::parse(&alias))?;
        let api_url = var("LLM_API_URL")
            .unwrap_or_else(|| DEFAULT_API_URL.to_owned())
            .trim_end_matches('/')
            .to_owned();
        let api_key = var("LLM_API_KEY")
            .or_else(|| var("DASHSCOPE_API_KEY"))
            .unwrap_or_default();
        let model = var("LLM_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_owned());
        let max_tokens = var("LLM_MAX_TOKENS").map_or(Ok(DEFAULT_MAX_TOKENS), |raw| {
            raw.trim()
                .parse()
                .map_err(|e| LlmError::Config(format!("invalid LLM_MAX_TOKENS: {e}")))
        })?;

        Ok(Self {
            backend_type,
            api_url,
            api_key: api_key.trim().to_owned(),
            model,
            max_tokens,
        })
    }

    /// Whether an API key is present.
    pub fn has_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}
