//! LLM backend implementations.
//!
//! Enum dispatch over the concrete backends keeps [`LlmBackend`] a plain
//! value the engine can be generic over. Both backends talk HTTP via
//! `reqwest`; neither retries, since the engine records a failed turn and
//! moves on.

use socialsim_core::{GeneratorError, TextGenerator};
use socialsim_types::{ChatMessage, ChatRole};
use tracing::debug;

use crate::config::{BackendConfig, BackendType};
use crate::error::LlmError;

/// Nucleus sampling value sent to OpenAI-compatible endpoints.
const TOP_P: f32 = 0.9;

/// Anthropic API version header value.
const ANTHROPIC_VERSION: &str = "2023-06-01";

// ---------------------------------------------------------------------------
// Unified backend enum
// ---------------------------------------------------------------------------

/// An LLM backend that turns chat messages into completion text.
pub enum LlmBackend {
    /// OpenAI-compatible chat completions API.
    OpenAi(OpenAiBackend),
    /// Anthropic Messages API.
    Anthropic(AnthropicBackend),
}

impl LlmBackend {
    /// Human-readable name for logging.
    pub const fn backend_name(&self) -> &'static str {
        match self {
            Self::OpenAi(_) => "openai-compatible",
            Self::Anthropic(_) => "anthropic",
        }
    }

    const fn settings(&self) -> &BackendConfig {
        match self {
            Self::OpenAi(backend) => &backend.config,
            Self::Anthropic(backend) => &backend.config,
        }
    }
}

impl TextGenerator for LlmBackend {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        temperature: f32,
    ) -> Result<String, GeneratorError> {
        if !self.settings().has_key() {
            return Err(LlmError::NotConfigured(self.backend_name().to_owned()).into());
        }
        debug!(
            backend = self.backend_name(),
            model = %self.settings().model,
            messages = messages.len(),
            temperature,
            "sending completion request"
        );
        let result = match self {
            Self::OpenAi(backend) => backend.complete(messages, temperature).await,
            Self::Anthropic(backend) => backend.complete(messages, temperature).await,
        };
        result.map_err(GeneratorError::from)
    }

    fn is_configured(&self) -> bool {
        self.settings().has_key()
    }

    fn name(&self) -> &str {
        self.backend_name()
    }

    fn model(&self) -> &str {
        &self.settings().model
    }
}

// ---------------------------------------------------------------------------
// OpenAI-compatible backend
// ---------------------------------------------------------------------------

/// Backend for OpenAI-compatible chat completions APIs.
///
/// Sends requests to `{api_url}/chat/completions`.
pub struct OpenAiBackend {
    client: reqwest::Client,
    config: BackendConfig,
}

impl OpenAiBackend {
    /// Create a new `OpenAI`-compatible backend.
    pub fn new(config: &BackendConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config: config.clone(),
        }
    }

    async fn complete(&self, messages: &[ChatMessage], temperature: f32) -> Result<String, LlmError> {
        let url = format!("{}/chat/completions", self.config.api_url);
        let body = openai_request_body(&self.config, messages, temperature);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Backend(format!("OpenAI request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read error body".to_owned());
            return Err(LlmError::Backend(format!(
                "OpenAI returned {status}: {error_body}"
            )));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| LlmError::Backend(format!("OpenAI response parse failed: {e}")))?;

        extract_openai_content(&json)
    }
}

/// Build an OpenAI chat completions request body.
fn openai_request_body(
    config: &BackendConfig,
    messages: &[ChatMessage],
    temperature: f32,
) -> serde_json::Value {
    serde_json::json!({
        "model": config.model,
        "messages": messages,
        "temperature": temperature,
        "max_tokens": config.max_tokens,
        "top_p": TOP_P,
    })
}

/// Extract the text content from an `OpenAI` chat completions response.
fn extract_openai_content(json: &serde_json::Value) -> Result<String, LlmError> {
    json.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(serde_json::Value::as_str)
        .map(ToOwned::to_owned)
        .ok_or_else(|| {
            LlmError::Backend("OpenAI response missing choices[0].message.content".to_owned())
        })
}

// ---------------------------------------------------------------------------
// Anthropic Messages API backend
// ---------------------------------------------------------------------------

/// Backend for the Anthropic Messages API.
///
/// Anthropic uses a different request format from `OpenAI`:
/// - Uses `x-api-key` header instead of `Authorization: Bearer`
/// - System messages move to the top-level `system` field
/// - Response structure differs: `content[0].text`
pub struct AnthropicBackend {
    client: reqwest::Client,
    config: BackendConfig,
}

impl AnthropicBackend {
    /// Create a new Anthropic Messages API backend.
    pub fn new(config: &BackendConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config: config.clone(),
        }
    }

    async fn complete(&self, messages: &[ChatMessage], temperature: f32) -> Result<String, LlmError> {
        let url = format!("{}/messages", self.config.api_url);
        let body = anthropic_request_body(&self.config, messages, temperature);

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Backend(format!("Anthropic request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read error body".to_owned());
            return Err(LlmError::Backend(format!(
                "Anthropic returned {status}: {error_body}"
            )));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| LlmError::Backend(format!("Anthropic response parse failed: {e}")))?;

        extract_anthropic_content(&json)
    }
}

/// Build an Anthropic Messages request body.
fn anthropic_request_body(
    config: &BackendConfig,
    messages: &[ChatMessage],
    temperature: f32,
) -> serde_json::Value {
    let system = messages
        .iter()
        .filter(|m| m.role == ChatRole::System)
        .map(|m| m.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");
    let conversation: Vec<&ChatMessage> = messages
        .iter()
        .filter(|m| m.role != ChatRole::System)
        .collect();

    let mut body = serde_json::json!({
        "model": config.model,
        "max_tokens": config.max_tokens,
        "temperature": temperature,
        "messages": conversation,
    });
    if !system.is_empty()
        && let Some(obj) = body.as_object_mut()
    {
        obj.insert("system".to_owned(), serde_json::Value::String(system));
    }
    body
}

/// Extract the text content from an Anthropic Messages API response.
fn extract_anthropic_content(json: &serde_json::Value) -> Result<String, LlmError> {
    json.get("content")
        .and_then(|c| c.get(0))
        .and_then(|b| b.get("text"))
        .and_then(serde_json::Value::as_str)
        .map(ToOwned::to_owned)
        .ok_or_else(|| LlmError::Backend("Anthropic response missing content[0].text".to_owned()))
}

// ---------------------------------------------------------------------------
// Factory
// ---------------------------------------------------------------------------

/// Create an LLM backend from configuration.
///
/// Dispatches to [`OpenAiBackend`] or [`AnthropicBackend`] based on the
/// configured [`BackendType`].
pub fn create_backend(config: &BackendConfig) -> LlmBackend {
    match config.backend_type {
        BackendType::OpenAi => LlmBackend::OpenAi(OpenAiBackend::new(config)),
        BackendType::Anthropic => LlmBackend::Anthropic(AnthropicBackend::new(config)),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn config(backend_type: BackendType, api_key: &str) -> BackendConfig {
        BackendConfig {
            backend_type,
            api_url: "http://127.0.0.1:9".to_owned(),
            api_key: api_key.to_owned(),
            model: "test-model".to_owned(),
            max_tokens: 2000,
        }
    }

    fn conversation() -> Vec<ChatMessage> {
        vec![ChatMessage::system("frame"), ChatMessage::user("go")]
    }

    #[test]
    fn extract_openai_content_valid() {
        let json = serde_json::json!({
            "choices": [{ "message": { "content": "*waves*" } }]
        });
        assert_eq!(extract_openai_content(&json).unwrap(), "*waves*");
    }

    #[test]
    fn extract_openai_content_missing_choices() {
        let json = serde_json::json!({"error": "rate_limit"});
        assert!(matches!(extract_openai_content(&json), Err(LlmError::Backend(_))));
    }

    #[test]
    fn extract_anthropic_content_valid() {
        let json = serde_json::json!({
            "content": [{ "type": "text", "text": "hello" }]
        });
        assert_eq!(extract_anthropic_content(&json).unwrap(), "hello");
    }

    #[test]
    fn extract_anthropic_content_missing() {
        let json = serde_json::json!({"content": []});
        assert!(extract_anthropic_content(&json).is_err());
    }

    #[test]
    fn openai_body_carries_sampling_settings() {
        let body = openai_request_body(&config(BackendType::OpenAi, "k"), &conversation(), 0.85);
        assert_eq!(body.pointer("/model").unwrap(), "test-model");
        assert_eq!(body.pointer("/max_tokens").unwrap(), 2000);
        assert_eq!(body.pointer("/messages/0/role").unwrap(), "system");
        assert_eq!(body.pointer("/messages/1/content").unwrap(), "go");
        assert!((body.pointer("/top_p").unwrap().as_f64().unwrap() - 0.9).abs() < 1e-6);
    }

    #[test]
    fn anthropic_body_lifts_system_messages() {
        let body = anthropic_request_body(&config(BackendType::Anthropic, "k"), &conversation(), 0.3);
        assert_eq!(body.pointer("/system").unwrap(), "frame");
        assert_eq!(body.pointer("/messages").unwrap().as_array().unwrap().len(), 1);
        assert_eq!(body.pointer("/messages/0/role").unwrap(), "user");
    }

    #[test]
    fn create_backend_dispatches_correctly() {
        let backend = create_backend(&config(BackendType::OpenAi, "k"));
        assert_eq!(backend.name(), "openai-compatible");
        assert_eq!(backend.model(), "test-model");

        let backend = create_backend(&config(BackendType::Anthropic, "k"));
        assert_eq!(backend.name(), "anthropic");
    }

    #[tokio::test]
    async fn missing_key_fails_without_a_request() {
        let backend = create_backend(&config(BackendType::OpenAi, "  "));
        assert!(!backend.is_configured());
        let result = backend.complete(&conversation(), 0.5).await;
        assert!(matches!(result, Err(GeneratorError::NotConfigured(_))));
    }
}
