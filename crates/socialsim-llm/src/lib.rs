//! HTTP text-generation backends for SocialSim.
//!
//! Implements the engine's [`TextGenerator`] trait over two wire formats:
//! OpenAI-compatible chat completions (`OpenAI`, `DeepSeek`, Ollama, and
//! `DashScope`'s compatible mode) and the Anthropic Messages API.
//!
//! # Modules
//!
//! - [`backend`] -- [`LlmBackend`] enum dispatch and the two HTTP clients.
//! - [`config`] -- [`BackendConfig`] loaded from environment variables.
//! - [`error`] -- [`LlmError`] and its mapping onto the engine's
//!   generator error.
//!
//! [`TextGenerator`]: socialsim_core::TextGenerator

pub mod backend;
pub mod config;
pub mod error;

pub use backend::{AnthropicBackend, LlmBackend, OpenAiBackend, create_backend};
pub use config::{BackendConfig, BackendType};
pub use error::LlmError;
