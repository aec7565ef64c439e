//! The engine's handle on the text generator.
//!
//! A [`Narrator`] bundles the generator with the prompt templates and the
//! engine configuration, and puts a deadline on every call.

use std::time::Duration;

use socialsim_types::ChatMessage;

use crate::config::SimulationConfig;
use crate::error::GeneratorError;
use crate::generator::TextGenerator;
use crate::prompt::PromptEngine;

/// Generator plus prompts plus configuration.
#[derive(Debug)]
pub struct Narrator<G> {
    generator: G,
    prompts: PromptEngine,
    config: SimulationConfig,
}

impl<G: TextGenerator> Narrator<G> {
    /// Bundle a generator with its prompts and configuration.
    pub const fn new(generator: G, prompts: PromptEngine, config: SimulationConfig) -> Self {
        Self {
            generator,
            prompts,
            config,
        }
    }

    /// The underlying generator.
    pub const fn generator(&self) -> &G {
        &self.generator
    }

    /// The prompt templates.
    pub const fn prompts(&self) -> &PromptEngine {
        &self.prompts
    }

    /// The engine configuration.
    pub const fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Request a completion under the configured deadline.
    ///
    /// Returns the trimmed completion text.
    ///
    /// # Errors
    ///
    /// Whatever the generator returns, [`GeneratorError::Timeout`] when the
    /// deadline expires, or [`GeneratorError::Malformed`] for a blank
    /// completion.
    pub async fn complete(
        &self,
        messages: &[ChatMessage],
        temperature: f32,
    ) -> Result<String, GeneratorError> {
        let timeout_ms = self.config.engine.turn_timeout_ms;
        let call = self.generator.complete(messages, temperature);
        let text = match tokio::time::timeout(Duration::from_millis(timeout_ms), call).await {
            Ok(result) => result?,
            Err(_) => return Err(GeneratorError::Timeout { timeout_ms }),
        };

        let text = text.trim();
        if text.is_empty() {
            return Err(GeneratorError::Malformed("empty completion".to_owned()));
        }
        Ok(text.to_owned())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::generator::StubGenerator;

    fn narrator(stub: StubGenerator, timeout_ms: u64) -> Narrator<StubGenerator> {
        let mut config = SimulationConfig::default();
        config.engine.turn_timeout_ms = timeout_ms;
        Narrator::new(stub, PromptEngine::builtin().unwrap(), config)
    }

    #[tokio::test(start_paused = true)]
    async fn slow_generator_times_out() {
        let narrator = narrator(
            StubGenerator::replying("late").with_delay(Duration::from_secs(5)),
            1_000,
        );
        let result = narrator.complete(&[ChatMessage::user("go")], 0.5).await;
        assert_eq!(result, Err(GeneratorError::Timeout { timeout_ms: 1_000 }));
    }

    #[tokio::test]
    async fn blank_completion_is_malformed() {
        let narrator = narrator(StubGenerator::replying("   \n"), 1_000);
        let result = narrator.complete(&[ChatMessage::user("go")], 0.5).await;
        assert!(matches!(result, Err(GeneratorError::Malformed(_))));
    }

    #[tokio::test]
    async fn completion_is_trimmed() {
        let narrator = narrator(StubGenerator::replying("  hello \n"), 1_000);
        let text = narrator.complete(&[ChatMessage::user("go")], 0.5).await.unwrap();
        assert_eq!(text, "hello");
    }
}
