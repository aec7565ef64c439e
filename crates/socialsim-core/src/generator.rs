//! Text generator trait and stub implementation.
//!
//! Every turn, metric evaluation, and generation request ends in a call to
//! a [`TextGenerator`]: an ordered list of chat messages plus a temperature
//! goes in, completion text comes out. The engine treats the generator as
//! opaque -- it may be an HTTP language-model backend, a scripted bot, or a
//! test stub.
//!
//! The [`StubGenerator`] answers from a script (falling back to a fixed
//! reply or a fixed failure) and records every call, which lets the turn
//! scheduler be exercised end-to-end without network access.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use socialsim_types::ChatMessage;

use crate::error::GeneratorError;

/// A source of completions.
///
/// The returned future must be `Send` so turns can run on the background
/// run loop.
pub trait TextGenerator: Send + Sync + 'static {
    /// Produce a completion for the given conversation.
    ///
    /// # Errors
    ///
    /// Returns [`GeneratorError`] for credential, network, quota, or
    /// response-shape failures. Callers treat every variant uniformly as a
    /// collaborator failure.
    fn complete(
        &self,
        messages: &[ChatMessage],
        temperature: f32,
    ) -> impl Future<Output = Result<String, GeneratorError>> + Send;

    /// Whether the generator has a usable credential.
    fn is_configured(&self) -> bool;

    /// Human-readable backend name for logging and status.
    fn name(&self) -> &str;

    /// Model identifier requests are sent to.
    fn model(&self) -> &str;
}

/// One call observed by a [`StubGenerator`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    /// The messages that were sent.
    pub messages: Vec<ChatMessage>,
    /// The requested temperature.
    pub temperature: f32,
}

impl RecordedCall {
    /// All message contents joined, for substring assertions.
    pub fn text(&self) -> String {
        self.messages
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// A scripted generator for tests and offline runs.
///
/// Scripted replies are consumed in order; once the script is exhausted
/// every call gets the fallback.
#[derive(Debug)]
pub struct StubGenerator {
    script: Mutex<VecDeque<Result<String, GeneratorError>>>,
    fallback: Result<String, GeneratorError>,
    delay: Duration,
    configured: bool,
    calls: Mutex<Vec<RecordedCall>>,
}

impl StubGenerator {
    /// A configured stub that always replies `reply`.
    pub fn replying(reply: impl Into<String>) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: Ok(reply.into()),
            delay: Duration::ZERO,
            configured: true,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// A configured stub whose every call fails with a request error.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            fallback: Err(GeneratorError::Request(message.into())),
            ..Self::replying(String::new())
        }
    }

    /// Queue scripted outcomes ahead of the fallback.
    #[must_use]
    pub fn with_script<I>(self, outcomes: I) -> Self
    where
        I: IntoIterator<Item = Result<String, GeneratorError>>,
    {
        lock(&self.script).extend(outcomes);
        self
    }

    /// Delay every completion by `delay`.
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Report no usable credential.
    #[must_use]
    pub const fn unconfigured(mut self) -> Self {
        self.configured = false;
        self
    }

    /// Every call observed so far, oldest first.
    pub fn calls(&self) -> Vec<RecordedCall> {
        lock(&self.calls).clone()
    }

    /// Number of calls observed so far.
    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    fn next_outcome(&self, messages: &[ChatMessage], temperature: f32) -> Result<String, GeneratorError> {
        lock(&self.calls).push(RecordedCall {
            messages: messages.to_vec(),
            temperature,
        });
        lock(&self.script)
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone())
    }
}

impl Default for StubGenerator {
    fn default() -> Self {
        Self::replying("*looks around quietly*")
    }
}

impl TextGenerator for StubGenerator {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        temperature: f32,
    ) -> Result<String, GeneratorError> {
        let outcome = self.next_outcome(messages, temperature);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        outcome
    }

    fn is_configured(&self) -> bool {
        self.configured
    }

    fn name(&self) -> &str {
        "stub"
    }

    fn model(&self) -> &str {
        "stub"
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
