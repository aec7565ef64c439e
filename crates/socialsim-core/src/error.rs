//! Error taxonomy for the simulation engine.
//!
//! - [`StateError`] -- the operation is not valid in the current state
//!   (already running, empty roster, unknown ID, bad input). Never advances
//!   the round.
//! - [`GeneratorError`] -- the text generator failed or timed out. Inside a
//!   turn this is recovered into an error-tagged history record.
//! - [`SimulationError`] -- what engine operations return to callers,
//!   wrapping the above plus configuration, template, and parse failures.

use socialsim_types::{MetricId, PersonaId};

/// The requested operation conflicts with the current simulation state.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StateError {
    /// A run is already active.
    #[error("simulation is already running")]
    AlreadyRunning,

    /// Manual operations that need a paused simulation were attempted
    /// while a run is active.
    #[error("simulation is running; stop it first")]
    RunActive,

    /// The roster is empty.
    #[error("no personas on the roster")]
    NoPersonas,

    /// An injected event was blank.
    #[error("event text must not be empty")]
    EmptyEvent,

    /// No persona has the given ID.
    #[error("persona {0} not found")]
    PersonaNotFound(PersonaId),

    /// No metric has the given ID.
    #[error("metric {0} not found")]
    MetricNotFound(MetricId),

    /// A persona or metric was submitted without a name.
    #[error("name must not be empty")]
    EmptyName,

    /// The requested cadence was zero.
    #[error("cadence must be at least one second")]
    InvalidCadence,

    /// A metric range is inverted or not finite.
    #[error("invalid metric range [{min}, {max}]")]
    InvalidRange {
        /// Submitted lower bound.
        min: f64,
        /// Submitted upper bound.
        max: f64,
    },

    /// Persona generation needs a world background to work from.
    #[error("world background must be set before generating personas")]
    MissingBackground,

    /// The requested persona count is outside the allowed range.
    #[error("persona count {requested} outside 1..={max}")]
    InvalidCount {
        /// The count that was asked for.
        requested: usize,
        /// The configured upper bound.
        max: usize,
    },

    /// A metric draft was requested without a description.
    #[error("metric description must not be empty")]
    EmptyDescription,

    /// Imported history does not number its rounds 1, 2, 3, ...
    #[error("imported history is out of order at index {index}: expected round {expected}, found {found}")]
    InvalidHistory {
        /// Position of the offending record.
        index: usize,
        /// The round that should be at this position.
        expected: u64,
        /// The round that was found.
        found: u64,
    },

    /// An imported snapshot lists the same identifier twice.
    #[error("duplicate {kind} id {id} in snapshot")]
    DuplicateId {
        /// What the identifier names (`persona` or `metric`).
        kind: &'static str,
        /// The repeated identifier.
        id: String,
    },

    /// The round counter cannot advance further.
    #[error("round counter overflow")]
    RoundOverflow,
}

/// The text generator could not produce a completion.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GeneratorError {
    /// No usable credential is configured.
    #[error("text generator is not configured: {0}")]
    NotConfigured(String),

    /// The request failed (network, HTTP status, quota).
    #[error("text generation request failed: {0}")]
    Request(String),

    /// The call exceeded its deadline.
    #[error("text generation timed out after {timeout_ms}ms")]
    Timeout {
        /// The deadline that expired.
        timeout_ms: u64,
    },

    /// The service answered but the completion was unusable.
    #[error("text generation returned an unusable response: {0}")]
    Malformed(String),
}

/// Errors surfaced by engine operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SimulationError {
    /// The text generator has no usable credential.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The operation is invalid in the current state.
    #[error(transparent)]
    State(#[from] StateError),

    /// The text generator failed.
    #[error(transparent)]
    Collaborator(#[from] GeneratorError),

    /// The generator's output could not be interpreted.
    #[error("parse error: {0}")]
    Parse(String),

    /// A prompt template failed to render.
    #[error("template error: {0}")]
    Template(String),
}

impl SimulationError {
    /// The "not configured" error raised when the generator has no credential.
    pub fn not_configured() -> Self {
        Self::Configuration("text generator has no API key configured".to_owned())
    }
}
