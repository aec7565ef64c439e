//! Turn scheduler, run control, and shared state for the SocialSim
//! narrative simulation.
//!
//! One persona at a time produces a turn through a [`TextGenerator`], the
//! result is committed to an append-only history, operator-injected events
//! are consumed one per turn, and user-defined metrics are scored
//! periodically from the recent narrative.
//!
//! # Modules
//!
//! - [`config`] -- Configuration loading from `socialsim.yaml` into
//!   strongly-typed structs.
//! - [`error`] -- State, generator, and simulation error enums.
//! - [`events`] -- FIFO of injected events.
//! - [`evaluator`] -- Periodic metric scoring.
//! - [`generation`] -- Generator-assisted persona and metric authoring.
//! - [`generator`] -- [`TextGenerator`] trait and [`StubGenerator`].
//! - [`history`] -- Append-only turn log.
//! - [`metrics`] -- Metric definitions and clamped time series.
//! - [`narrator`] -- Generator plus prompts plus per-call deadline.
//! - [`operator`] -- [`Simulation`], the run controller.
//! - [`parse`] -- JSON recovery for structured completions.
//! - [`prompt`] -- `minijinja` prompt templates.
//! - [`roster`] -- Ordered personas and round-robin selection.
//! - [`scheduler`] -- One turn per [`scheduler::advance`] call.
//! - [`snapshot`] -- Whole-state export and import.
//! - [`state`] -- The single mutable aggregate.
//!
//! [`TextGenerator`]: generator::TextGenerator
//! [`StubGenerator`]: generator::StubGenerator
//! [`Simulation`]: operator::Simulation

pub mod config;
pub mod error;
pub mod evaluator;
pub mod events;
pub mod generation;
pub mod generator;
pub mod history;
pub mod metrics;
pub mod narrator;
pub mod operator;
pub mod parse;
pub mod prompt;
pub mod roster;
mod runner;
pub mod scheduler;
pub mod snapshot;
pub mod state;

pub use config::SimulationConfig;
pub use error::{GeneratorError, SimulationError, StateError};
pub use generator::{StubGenerator, TextGenerator};
pub use narrator::Narrator;
pub use operator::Simulation;
pub use prompt::PromptEngine;
