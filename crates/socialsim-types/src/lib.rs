//! Shared type definitions for the SocialSim narrative simulation.
//!
//! This crate is the single source of truth for the data that crosses crate
//! boundaries: the world setting, personas, turn records, metrics, and the
//! chat messages handed to the text generator. Types flow to `TypeScript`
//! via `ts-rs` for dashboard clients.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers for persona, turn, and metric IDs
//! - [`structs`] -- Entity structs, drafts, status, and export payloads

pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use ids::{MetricId, PersonaId, TurnId};
pub use structs::{
    ChatMessage, ChatRole, Metric, MetricData, MetricDraft, MetricSample, Persona, PersonaDraft,
    SimulationExport, SimulationStatus, TurnRecord, World,
};
