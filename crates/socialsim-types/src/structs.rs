//! Core entity structs shared between the engine, the text-generation
//! client, and the HTTP surface.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::ids::{MetricId, PersonaId, TurnId};

// ---------------------------------------------------------------------------
// World
// ---------------------------------------------------------------------------

/// The operator-authored world setting.
///
/// Every field is free-form text and may be empty. The engine never
/// interprets these strings; they only feed prompt construction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct World {
    /// Display name of the world.
    #[serde(default)]
    pub name: String,
    /// Background narrative.
    #[serde(default)]
    pub background: String,
    /// Ruleset the personas are expected to follow.
    #[serde(default)]
    pub rules: String,
    /// Resources available in the world.
    #[serde(default)]
    pub resources: String,
}

// ---------------------------------------------------------------------------
// Personas
// ---------------------------------------------------------------------------

/// An actor on the roster whose turns are produced by the text generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Persona {
    /// Identity assigned at creation.
    pub id: PersonaId,
    /// Display name.
    pub name: String,
    /// Personality description.
    #[serde(default)]
    pub personality: String,
    /// The persona's driving goal.
    #[serde(default)]
    pub goal: String,
    /// Background memories.
    #[serde(default)]
    pub memory: String,
}

/// A persona as submitted for upsert.
///
/// Without an `id` a new persona is created; with an `id` the existing
/// persona is replaced in place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct PersonaDraft {
    /// Target persona, or `None` to create one.
    #[serde(default)]
    pub id: Option<PersonaId>,
    /// Display name.
    pub name: String,
    /// Personality description.
    #[serde(default)]
    pub personality: String,
    /// The persona's driving goal.
    #[serde(default)]
    pub goal: String,
    /// Background memories.
    #[serde(default)]
    pub memory: String,
}

impl PersonaDraft {
    /// Materialize the draft into a persona with the given identity.
    pub fn into_persona(self, id: PersonaId) -> Persona {
        Persona {
            id,
            name: self.name,
            personality: self.personality,
            goal: self.goal,
            memory: self.memory,
        }
    }
}

// ---------------------------------------------------------------------------
// History
// ---------------------------------------------------------------------------

/// One committed turn. Immutable once appended to the history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct TurnRecord {
    /// Unique record identity.
    pub id: TurnId,
    /// Round number; strictly increasing by one per turn.
    pub round: u64,
    /// The persona that acted.
    pub persona_id: PersonaId,
    /// The persona's name at commit time.
    pub persona_name: String,
    /// Generated content, or a human-readable error when `is_error` is set.
    pub content: String,
    /// Commit time.
    pub timestamp: DateTime<Utc>,
    /// The injected event consumed by this turn, if any.
    #[serde(default)]
    pub injected_event: Option<String>,
    /// Whether the text generator failed for this turn.
    #[serde(default)]
    pub is_error: bool,
}

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

/// A bounded numeric quantity scored periodically from the narrative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Metric {
    /// Identity assigned at creation.
    pub id: MetricId,
    /// Name the evaluator reports scores under.
    pub name: String,
    /// What the metric measures.
    #[serde(default)]
    pub description: String,
    /// Lower bound (inclusive).
    #[serde(default = "default_metric_min")]
    pub min: f64,
    /// Upper bound (inclusive).
    #[serde(default = "default_metric_max")]
    pub max: f64,
    /// Display unit, possibly empty.
    #[serde(default)]
    pub unit: String,
}

impl Metric {
    /// Clamp a raw value into this metric's `[min, max]` range.
    pub fn clamp(&self, value: f64) -> f64 {
        value.max(self.min).min(self.max)
    }
}

/// A metric as submitted for upsert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct MetricDraft {
    /// Target metric, or `None` to create one.
    #[serde(default)]
    pub id: Option<MetricId>,
    /// Name the evaluator reports scores under.
    pub name: String,
    /// What the metric measures.
    #[serde(default)]
    pub description: String,
    /// Lower bound (inclusive).
    #[serde(default = "default_metric_min")]
    pub min: f64,
    /// Upper bound (inclusive).
    #[serde(default = "default_metric_max")]
    pub max: f64,
    /// Display unit, possibly empty.
    #[serde(default)]
    pub unit: String,
}

impl MetricDraft {
    /// Materialize the draft into a metric with the given identity.
    pub fn into_metric(self, id: MetricId) -> Metric {
        Metric {
            id,
            name: self.name,
            description: self.description,
            min: self.min,
            max: self.max,
            unit: self.unit,
        }
    }
}

const fn default_metric_min() -> f64 {
    0.0
}

const fn default_metric_max() -> f64 {
    100.0
}

/// One evaluated value of a metric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct MetricSample {
    /// The round at which the evaluation ran.
    pub round: u64,
    /// The clamped value.
    pub value: f64,
}

/// Per-metric time series, keyed by metric ID.
pub type MetricData = BTreeMap<MetricId, Vec<MetricSample>>;

// ---------------------------------------------------------------------------
// Run status
// ---------------------------------------------------------------------------

/// Point-in-time view of the run controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SimulationStatus {
    /// Whether the background loop is active.
    pub running: bool,
    /// The last committed round (0 before the first turn).
    pub round: u64,
    /// Seconds between automatic turns.
    pub cadence_secs: u64,
    /// Number of personas on the roster.
    pub persona_count: usize,
}

// ---------------------------------------------------------------------------
// Export / import
// ---------------------------------------------------------------------------

/// Full in-memory state as exchanged by export and import.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationExport {
    /// The world setting.
    #[serde(default)]
    pub world: World,
    /// The roster, in scheduling order.
    #[serde(default)]
    pub personas: Vec<Persona>,
    /// Committed turns in round order.
    #[serde(default)]
    pub history: Vec<TurnRecord>,
    /// Metric definitions.
    #[serde(default)]
    pub metrics: Vec<Metric>,
    /// Metric time series.
    #[serde(default)]
    pub metric_data: MetricData,
    /// When the export was taken.
    #[serde(default = "Utc::now")]
    pub exported_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Text generation messages
// ---------------------------------------------------------------------------

/// Author of a chat message sent to the text generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum ChatRole {
    /// Framing instructions.
    System,
    /// The request itself.
    User,
    /// A previous completion.
    Assistant,
}

/// One message of a text-generation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ChatMessage {
    /// Author of the message.
    pub role: ChatRole,
    /// Message text.
    pub content: String,
}

impl ChatMessage {
    /// Build a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    /// Build a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}
