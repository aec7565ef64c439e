//! Generator-assisted authoring: persona rosters and metric definitions.
//!
//! Unlike turns, these requests surface every failure to the caller. They
//! never touch shared state themselves; the run controller decides what to
//! do with the result.

use socialsim_types::{Metric, MetricId, Persona, PersonaId, World};
use tracing::info;

use crate::error::{SimulationError, StateError};
use crate::generator::TextGenerator;
use crate::metrics;
use crate::narrator::Narrator;
use crate::parse;

/// Check a requested persona count against the configured ceiling.
///
/// # Errors
///
/// [`StateError::InvalidCount`] outside `1..=max`.
pub const fn check_count(count: usize, max: usize) -> Result<(), StateError> {
    if count == 0 || count > max {
        return Err(StateError::InvalidCount {
            requested: count,
            max,
        });
    }
    Ok(())
}

/// Ask the generator for `count` personas that fit `world`.
///
/// Extra personas beyond `count` are discarded; fewer are accepted. Every
/// persona gets a fresh ID.
///
/// # Errors
///
/// [`StateError::MissingBackground`] or [`StateError::InvalidCount`] before
/// any call, then [`SimulationError::Collaborator`] or
/// [`SimulationError::Parse`].
pub async fn generate_personas<G: TextGenerator>(
    narrator: &Narrator<G>,
    world: &World,
    count: usize,
) -> Result<Vec<Persona>, SimulationError> {
    if world.background.trim().is_empty() {
        return Err(StateError::MissingBackground.into());
    }
    check_count(count, narrator.config().engine.max_generated_personas)?;

    let messages = narrator.prompts().render_personas(world, count)?;
    let reply = narrator
        .complete(&messages, narrator.config().generation.persona_temperature)
        .await?;
    let personas: Vec<Persona> = parse::parse_persona_drafts(&reply)?
        .into_iter()
        .take(count)
        .map(|draft| draft.into_persona(PersonaId::new()))
        .collect();

    info!(requested = count, generated = personas.len(), "personas generated");
    Ok(personas)
}

/// Ask the generator to turn a plain-language description into a metric.
///
/// The metric gets a fresh ID but is not stored.
///
/// # Errors
///
/// [`StateError::EmptyDescription`] before any call, then
/// [`SimulationError::Collaborator`], or [`SimulationError::Parse`] when
/// the reply is not a usable metric object.
pub async fn draft_metric<G: TextGenerator>(
    narrator: &Narrator<G>,
    description: &str,
) -> Result<Metric, SimulationError> {
    let description = description.trim();
    if description.is_empty() {
        return Err(StateError::EmptyDescription.into());
    }

    let messages = narrator.prompts().render_metric_draft(description)?;
    let reply = narrator
        .complete(&messages, narrator.config().generation.draft_temperature)
        .await?;
    let mut draft = parse::parse_metric_draft(&reply)?;
    draft.id = None;
    metrics::validate_draft(&draft)
        .map_err(|e| SimulationError::Parse(format!("drafted metric is unusable: {e}")))?;

    let metric = draft.into_metric(MetricId::new());
    info!(metric = %metric.name, "metric drafted");
    Ok(metric)
}
