//! Periodic metric evaluation.
//!
//! Shows the generator the metric definitions and the trailing history
//! window, asks for one number per metric, and appends clamped samples.
//! The scheduler runs this after committing a turn and discards its error.

use tracing::debug;

use crate::error::SimulationError;
use crate::generator::TextGenerator;
use crate::narrator::Narrator;
use crate::parse;
use crate::state::SimulationState;

/// Whether metrics are due after committing `round`.
pub fn is_due(state: &SimulationState, round: u64, interval: u64) -> bool {
    !state.metrics.is_empty() && round.checked_rem(interval) == Some(0)
}

/// Evaluate every metric for `round` and append the samples.
///
/// Metrics the reply does not mention get no sample. Returns the number of
/// samples appended.
///
/// # Errors
///
/// [`SimulationError::Collaborator`] when the call fails,
/// [`SimulationError::Parse`] when the reply is not a name-to-number map,
/// or [`SimulationError::Template`].
pub async fn evaluate<G: TextGenerator>(
    state: &mut SimulationState,
    narrator: &Narrator<G>,
    round: u64,
) -> Result<usize, SimulationError> {
    let config = narrator.config();
    let messages = narrator.prompts().render_metrics(
        state.metrics.list(),
        state.history.recent(config.engine.metric_window),
    )?;
    let reply = narrator
        .complete(&messages, config.generation.metric_temperature)
        .await?;
    let scores = parse::parse_scores(&reply)?;
    let applied = state.metrics.apply_scores(round, &scores);
    debug!(round, applied, reported = scores.len(), "metrics evaluated");
    Ok(applied)
}
