//! The turn scheduler: one call to [`advance`] is one round.
//!
//! The caller holds the state mutex for the whole call, so the round
//! increment, the event dequeue, the generator call, the history append,
//! and any metric evaluation are one atomic step as far as every other
//! operation can tell.
//!
//! # Turn order
//!
//! 1. Refuse an empty roster without touching anything
//! 2. Increment the round and select persona `(round - 1) mod len`
//! 3. Dequeue at most one event
//! 4. Render the prompt and call the generator
//! 5. Append the record, error-tagged if the call failed
//! 6. On every `metric_interval`-th round, evaluate metrics best-effort

use chrono::Utc;
use socialsim_types::{Persona, TurnId, TurnRecord};
use tracing::{debug, info, warn};

use crate::error::{SimulationError, StateError};
use crate::evaluator;
use crate::generator::TextGenerator;
use crate::narrator::Narrator;
use crate::prompt::TurnContext;
use crate::state::SimulationState;

/// Run one turn and return the committed record.
///
/// A generator failure does not fail the turn: the round is consumed and
/// an error-tagged record is committed instead.
///
/// # Errors
///
/// [`StateError::NoPersonas`] for an empty roster, or
/// [`StateError::RoundOverflow`]. Neither changes any state.
pub async fn advance<G: TextGenerator>(
    state: &mut SimulationState,
    narrator: &Narrator<G>,
) -> Result<TurnRecord, StateError> {
    if state.roster.is_empty() {
        return Err(StateError::NoPersonas);
    }
    let round = state
        .round
        .checked_add(1)
        .ok_or(StateError::RoundOverflow)?;
    let persona = state
        .roster
        .select_for_round(round)
        .cloned()
        .ok_or(StateError::NoPersonas)?;

    state.round = round;
    let event = state.events.take_next();

    let (content, is_error) = match produce_turn(state, narrator, &persona, event.as_deref()).await {
        Ok(text) => (text, false),
        Err(e) => {
            warn!(round, persona = %persona.name, error = %e, "turn generation failed");
            (format!("turn could not be generated: {e}"), true)
        }
    };

    let record = TurnRecord {
        id: TurnId::new(),
        round,
        persona_id: persona.id,
        persona_name: persona.name,
        content,
        timestamp: Utc::now(),
        injected_event: event,
        is_error,
    };
    state.history.append(record.clone());
    info!(
        round,
        persona = %record.persona_name,
        is_error,
        event = record.injected_event.is_some(),
        "turn committed"
    );

    if evaluator::is_due(state, round, narrator.config().engine.metric_interval) {
        match evaluator::evaluate(state, narrator, round).await {
            Ok(applied) => debug!(round, applied, "metric samples recorded"),
            Err(e) => warn!(round, error = %e, "metric evaluation failed"),
        }
    }

    Ok(record)
}

async fn produce_turn<G: TextGenerator>(
    state: &SimulationState,
    narrator: &Narrator<G>,
    persona: &Persona,
    event: Option<&str>,
) -> Result<String, SimulationError> {
    let config = narrator.config();
    let messages = narrator.prompts().render_turn(&TurnContext {
        world: &state.world,
        persona,
        roster: state.roster.list(),
        history: state.history.recent(config.engine.history_window),
        event,
        excerpt_chars: config.engine.persona_excerpt_chars,
    })?;
    let text = narrator
        .complete(&messages, config.generation.turn_temperature)
        .await?;
    Ok(text)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use socialsim_types::{MetricDraft, PersonaDraft};

    use super::*;
    use crate::config::SimulationConfig;
    use crate::error::GeneratorError;
    use crate::generator::StubGenerator;
    use crate::prompt::PromptEngine;

    fn narrator(stub: StubGenerator) -> Narrator<StubGenerator> {
        Narrator::new(
            stub,
            PromptEngine::builtin().unwrap(),
            SimulationConfig::default(),
        )
    }

    fn state_with(names: &[&str]) -> SimulationState {
        let mut state = SimulationState::new();
        for name in names {
            state
                .roster
                .upsert(PersonaDraft {
                    name: (*name).to_owned(),
                    ..PersonaDraft::default()
                })
                .unwrap();
        }
        state
    }

    fn add_metric(state: &mut SimulationState, name: &str) {
        state
            .metrics
            .upsert(MetricDraft {
                id: None,
                name: name.to_owned(),
                description: String::new(),
                min: 0.0,
                max: 100.0,
                unit: String::new(),
            })
            .unwrap();
    }

    #[tokio::test]
    async fn empty_roster_consumes_nothing() {
        let mut state = SimulationState::new();
        state.events.inject("storm").unwrap();
        let narrator = narrator(StubGenerator::default());

        let result = advance(&mut state, &narrator).await;

        assert_eq!(result, Err(StateError::NoPersonas));
        assert_eq!(state.round, 0);
        assert!(state.history.is_empty());
        assert_eq!(state.events.len(), 1);
        assert_eq!(narrator.generator().call_count(), 0);
    }

    #[tokio::test]
    async fn two_personas_alternate() {
        let mut state = state_with(&["A", "B"]);
        let narrator = narrator(StubGenerator::replying("ok"));

        for _ in 0..3 {
            advance(&mut state, &narrator).await.unwrap();
        }

        let turns: Vec<(u64, &str, &str)> = state
            .history
            .records()
            .iter()
            .map(|r| (r.round, r.persona_name.as_str(), r.content.as_str()))
            .collect();
        assert_eq!(turns, vec![(1, "A", "ok"), (2, "B", "ok"), (3, "A", "ok")]);
    }

    #[tokio::test]
    async fn event_tags_exactly_one_turn() {
        let mut state = state_with(&["A"]);
        state.events.inject("a comet appears").unwrap();
        let narrator = narrator(StubGenerator::default());

        let first = advance(&mut state, &narrator).await.unwrap();
        let second = advance(&mut state, &narrator).await.unwrap();

        assert_eq!(first.injected_event.as_deref(), Some("a comet appears"));
        assert_eq!(second.injected_event, None);
        assert!(narrator.generator().calls().first().unwrap().text().contains("a comet appears"));
    }

    #[tokio::test]
    async fn generator_failure_commits_error_record() {
        let mut state = state_with(&["A", "B"]);
        state.events.inject("quake").unwrap();
        let narrator = narrator(StubGenerator::failing("quota exceeded"));

        let record = advance(&mut state, &narrator).await.unwrap();

        assert!(record.is_error);
        assert_eq!(record.round, 1);
        assert_eq!(record.persona_name, "A");
        assert!(record.content.contains("quota exceeded"));
        assert_eq!(record.injected_event.as_deref(), Some("quake"));
        assert_eq!(state.round, 1);
        assert_eq!(state.history.len(), 1);
    }

    #[tokio::test]
    async fn metrics_evaluated_on_interval_and_clamped() {
        let mut state = state_with(&["A"]);
        add_metric(&mut state, "tension");
        let stub = StubGenerator::replying("ok").with_script(
            std::iter::repeat_with(|| Ok(String::from("ok")))
                .take(5)
                .chain([Ok(String::from(r#"{"tension": 150}"#))]),
        );
        let narrator = narrator(stub);

        for _ in 0..5 {
            advance(&mut state, &narrator).await.unwrap();
        }

        // five turns plus one evaluation
        assert_eq!(narrator.generator().call_count(), 6);
        let series = state.metrics.data().values().next().unwrap();
        assert_eq!(series.len(), 1);
        let sample = series.first().unwrap();
        assert_eq!(sample.round, 5);
        assert!((sample.value - 100.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn failed_evaluation_keeps_the_turn() {
        let mut state = state_with(&["A"]);
        add_metric(&mut state, "tension");
        state.round = 4;
        let stub = StubGenerator::replying("ok").with_script([
            Ok(String::from("*acts*")),
            Err(GeneratorError::Request(String::from("down"))),
        ]);
        let narrator = narrator(stub);

        let record = advance(&mut state, &narrator).await.unwrap();

        assert_eq!(record.round, 5);
        assert!(!record.is_error);
        assert_eq!(state.history.len(), 1);
        assert!(state.metrics.data().values().all(Vec::is_empty));
    }

    #[tokio::test]
    async fn no_evaluation_without_metrics() {
        let mut state = state_with(&["A"]);
        let narrator = narrator(StubGenerator::default());
        for _ in 0..5 {
            advance(&mut state, &narrator).await.unwrap();
        }
        assert_eq!(narrator.generator().call_count(), 5);
    }
}
