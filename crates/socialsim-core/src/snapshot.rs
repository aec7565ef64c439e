//! Whole-state export and import.
//!
//! Snapshots are plain values; writing them anywhere is the caller's job.

use std::collections::BTreeSet;

use chrono::Utc;
use socialsim_types::SimulationExport;

use crate::error::StateError;
use crate::metrics;
use crate::state::SimulationState;

/// Copy the full state into an export payload.
pub fn export(state: &SimulationState) -> SimulationExport {
    SimulationExport {
        world: state.world.clone(),
        personas: state.roster.list().to_vec(),
        history: state.history.records().to_vec(),
        metrics: state.metrics.list().to_vec(),
        metric_data: state.metrics.data().clone(),
        exported_at: Utc::now(),
    }
}

/// Replace every store with the snapshot's contents.
///
/// The round clock resumes from the last imported record, the event queue
/// is emptied, series for unknown metric IDs are dropped, and imported
/// samples are clamped into their metric's range.
///
/// # Errors
///
/// Nothing is replaced on error:
/// - [`StateError::InvalidHistory`] if the imported rounds are not exactly
///   `1, 2, 3, ...`
/// - [`StateError::EmptyName`] for a blank persona or metric name
/// - [`StateError::InvalidRange`] for an inverted or non-finite metric range
/// - [`StateError::DuplicateId`] if a persona or metric ID repeats
pub fn import(state: &mut SimulationState, snapshot: SimulationExport) -> Result<(), StateError> {
    check_rounds(&snapshot)?;
    check_definitions(&snapshot)?;

    let round = snapshot.history.last().map_or(0, |r| r.round);
    state.world = snapshot.world;
    state.roster.replace(snapshot.personas);
    state.history.replace(snapshot.history);
    state.metrics.replace(snapshot.metrics, snapshot.metric_data);
    state.events.clear();
    state.round = round;
    Ok(())
}

fn check_definitions(snapshot: &SimulationExport) -> Result<(), StateError> {
    let mut persona_ids = BTreeSet::new();
    for persona in &snapshot.personas {
        if persona.name.trim().is_empty() {
            return Err(StateError::EmptyName);
        }
        if !persona_ids.insert(persona.id) {
            return Err(StateError::DuplicateId {
                kind: "persona",
                id: persona.id.to_string(),
            });
        }
    }

    let mut metric_ids = BTreeSet::new();
    for metric in &snapshot.metrics {
        metrics::validate_metric(metric)?;
        if !metric_ids.insert(metric.id) {
            return Err(StateError::DuplicateId {
                kind: "metric",
                id: metric.id.to_string(),
            });
        }
    }
    Ok(())
}

fn check_rounds(snapshot: &SimulationExport) -> Result<(), StateError> {
    let mut expected = 0_u64;
    for (index, record) in snapshot.history.iter().enumerate() {
        expected = expected.checked_add(1).ok_or(StateError::RoundOverflow)?;
        if record.round != expected {
            return Err(StateError::InvalidHistory {
                index,
                expected,
                found: record.round,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use socialsim_types::{MetricDraft, MetricId, MetricSample, PersonaDraft, PersonaId, TurnId, TurnRecord};

    use super::*;

    fn record(round: u64) -> TurnRecord {
        TurnRecord {
            id: TurnId::new(),
            round,
            persona_id: PersonaId::new(),
            persona_name: String::from("A"),
            content: String::from("ok"),
            timestamp: Utc::now(),
            injected_event: None,
            is_error: false,
        }
    }

    fn populated() -> SimulationState {
        let mut state = SimulationState::new();
        state.world.name = String::from("Harbor");
        state
            .roster
            .upsert(PersonaDraft {
                name: String::from("A"),
                ..PersonaDraft::default()
            })
            .unwrap();
        state
            .metrics
            .upsert(MetricDraft {
                id: None,
                name: String::from("trust"),
                description: String::new(),
                min: 0.0,
                max: 10.0,
                unit: String::new(),
            })
            .unwrap();
        for round in 1..=3 {
            state.history.append(record(round));
        }
        state.round = 3;
        state
    }

    #[test]
    fn export_then_import_restores_state() {
        let source = populated();
        let snapshot = export(&source);

        let mut restored = SimulationState::new();
        restored.events.inject("stale").unwrap();
        import(&mut restored, snapshot).unwrap();

        assert_eq!(restored.round, 3);
        assert_eq!(restored.world.name, "Harbor");
        assert_eq!(restored.roster, source.roster);
        assert_eq!(restored.history, source.history);
        assert_eq!(restored.metrics, source.metrics);
        assert!(restored.events.is_empty());
    }

    #[test]
    fn gapped_history_is_rejected_without_changes() {
        let mut snapshot = export(&populated());
        snapshot.history.remove(1);

        let mut state = SimulationState::new();
        let result = import(&mut state, snapshot);

        assert_eq!(
            result,
            Err(StateError::InvalidHistory {
                index: 1,
                expected: 2,
                found: 3
            })
        );
        assert_eq!(state, SimulationState::new());
    }

    #[test]
    fn orphan_series_are_dropped_and_missing_ones_created() {
        let mut snapshot = export(&populated());
        let metric_id = snapshot.metrics.first().unwrap().id;
        snapshot.metric_data.clear();
        snapshot
            .metric_data
            .insert(MetricId::new(), vec![MetricSample { round: 1, value: 1.0 }]);

        let mut state = SimulationState::new();
        import(&mut state, snapshot).unwrap();

        assert_eq!(state.metrics.data().len(), 1);
        assert!(state.metrics.series(metric_id).unwrap().is_empty());
    }

    #[test]
    fn inverted_metric_range_is_rejected_without_changes() {
        let mut snapshot = export(&populated());
        if let Some(metric) = snapshot.metrics.first_mut() {
            metric.min = 100.0;
            metric.max = 0.0;
        }

        let mut state = SimulationState::new();
        let result = import(&mut state, snapshot);

        assert!(matches!(result, Err(StateError::InvalidRange { .. })));
        assert_eq!(state, SimulationState::new());
    }

    #[test]
    fn non_finite_metric_bound_is_rejected() {
        let mut snapshot = export(&populated());
        if let Some(metric) = snapshot.metrics.first_mut() {
            metric.max = f64::INFINITY;
        }

        let result = import(&mut SimulationState::new(), snapshot);

        assert!(matches!(result, Err(StateError::InvalidRange { .. })));
    }

    #[test]
    fn repeated_persona_id_is_rejected_without_changes() {
        let mut snapshot = export(&populated());
        let persona = snapshot.personas.first().unwrap().clone();
        snapshot.personas.push(persona.clone());

        let mut state = populated();
        let before = state.clone();
        let result = import(&mut state, snapshot);

        assert_eq!(
            result,
            Err(StateError::DuplicateId {
                kind: "persona",
                id: persona.id.to_string(),
            })
        );
        assert_eq!(state, before);
    }

    #[test]
    fn repeated_metric_id_is_rejected() {
        let mut snapshot = export(&populated());
        let metric = snapshot.metrics.first().unwrap().clone();
        snapshot.metrics.push(metric);

        let result = import(&mut SimulationState::new(), snapshot);

        assert!(matches!(
            result,
            Err(StateError::DuplicateId { kind: "metric", .. })
        ));
    }

    #[test]
    fn blank_persona_name_is_rejected() {
        let mut snapshot = export(&populated());
        if let Some(persona) = snapshot.personas.first_mut() {
            persona.name = String::from("  ");
        }

        let result = import(&mut SimulationState::new(), snapshot);

        assert_eq!(result, Err(StateError::EmptyName));
    }

    #[test]
    fn imported_samples_are_clamped_into_range() {
        let mut snapshot = export(&populated());
        let metric_id = snapshot.metrics.first().unwrap().id;
        snapshot.metric_data.insert(
            metric_id,
            vec![
                MetricSample { round: 1, value: 50.0 },
                MetricSample { round: 2, value: f64::NAN },
                MetricSample { round: 3, value: -4.0 },
            ],
        );

        let mut state = SimulationState::new();
        import(&mut state, snapshot).unwrap();

        let series = state.metrics.series(metric_id).unwrap();
        let values: Vec<(u64, f64)> = series.iter().map(|s| (s.round, s.value)).collect();
        assert_eq!(values.len(), 2);
        assert!(values.iter().all(|(_, v)| (0.0..=10.0).contains(v)));
        assert_eq!(values.first().unwrap().0, 1);
        assert!((values.first().unwrap().1 - 10.0).abs() < f64::EPSILON);
        assert!(values.get(1).unwrap().1.abs() < f64::EPSILON);
    }

    #[test]
    fn empty_snapshot_resets_round() {
        let mut state = populated();
        let snapshot: SimulationExport = serde_json::from_str("{}").unwrap();
        import(&mut state, snapshot).unwrap();
        assert_eq!(state.round, 0);
        assert!(state.roster.is_empty());
    }
}
