//! End-to-end properties of the run controller, driven through the public
//! [`Simulation`] API with a scripted generator.
//!
//! Loop and cadence tests run on a paused clock so sleeps complete
//! instantly and deterministically.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use socialsim_core::{
    GeneratorError, Narrator, PromptEngine, Simulation, SimulationConfig, SimulationError,
    StateError, StubGenerator,
};
use socialsim_types::{MetricDraft, PersonaDraft, TurnRecord, World};

fn simulation(stub: StubGenerator) -> Arc<Simulation<StubGenerator>> {
    let narrator = Narrator::new(
        stub,
        PromptEngine::builtin().unwrap(),
        SimulationConfig::default(),
    );
    Arc::new(Simulation::new(narrator))
}

async fn add_personas(sim: &Simulation<StubGenerator>, names: &[&str]) {
    for name in names {
        sim.upsert_persona(PersonaDraft {
            name: (*name).to_owned(),
            ..PersonaDraft::default()
        })
        .await
        .unwrap();
    }
}

fn assert_contiguous(history: &[TurnRecord]) {
    for (expected, record) in (1_u64..).zip(history) {
        assert_eq!(record.round, expected);
    }
}

#[tokio::test]
async fn two_personas_three_steps() {
    let sim = simulation(StubGenerator::replying("ok"));
    add_personas(&sim, &["A", "B"]).await;

    for _ in 0..3 {
        sim.step().await.unwrap();
    }

    let history = sim.history_since(0).await;
    let turns: Vec<(u64, &str, &str)> = history
        .iter()
        .map(|r| (r.round, r.persona_name.as_str(), r.content.as_str()))
        .collect();
    assert_eq!(turns, vec![(1, "A", "ok"), (2, "B", "ok"), (3, "A", "ok")]);
    assert_eq!(sim.status().await.round, 3);
}

#[tokio::test]
async fn step_on_empty_roster_changes_nothing() {
    let sim = simulation(StubGenerator::default());

    let result = sim.step().await;

    assert_eq!(result, Err(SimulationError::State(StateError::NoPersonas)));
    assert_eq!(sim.status().await.round, 0);
    assert!(sim.history_since(0).await.is_empty());
}

#[tokio::test]
async fn injected_event_tags_one_turn() {
    let sim = simulation(StubGenerator::default());
    add_personas(&sim, &["A"]).await;
    sim.inject_event("the river floods").await.unwrap();
    assert_eq!(
        sim.inject_event("   ").await,
        Err(SimulationError::State(StateError::EmptyEvent))
    );

    let first = sim.step().await.unwrap();
    let second = sim.step().await.unwrap();

    assert_eq!(first.injected_event.as_deref(), Some("the river floods"));
    assert!(second.injected_event.is_none());
}

#[tokio::test]
async fn metric_samples_are_clamped() {
    let stub = StubGenerator::replying("ok").with_script(
        std::iter::repeat_with(|| Ok(String::from("*acts*")))
            .take(5)
            .chain([Ok(String::from(r#"{"tension": 150}"#))]),
    );
    let sim = simulation(stub);
    add_personas(&sim, &["A", "B"]).await;
    let metric = sim
        .upsert_metric(MetricDraft {
            id: None,
            name: String::from("tension"),
            description: String::from("how tense things are"),
            min: 0.0,
            max: 100.0,
            unit: String::new(),
        })
        .await
        .unwrap();

    for _ in 0..5 {
        sim.step().await.unwrap();
    }

    let data = sim.metric_data().await;
    let series = data.get(&metric.id).unwrap();
    assert_eq!(series.len(), 1);
    let sample = series.first().unwrap();
    assert_eq!(sample.round, 5);
    assert!((sample.value - 100.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn reset_clears_history_round_and_series() {
    let stub = StubGenerator::replying("ok").with_script(
        std::iter::repeat_with(|| Ok(String::from("ok")))
            .take(5)
            .chain([Ok(String::from(r#"{"trust": 4}"#))]),
    );
    let sim = simulation(stub);
    add_personas(&sim, &["A"]).await;
    let metric = sim
        .upsert_metric(MetricDraft {
            id: None,
            name: String::from("trust"),
            description: String::new(),
            min: 0.0,
            max: 10.0,
            unit: String::new(),
        })
        .await
        .unwrap();
    for _ in 0..5 {
        sim.step().await.unwrap();
    }
    assert_eq!(sim.metric_data().await.get(&metric.id).unwrap().len(), 1);

    sim.reset_history().await;

    assert_eq!(sim.status().await.round, 0);
    assert!(sim.history_since(0).await.is_empty());
    assert!(sim.metric_data().await.get(&metric.id).unwrap().is_empty());
    assert_eq!(sim.list_metrics().await.len(), 1);
    assert_eq!(sim.step().await.unwrap().round, 1);
}

#[tokio::test]
async fn start_preconditions() {
    let sim = simulation(StubGenerator::default());
    assert_eq!(
        sim.start(Some(1)).await,
        Err(SimulationError::State(StateError::NoPersonas))
    );

    add_personas(&sim, &["A"]).await;
    assert_eq!(
        sim.start(Some(0)).await,
        Err(SimulationError::State(StateError::InvalidCadence))
    );

    let unconfigured = simulation(StubGenerator::default().unconfigured());
    add_personas(&unconfigured, &["A"]).await;
    assert!(matches!(
        unconfigured.start(Some(1)).await,
        Err(SimulationError::Configuration(_))
    ));
    assert!(!unconfigured.status().await.running);
}

#[tokio::test(start_paused = true)]
async fn second_start_is_rejected() {
    let sim = simulation(StubGenerator::default());
    add_personas(&sim, &["A"]).await;

    sim.start(Some(5)).await.unwrap();
    assert_eq!(
        sim.start(Some(5)).await,
        Err(SimulationError::State(StateError::AlreadyRunning))
    );
    assert_eq!(
        sim.step().await,
        Err(SimulationError::State(StateError::RunActive))
    );

    sim.stop();
    sim.stop();
    assert!(!sim.status().await.running);
}

#[tokio::test(start_paused = true)]
async fn rounds_stay_contiguous_across_manual_and_auto_turns() {
    let sim = simulation(StubGenerator::replying("ok"));
    add_personas(&sim, &["A", "B", "C"]).await;

    sim.step().await.unwrap();
    sim.step().await.unwrap();
    sim.start(Some(1)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(3_500)).await;
    sim.stop();
    sim.step().await.unwrap();

    let history = sim.history_since(0).await;
    assert!(history.len() >= 4);
    assert_contiguous(&history);
    let status = sim.status().await;
    assert!(!status.running);
    assert_eq!(status.round, u64::try_from(history.len()).unwrap());
}

#[tokio::test(start_paused = true)]
async fn failed_turn_halts_the_loop() {
    let stub = StubGenerator::replying("ok").with_script([
        Ok(String::from("fine")),
        Err(GeneratorError::Request(String::from("rate limited"))),
    ]);
    let sim = simulation(stub);
    add_personas(&sim, &["A", "B"]).await;

    sim.start(Some(1)).await.unwrap();
    tokio::time::sleep(Duration::from_secs(10)).await;

    let status = sim.status().await;
    assert!(!status.running);
    assert_eq!(status.round, 2);
    let history = sim.history_since(0).await;
    let last = history.last().unwrap();
    assert!(last.is_error);
    assert!(last.content.contains("rate limited"));
    assert_eq!(sim.narrator().generator().call_count(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn failed_turn_is_published_after_the_run_stops() {
    let sim = simulation(StubGenerator::failing("quota exhausted"));
    add_personas(&sim, &["A"]).await;
    let mut rx = sim.subscribe();

    sim.start(Some(1)).await.unwrap();
    let record = rx.recv().await.unwrap();

    assert!(record.is_error);
    assert!(!sim.is_running());
}

#[tokio::test(start_paused = true)]
async fn roster_edits_during_a_turn_apply_to_later_turns() {
    let sim = simulation(StubGenerator::replying("ok").with_delay(Duration::from_secs(10)));
    add_personas(&sim, &["Anselm", "Bartholomew"]).await;
    let personas = sim.list_personas().await;
    let first_id = personas.first().unwrap().id;
    let second_id = personas.get(1).unwrap().id;

    let turn = tokio::spawn({
        let sim = Arc::clone(&sim);
        async move { sim.step().await }
    });
    while sim.narrator().generator().call_count() == 0 {
        tokio::task::yield_now().await;
    }

    let edit = tokio::spawn({
        let sim = Arc::clone(&sim);
        async move {
            sim.upsert_persona(PersonaDraft {
                id: Some(first_id),
                name: String::from("Ada"),
                ..PersonaDraft::default()
            })
            .await
            .unwrap();
            sim.delete_persona(second_id).await.unwrap();
        }
    });
    tokio::task::yield_now().await;
    assert!(!edit.is_finished());

    let in_flight = turn.await.unwrap().unwrap();
    assert_eq!(in_flight.round, 1);
    assert_eq!(in_flight.persona_name, "Anselm");
    let calls = sim.narrator().generator().calls();
    assert!(calls.first().unwrap().text().contains("Bartholomew"));

    edit.await.unwrap();
    let next = sim.step().await.unwrap();

    assert_eq!(next.round, 2);
    assert_eq!(next.persona_id, first_id);
    assert_eq!(next.persona_name, "Ada");
    let calls = sim.narrator().generator().calls();
    assert!(!calls.get(1).unwrap().text().contains("Bartholomew"));
}

#[tokio::test(start_paused = true)]
async fn stop_lets_the_turn_in_flight_commit() {
    let sim = simulation(StubGenerator::replying("slow").with_delay(Duration::from_secs(10)));
    add_personas(&sim, &["A"]).await;

    sim.start(Some(1)).await.unwrap();
    while sim.narrator().generator().call_count() == 0 {
        tokio::task::yield_now().await;
    }
    sim.stop();

    // Waits for the in-flight turn to release the lock.
    let status = sim.status().await;
    assert!(!status.running);
    assert_eq!(status.round, 1);

    tokio::time::sleep(Duration::from_secs(30)).await;
    let history = sim.history_since(0).await;
    assert_eq!(history.len(), 1);
    assert!(!history.first().unwrap().is_error);
}

#[tokio::test(start_paused = true)]
async fn rapid_restart_runs_one_loop() {
    let sim = simulation(StubGenerator::default());
    add_personas(&sim, &["A"]).await;

    sim.start(Some(10)).await.unwrap();
    sim.stop();
    sim.start(Some(10)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(4_500)).await;

    assert_eq!(sim.status().await.round, 1);
    sim.stop();
}

#[tokio::test]
async fn committed_turns_are_broadcast() {
    let sim = simulation(StubGenerator::replying("hello"));
    add_personas(&sim, &["A"]).await;
    let mut rx = sim.subscribe();

    let record = sim.step().await.unwrap();

    assert_eq!(rx.recv().await.unwrap(), record);
}

#[tokio::test]
async fn generated_personas_replace_the_roster() {
    let sim = simulation(StubGenerator::replying(
        r#"[{"name": "Ada"}, {"name": "Bo"}, {"name": "Cy"}]"#,
    ));
    add_personas(&sim, &["Old"]).await;
    assert_eq!(
        sim.generate_personas(Some(3)).await,
        Err(SimulationError::State(StateError::MissingBackground))
    );

    sim.set_world(World {
        name: String::from("Harbor"),
        background: String::from("A fishing village"),
        ..World::default()
    })
    .await;
    let personas = sim.generate_personas(Some(3)).await.unwrap();

    let names: Vec<String> = sim.list_personas().await.into_iter().map(|p| p.name).collect();
    assert_eq!(names, vec!["Ada", "Bo", "Cy"]);
    assert_eq!(personas.len(), 3);
}

#[tokio::test]
async fn import_restores_round_and_rejects_while_running() {
    let sim = simulation(StubGenerator::default());
    add_personas(&sim, &["A", "B"]).await;
    for _ in 0..4 {
        sim.step().await.unwrap();
    }
    sim.inject_event("pending").await.unwrap();
    let snapshot = sim.export().await;

    let other = simulation(StubGenerator::default());
    other.import(snapshot.clone()).await.unwrap();
    assert_eq!(other.status().await.round, 4);
    assert_eq!(other.status().await.persona_count, 2);
    let next = other.step().await.unwrap();
    assert_eq!(next.round, 5);
    assert_eq!(next.persona_name, "A");
    assert!(next.injected_event.is_none());

    other.start(Some(60)).await.unwrap();
    assert_eq!(
        other.import(snapshot).await,
        Err(SimulationError::State(StateError::RunActive))
    );
    other.stop();
}
