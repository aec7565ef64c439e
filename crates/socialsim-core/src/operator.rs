//! The run controller: the one shared handle on a simulation.
//!
//! [`Simulation`] owns the [`SimulationState`] behind a single
//! [`tokio::sync::Mutex`]. Every operation, whether it comes from the
//! background loop or from an HTTP handler task, goes through that lock,
//! so a turn is never observed half-committed.
//!
//! # Run lifecycle
//!
//! Whether a run is active is an epoch stored in an [`AtomicU64`]: `0`
//! means stopped, any other value identifies the live background loop.
//! `start` installs a fresh epoch and spawns one loop carrying it; `stop`
//! clears it and wakes the loop from its sleep. A loop whose epoch is no
//! longer current exits at its next checkpoint, so a rapid stop/start pair
//! still leaves exactly one loop running.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use socialsim_types::{
    Metric, MetricData, MetricDraft, MetricId, Persona, PersonaDraft, PersonaId,
    SimulationExport, SimulationStatus, TurnRecord, World,
};
use tokio::sync::{Mutex, Notify, broadcast};
use tracing::{debug, info, warn};

use crate::error::{SimulationError, StateError};
use crate::generation;
use crate::generator::TextGenerator;
use crate::narrator::Narrator;
use crate::runner;
use crate::scheduler;
use crate::snapshot;
use crate::state::SimulationState;

/// Capacity of the committed-turn broadcast channel.
const TURN_CHANNEL_CAPACITY: usize = 256;

/// What happened when the background loop asked for a turn.
#[derive(Debug)]
pub(crate) enum LoopTurn {
    /// A record was committed.
    Committed(TurnRecord),
    /// An error-tagged record was committed and the run was marked stopped
    /// before the record was published.
    Halted(TurnRecord),
    /// The roster is empty; nothing changed.
    Idle,
    /// The turn was refused and the run was marked stopped.
    Refused(StateError),
    /// The loop's run is no longer the current one.
    Superseded,
}

/// Shared simulation handle.
///
/// Wrap it in an [`Arc`]; [`Simulation::start`] needs one to hand to the
/// background loop.
#[derive(Debug)]
pub struct Simulation<G> {
    narrator: Narrator<G>,
    state: Mutex<SimulationState>,
    /// Epoch of the live run, 0 when stopped.
    run_epoch: AtomicU64,
    epoch_counter: AtomicU64,
    cadence_secs: AtomicU64,
    /// Cuts the inter-turn sleep short.
    wake: Notify,
    turns: broadcast::Sender<TurnRecord>,
}

impl<G: TextGenerator> Simulation<G> {
    /// Create a stopped simulation with empty state.
    pub fn new(narrator: Narrator<G>) -> Self {
        let cadence = narrator.config().engine.default_cadence_secs;
        let (turns, _) = broadcast::channel(TURN_CHANNEL_CAPACITY);
        Self {
            narrator,
            state: Mutex::new(SimulationState::new()),
            run_epoch: AtomicU64::new(0),
            epoch_counter: AtomicU64::new(0),
            cadence_secs: AtomicU64::new(cadence),
            wake: Notify::new(),
            turns,
        }
    }

    /// The generator, prompts, and configuration in use.
    pub const fn narrator(&self) -> &Narrator<G> {
        &self.narrator
    }

    // -----------------------------------------------------------------------
    // Run control
    // -----------------------------------------------------------------------

    /// Whether a background run is active.
    pub fn is_running(&self) -> bool {
        self.run_epoch.load(Ordering::Acquire) != 0
    }

    /// Seconds between automatic turns.
    pub fn cadence_secs(&self) -> u64 {
        self.cadence_secs.load(Ordering::Acquire)
    }

    /// Start the background loop and return immediately.
    ///
    /// `None` uses the configured default cadence.
    ///
    /// # Errors
    ///
    /// [`StateError::AlreadyRunning`], [`StateError::InvalidCadence`],
    /// [`StateError::NoPersonas`], or [`SimulationError::Configuration`]
    /// when the generator has no credential, checked in that order.
    pub async fn start(self: &Arc<Self>, cadence_secs: Option<u64>) -> Result<(), SimulationError> {
        if self.is_running() {
            return Err(StateError::AlreadyRunning.into());
        }
        let cadence = cadence_secs.unwrap_or(self.narrator.config().engine.default_cadence_secs);
        if cadence == 0 {
            return Err(StateError::InvalidCadence.into());
        }

        let state = self.state.lock().await;
        if state.roster.is_empty() {
            return Err(StateError::NoPersonas.into());
        }
        if !self.narrator.generator().is_configured() {
            return Err(SimulationError::not_configured());
        }

        let epoch = self
            .epoch_counter
            .fetch_add(1, Ordering::AcqRel)
            .saturating_add(1);
        if self
            .run_epoch
            .compare_exchange(0, epoch, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(StateError::AlreadyRunning.into());
        }
        self.cadence_secs.store(cadence, Ordering::Release);
        drop(state);

        info!(
            epoch,
            cadence_secs = cadence,
            generator = self.narrator.generator().name(),
            model = self.narrator.generator().model(),
            "simulation started"
        );
        tokio::spawn(runner::run_loop(Arc::clone(self), epoch));
        Ok(())
    }

    /// Stop the background loop. Idempotent.
    ///
    /// A turn already in flight still commits; the loop exits at its next
    /// checkpoint.
    pub fn stop(&self) {
        let previous = self.run_epoch.swap(0, Ordering::AcqRel);
        if previous != 0 {
            info!(epoch = previous, "simulation stop requested");
        }
        self.wake.notify_waiters();
    }

    /// Run exactly one turn while no run is active.
    ///
    /// # Errors
    ///
    /// [`StateError::RunActive`] while running, or the scheduler's
    /// [`StateError::NoPersonas`].
    pub async fn step(&self) -> Result<TurnRecord, SimulationError> {
        let mut state = self.state.lock().await;
        if self.is_running() {
            return Err(StateError::RunActive.into());
        }
        let record = scheduler::advance(&mut state, &self.narrator).await?;
        self.publish(&record);
        Ok(record)
    }

    /// Point-in-time status. Waits at most for the turn in flight.
    pub async fn status(&self) -> SimulationStatus {
        let state = self.state.lock().await;
        SimulationStatus {
            running: self.is_running(),
            round: state.round,
            cadence_secs: self.cadence_secs(),
            persona_count: state.roster.len(),
        }
    }

    /// Receive every record committed from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<TurnRecord> {
        self.turns.subscribe()
    }

    // -----------------------------------------------------------------------
    // Background loop hooks
    // -----------------------------------------------------------------------

    pub(crate) fn is_current(&self, epoch: u64) -> bool {
        self.run_epoch.load(Ordering::Acquire) == epoch
    }

    /// Run one turn if `epoch` is still the live run.
    ///
    /// A failed or refused turn stops the run while the state lock is still
    /// held, so no reader sees the error record with `running` still set.
    pub(crate) async fn advance_if_current(&self, epoch: u64) -> LoopTurn {
        let mut state = self.state.lock().await;
        if !self.is_current(epoch) {
            return LoopTurn::Superseded;
        }
        match scheduler::advance(&mut state, &self.narrator).await {
            Ok(record) if record.is_error => {
                if self.halt(epoch) {
                    warn!(round = record.round, "turn failed, halting simulation");
                }
                self.publish(&record);
                LoopTurn::Halted(record)
            }
            Ok(record) => {
                self.publish(&record);
                LoopTurn::Committed(record)
            }
            Err(StateError::NoPersonas) => LoopTurn::Idle,
            Err(e) => {
                if self.halt(epoch) {
                    warn!(error = %e, "turn refused, halting simulation");
                }
                LoopTurn::Refused(e)
            }
        }
    }

    /// Mark the run stopped if `epoch` is still the live run.
    pub(crate) fn halt(&self, epoch: u64) -> bool {
        self.run_epoch
            .compare_exchange(epoch, 0, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub(crate) const fn wake(&self) -> &Notify {
        &self.wake
    }

    fn publish(&self, record: &TurnRecord) {
        let receivers = self.turns.send(record.clone()).unwrap_or(0);
        debug!(round = record.round, receivers, "turn published");
    }

    // -----------------------------------------------------------------------
    // Events and history
    // -----------------------------------------------------------------------

    /// Queue an event for the next turn.
    ///
    /// # Errors
    ///
    /// [`StateError::EmptyEvent`] for blank text.
    pub async fn inject_event(&self, event: &str) -> Result<(), SimulationError> {
        let mut state = self.state.lock().await;
        state.events.inject(event)?;
        info!(pending = state.events.len(), "event injected");
        Ok(())
    }

    /// Records from position `index` onward.
    pub async fn history_since(&self, index: usize) -> Vec<TurnRecord> {
        self.state.lock().await.history.since(index)
    }

    /// Clear history, zero the round, and empty every metric series.
    pub async fn reset_history(&self) {
        self.state.lock().await.reset_history();
        info!("history reset");
    }

    // -----------------------------------------------------------------------
    // World and roster
    // -----------------------------------------------------------------------

    /// The current world setting.
    pub async fn world(&self) -> World {
        self.state.lock().await.world.clone()
    }

    /// Replace the world setting.
    pub async fn set_world(&self, world: World) {
        info!(name = %world.name, "world updated");
        self.state.lock().await.world = world;
    }

    /// All personas in scheduling order.
    pub async fn list_personas(&self) -> Vec<Persona> {
        self.state.lock().await.roster.list().to_vec()
    }

    /// Create or replace a persona.
    ///
    /// # Errors
    ///
    /// [`StateError::EmptyName`] or [`StateError::PersonaNotFound`].
    pub async fn upsert_persona(&self, draft: PersonaDraft) -> Result<Persona, SimulationError> {
        let persona = self.state.lock().await.roster.upsert(draft)?;
        info!(persona = %persona.name, id = %persona.id, "persona saved");
        Ok(persona)
    }

    /// Remove a persona from the roster. Its history records remain.
    ///
    /// # Errors
    ///
    /// [`StateError::PersonaNotFound`].
    pub async fn delete_persona(&self, id: PersonaId) -> Result<Persona, SimulationError> {
        let persona = self.state.lock().await.roster.remove(id)?;
        info!(persona = %persona.name, id = %id, "persona deleted");
        Ok(persona)
    }

    /// Remove every persona.
    pub async fn clear_roster(&self) {
        self.state.lock().await.roster.clear();
        info!("roster cleared");
    }

    /// Generate a roster for the current world and replace the existing one.
    ///
    /// `None` asks for the configured default count. The generator call
    /// runs without holding the state lock.
    ///
    /// # Errors
    ///
    /// [`SimulationError::Configuration`] without a credential, then the
    /// errors of [`generation::generate_personas`].
    pub async fn generate_personas(&self, count: Option<usize>) -> Result<Vec<Persona>, SimulationError> {
        if !self.narrator.generator().is_configured() {
            return Err(SimulationError::not_configured());
        }
        let count = count.unwrap_or(self.narrator.config().generation.default_persona_count);
        let world = self.world().await;

        let personas = generation::generate_personas(&self.narrator, &world, count).await?;
        self.state.lock().await.roster.replace(personas.clone());
        Ok(personas)
    }

    // -----------------------------------------------------------------------
    // Metrics
    // -----------------------------------------------------------------------

    /// All metric definitions.
    pub async fn list_metrics(&self) -> Vec<Metric> {
        self.state.lock().await.metrics.list().to_vec()
    }

    /// Create or replace a metric definition.
    ///
    /// # Errors
    ///
    /// [`StateError::EmptyName`], [`StateError::InvalidRange`], or
    /// [`StateError::MetricNotFound`].
    pub async fn upsert_metric(&self, draft: MetricDraft) -> Result<Metric, SimulationError> {
        let metric = self.state.lock().await.metrics.upsert(draft)?;
        info!(metric = %metric.name, id = %metric.id, "metric saved");
        Ok(metric)
    }

    /// Delete a metric and its series.
    ///
    /// # Errors
    ///
    /// [`StateError::MetricNotFound`].
    pub async fn delete_metric(&self, id: MetricId) -> Result<Metric, SimulationError> {
        let metric = self.state.lock().await.metrics.remove(id)?;
        info!(metric = %metric.name, id = %id, "metric deleted");
        Ok(metric)
    }

    /// Every metric series.
    pub async fn metric_data(&self) -> MetricData {
        self.state.lock().await.metrics.data().clone()
    }

    /// Draft a metric from a description without storing it.
    ///
    /// # Errors
    ///
    /// [`SimulationError::Configuration`] without a credential, then the
    /// errors of [`generation::draft_metric`].
    pub async fn draft_metric(&self, description: &str) -> Result<Metric, SimulationError> {
        if !self.narrator.generator().is_configured() {
            return Err(SimulationError::not_configured());
        }
        generation::draft_metric(&self.narrator, description).await
    }

    // -----------------------------------------------------------------------
    // Snapshots
    // -----------------------------------------------------------------------

    /// Export the full state.
    pub async fn export(&self) -> SimulationExport {
        snapshot::export(&*self.state.lock().await)
    }

    /// Replace the full state with a snapshot.
    ///
    /// # Errors
    ///
    /// [`StateError::RunActive`] while running, or
    /// [`StateError::InvalidHistory`].
    pub async fn import(&self, data: SimulationExport) -> Result<(), SimulationError> {
        let mut state = self.state.lock().await;
        if self.is_running() {
            return Err(StateError::RunActive.into());
        }
        snapshot::import(&mut state, data)?;
        info!(
            round = state.round,
            personas = state.roster.len(),
            metrics = state.metrics.list().len(),
            "snapshot imported"
        );
        Ok(())
    }
}
