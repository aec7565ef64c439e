//! The single owned aggregate of mutable simulation state.
//!
//! Everything the scheduler reads or writes lives here, behind the one
//! mutex owned by [`crate::operator::Simulation`]. Holding the guard is
//! what makes a turn atomic with respect to every other operation.

use socialsim_types::World;

use crate::events::EventQueue;
use crate::history::HistoryLog;
use crate::metrics::MetricStore;
use crate::roster::Roster;

/// World, roster, history, event queue, metrics, and the round clock.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimulationState {
    pub(crate) world: World,
    pub(crate) roster: Roster,
    pub(crate) history: HistoryLog,
    pub(crate) events: EventQueue,
    pub(crate) metrics: MetricStore,
    pub(crate) round: u64,
}

impl SimulationState {
    /// Empty state at round 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// The world setting.
    pub const fn world(&self) -> &World {
        &self.world
    }

    /// The persona roster.
    pub const fn roster(&self) -> &Roster {
        &self.roster
    }

    /// The committed history.
    pub const fn history(&self) -> &HistoryLog {
        &self.history
    }

    /// Pending injected events.
    pub const fn events(&self) -> &EventQueue {
        &self.events
    }

    /// Metric definitions and series.
    pub const fn metrics(&self) -> &MetricStore {
        &self.metrics
    }

    /// The last committed round, 0 before the first turn.
    pub const fn round(&self) -> u64 {
        self.round
    }

    /// Clear history, zero the round, and empty every metric series.
    ///
    /// Pending events and every definition survive.
    pub fn reset_history(&mut self) {
        self.history.clear();
        self.round = 0;
        self.metrics.truncate_series();
    }
}
