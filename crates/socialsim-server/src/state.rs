//! Shared application state for the API server.
//!
//! [`AppState`] wraps the single [`Simulation`] every handler talks to.
//! All engine state lives behind the simulation's own lock, so the server
//! keeps nothing of its own.

use std::sync::Arc;

use socialsim_core::{Simulation, TextGenerator};
use socialsim_types::TurnRecord;
use tokio::sync::broadcast;

/// Shared state accessible from all Axum handlers.
pub struct AppState<G> {
    /// The simulation instance.
    pub simulation: Arc<Simulation<G>>,
}

impl<G: TextGenerator> AppState<G> {
    /// Wrap an existing simulation.
    pub const fn new(simulation: Arc<Simulation<G>>) -> Self {
        Self { simulation }
    }

    /// Subscribe to committed turns.
    pub fn subscribe(&self) -> broadcast::Receiver<TurnRecord> {
        self.simulation.subscribe()
    }
}
