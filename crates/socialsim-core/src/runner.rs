//! The background auto-advance loop.
//!
//! Spawned by [`Simulation::start`] with the epoch it was started under.
//! Each iteration runs one turn, then sleeps for the current cadence. The
//! loop ends when:
//!
//! - **Stopped**: its epoch is no longer current at the top of the loop,
//!   under the state lock, or after the sleep
//! - **Halted**: a turn committed an error-tagged record, which also marks
//!   the run stopped
//!
//! An empty roster does not end the run; the loop idles until personas
//! are added or the run is stopped.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::generator::TextGenerator;
use crate::operator::{LoopTurn, Simulation};

/// Why a run loop exited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LoopExit {
    /// The run was stopped or replaced.
    Stopped,
    /// A failed turn halted the run.
    Halted,
}

/// Drive turns until the run identified by `epoch` ends.
pub(crate) async fn run_loop<G: TextGenerator>(sim: Arc<Simulation<G>>, epoch: u64) -> LoopExit {
    let exit = drive(&sim, epoch).await;
    info!(epoch, reason = ?exit, "run loop exited");
    exit
}

async fn drive<G: TextGenerator>(sim: &Simulation<G>, epoch: u64) -> LoopExit {
    loop {
        if !sim.is_current(epoch) {
            return LoopExit::Stopped;
        }

        match sim.advance_if_current(epoch).await {
            LoopTurn::Superseded => return LoopExit::Stopped,
            LoopTurn::Halted(record) => {
                debug!(round = record.round, "failed turn ended the run");
                return LoopExit::Halted;
            }
            LoopTurn::Refused(e) => {
                debug!(error = %e, "refused turn ended the run");
                return LoopExit::Halted;
            }
            LoopTurn::Committed(record) => {
                debug!(round = record.round, "auto turn committed");
            }
            LoopTurn::Idle => {
                debug!("roster is empty, idling");
            }
        }

        // Register for the stop signal before re-checking the epoch so a
        // stop between the check and the sleep is not lost.
        let notified = sim.wake().notified();
        tokio::pin!(notified);
        notified.as_mut().enable();
        if !sim.is_current(epoch) {
            return LoopExit::Stopped;
        }

        let cadence = Duration::from_secs(sim.cadence_secs());
        tokio::select! {
            () = tokio::time::sleep(cadence) => {}
            () = &mut notified => {}
        }
    }
}
