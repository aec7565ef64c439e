//! Run-control REST handlers.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/api/simulation/start` | Start the background loop |
//! | `POST` | `/api/simulation/stop` | Stop the background loop |
//! | `POST` | `/api/simulation/step` | Run one turn while stopped |
//! | `GET` | `/api/simulation/status` | Running flag, round, cadence, roster size |

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::response::IntoResponse;
use socialsim_core::TextGenerator;

use crate::error::ApiError;
use crate::state::AppState;

/// Request body for `POST /api/simulation/start`.
#[derive(Debug, Default, serde::Deserialize)]
pub struct StartRequest {
    /// Seconds between turns; the configured default when absent.
    pub cadence_secs: Option<u64>,
}

// ---------------------------------------------------------------------------
// POST /api/simulation/start
// ---------------------------------------------------------------------------

/// Start the background loop and return the new status.
///
/// The body is optional; an empty request uses the default cadence.
pub async fn start<G: TextGenerator>(
    State(state): State<Arc<AppState<G>>>,
    body: Option<Json<StartRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = body.unwrap_or_default();
    state.simulation.start(request.cadence_secs).await?;
    Ok(Json(state.simulation.status().await))
}

// ---------------------------------------------------------------------------
// POST /api/simulation/stop
// ---------------------------------------------------------------------------

/// Stop the background loop. Stopping a stopped simulation is not an error.
///
/// The response waits for a turn in flight to commit.
pub async fn stop<G: TextGenerator>(State(state): State<Arc<AppState<G>>>) -> impl IntoResponse {
    state.simulation.stop();
    Json(state.simulation.status().await)
}

// ---------------------------------------------------------------------------
// POST /api/simulation/step
// ---------------------------------------------------------------------------

/// Run exactly one turn and return its record.
pub async fn step<G: TextGenerator>(
    State(state): State<Arc<AppState<G>>>,
) -> Result<impl IntoResponse, ApiError> {
    let record = state.simulation.step().await?;
    Ok(Json(record))
}

// ---------------------------------------------------------------------------
// GET /api/simulation/status
// ---------------------------------------------------------------------------

/// Current run status.
pub async fn status<G: TextGenerator>(State(state): State<Arc<AppState<G>>>) -> impl IntoResponse {
    Json(state.simulation.status().await)
}
