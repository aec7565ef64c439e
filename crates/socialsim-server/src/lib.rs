//! HTTP API server for the SocialSim narrative simulation.
//!
//! This crate exposes a [`Simulation`](socialsim_core::Simulation) over
//! Axum:
//!
//! - **REST endpoints** for the world, roster, metrics, events, history,
//!   and whole-state snapshots
//! - **Run-control endpoints** (`/api/simulation/*`) for start, stop,
//!   single steps, and status
//! - **`WebSocket` endpoint** (`/ws/turns`) streaming every committed turn
//! - **Minimal HTML page** (`GET /`) showing run status and API links
//!
//! Handlers are generic over the
//! [`TextGenerator`](socialsim_core::TextGenerator), so tests drive the
//! full router with a scripted stub and no network.

pub mod error;
pub mod handlers;
pub mod operator;
pub mod router;
pub mod server;
pub mod state;
pub mod ws;

// Re-export primary types for convenience.
pub use error::ApiError;
pub use router::build_router;
pub use server::{ServerError, start_server};
pub use state::AppState;
