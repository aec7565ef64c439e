//! Axum router construction for the SocialSim API.
//!
//! Assembles all routes (REST + `WebSocket`) into a single [`Router`]
//! with CORS middleware enabled for cross-origin front-end access.

use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, post};
use socialsim_core::TextGenerator;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::operator;
use crate::state::AppState;
use crate::ws;

/// Build the complete Axum router over a shared [`AppState`].
///
/// CORS allows any origin so a front end served elsewhere can drive the
/// simulation.
pub fn build_router<G: TextGenerator>(state: Arc<AppState<G>>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Status page
        .route("/", get(handlers::index::<G>))
        // WebSocket
        .route("/ws/turns", get(ws::ws_turns::<G>))
        // Configuration and world
        .route("/api/config", get(handlers::get_config::<G>))
        .route(
            "/api/world",
            get(handlers::get_world::<G>).post(handlers::set_world::<G>),
        )
        // Roster
        .route(
            "/api/personas",
            get(handlers::list_personas::<G>).post(handlers::upsert_persona::<G>),
        )
        .route("/api/personas/clear", post(handlers::clear_personas::<G>))
        .route(
            "/api/personas/generate",
            post(handlers::generate_personas::<G>),
        )
        .route("/api/personas/{id}", delete(handlers::delete_persona::<G>))
        // Metrics
        .route(
            "/api/metrics",
            get(handlers::list_metrics::<G>).post(handlers::upsert_metric::<G>),
        )
        .route("/api/metrics/data", get(handlers::metric_data::<G>))
        .route("/api/metrics/generate", post(handlers::draft_metric::<G>))
        .route("/api/metrics/{id}", delete(handlers::delete_metric::<G>))
        // Run control
        .route("/api/simulation/start", post(operator::start::<G>))
        .route("/api/simulation/stop", post(operator::stop::<G>))
        .route("/api/simulation/step", post(operator::step::<G>))
        .route("/api/simulation/status", get(operator::status::<G>))
        // Events, history, snapshots
        .route("/api/event", post(handlers::inject_event::<G>))
        .route("/api/history", get(handlers::get_history::<G>))
        .route("/api/history/clear", post(handlers::clear_history::<G>))
        .route("/api/export", get(handlers::export::<G>))
        .route("/api/import", post(handlers::import::<G>))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
