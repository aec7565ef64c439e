//! REST API endpoint handlers for world, roster, metrics, events, history,
//! and snapshots.
//!
//! Every handler is a thin adapter over a [`Simulation`] operation; all
//! validation happens in the engine and surfaces here as an [`ApiError`].
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/` | Minimal HTML status page |
//! | `GET` | `/api/config` | Generator credential and model |
//! | `GET` / `POST` | `/api/world` | Read / replace the world |
//! | `GET` / `POST` | `/api/personas` | List / upsert personas |
//! | `DELETE` | `/api/personas/{id}` | Delete a persona |
//! | `POST` | `/api/personas/clear` | Remove every persona |
//! | `POST` | `/api/personas/generate` | Generate a roster for the world |
//! | `GET` / `POST` | `/api/metrics` | List / upsert metrics |
//! | `DELETE` | `/api/metrics/{id}` | Delete a metric |
//! | `GET` | `/api/metrics/data` | Every metric series |
//! | `POST` | `/api/metrics/generate` | Draft a metric from a description |
//! | `POST` | `/api/event` | Queue an event |
//! | `GET` | `/api/history` | History since an index |
//! | `POST` | `/api/history/clear` | Reset history and series |
//! | `GET` | `/api/export` | Full snapshot |
//! | `POST` | `/api/import` | Restore a snapshot |
//!
//! [`Simulation`]: socialsim_core::Simulation

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::response::{Html, IntoResponse};
use socialsim_core::TextGenerator;
use socialsim_types::{MetricDraft, MetricId, PersonaDraft, PersonaId, SimulationExport, World};
use tracing::info;
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Query parameters for `GET /api/history`.
#[derive(Debug, serde::Deserialize)]
pub struct HistoryQuery {
    /// Index of the first record to return (default 0).
    pub since: Option<usize>,
}

/// Request body for `POST /api/personas/generate`.
#[derive(Debug, Default, serde::Deserialize)]
pub struct GeneratePersonasRequest {
    /// How many personas to create; the configured default when absent.
    pub count: Option<usize>,
}

/// Request body for `POST /api/metrics/generate`.
#[derive(Debug, serde::Deserialize)]
pub struct DraftMetricRequest {
    /// Plain-language description of what to measure.
    pub description: String,
}

/// Request body for `POST /api/event`.
#[derive(Debug, serde::Deserialize)]
pub struct InjectEventRequest {
    /// Event text shown to the next persona.
    pub event: String,
}

/// Response body for `GET /api/config`.
#[derive(Debug, serde::Serialize)]
pub struct ConfigResponse {
    /// Whether the text generator has a credential.
    pub has_key: bool,
    /// Model identifier requests go to.
    pub model: String,
    /// Backend name.
    pub backend: String,
}

/// Generic success response.
#[derive(Debug, serde::Serialize)]
pub(crate) struct OkResponse {
    /// Whether the operation succeeded.
    pub(crate) ok: bool,
    /// Human-readable message.
    pub(crate) message: String,
}

impl OkResponse {
    pub(crate) fn new(message: &str) -> Json<Self> {
        Json(Self {
            ok: true,
            message: message.to_owned(),
        })
    }
}

// ---------------------------------------------------------------------------
// GET / -- minimal HTML status page
// ---------------------------------------------------------------------------

/// Serve a minimal HTML page showing run status and API links.
pub async fn index<G: TextGenerator>(State(state): State<Arc<AppState<G>>>) -> impl IntoResponse {
    let status = state.simulation.status().await;
    let world = state.simulation.world().await;
    let world_name = if world.name.is_empty() {
        String::from("(untitled world)")
    } else {
        escape_html(&world.name)
    };
    let run_state = if status.running { "RUNNING" } else { "STOPPED" };

    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <title>SocialSim</title>
    <style>
        body {{ background: #0d1117; color: #c9d1d9; font-family: monospace; padding: 2rem; max-width: 800px; margin: 0 auto; }}
        h1 {{ color: #58a6ff; margin-bottom: 0.25rem; }}
        .subtitle {{ color: #8b949e; margin-top: 0; }}
        .metric {{ display: inline-block; background: #161b22; border: 1px solid #30363d; border-radius: 6px; padding: 1rem 1.5rem; margin: 0.5rem 0.5rem 0.5rem 0; }}
        .metric .label {{ color: #8b949e; font-size: 0.85rem; }}
        .metric .value {{ color: #58a6ff; font-size: 1.5rem; font-weight: bold; }}
        a {{ color: #58a6ff; text-decoration: none; }}
        ul {{ list-style: none; padding: 0; }}
        li::before {{ content: "GET "; color: #7ee787; font-weight: bold; }}
    </style>
</head>
<body>
    <h1>SocialSim</h1>
    <p class="subtitle">{world_name}</p>

    <div class="metric"><div class="label">Status</div><div class="value">{run_state}</div></div>
    <div class="metric"><div class="label">Round</div><div class="value">{round}</div></div>
    <div class="metric"><div class="label">Personas</div><div class="value">{personas}</div></div>
    <div class="metric"><div class="label">Cadence</div><div class="value">{cadence}s</div></div>

    <h2>API</h2>
    <ul>
        <li><a href="/api/simulation/status">/api/simulation/status</a></li>
        <li><a href="/api/world">/api/world</a></li>
        <li><a href="/api/personas">/api/personas</a></li>
        <li><a href="/api/metrics">/api/metrics</a></li>
        <li><a href="/api/metrics/data">/api/metrics/data</a></li>
        <li><a href="/api/history">/api/history</a></li>
        <li><a href="/api/export">/api/export</a></li>
        <li><a href="/api/config">/api/config</a></li>
    </ul>
</body>
</html>"#,
        round = status.round,
        personas = status.persona_count,
        cadence = status.cadence_secs,
    ))
}

fn escape_html(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

// ---------------------------------------------------------------------------
// GET /api/config
// ---------------------------------------------------------------------------

/// Report whether the text generator is usable, without exposing the key.
pub async fn get_config<G: TextGenerator>(
    State(state): State<Arc<AppState<G>>>,
) -> Json<ConfigResponse> {
    let generator = state.simulation.narrator().generator();
    Json(ConfigResponse {
        has_key: generator.is_configured(),
        model: generator.model().to_owned(),
        backend: generator.name().to_owned(),
    })
}

// ---------------------------------------------------------------------------
// /api/world
// ---------------------------------------------------------------------------

/// Return the world setting.
pub async fn get_world<G: TextGenerator>(State(state): State<Arc<AppState<G>>>) -> Json<World> {
    Json(state.simulation.world().await)
}

/// Replace the world setting and echo it back.
pub async fn set_world<G: TextGenerator>(
    State(state): State<Arc<AppState<G>>>,
    Json(world): Json<World>,
) -> Json<World> {
    state.simulation.set_world(world).await;
    Json(state.simulation.world().await)
}

// ---------------------------------------------------------------------------
// /api/personas
// ---------------------------------------------------------------------------

/// List personas in scheduling order.
pub async fn list_personas<G: TextGenerator>(
    State(state): State<Arc<AppState<G>>>,
) -> impl IntoResponse {
    Json(state.simulation.list_personas().await)
}

/// Create a persona, or replace one when the draft carries an `id`.
pub async fn upsert_persona<G: TextGenerator>(
    State(state): State<Arc<AppState<G>>>,
    Json(draft): Json<PersonaDraft>,
) -> Result<impl IntoResponse, ApiError> {
    let persona = state.simulation.upsert_persona(draft).await?;
    Ok(Json(persona))
}

/// Delete a persona and return it.
pub async fn delete_persona<G: TextGenerator>(
    State(state): State<Arc<AppState<G>>>,
    Path(id_str): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = PersonaId::from(parse_uuid(&id_str)?);
    let persona = state.simulation.delete_persona(id).await?;
    Ok(Json(persona))
}

/// Remove every persona.
pub async fn clear_personas<G: TextGenerator>(
    State(state): State<Arc<AppState<G>>>,
) -> impl IntoResponse {
    state.simulation.clear_roster().await;
    OkResponse::new("Roster cleared")
}

/// Generate a roster for the current world, replacing the existing one.
pub async fn generate_personas<G: TextGenerator>(
    State(state): State<Arc<AppState<G>>>,
    body: Option<Json<GeneratePersonasRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = body.unwrap_or_default();
    let personas = state.simulation.generate_personas(request.count).await?;
    info!(count = personas.len(), "roster generated");
    Ok(Json(personas))
}

// ---------------------------------------------------------------------------
// /api/metrics
// ---------------------------------------------------------------------------

/// List metric definitions.
pub async fn list_metrics<G: TextGenerator>(
    State(state): State<Arc<AppState<G>>>,
) -> impl IntoResponse {
    Json(state.simulation.list_metrics().await)
}

/// Create a metric, or replace one when the draft carries an `id`.
pub async fn upsert_metric<G: TextGenerator>(
    State(state): State<Arc<AppState<G>>>,
    Json(draft): Json<MetricDraft>,
) -> Result<impl IntoResponse, ApiError> {
    let metric = state.simulation.upsert_metric(draft).await?;
    Ok(Json(metric))
}

/// Delete a metric with its series and return the definition.
pub async fn delete_metric<G: TextGenerator>(
    State(state): State<Arc<AppState<G>>>,
    Path(id_str): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = MetricId::from(parse_uuid(&id_str)?);
    let metric = state.simulation.delete_metric(id).await?;
    Ok(Json(metric))
}

/// Every metric series, keyed by metric ID.
pub async fn metric_data<G: TextGenerator>(
    State(state): State<Arc<AppState<G>>>,
) -> impl IntoResponse {
    Json(state.simulation.metric_data().await)
}

/// Draft a metric definition from a description. The draft is not stored.
pub async fn draft_metric<G: TextGenerator>(
    State(state): State<Arc<AppState<G>>>,
    Json(body): Json<DraftMetricRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let metric = state.simulation.draft_metric(&body.description).await?;
    Ok(Json(metric))
}

// ---------------------------------------------------------------------------
// POST /api/event
// ---------------------------------------------------------------------------

/// Queue an event for the next turn.
pub async fn inject_event<G: TextGenerator>(
    State(state): State<Arc<AppState<G>>>,
    Json(body): Json<InjectEventRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state.simulation.inject_event(&body.event).await?;
    Ok(OkResponse::new("Event queued for the next turn"))
}

// ---------------------------------------------------------------------------
// /api/history
// ---------------------------------------------------------------------------

/// Records from `since` onward; an index past the end yields `[]`.
pub async fn get_history<G: TextGenerator>(
    State(state): State<Arc<AppState<G>>>,
    Query(query): Query<HistoryQuery>,
) -> impl IntoResponse {
    let since = query.since.unwrap_or(0);
    Json(state.simulation.history_since(since).await)
}

/// Clear history, zero the round, and empty every metric series.
pub async fn clear_history<G: TextGenerator>(
    State(state): State<Arc<AppState<G>>>,
) -> impl IntoResponse {
    state.simulation.reset_history().await;
    OkResponse::new("History cleared")
}

// ---------------------------------------------------------------------------
// Snapshots
// ---------------------------------------------------------------------------

/// Export the whole simulation state.
pub async fn export<G: TextGenerator>(
    State(state): State<Arc<AppState<G>>>,
) -> Json<SimulationExport> {
    Json(state.simulation.export().await)
}

/// Replace the whole simulation state with a snapshot.
pub async fn import<G: TextGenerator>(
    State(state): State<Arc<AppState<G>>>,
    Json(snapshot): Json<SimulationExport>,
) -> Result<impl IntoResponse, ApiError> {
    state.simulation.import(snapshot).await?;
    Ok(Json(state.simulation.status().await))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Parse a UUID string, returning an [`ApiError`] on failure.
fn parse_uuid(s: &str) -> Result<Uuid, ApiError> {
    s.parse::<Uuid>()
        .map_err(|e| ApiError::InvalidUuid(format!("{s}: {e}")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn escape_html_neutralises_markup() {
        assert_eq!(
            escape_html(r#"<b>"A & B"</b>"#),
            "&lt;b&gt;&quot;A &amp; B&quot;&lt;/b&gt;"
        );
    }

    #[test]
    fn parse_uuid_rejects_garbage() {
        assert!(matches!(parse_uuid("nope"), Err(ApiError::InvalidUuid(_))));
        let id = Uuid::now_v7();
        assert_eq!(parse_uuid(&id.to_string()).unwrap(), id);
    }
}
