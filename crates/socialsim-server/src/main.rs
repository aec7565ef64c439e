//! `socialsim` server binary.
//!
//! # Startup Sequence
//!
//! 1. Initialize structured logging (tracing)
//! 2. Load configuration from `socialsim.yaml` (or `SOCIALSIM_CONFIG`)
//! 3. Load prompt templates
//! 4. Build the text-generation backend from environment variables
//! 5. Create the simulation and serve the API until `Ctrl-C`

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use socialsim_core::{Narrator, PromptEngine, Simulation, SimulationConfig};
use socialsim_llm::{BackendConfig, create_backend};
use socialsim_server::{AppState, start_server};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Default configuration file, relative to the working directory.
const DEFAULT_CONFIG_PATH: &str = "socialsim.yaml";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("socialsim starting");

    // 2. Load configuration.
    let config = load_config()?;
    info!(
        host = %config.server.host,
        port = config.server.port,
        metric_interval = config.engine.metric_interval,
        turn_timeout_ms = config.engine.turn_timeout_ms,
        "Configuration loaded"
    );

    // 3. Load prompt templates.
    let prompts = match config.prompts.templates_dir.as_deref() {
        Some(dir) => PromptEngine::from_dir(Path::new(dir))
            .with_context(|| format!("loading prompt templates from {dir}"))?,
        None => PromptEngine::builtin().context("loading built-in prompt templates")?,
    };

    // 4. Build the text-generation backend.
    let backend_config = BackendConfig::from_env().context("reading LLM_* environment")?;
    if !backend_config.has_key() {
        warn!("No API key configured; the simulation cannot start until one is set");
    }
    let backend = create_backend(&backend_config);
    info!(
        backend = backend.backend_name(),
        model = %backend_config.model,
        "Text generator ready"
    );

    // 5. Serve.
    let server_config = config.server.clone();
    let simulation = Arc::new(Simulation::new(Narrator::new(backend, prompts, config)));
    let state = Arc::new(AppState::new(simulation));
    start_server(&server_config, state)
        .await
        .context("running HTTP server")?;

    Ok(())
}

/// Load the configuration file, falling back to defaults when the default
/// path does not exist. An explicit `SOCIALSIM_CONFIG` must exist.
fn load_config() -> anyhow::Result<SimulationConfig> {
    let (path, explicit) = std::env::var("SOCIALSIM_CONFIG").map_or_else(
        |_| (PathBuf::from(DEFAULT_CONFIG_PATH), false),
        |p| (PathBuf::from(p), true),
    );

    if !explicit && !path.exists() {
        info!(path = %path.display(), "No configuration file, using defaults");
        return Ok(SimulationConfig::default());
    }

    SimulationConfig::from_file(&path)
        .with_context(|| format!("loading configuration from {}", path.display()))
}
