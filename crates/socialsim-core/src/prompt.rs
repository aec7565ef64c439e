//! Prompt template loading and rendering via `minijinja`.
//!
//! Five templates ship with the crate: `system`, `turn`, `metrics`,
//! `personas`, and `metric_draft`. Operators can override any of them by
//! pointing `prompts.templates_dir` at a directory of `<name>.j2` files;
//! templates missing from the directory fall back to the built-in text.

use std::path::Path;

use minijinja::{Environment, context};
use serde::Serialize;
use socialsim_types::{ChatMessage, Metric, Persona, TurnRecord, World};

use crate::error::SimulationError;

const BUILTIN: [(&str, &str); 5] = [
    ("system", include_str!("../templates/system.j2")),
    ("turn", include_str!("../templates/turn.j2")),
    ("metrics", include_str!("../templates/metrics.j2")),
    ("personas", include_str!("../templates/personas.j2")),
    ("metric_draft", include_str!("../templates/metric_draft.j2")),
];

/// Renders the chat messages sent to the text generator.
#[derive(Debug)]
pub struct PromptEngine {
    env: Environment<'static>,
}

/// Everything a persona sees when it is asked to act.
#[derive(Debug, Clone, Copy)]
pub struct TurnContext<'a> {
    /// The world setting.
    pub world: &'a World,
    /// The acting persona.
    pub persona: &'a Persona,
    /// The full roster; the acting persona is filtered out.
    pub roster: &'a [Persona],
    /// The trailing history window.
    pub history: &'a [TurnRecord],
    /// The event consumed by this turn.
    pub event: Option<&'a str>,
    /// Characters of each other persona's personality to show.
    pub excerpt_chars: usize,
}

#[derive(Serialize)]
struct OtherPersona<'a> {
    name: &'a str,
    excerpt: String,
}

impl PromptEngine {
    /// Create an engine with the built-in templates.
    ///
    /// # Errors
    ///
    /// [`SimulationError::Template`] if a built-in template fails to compile.
    pub fn builtin() -> Result<Self, SimulationError> {
        let mut env = Environment::new();
        for (name, source) in BUILTIN {
            env.add_template(name, source).map_err(|e| {
                SimulationError::Template(format!("failed to add {name} template: {e}"))
            })?;
        }
        Ok(Self { env })
    }

    /// Create an engine whose templates are read from `dir` where present.
    ///
    /// # Errors
    ///
    /// [`SimulationError::Template`] if a file exists but cannot be read or
    /// compiled.
    pub fn from_dir(dir: &Path) -> Result<Self, SimulationError> {
        let mut env = Environment::new();
        for (name, builtin) in BUILTIN {
            let path = dir.join(format!("{name}.j2"));
            let added = if path.is_file() {
                let source = std::fs::read_to_string(&path).map_err(|e| {
                    SimulationError::Template(format!("failed to read {}: {e}", path.display()))
                })?;
                tracing::debug!(template = name, path = %path.display(), "loaded template override");
                env.add_template_owned(name.to_owned(), source)
            } else {
                env.add_template(name, builtin)
            };
            added.map_err(|e| {
                SimulationError::Template(format!("failed to add {name} template: {e}"))
            })?;
        }
        Ok(Self { env })
    }

    /// Render the system and user messages for one persona turn.
    ///
    /// # Errors
    ///
    /// [`SimulationError::Template`] if rendering fails.
    pub fn render_turn(&self, turn: &TurnContext<'_>) -> Result<Vec<ChatMessage>, SimulationError> {
        let others: Vec<OtherPersona<'_>> = turn
            .roster
            .iter()
            .filter(|p| p.id != turn.persona.id)
            .map(|p| OtherPersona {
                name: &p.name,
                excerpt: excerpt(&p.personality, turn.excerpt_chars),
            })
            .collect();

        let system = self.render("system", context! { world => turn.world })?;
        let user = self.render(
            "turn",
            context! {
                persona => turn.persona,
                others => others,
                history => turn.history,
                event => turn.event,
            },
        )?;
        Ok(vec![ChatMessage::system(system), ChatMessage::user(user)])
    }

    /// Render the metric-evaluation request.
    ///
    /// # Errors
    ///
    /// [`SimulationError::Template`] if rendering fails.
    pub fn render_metrics(
        &self,
        metrics: &[Metric],
        history: &[TurnRecord],
    ) -> Result<Vec<ChatMessage>, SimulationError> {
        let user = self.render("metrics", context! { metrics => metrics, history => history })?;
        Ok(vec![ChatMessage::user(user)])
    }

    /// Render the persona-generation request.
    ///
    /// # Errors
    ///
    /// [`SimulationError::Template`] if rendering fails.
    pub fn render_personas(
        &self,
        world: &World,
        count: usize,
    ) -> Result<Vec<ChatMessage>, SimulationError> {
        let user = self.render("personas", context! { world => world, count => count })?;
        Ok(vec![ChatMessage::user(user)])
    }

    /// Render the metric-drafting request.
    ///
    /// # Errors
    ///
    /// [`SimulationError::Template`] if rendering fails.
    pub fn render_metric_draft(&self, description: &str) -> Result<Vec<ChatMessage>, SimulationError> {
        let user = self.render("metric_draft", context! { description => description })?;
        Ok(vec![ChatMessage::user(user)])
    }

    fn render(&self, name: &str, ctx: minijinja::Value) -> Result<String, SimulationError> {
        self.env
            .get_template(name)
            .map_err(|e| SimulationError::Template(format!("missing {name} template: {e}")))?
            .render(ctx)
            .map_err(|e| SimulationError::Template(format!("{name} render failed: {e}")))
    }
}

/// The first `chars` characters of `text`.
fn excerpt(text: &str, chars: usize) -> String {
    text.chars().take(chars).collect()
}
