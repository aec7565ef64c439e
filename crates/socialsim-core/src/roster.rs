//! The ordered persona roster.
//!
//! Roster order is scheduling order: the persona acting in round `r` is the
//! one at position `(r - 1) mod len` at the time the turn starts. Editing
//! the roster between turns therefore changes who acts next, predictably.

use socialsim_types::{Persona, PersonaDraft, PersonaId};

use crate::error::StateError;

/// The ordered collection of personas.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Roster {
    personas: Vec<Persona>,
}

impl Roster {
    /// Create an empty roster.
    pub const fn new() -> Self {
        Self {
            personas: Vec::new(),
        }
    }

    /// Number of personas.
    pub fn len(&self) -> usize {
        self.personas.len()
    }

    /// Whether the roster has no personas.
    pub fn is_empty(&self) -> bool {
        self.personas.is_empty()
    }

    /// All personas in scheduling order.
    pub fn list(&self) -> &[Persona] {
        &self.personas
    }

    /// Look up a persona by ID.
    pub fn get(&self, id: PersonaId) -> Option<&Persona> {
        self.personas.iter().find(|p| p.id == id)
    }

    /// Insert a new persona or replace an existing one in place.
    ///
    /// A draft without an ID gets a fresh one and is appended. A draft with
    /// an ID must name a persona on the roster; IDs are never minted by
    /// callers, so a deleted persona cannot be resurrected under its old ID.
    ///
    /// # Errors
    ///
    /// [`StateError::EmptyName`] for a blank name, or
    /// [`StateError::PersonaNotFound`] for an unknown ID.
    pub fn upsert(&mut self, draft: PersonaDraft) -> Result<Persona, StateError> {
        if draft.name.trim().is_empty() {
            return Err(StateError::EmptyName);
        }

        match draft.id {
            None => {
                let persona = draft.into_persona(PersonaId::new());
                self.personas.push(persona.clone());
                Ok(persona)
            }
            Some(id) => {
                let slot = self
                    .personas
                    .iter_mut()
                    .find(|p| p.id == id)
                    .ok_or(StateError::PersonaNotFound(id))?;
                *slot = draft.into_persona(id);
                Ok(slot.clone())
            }
        }
    }

    /// Remove a persona, returning it.
    ///
    /// # Errors
    ///
    /// [`StateError::PersonaNotFound`] if no persona has this ID.
    pub fn remove(&mut self, id: PersonaId) -> Result<Persona, StateError> {
        let position = self
            .personas
            .iter()
            .position(|p| p.id == id)
            .ok_or(StateError::PersonaNotFound(id))?;
        Ok(self.personas.remove(position))
    }

    /// Remove every persona.
    pub fn clear(&mut self) {
        self.personas.clear();
    }

    /// Replace the whole roster.
    pub fn replace(&mut self, personas: Vec<Persona>) {
        self.personas = personas;
    }

    /// The persona scheduled to act in `round` (1-based).
    ///
    /// Returns `None` for an empty roster or round 0.
    pub fn select_for_round(&self, round: u64) -> Option<&Persona> {
        let len = u64::try_from(self.personas.len()).ok()?;
        let index = round.checked_sub(1)?.checked_rem(len)?;
        self.personas.get(usize::try_from(index).ok()?)
    }
}
