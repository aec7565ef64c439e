//! Operator-injected event queue.
//!
//! Events are free text that perturbs the narrative. Each turn consumes at
//! most one event, oldest first. There is no cap, priority, or expiry: an
//! event injected while the simulation is stopped waits for the next turn,
//! and a burst of injections drains one per round.

use std::collections::VecDeque;

use crate::error::StateError;

/// FIFO of pending event texts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventQueue {
    pending: VecDeque<String>,
}

impl EventQueue {
    /// Create an empty queue.
    pub const fn new() -> Self {
        Self {
            pending: VecDeque::new(),
        }
    }

    /// Queue an event for a future turn.
    ///
    /// Surrounding whitespace is trimmed.
    ///
    /// # Errors
    ///
    /// [`StateError::EmptyEvent`] if the text is blank.
    pub fn inject(&mut self, event: &str) -> Result<(), StateError> {
        let text = event.trim();
        if text.is_empty() {
            return Err(StateError::EmptyEvent);
        }
        self.pending.push_back(text.to_owned());
        Ok(())
    }

    /// Dequeue the oldest pending event.
    pub fn take_next(&mut self) -> Option<String> {
        self.pending.pop_front()
    }

    /// Number of pending events.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub(crate) fn clear(&mut self) {
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_events_are_rejected() {
        let mut queue = EventQueue::new();
        assert_eq!(queue.inject(""), Err(StateError::EmptyEvent));
        assert_eq!(queue.inject(" \n\t"), Err(StateError::EmptyEvent));
        assert!(queue.is_empty());
    }

    #[test]
    fn events_drain_in_order_one_at_a_time() {
        let mut queue = EventQueue::new();
        assert!(queue.inject("storm").is_ok());
        assert!(queue.inject("  festival ").is_ok());
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.take_next().as_deref(), Some("storm"));
        assert_eq!(queue.take_next().as_deref(), Some("festival"));
        assert_eq!(queue.take_next(), None);
    }
}
