//! Registry of lobby events keyed by id

use super::{EventError, LobbyEvent};
use crate::types::{EventId, Timestamp};
use std::collections::HashMap;

/// All registered events, keyed by their instant-derived id.
#[derive(Debug, Default)]
pub struct EventRegistry {
    events: HashMap<EventId, LobbyEvent>,
}

impl EventRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive a fresh id from the creation instant, bumping the millisecond
    /// value until it is unique within the registry.
    pub fn allocate_id(&self, created_at: Timestamp) -> EventId {
        let mut millis = created_at.as_millis();
        loop {
            let id = EventId::from_instant(Timestamp::from_millis(millis));
            if !self.events.contains_key(&id) {
                return id;
            }
            millis += 1;
        }
    }

    pub fn insert(&mut self, event: LobbyEvent) {
        self.events.insert(event.id().clone(), event);
    }

    pub fn get(&self, id: &EventId) -> Result<&LobbyEvent, EventError> {
        self.events
            .get(id)
            .ok_or_else(|| EventError::NotFound(id.clone()))
    }

    pub fn get_mut(&mut self, id: &EventId) -> Result<&mut LobbyEvent, EventError> {
        self.events
            .get_mut(id)
            .ok_or_else(|| EventError::NotFound(id.clone()))
    }

    /// Remove an event; `None` if it is already gone. Activation timers use
    /// this tolerant form so a stale fire is a quiet no-op.
    pub fn take(&mut self, id: &EventId) -> Option<LobbyEvent> {
        self.events.remove(id)
    }

    pub fn contains(&self, id: &EventId) -> bool {
        self.events.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
