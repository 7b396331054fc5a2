//! Current entity states
//!
//! Only the latest state of each entity is kept. There is no event bus and
//! no history.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// The state of one entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct State {
    pub entity_id: String,
    pub state: String,
    #[serde(default)]
    pub attributes: HashMap<String, serde_json::Value>,
    pub last_updated: DateTime<Utc>,
}

impl State {
    /// The `friendly_name` attribute, if it is a string
    pub fn friendly_name(&self) -> Option<&str> {
        self.attributes.get("friendly_name").and_then(|v| v.as_str())
    }
}

/// Entity states keyed by entity id
#[derive(Default)]
pub struct StateStore {
    states: DashMap<String, State>,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the state of an entity, replacing any previous state
    pub fn set(
        &self,
        entity_id: impl Into<String>,
        state: impl Into<String>,
        attributes: HashMap<String, serde_json::Value>,
    ) -> State {
        let entity_id = entity_id.into();
        let new_state = State {
            entity_id: entity_id.clone(),
            state: state.into(),
            attributes,
            last_updated: Utc::now(),
        };
        trace!(entity_id = %entity_id, state = %new_state.state, "Setting entity state");
        self.states.insert(entity_id, new_state.clone());
        new_state
    }

    pub fn get(&self, entity_id: &str) -> Option<State> {
        self.states.get(entity_id).map(|s| s.clone())
    }

    pub fn remove(&self, entity_id: &str) -> Option<State> {
        self.states.remove(entity_id).map(|(_, s)| s)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}
