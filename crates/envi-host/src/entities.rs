//! Entity lookup for integrations
//!
//! Flows see the registry and the state store only through [`EntityLookup`].

use std::sync::Arc;

use crate::entity_registry::{EntityEntry, EntityRegistry};
use crate::state_store::{State, StateStore};

pub trait EntityLookup: Send + Sync {
    /// Registry entry for an entity id
    fn entity(&self, entity_id: &str) -> Option<Arc<EntityEntry>>;

    /// Registered entities of `domain` provided by `platform`, in registration order
    fn entities_for(&self, domain: &str, platform: &str) -> Vec<Arc<EntityEntry>>;

    /// Current state of an entity
    fn state(&self, entity_id: &str) -> Option<State>;
}

/// Registry plus state store
#[derive(Clone)]
pub struct Entities {
    pub registry: Arc<EntityRegistry>,
    pub states: Arc<StateStore>,
}

impl Entities {
    pub fn new(registry: Arc<EntityRegistry>, states: Arc<StateStore>) -> Self {
        Self { registry, states }
    }
}

impl Default for Entities {
    fn default() -> Self {
        Self::new(Arc::new(EntityRegistry::new()), Arc::new(StateStore::new()))
    }
}

impl EntityLookup for Entities {
    fn entity(&self, entity_id: &str) -> Option<Arc<EntityEntry>> {
        self.registry.get(entity_id)
    }

    fn entities_for(&self, domain: &str, platform: &str) -> Vec<Arc<EntityEntry>> {
        self.registry.entities_for(domain, platform)
    }

    fn state(&self, entity_id: &str) -> Option<State> {
        self.states.get(entity_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_lookup_through_trait_object() {
        let entities = Entities::default();
        entities
            .registry
            .get_or_create("smart_envi", "climate.bedroom", Some("smart_envi_1"), None);
        entities
            .states
            .set("climate.bedroom", "heat", HashMap::new());

        let lookup: Arc<dyn EntityLookup> = Arc::new(entities);
        assert_eq!(lookup.entities_for("climate", "smart_envi").len(), 1);
        assert_eq!(
            lookup.entity("climate.bedroom").unwrap().unique_id.as_deref(),
            Some("smart_envi_1")
        );
        assert_eq!(lookup.state("climate.bedroom").unwrap().state, "heat");
        assert!(lookup.state("climate.office").is_none());
    }
}
