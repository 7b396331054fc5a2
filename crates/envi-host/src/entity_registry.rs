//! Entity registry
//!
//! Entities integrations have registered, kept in registration order.
//! A unique id is scoped to the platform that registered it.

use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error, Clone)]
pub enum EntityRegistryError {
    #[error("Entity not found: {0}")]
    NotFound(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityEntry {
    /// `<domain>.<object_id>`
    pub entity_id: String,
    /// Integration that provides the entity
    pub platform: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_entry_id: Option<String>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl EntityEntry {
    pub fn domain(&self) -> &str {
        self.entity_id
            .split_once('.')
            .map_or(self.entity_id.as_str(), |(domain, _)| domain)
    }
}

#[derive(Default)]
pub struct EntityRegistry {
    /// entity_id -> entry, in registration order
    entities: RwLock<IndexMap<String, Arc<EntityEntry>>>,
    /// (platform, unique_id) -> entity_id
    unique_ids: DashMap<(String, String), String>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, entity_id: &str) -> Option<Arc<EntityEntry>> {
        let entities = self.entities.read().unwrap_or_else(PoisonError::into_inner);
        entities.get(entity_id).cloned()
    }

    pub fn get_by_unique_id(&self, platform: &str, unique_id: &str) -> Option<Arc<EntityEntry>> {
        let entity_id = self
            .unique_ids
            .get(&(platform.to_string(), unique_id.to_string()))?
            .value()
            .clone();
        self.get(&entity_id)
    }

    /// Entities of `domain` provided by `platform`, in registration order
    pub fn entities_for(&self, domain: &str, platform: &str) -> Vec<Arc<EntityEntry>> {
        let entities = self.entities.read().unwrap_or_else(PoisonError::into_inner);
        entities
            .values()
            .filter(|e| e.platform == platform && e.domain() == domain)
            .cloned()
            .collect()
    }

    /// Register an entity
    ///
    /// If `platform` already registered `unique_id`, the existing entity is
    /// returned unchanged.
    pub fn get_or_create(
        &self,
        platform: &str,
        entity_id: &str,
        unique_id: Option<&str>,
        config_entry_id: Option<&str>,
    ) -> Arc<EntityEntry> {
        if let Some(existing) = unique_id.and_then(|uid| self.get_by_unique_id(platform, uid)) {
            return existing;
        }

        let entry = Arc::new(EntityEntry {
            entity_id: entity_id.to_string(),
            platform: platform.to_string(),
            unique_id: unique_id.map(String::from),
            config_entry_id: config_entry_id.map(String::from),
            created_at: Utc::now(),
        });

        if let Some(uid) = unique_id {
            self.unique_ids
                .insert((platform.to_string(), uid.to_string()), entity_id.to_string());
        }
        self.entities
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(entity_id.to_string(), entry.clone());

        debug!("Registered {} for {}", entity_id, platform);
        entry
    }

    pub fn remove(&self, entity_id: &str) -> Result<Arc<EntityEntry>, EntityRegistryError> {
        let entry = self
            .entities
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .shift_remove(entity_id)
            .ok_or_else(|| EntityRegistryError::NotFound(entity_id.to_string()))?;

        if let Some(uid) = &entry.unique_id {
            self.unique_ids.remove(&(entry.platform.clone(), uid.clone()));
        }
        debug!("Removed {}", entity_id);
        Ok(entry)
    }

    pub fn len(&self) -> usize {
        self.entities
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
