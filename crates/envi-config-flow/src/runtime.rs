//! Per-entry runtime data
//!
//! What a loaded entry leaves behind for its flows: the cloud client and the
//! coordinator. Either may be missing, e.g. while the entry is not loaded.

use std::sync::Arc;

use dashmap::DashMap;
use envi_api::EnviClient;

use crate::constants::UNIQUE_ID_PREFIX;
use crate::coordinator::Coordinator;

#[derive(Default)]
pub struct EnviData {
    /// entry_id -> client
    clients: DashMap<String, Arc<dyn EnviClient>>,
    /// entry_id -> coordinator
    coordinators: DashMap<String, Arc<dyn Coordinator>>,
}

impl EnviData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_client(&self, entry_id: impl Into<String>, client: Arc<dyn EnviClient>) {
        self.clients.insert(entry_id.into(), client);
    }

    pub fn insert_coordinator(
        &self,
        entry_id: impl Into<String>,
        coordinator: Arc<dyn Coordinator>,
    ) {
        self.coordinators.insert(entry_id.into(), coordinator);
    }

    pub fn client(&self, entry_id: &str) -> Option<Arc<dyn EnviClient>> {
        self.clients.get(entry_id).map(|c| c.clone())
    }

    pub fn coordinator(&self, entry_id: &str) -> Option<Arc<dyn Coordinator>> {
        self.coordinators.get(entry_id).map(|c| c.clone())
    }

    /// Drop everything held for an entry. Returns whether anything was held.
    pub fn remove(&self, entry_id: &str) -> bool {
        let client = self.clients.remove(entry_id).is_some();
        let coordinator = self.coordinators.remove(entry_id).is_some();
        client || coordinator
    }

    pub fn is_loaded(&self, entry_id: &str) -> bool {
        self.clients.contains_key(entry_id)
    }
}

/// Device id behind a climate entity's registry unique id
///
/// The `smart_envi_` prefix is stripped once; a unique id without it is the
/// device id itself.
pub fn device_id_from_unique_id(unique_id: &str) -> &str {
    unique_id.strip_prefix(UNIQUE_ID_PREFIX).unwrap_or(unique_id)
}
