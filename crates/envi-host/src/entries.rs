//! Config entry store
//!
//! Every change is written straight through to `.storage/core.config_entries`.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::entry::{ConfigEntry, ConfigEntryUpdate};
use crate::storage::{Storable, Storage, StorageError, StorageResult};

pub const STORAGE_KEY: &str = "core.config_entries";
pub const STORAGE_VERSION: u32 = 1;
pub const STORAGE_MINOR_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum ConfigEntriesError {
    #[error("Entry not found: {0}")]
    NotFound(String),

    #[error("Entry already exists for domain {domain} with unique_id {unique_id}")]
    AlreadyExists { domain: String, unique_id: String },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

pub type ConfigEntriesResult<T> = Result<T, ConfigEntriesError>;

/// On-disk form: entries in creation order
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigEntriesData {
    pub entries: Vec<ConfigEntry>,
}

impl Storable for ConfigEntriesData {
    const KEY: &'static str = STORAGE_KEY;
    const VERSION: u32 = STORAGE_VERSION;
    const MINOR_VERSION: u32 = STORAGE_MINOR_VERSION;
}

pub struct ConfigEntries {
    storage: Arc<Storage>,
    /// entry_id -> entry
    entries: DashMap<String, ConfigEntry>,
    /// (domain, unique_id) -> entry_id
    unique_ids: DashMap<(String, String), String>,
}

impl ConfigEntries {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self {
            storage,
            entries: DashMap::new(),
            unique_ids: DashMap::new(),
        }
    }

    /// Read stored entries. Returns how many were loaded.
    pub async fn load(&self) -> StorageResult<usize> {
        let Some(file) = self.storage.load::<ConfigEntriesData>().await? else {
            return Ok(0);
        };

        let count = file.data.entries.len();
        for entry in file.data.entries {
            if let Some(key) = entry.unique_key() {
                self.unique_ids.insert(key, entry.entry_id.clone());
            }
            self.entries.insert(entry.entry_id.clone(), entry);
        }
        info!("Loaded {} config entries", count);
        Ok(count)
    }

    async fn persist(&self) -> StorageResult<()> {
        let mut entries: Vec<ConfigEntry> =
            self.entries.iter().map(|e| e.value().clone()).collect();
        entries.sort_by_key(|e| e.created_at);

        let count = entries.len();
        self.storage.save(&ConfigEntriesData { entries }).await?;
        debug!("Persisted {} config entries", count);
        Ok(())
    }

    pub fn get(&self, entry_id: &str) -> Option<ConfigEntry> {
        self.entries.get(entry_id).map(|e| e.value().clone())
    }

    pub fn get_by_unique_id(&self, domain: &str, unique_id: &str) -> Option<ConfigEntry> {
        let entry_id = self
            .unique_ids
            .get(&(domain.to_string(), unique_id.to_string()))?
            .value()
            .clone();
        self.get(&entry_id)
    }

    /// Store a new entry. Fails if the domain already has its unique id.
    pub async fn add(&self, entry: ConfigEntry) -> ConfigEntriesResult<ConfigEntry> {
        if let Some(key) = entry.unique_key() {
            match self.unique_ids.entry(key) {
                Entry::Occupied(taken) => {
                    let (domain, unique_id) = taken.key().clone();
                    return Err(ConfigEntriesError::AlreadyExists { domain, unique_id });
                }
                Entry::Vacant(slot) => {
                    slot.insert(entry.entry_id.clone());
                }
            }
        }

        self.entries.insert(entry.entry_id.clone(), entry.clone());
        if let Err(e) = self.persist().await {
            self.entries.remove(&entry.entry_id);
            if let Some(key) = entry.unique_key() {
                self.unique_ids.remove(&key);
            }
            return Err(e.into());
        }

        info!(
            "Added config entry {} for {} [{}]",
            entry.title, entry.domain, entry.entry_id
        );
        Ok(entry)
    }

    pub async fn update(
        &self,
        entry_id: &str,
        update: ConfigEntryUpdate,
    ) -> ConfigEntriesResult<ConfigEntry> {
        let updated = {
            let mut entry = self
                .entries
                .get_mut(entry_id)
                .ok_or_else(|| ConfigEntriesError::NotFound(entry_id.to_string()))?;
            update.apply(&mut entry);
            entry.clone()
        };
        self.persist().await?;

        debug!("Updated config entry {}", entry_id);
        Ok(updated)
    }

    pub async fn remove(&self, entry_id: &str) -> ConfigEntriesResult<ConfigEntry> {
        let (_, entry) = self
            .entries
            .remove(entry_id)
            .ok_or_else(|| ConfigEntriesError::NotFound(entry_id.to_string()))?;
        if let Some(key) = entry.unique_key() {
            self.unique_ids.remove(&key);
        }
        self.persist().await?;

        info!("Removed config entry {} [{}]", entry.title, entry_id);
        Ok(entry)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::EntryMap;
    use serde_json::json;
    use tempfile::TempDir;

    fn store() -> (TempDir, ConfigEntries) {
        let dir = TempDir::new().unwrap();
        let storage = Arc::new(Storage::new(dir.path()));
        (dir, ConfigEntries::new(storage))
    }

    fn envi(unique_id: &str) -> ConfigEntry {
        ConfigEntry::new("smart_envi", format!("Smart Envi ({})", unique_id))
            .with_unique_id(unique_id)
    }

    #[tokio::test]
    async fn test_duplicate_unique_id_rejected() {
        let (_dir, entries) = store();
        entries.add(envi("a")).await.unwrap();

        let err = entries.add(envi("a")).await.unwrap_err();

        assert!(matches!(
            err,
            ConfigEntriesError::AlreadyExists { ref unique_id, .. } if unique_id == "a"
        ));
        assert_eq!(entries.len(), 1);
    }

    #[tokio::test]
    async fn test_unique_id_scoped_to_domain() {
        let (_dir, entries) = store();
        entries.add(envi("a")).await.unwrap();
        entries
            .add(ConfigEntry::new("other", "Other").with_unique_id("a"))
            .await
            .unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries.get_by_unique_id("smart_envi", "a").unwrap().title, "Smart Envi (a)");
        assert_eq!(entries.get_by_unique_id("other", "a").unwrap().title, "Other");
    }

    #[tokio::test]
    async fn test_failed_save_does_not_keep_entry() {
        let (dir, entries) = store();
        // A file where the storage directory belongs makes every save fail
        let blocker = dir.path().join(".storage");
        std::fs::write(&blocker, b"").unwrap();

        let err = entries.add(envi("a")).await.unwrap_err();
        assert!(matches!(err, ConfigEntriesError::Storage(_)));
        assert!(entries.is_empty());
        assert!(entries.get_by_unique_id("smart_envi", "a").is_none());

        std::fs::remove_file(&blocker).unwrap();
        entries.add(envi("a")).await.unwrap();
        assert_eq!(entries.len(), 1);
    }

    #[tokio::test]
    async fn test_update_options_keeps_data() {
        let (_dir, entries) = store();
        let entry = entries
            .add(envi("a").with_data(EntryMap::from([("username".to_string(), json!("a"))])))
            .await
            .unwrap();

        let updated = entries
            .update(
                &entry.entry_id,
                ConfigEntryUpdate::new()
                    .options(EntryMap::from([("scan_interval".to_string(), json!(60))])),
            )
            .await
            .unwrap();

        assert_eq!(updated.options["scan_interval"], json!(60));
        assert_eq!(updated.data_str("username"), Some("a"));
        assert_eq!(entries.get(&entry.entry_id).unwrap().options, updated.options);
    }

    #[tokio::test]
    async fn test_update_missing_entry() {
        let (_dir, entries) = store();
        let result = entries.update("nope", ConfigEntryUpdate::new().title("x")).await;
        assert!(matches!(result, Err(ConfigEntriesError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_remove_frees_unique_id() {
        let (_dir, entries) = store();
        let entry = entries.add(envi("a")).await.unwrap();

        entries.remove(&entry.entry_id).await.unwrap();

        assert!(entries.is_empty());
        assert!(entries.get_by_unique_id("smart_envi", "a").is_none());
        entries.add(envi("a")).await.unwrap();
    }

    #[tokio::test]
    async fn test_reload_from_storage() {
        let dir = TempDir::new().unwrap();
        let storage = Arc::new(Storage::new(dir.path()));

        let first = ConfigEntries::new(storage.clone());
        first.add(envi("a")).await.unwrap();
        first.add(envi("b")).await.unwrap();

        let second = ConfigEntries::new(storage);
        assert_eq!(second.load().await.unwrap(), 2);

        for unique_id in ["a", "b"] {
            let entry = second.get_by_unique_id("smart_envi", unique_id).unwrap();
            assert_eq!(entry.title, format!("Smart Envi ({})", unique_id));
        }
        assert!(second.add(envi("b")).await.is_err());
    }
}
