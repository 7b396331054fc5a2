//! Config entries
//!
//! A [`ConfigEntry`] is one configured instance of an integration. `data`
//! holds what the setup flow collected and never changes afterwards;
//! `options` is owned by the options flow.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use ulid::Ulid;

/// Key/value map stored as an entry's `data` or `options`
pub type EntryMap = HashMap<String, Value>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigEntry {
    pub entry_id: String,
    pub domain: String,
    pub title: String,

    #[serde(default)]
    pub data: EntryMap,

    #[serde(default)]
    pub options: EntryMap,

    /// Deduplicates entries within a domain
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique_id: Option<String>,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,

    #[serde(default = "Utc::now")]
    pub modified_at: DateTime<Utc>,
}

impl ConfigEntry {
    pub fn new(domain: impl Into<String>, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            entry_id: Ulid::new().to_string(),
            domain: domain.into(),
            title: title.into(),
            data: EntryMap::new(),
            options: EntryMap::new(),
            unique_id: None,
            created_at: now,
            modified_at: now,
        }
    }

    pub fn with_data(mut self, data: EntryMap) -> Self {
        self.data = data;
        self
    }

    pub fn with_options(mut self, options: EntryMap) -> Self {
        self.options = options;
        self
    }

    pub fn with_unique_id(mut self, unique_id: impl Into<String>) -> Self {
        self.unique_id = Some(unique_id.into());
        self
    }

    /// String value from `data`
    pub fn data_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(Value::as_str)
    }

    /// Domain plus unique id, if the entry has one
    pub(crate) fn unique_key(&self) -> Option<(String, String)> {
        self.unique_id
            .as_ref()
            .map(|uid| (self.domain.clone(), uid.clone()))
    }
}

/// Changes to apply to a stored entry. Unset fields are left alone.
#[derive(Debug, Default)]
pub struct ConfigEntryUpdate {
    title: Option<String>,
    options: Option<EntryMap>,
}

impl ConfigEntryUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn options(mut self, options: EntryMap) -> Self {
        self.options = Some(options);
        self
    }

    pub(crate) fn apply(self, entry: &mut ConfigEntry) {
        if let Some(title) = self.title {
            entry.title = title;
        }
        if let Some(options) = self.options {
            entry.options = options;
        }
        entry.modified_at = Utc::now();
    }
}
