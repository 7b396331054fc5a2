//! Versioned JSON persistence
//!
//! Each [`Storable`] type lives in one file under `<config_dir>/.storage/`,
//! named by its key and wrapped with version information:
//!
//! ```json
//! {
//!   "version": 1,
//!   "minor_version": 1,
//!   "key": "core.config_entries",
//!   "data": { ... }
//! }
//! ```

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tokio::fs;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Storage {key} is at version {found}, expected {expected}")]
    MigrationRequired {
        key: String,
        found: u32,
        expected: u32,
    },
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Envelope written around the stored data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageFile<T> {
    pub version: u32,
    pub minor_version: u32,
    pub key: String,
    pub data: T,
}

/// A type persisted as one storage file
pub trait Storable: Serialize + DeserializeOwned {
    /// File name under `.storage/`
    const KEY: &'static str;
    /// A stored file with another major version is refused
    const VERSION: u32;
    const MINOR_VERSION: u32;
}

#[derive(Debug, Clone)]
pub struct Storage {
    dir: PathBuf,
}

impl Storage {
    /// Storage under `<config_dir>/.storage`
    pub fn new(config_dir: impl AsRef<Path>) -> Self {
        Self {
            dir: config_dir.as_ref().join(".storage"),
        }
    }

    pub fn storage_dir(&self) -> &Path {
        &self.dir
    }

    pub fn file_path(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }

    /// Read `T`. `None` if it was never saved.
    pub async fn load<T: Storable>(&self) -> StorageResult<Option<StorageFile<T>>> {
        let raw = match fs::read(self.file_path(T::KEY)).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No stored {}", T::KEY);
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let envelope: StorageFile<serde_json::Value> = serde_json::from_slice(&raw)?;
        if envelope.version != T::VERSION {
            return Err(StorageError::MigrationRequired {
                key: T::KEY.to_string(),
                found: envelope.version,
                expected: T::VERSION,
            });
        }
        if envelope.minor_version < T::MINOR_VERSION {
            warn!(
                "Stored {} is at minor version {}, current is {}",
                T::KEY,
                envelope.minor_version,
                T::MINOR_VERSION
            );
        }

        Ok(Some(StorageFile {
            version: envelope.version,
            minor_version: envelope.minor_version,
            key: envelope.key,
            data: serde_json::from_value(envelope.data)?,
        }))
    }

    /// Write `data` to a temp file, then rename it over the old one
    pub async fn save<T: Storable>(&self, data: &T) -> StorageResult<()> {
        fs::create_dir_all(&self.dir).await?;

        let envelope = StorageFile {
            version: T::VERSION,
            minor_version: T::MINOR_VERSION,
            key: T::KEY.to_string(),
            data,
        };
        let bytes = serde_json::to_vec_pretty(&envelope)?;

        let target = self.file_path(T::KEY);
        let staging = self.dir.join(format!("{}.tmp", T::KEY));
        fs::write(&staging, bytes).await?;
        fs::rename(&staging, &target).await?;

        debug!("Wrote {}", T::KEY);
        Ok(())
    }
}
