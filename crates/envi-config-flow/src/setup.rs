//! Entry setup and unload
//!
//! [`EnviIntegration`] is what the host holds for the `smart_envi` domain. It
//! loads entries (client, coordinator, first refresh) and hands out the
//! config and options flows.

use std::sync::Arc;

use envi_api::{ClientFactory, Credentials, EnviApiError};
use envi_host::{ConfigEntries, ConfigEntry, EntityLookup};
use thiserror::Error;
use tracing::{debug, info};

use crate::config_flow::EnviConfigFlow;
use crate::constants::{CLIMATE_DOMAIN, CONF_PASSWORD, CONF_USERNAME, DOMAIN};
use crate::coordinator::{Coordinator, EnviCoordinator};
use crate::options::IntegrationOptions;
use crate::options_flow::EnviOptionsFlow;
use crate::runtime::{device_id_from_unique_id, EnviData};

#[derive(Debug, Error)]
pub enum SetupError {
    #[error("Config entry {0} has no stored credentials")]
    MissingCredentials(String),

    #[error("Authentication failed: {0}")]
    Auth(#[source] EnviApiError),

    #[error("Envi cloud not ready: {0}")]
    NotReady(#[source] EnviApiError),
}

impl From<EnviApiError> for SetupError {
    fn from(err: EnviApiError) -> Self {
        if err.is_auth_error() {
            SetupError::Auth(err)
        } else {
            SetupError::NotReady(err)
        }
    }
}

pub struct EnviIntegration {
    data: Arc<EnviData>,
    entries: Arc<ConfigEntries>,
    entities: Arc<dyn EntityLookup>,
    factory: Arc<dyn ClientFactory>,
}

impl EnviIntegration {
    pub fn new(
        entries: Arc<ConfigEntries>,
        entities: Arc<dyn EntityLookup>,
        factory: Arc<dyn ClientFactory>,
    ) -> Self {
        Self {
            data: Arc::new(EnviData::new()),
            entries,
            entities,
            factory,
        }
    }

    pub fn data(&self) -> &Arc<EnviData> {
        &self.data
    }

    /// A new setup flow
    pub fn config_flow(&self) -> EnviConfigFlow {
        EnviConfigFlow::new(self.factory.clone(), self.entries.clone())
    }

    /// A new options flow for `entry`
    pub fn options_flow(&self, entry: ConfigEntry) -> EnviOptionsFlow {
        EnviOptionsFlow::new(entry, self.data.clone(), self.entities.clone())
    }

    /// Load an entry: log in, then poll every heater registered for it once
    pub async fn async_setup_entry(&self, entry: &ConfigEntry) -> Result<(), SetupError> {
        let (Some(username), Some(password)) =
            (entry.data_str(CONF_USERNAME), entry.data_str(CONF_PASSWORD))
        else {
            return Err(SetupError::MissingCredentials(entry.entry_id.clone()));
        };

        let options = IntegrationOptions::from_options(&entry.options);
        let client = self
            .factory
            .create(Credentials::new(username, password), options.timeout())?;
        client.authenticate().await?;

        let device_ids = self.tracked_devices(&entry.entry_id);
        debug!(
            "Entry {} tracks {} devices: {:?}",
            entry.entry_id,
            device_ids.len(),
            device_ids
        );

        let coordinator = Arc::new(EnviCoordinator::new(
            client.clone(),
            device_ids,
            options.update_interval(),
        ));
        coordinator.refresh_all().await?;

        self.data.insert_client(entry.entry_id.clone(), client);
        self.data.insert_coordinator(entry.entry_id.clone(), coordinator);

        info!(
            "Set up {} entry {} ({}), polling every {}s",
            DOMAIN,
            entry.title,
            entry.entry_id,
            options.update_interval().as_secs()
        );
        Ok(())
    }

    /// Unload an entry. Returns whether it was loaded.
    pub async fn async_unload_entry(&self, entry_id: &str) -> bool {
        let unloaded = self.data.remove(entry_id);
        if unloaded {
            info!("Unloaded {} entry {}", DOMAIN, entry_id);
        }
        unloaded
    }

    /// Device ids of this entry's climate entities, in registration order
    fn tracked_devices(&self, entry_id: &str) -> Vec<String> {
        self.entities
            .entities_for(CLIMATE_DOMAIN, DOMAIN)
            .iter()
            .filter(|entity| entity.config_entry_id.as_deref() == Some(entry_id))
            .filter_map(|entity| entity.unique_id.as_deref())
            .map(|unique_id| device_id_from_unique_id(unique_id).to_string())
            .collect()
    }
}
