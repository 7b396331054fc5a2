//! Flow harness
//!
//! Owns a temporary config directory, the entity registry and state store,
//! a flow manager and an [`EnviIntegration`] built on the fakes.

use std::collections::HashMap;
use std::sync::Arc;

use envi_config_flow::constants::{CONF_PASSWORD, CONF_USERNAME, DOMAIN};
use envi_config_flow::EnviIntegration;
use envi_host::{
    ConfigEntries, ConfigEntry, Entities, FlowContext, FlowManager, FlowResult, Storage,
};
use serde_json::{json, Value};
use tempfile::TempDir;

use super::{input, FakeClient, FakeCoordinator, FakeFactory};

pub struct Harness {
    _dir: TempDir,
    pub entries: Arc<ConfigEntries>,
    pub entities: Entities,
    pub flows: FlowManager,
    pub client: Arc<FakeClient>,
    pub factory: Arc<FakeFactory>,
    pub integration: EnviIntegration,
}

impl Harness {
    pub fn new() -> Self {
        super::init_tracing();

        let dir = TempDir::new().unwrap();
        let storage = Arc::new(Storage::new(dir.path()));
        let entries = Arc::new(ConfigEntries::new(storage));
        let entities = Entities::default();
        let client = FakeClient::new();
        let factory = FakeFactory::new(client.clone());
        let integration = EnviIntegration::new(
            entries.clone(),
            Arc::new(entities.clone()),
            factory.clone(),
        );

        Self {
            _dir: dir,
            flows: FlowManager::new(entries.clone()),
            entries,
            entities,
            client,
            factory,
            integration,
        }
    }

    /// Store an entry for `username` the way the setup flow would
    pub async fn add_entry(&self, username: &str) -> ConfigEntry {
        let data = HashMap::from([
            (CONF_USERNAME.to_string(), json!(username)),
            (CONF_PASSWORD.to_string(), json!("hunter2")),
        ]);
        let entry = ConfigEntry::new(DOMAIN, format!("Smart Envi ({})", username))
            .with_data(data)
            .with_unique_id(username.to_lowercase());
        self.entries.add(entry).await.unwrap()
    }

    /// Register an Envi climate entity with a current state
    pub fn add_heater(
        &self,
        entity_id: &str,
        device_id: &str,
        friendly_name: Option<&str>,
        entry_id: &str,
    ) {
        self.register_heater(entity_id, device_id, entry_id);

        let mut attributes = HashMap::new();
        if let Some(name) = friendly_name {
            attributes.insert("friendly_name".to_string(), json!(name));
        }
        self.entities.states.set(entity_id, "heat", attributes);
    }

    /// Register an Envi climate entity without giving it a state
    pub fn register_heater(&self, entity_id: &str, device_id: &str, entry_id: &str) {
        let unique_id = format!("smart_envi_{}", device_id);
        self.entities
            .registry
            .get_or_create(DOMAIN, entity_id, Some(&unique_id), Some(entry_id));
    }

    /// Put the fake client into the entry's runtime data
    pub fn load_client(&self, entry_id: &str) {
        self.integration
            .data()
            .insert_client(entry_id, self.client.clone());
    }

    pub fn load_coordinator(&self, entry_id: &str, device_ids: &[&str]) -> Arc<FakeCoordinator> {
        let coordinator = Arc::new(FakeCoordinator::tracking(device_ids));
        self.integration
            .data()
            .insert_coordinator(entry_id, coordinator.clone());
        coordinator
    }

    pub async fn start_config(&self) -> FlowResult {
        self.flows
            .start(Box::new(self.integration.config_flow()), FlowContext::Config)
            .await
            .unwrap()
    }

    /// Start an options flow for the stored version of `entry_id`
    pub async fn start_options(&self, entry_id: &str) -> FlowResult {
        let entry = self.entries.get(entry_id).unwrap();
        self.flows
            .start(
                Box::new(self.integration.options_flow(entry)),
                FlowContext::Options {
                    entry_id: entry_id.to_string(),
                },
            )
            .await
            .unwrap()
    }

    pub async fn submit(&self, flow_id: &str, value: Value) -> FlowResult {
        self.flows
            .progress(flow_id, Some(input(value)))
            .await
            .unwrap()
    }

    /// Pick a menu option
    pub async fn choose(&self, flow_id: &str, option: &str) -> FlowResult {
        self.submit(flow_id, json!({ "next_step_id": option })).await
    }

    /// Open the schedules menu and pick `schedule_type`
    pub async fn open_schedules(&self, entry_id: &str, schedule_type: &str) -> FlowResult {
        let menu = self.start_options(entry_id).await;
        let form = self.choose(&menu.flow_id, "schedules").await;
        assert_eq!(form.step_id.as_deref(), Some("schedule_options"));
        self.submit(&form.flow_id, json!({ "schedule_type": schedule_type }))
            .await
    }
}
