//! Coordinator that only records refreshes

use std::sync::Mutex;

use async_trait::async_trait;
use envi_api::{EnviApiError, EnviResult};
use envi_config_flow::Coordinator;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Refresh {
    Device(String),
    All,
}

#[derive(Default)]
pub struct FakeCoordinator {
    device_ids: Vec<String>,
    failing: Mutex<bool>,
    refreshes: Mutex<Vec<Refresh>>,
}

impl FakeCoordinator {
    pub fn tracking(device_ids: &[&str]) -> Self {
        Self {
            device_ids: device_ids.iter().map(|id| id.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn fail(&self) {
        *self.failing.lock().unwrap() = true;
    }

    pub fn refreshes(&self) -> Vec<Refresh> {
        self.refreshes.lock().unwrap().clone()
    }

    fn result(&self) -> EnviResult<()> {
        if *self.failing.lock().unwrap() {
            Err(EnviApiError::Http {
                status: 503,
                message: "refresh failed".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Coordinator for FakeCoordinator {
    fn tracks_device(&self, device_id: &str) -> bool {
        self.device_ids.iter().any(|id| id == device_id)
    }

    async fn refresh_device(&self, device_id: &str) -> EnviResult<()> {
        self.refreshes
            .lock()
            .unwrap()
            .push(Refresh::Device(device_id.to_string()));
        self.result()
    }

    async fn refresh_all(&self) -> EnviResult<()> {
        self.refreshes.lock().unwrap().push(Refresh::All);
        self.result()
    }
}
