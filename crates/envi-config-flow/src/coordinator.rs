//! Device state coordinator
//!
//! Holds the latest [`DeviceState`] of every heater an entry tracks. The
//! options flow asks it to refresh after a schedule change.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use envi_api::{DeviceState, EnviClient, EnviResult};
use tracing::{debug, warn};

/// Refresh collaborator used by the options flow
#[async_trait]
pub trait Coordinator: Send + Sync {
    /// Whether `device_id` is one of the devices this coordinator polls
    fn tracks_device(&self, device_id: &str) -> bool;

    /// Re-fetch one device
    async fn refresh_device(&self, device_id: &str) -> EnviResult<()>;

    /// Re-fetch every tracked device
    async fn refresh_all(&self) -> EnviResult<()>;
}

pub struct EnviCoordinator {
    client: Arc<dyn EnviClient>,
    device_ids: Vec<String>,
    update_interval: Duration,
    data: DashMap<String, DeviceState>,
}

impl EnviCoordinator {
    pub fn new(
        client: Arc<dyn EnviClient>,
        device_ids: Vec<String>,
        update_interval: Duration,
    ) -> Self {
        Self {
            client,
            device_ids,
            update_interval,
            data: DashMap::new(),
        }
    }

    pub fn device_ids(&self) -> &[String] {
        &self.device_ids
    }

    pub fn update_interval(&self) -> Duration {
        self.update_interval
    }

    /// Last fetched state of a device
    pub fn device_state(&self, device_id: &str) -> Option<DeviceState> {
        self.data.get(device_id).map(|s| s.clone())
    }
}

#[async_trait]
impl Coordinator for EnviCoordinator {
    fn tracks_device(&self, device_id: &str) -> bool {
        self.device_ids.iter().any(|id| id == device_id)
    }

    async fn refresh_device(&self, device_id: &str) -> EnviResult<()> {
        let state = self.client.get_device_state(device_id).await?;
        self.data.insert(device_id.to_string(), state);
        debug!("Refreshed device {}", device_id);
        Ok(())
    }

    async fn refresh_all(&self) -> EnviResult<()> {
        for device_id in &self.device_ids {
            if let Err(e) = self.refresh_device(device_id).await {
                warn!("Failed to refresh device {}: {}", device_id, e);
                return Err(e);
            }
        }
        debug!("Refreshed {} devices", self.device_ids.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use envi_api::{EnviApiError, Schedule, SchedulePayload};
    use serde_json::json;

    /// Knows device 3401 only
    struct OneDevice;

    #[async_trait]
    impl EnviClient for OneDevice {
        async fn authenticate(&self) -> EnviResult<()> {
            Ok(())
        }

        async fn get_device_state(&self, device_id: &str) -> EnviResult<DeviceState> {
            if device_id != "3401" {
                return Err(EnviApiError::Http {
                    status: 404,
                    message: "device not found".to_string(),
                });
            }
            Ok(serde_json::from_value(json!({"id": 3401, "current_temperature": 68}))?)
        }

        async fn get_schedule_list(&self) -> EnviResult<Vec<Schedule>> {
            Ok(vec![])
        }

        async fn get_schedule(&self, schedule_id: i64) -> EnviResult<Schedule> {
            Err(EnviApiError::Http {
                status: 404,
                message: format!("schedule {} not found", schedule_id),
            })
        }

        async fn create_schedule(&self, _payload: &SchedulePayload) -> EnviResult<()> {
            Ok(())
        }

        async fn update_schedule(&self, _id: i64, _payload: &SchedulePayload) -> EnviResult<()> {
            Ok(())
        }

        async fn delete_schedule(&self, _schedule_id: i64) -> EnviResult<()> {
            Ok(())
        }
    }

    fn coordinator(device_ids: &[&str]) -> EnviCoordinator {
        EnviCoordinator::new(
            Arc::new(OneDevice),
            device_ids.iter().map(|id| id.to_string()).collect(),
            Duration::from_secs(30),
        )
    }

    #[tokio::test]
    async fn test_refresh_all_stores_state() {
        let coordinator = coordinator(&["3401"]);
        assert!(coordinator.device_state("3401").is_none());

        coordinator.refresh_all().await.unwrap();

        let state = coordinator.device_state("3401").unwrap();
        assert_eq!(state.attributes["current_temperature"], json!(68));
        assert!(coordinator.tracks_device("3401"));
        assert!(!coordinator.tracks_device("3402"));
    }

    #[tokio::test]
    async fn test_refresh_all_stops_at_first_failure() {
        let coordinator = coordinator(&["3402", "3401"]);

        assert!(coordinator.refresh_all().await.is_err());
        assert!(coordinator.device_state("3401").is_none());
    }
}
