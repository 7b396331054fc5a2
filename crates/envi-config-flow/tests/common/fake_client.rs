//! Fake Envi cloud

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use envi_api::{
    ClientFactory, Credentials, DeviceState, EnviApiError, EnviClient, EnviResult, Schedule,
    SchedulePayload,
};

/// A call made against [`FakeClient`]
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Authenticate,
    GetDeviceState(String),
    GetScheduleList,
    GetSchedule(i64),
    CreateSchedule(SchedulePayload),
    UpdateSchedule(i64, SchedulePayload),
    DeleteSchedule(i64),
}

/// Operations that can be told to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    GetDeviceState,
    GetScheduleList,
    GetSchedule,
    CreateSchedule,
    UpdateSchedule,
    DeleteSchedule,
}

/// How `authenticate` behaves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthMode {
    #[default]
    Accept,
    /// Credentials rejected
    Reject,
    /// Cloud unreachable
    Unreachable,
}

fn server_error(what: &str) -> EnviApiError {
    EnviApiError::Http {
        status: 500,
        message: format!("{} failed", what),
    }
}

/// In-memory client recording every call
#[derive(Default)]
pub struct FakeClient {
    auth: Mutex<AuthMode>,
    devices: Mutex<HashMap<String, DeviceState>>,
    schedules: Mutex<Vec<Schedule>>,
    failing: Mutex<HashSet<Op>>,
    calls: Mutex<Vec<Call>>,
}

impl FakeClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_auth(&self, mode: AuthMode) {
        *self.auth.lock().unwrap() = mode;
    }

    pub fn set_device(&self, device_id: &str, device: DeviceState) {
        self.devices
            .lock()
            .unwrap()
            .insert(device_id.to_string(), device);
    }

    pub fn add_schedule(&self, schedule: Schedule) {
        self.schedules.lock().unwrap().push(schedule);
    }

    pub fn fail(&self, op: Op) {
        self.failing.lock().unwrap().insert(op);
    }

    pub fn recover(&self, op: Op) {
        self.failing.lock().unwrap().remove(&op);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    /// Calls that changed something in the cloud
    pub fn writes(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|call| {
                matches!(
                    call,
                    Call::CreateSchedule(_) | Call::UpdateSchedule(..) | Call::DeleteSchedule(_)
                )
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn check(&self, op: Op) -> EnviResult<()> {
        if self.failing.lock().unwrap().contains(&op) {
            Err(server_error(&format!("{:?}", op)))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl EnviClient for FakeClient {
    async fn authenticate(&self) -> EnviResult<()> {
        self.record(Call::Authenticate);
        match *self.auth.lock().unwrap() {
            AuthMode::Accept => Ok(()),
            AuthMode::Reject => Err(EnviApiError::Authentication(
                "Invalid username or password".to_string(),
            )),
            AuthMode::Unreachable => Err(server_error("login")),
        }
    }

    async fn get_device_state(&self, device_id: &str) -> EnviResult<DeviceState> {
        self.record(Call::GetDeviceState(device_id.to_string()));
        self.check(Op::GetDeviceState)?;
        Ok(self
            .devices
            .lock()
            .unwrap()
            .get(device_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_schedule_list(&self) -> EnviResult<Vec<Schedule>> {
        self.record(Call::GetScheduleList);
        self.check(Op::GetScheduleList)?;
        Ok(self.schedules.lock().unwrap().clone())
    }

    async fn get_schedule(&self, schedule_id: i64) -> EnviResult<Schedule> {
        self.record(Call::GetSchedule(schedule_id));
        self.check(Op::GetSchedule)?;
        self.schedules
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.id == schedule_id)
            .cloned()
            .ok_or_else(|| EnviApiError::Http {
                status: 404,
                message: format!("schedule {} not found", schedule_id),
            })
    }

    async fn create_schedule(&self, payload: &SchedulePayload) -> EnviResult<()> {
        self.record(Call::CreateSchedule(payload.clone()));
        self.check(Op::CreateSchedule)
    }

    async fn update_schedule(&self, schedule_id: i64, payload: &SchedulePayload) -> EnviResult<()> {
        self.record(Call::UpdateSchedule(schedule_id, payload.clone()));
        self.check(Op::UpdateSchedule)
    }

    async fn delete_schedule(&self, schedule_id: i64) -> EnviResult<()> {
        self.record(Call::DeleteSchedule(schedule_id));
        self.check(Op::DeleteSchedule)?;
        self.schedules.lock().unwrap().retain(|s| s.id != schedule_id);
        Ok(())
    }
}

/// Hands out the same [`FakeClient`] and remembers what it was asked for
pub struct FakeFactory {
    pub client: Arc<FakeClient>,
    created: Mutex<Vec<(Credentials, Duration)>>,
}

impl FakeFactory {
    pub fn new(client: Arc<FakeClient>) -> Arc<Self> {
        Arc::new(Self {
            client,
            created: Mutex::new(Vec::new()),
        })
    }

    pub fn created(&self) -> Vec<(Credentials, Duration)> {
        self.created.lock().unwrap().clone()
    }
}

impl ClientFactory for FakeFactory {
    fn create(
        &self,
        credentials: Credentials,
        timeout: Duration,
    ) -> EnviResult<Arc<dyn EnviClient>> {
        self.created.lock().unwrap().push((credentials, timeout));
        Ok(self.client.clone())
    }
}
