//! Envi cloud client
//!
//! [`EnviClient`] is the seam between the integration and the cloud. The
//! flows only ever hold an `Arc<dyn EnviClient>`; [`HttpEnviClient`] is the
//! production implementation.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::config::ApiSettings;
use crate::error::{EnviApiError, EnviResult};
use crate::models::{Credentials, DeviceState, Schedule, SchedulePayload};

/// Operations the integration performs against the Envi cloud
#[async_trait]
pub trait EnviClient: Send + Sync {
    /// Log in with the configured credentials
    ///
    /// This is the only operation that returns [`EnviApiError::Authentication`].
    async fn authenticate(&self) -> EnviResult<()>;

    /// Fetch the current device record, including its embedded schedule summary
    async fn get_device_state(&self, device_id: &str) -> EnviResult<DeviceState>;

    /// Fetch every schedule on the account
    async fn get_schedule_list(&self) -> EnviResult<Vec<Schedule>>;

    /// Fetch one schedule
    async fn get_schedule(&self, schedule_id: i64) -> EnviResult<Schedule>;

    /// Create a schedule (the payload carries the device id)
    async fn create_schedule(&self, payload: &SchedulePayload) -> EnviResult<()>;

    /// Replace an existing schedule
    async fn update_schedule(&self, schedule_id: i64, payload: &SchedulePayload)
        -> EnviResult<()>;

    /// Delete a schedule
    async fn delete_schedule(&self, schedule_id: i64) -> EnviResult<()>;
}

/// Builds clients from a credential pair
pub trait ClientFactory: Send + Sync {
    fn create(
        &self,
        credentials: Credentials,
        timeout: Duration,
    ) -> EnviResult<Arc<dyn EnviClient>>;
}

/// Factory for [`HttpEnviClient`]
#[derive(Debug, Clone)]
pub struct HttpClientFactory {
    base_url: String,
}

impl HttpClientFactory {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }
}

impl Default for HttpClientFactory {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_BASE_URL)
    }
}

impl ClientFactory for HttpClientFactory {
    fn create(
        &self,
        credentials: Credentials,
        timeout: Duration,
    ) -> EnviResult<Arc<dyn EnviClient>> {
        let settings = ApiSettings {
            timeout,
            ..ApiSettings::default()
        }
        .with_base_url(self.base_url.clone());
        Ok(Arc::new(HttpEnviClient::new(credentials, settings)?))
    }
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
    login_type: u8,
}

#[derive(Deserialize)]
struct LoginResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    data: Option<LoginData>,
}

#[derive(Deserialize)]
struct LoginData {
    #[serde(default)]
    token: Option<String>,
}

/// `{ "data": ... }` wrapper used by every endpoint
#[derive(Deserialize)]
struct Envelope<T> {
    data: T,
}

/// reqwest-backed [`EnviClient`]
pub struct HttpEnviClient {
    http: reqwest::Client,
    settings: ApiSettings,
    credentials: Credentials,
    /// Bearer token from the last successful login
    token: RwLock<Option<String>>,
}

impl HttpEnviClient {
    /// Create a client. No request is made until the first call.
    pub fn new(credentials: Credentials, settings: ApiSettings) -> EnviResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()?;

        Ok(Self {
            http,
            settings,
            credentials,
            token: RwLock::new(None),
        })
    }

    /// Current token, logging in first if there is none
    async fn token(&self) -> EnviResult<String> {
        if let Some(token) = self.token.read().await.clone() {
            return Ok(token);
        }
        self.authenticate().await?;
        self.token
            .read()
            .await
            .clone()
            .ok_or(EnviApiError::MissingToken)
    }

    /// Send an authenticated request and return the raw body of a 2xx response
    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&SchedulePayload>,
    ) -> EnviResult<String> {
        let token = self.token().await?;

        let mut request = self
            .http
            .request(method.clone(), self.settings.url(path))
            .bearer_auth(token);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            warn!(%method, path, status = status.as_u16(), "Envi API request failed");
            return Err(EnviApiError::Http {
                status: status.as_u16(),
                message: text,
            });
        }

        debug!(%method, path, "Envi API request succeeded");
        Ok(text)
    }

    async fn get_data<T: DeserializeOwned>(&self, path: &str) -> EnviResult<T> {
        let text = self.send(Method::GET, path, None).await?;
        let envelope: Envelope<T> = serde_json::from_str(&text)?;
        Ok(envelope.data)
    }
}

#[async_trait]
impl EnviClient for HttpEnviClient {
    async fn authenticate(&self) -> EnviResult<()> {
        let response = self
            .http
            .post(self.settings.url("/auth/login"))
            .json(&LoginRequest {
                username: &self.credentials.username,
                password: &self.credentials.password,
                login_type: 1,
            })
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(EnviApiError::Authentication(format!(
                "login rejected with HTTP {}",
                status.as_u16()
            )));
        }

        let text = response.text().await?;
        if !status.is_success() {
            return Err(EnviApiError::Http {
                status: status.as_u16(),
                message: text,
            });
        }

        let login: LoginResponse = serde_json::from_str(&text)?;
        if let Some(status) = login.status.as_deref() {
            if !status.eq_ignore_ascii_case("success") {
                return Err(EnviApiError::Authentication(
                    login.msg.unwrap_or_else(|| format!("login status {}", status)),
                ));
            }
        }

        let token = login
            .data
            .and_then(|d| d.token)
            .ok_or_else(|| EnviApiError::Authentication("no token in login response".into()))?;

        *self.token.write().await = Some(token);
        info!("Authenticated with Envi cloud as {}", self.credentials.username);
        Ok(())
    }

    async fn get_device_state(&self, device_id: &str) -> EnviResult<DeviceState> {
        self.get_data(&format!("/device/{}", device_id)).await
    }

    async fn get_schedule_list(&self) -> EnviResult<Vec<Schedule>> {
        let raw: Option<Vec<Value>> = self.get_data("/schedule/list").await?;

        let schedules: Vec<Schedule> = raw
            .unwrap_or_default()
            .into_iter()
            .filter_map(|item| match serde_json::from_value::<Schedule>(item) {
                Ok(schedule) => Some(schedule),
                Err(e) => {
                    debug!("Skipping malformed schedule entry: {}", e);
                    None
                }
            })
            .collect();

        debug!("Fetched {} schedules", schedules.len());
        Ok(schedules)
    }

    async fn get_schedule(&self, schedule_id: i64) -> EnviResult<Schedule> {
        self.get_data(&format!("/schedule/{}", schedule_id)).await
    }

    async fn create_schedule(&self, payload: &SchedulePayload) -> EnviResult<()> {
        self.send(Method::POST, "/schedule/add", Some(payload))
            .await?;
        info!(
            "Created schedule for device {}",
            payload.device_id.as_deref().unwrap_or("unknown")
        );
        Ok(())
    }

    async fn update_schedule(
        &self,
        schedule_id: i64,
        payload: &SchedulePayload,
    ) -> EnviResult<()> {
        self.send(
            Method::PATCH,
            &format!("/schedule/update/{}", schedule_id),
            Some(payload),
        )
        .await?;
        info!("Updated schedule {}", schedule_id);
        Ok(())
    }

    async fn delete_schedule(&self, schedule_id: i64) -> EnviResult<()> {
        self.send(
            Method::DELETE,
            &format!("/schedule/delete/{}", schedule_id),
            None,
        )
        .await?;
        info!("Deleted schedule {}", schedule_id);
        Ok(())
    }
}
