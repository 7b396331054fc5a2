//! Setup flow
//!
//! A single `user` step: ask for the Envi account, log in once, and create
//! the entry titled `Smart Envi (<username>)`.

use std::sync::Arc;

use async_trait::async_trait;
use envi_api::{ClientFactory, Credentials, EnviApiError};
use envi_host::{ConfigEntries, FlowError, FlowHandler, FlowResult, FormField, UserInput};
use serde_json::Value;
use tracing::{debug, error, info};

use crate::constants::{CONF_PASSWORD, CONF_USERNAME, DOMAIN};
use crate::options::IntegrationOptions;

pub const STEP_USER: &str = "user";

pub struct EnviConfigFlow {
    factory: Arc<dyn ClientFactory>,
    entries: Arc<ConfigEntries>,
    unique_id: Option<String>,
}

impl EnviConfigFlow {
    pub fn new(factory: Arc<dyn ClientFactory>, entries: Arc<ConfigEntries>) -> Self {
        Self {
            factory,
            entries,
            unique_id: None,
        }
    }

    fn show_form(errors: Option<(&str, &str)>) -> FlowResult {
        let form = FlowResult::form(
            STEP_USER,
            vec![
                FormField::string(CONF_USERNAME).required(),
                FormField::password(CONF_PASSWORD).required(),
            ],
        );
        match errors {
            Some((field, error)) => form.with_error(field, error),
            None => form,
        }
    }

    async fn step_user(&mut self, user_input: Option<UserInput>) -> FlowResult {
        let Some(input) = user_input else {
            return Self::show_form(None);
        };

        let field = |name: &str| input.get(name).and_then(Value::as_str).map(String::from);
        let Some(username) = field(CONF_USERNAME) else {
            return Self::show_form(Some((CONF_USERNAME, "required")));
        };
        let Some(password) = field(CONF_PASSWORD) else {
            return Self::show_form(Some((CONF_PASSWORD, "required")));
        };

        let unique_id = username.to_lowercase();
        if self.entries.get_by_unique_id(DOMAIN, &unique_id).is_some() {
            debug!("Envi account {} is already configured", unique_id);
            return FlowResult::abort("already_configured");
        }
        self.unique_id = Some(unique_id);

        let credentials = Credentials::new(username.clone(), password.clone());
        match self.authenticate(credentials).await {
            Ok(()) => {
                info!("Authenticated Envi account {}", username);
                let mut data = UserInput::new();
                data.insert(CONF_USERNAME.to_string(), Value::String(username.clone()));
                data.insert(CONF_PASSWORD.to_string(), Value::String(password));
                FlowResult::create_entry(format!("Smart Envi ({})", username), data)
            }
            Err(e) if e.is_auth_error() => {
                debug!("Envi login rejected for {}: {}", username, e);
                Self::show_form(Some(("base", "invalid_auth")))
            }
            Err(e) => {
                error!("Unexpected error during setup: {} ({:?})", e, e);
                Self::show_form(Some(("base", "cannot_connect")))
            }
        }
    }

    async fn authenticate(&self, credentials: Credentials) -> Result<(), EnviApiError> {
        let client = self
            .factory
            .create(credentials, IntegrationOptions::default().timeout())?;
        client.authenticate().await
    }
}

#[async_trait]
impl FlowHandler for EnviConfigFlow {
    fn handler(&self) -> &str {
        DOMAIN
    }

    fn init_step(&self) -> &str {
        STEP_USER
    }

    fn unique_id(&self) -> Option<&str> {
        self.unique_id.as_deref()
    }

    async fn async_step(
        &mut self,
        step_id: &str,
        user_input: Option<UserInput>,
    ) -> Result<FlowResult, FlowError> {
        match step_id {
            STEP_USER => Ok(self.step_user(user_input).await),
            other => Err(FlowError::UnknownStep {
                handler: DOMAIN.to_string(),
                step_id: other.to_string(),
            }),
        }
    }
}
