//! Menu and integration settings steps

use std::collections::HashMap;

use envi_host::{FlowResult, FormField, UserInput};
use tracing::info;

use super::{EnviOptionsFlow, OptionsStep, StepOutcome};
use crate::constants::{CONF_API_TIMEOUT, CONF_SCAN_INTERVAL};
use crate::options::IntegrationOptions;

pub(super) const MENU_INTEGRATION: &str = "integration";
pub(super) const MENU_SCHEDULES: &str = "schedules";

impl EnviOptionsFlow {
    pub(super) fn step_init(&self) -> StepOutcome {
        StepOutcome::Done(FlowResult::menu(
            OptionsStep::Init.id(),
            &[MENU_INTEGRATION, MENU_SCHEDULES],
        ))
    }

    pub(super) fn step_integration_options(&self, user_input: Option<UserInput>) -> StepOutcome {
        let mut errors = HashMap::new();

        if let Some(input) = user_input {
            match IntegrationOptions::validate(&input) {
                Ok(options) => {
                    info!(
                        "Saving integration options for {}: scan_interval={}s api_timeout={}s",
                        self.entry.entry_id, options.scan_interval, options.api_timeout
                    );
                    return StepOutcome::Done(FlowResult::create_entry("", options.to_options()));
                }
                Err(e) => errors = e,
            }
        }

        let current = IntegrationOptions::from_options(&self.entry.options);
        StepOutcome::Done(self.integration_form(current).with_errors(errors))
    }

    pub(super) fn integration_form(&self, defaults: IntegrationOptions) -> FlowResult {
        FlowResult::form(
            OptionsStep::IntegrationOptions.id(),
            vec![
                FormField::integer(CONF_SCAN_INTERVAL)
                    .required()
                    .with_default(defaults.scan_interval)
                    .with_description(
                        "How often to check for device updates, 10-300 seconds (default 30)",
                    ),
                FormField::integer(CONF_API_TIMEOUT)
                    .required()
                    .with_default(defaults.api_timeout)
                    .with_description(
                        "Maximum time to wait for API responses, 5-60 seconds (default 15)",
                    ),
            ],
        )
    }
}
