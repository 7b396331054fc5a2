//! Schedule editing for a single device
//!
//! `schedule_options` picks how schedules are managed, `select_device`
//! picks a heater and `edit_schedule` edits its schedule. The list-based
//! path also ends in `edit_schedule`.

use std::collections::HashMap;
use std::sync::Arc;

use envi_api::{EnviClient, EnviResult, SchedulePayload};
use envi_host::{FlowResult, FormField, SelectOption, UserInput};
use serde_json::Value;
use tracing::{debug, error, info};

use super::{EnviOptionsFlow, OptionsStep, StepOutcome};
use crate::constants::{CLIMATE_DOMAIN, DOMAIN};
use crate::runtime::device_id_from_unique_id;
use crate::schedule::{parse_time_entries, ScheduleDraft, TimeEntryError};

const SCHEDULE_TYPE_DEVICE: &str = "device";
const SCHEDULE_TYPE_ALL: &str = "all";

/// Result of trying to write the submitted schedule
enum SaveOutcome {
    Saved,
    /// Nothing to update and no device to create a schedule for
    MissingDevice,
}

/// Build the payload from an `edit_schedule` submission
fn parse_submission(input: &UserInput) -> Result<SchedulePayload, Vec<TimeEntryError>> {
    fn text<'a>(input: &'a UserInput, key: &str) -> &'a str {
        input.get(key).and_then(Value::as_str).unwrap_or("").trim()
    }

    let times = parse_time_entries(text(input, "time_entries"))?;
    let name = Some(text(input, "name"))
        .filter(|n| !n.is_empty())
        .map(String::from);

    Ok(SchedulePayload {
        enabled: input.get("enabled").and_then(Value::as_bool).unwrap_or(false),
        name,
        times,
        device_id: None,
    })
}

impl EnviOptionsFlow {
    pub(super) fn step_schedule_options(&self, user_input: Option<UserInput>) -> StepOutcome {
        if let Some(input) = user_input {
            let schedule_type = input
                .get("schedule_type")
                .and_then(Value::as_str)
                .map(String::from);
            match schedule_type.as_deref() {
                Some(SCHEDULE_TYPE_DEVICE) => {
                    return StepOutcome::Advance(OptionsStep::SelectDevice, Some(input))
                }
                Some(SCHEDULE_TYPE_ALL) => {
                    return StepOutcome::Advance(OptionsStep::ListSchedules, Some(input))
                }
                _ => {}
            }
        }

        StepOutcome::Done(FlowResult::form(
            OptionsStep::ScheduleOptions.id(),
            vec![FormField::select(
                "schedule_type",
                vec![
                    SelectOption::new(SCHEDULE_TYPE_DEVICE, "Edit Schedule for a Specific Device"),
                    SelectOption::new(SCHEDULE_TYPE_ALL, "View and Manage All Schedules"),
                ],
            )
            .required()
            .with_description("Choose how you want to manage schedules")],
        ))
    }

    pub(super) fn step_select_device(&mut self, user_input: Option<UserInput>) -> StepOutcome {
        let mut errors = HashMap::new();

        let selected = user_input
            .as_ref()
            .and_then(|input| input.get("entity_id"))
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty());

        if let Some(entity_id) = selected {
            self.session.entity_id = Some(entity_id.to_string());
            let unique_id = self
                .entities
                .entity(entity_id)
                .and_then(|entry| entry.unique_id.clone());

            match unique_id {
                Some(unique_id) => {
                    let device_id = device_id_from_unique_id(&unique_id).to_string();
                    debug!("Selected {} (device {})", entity_id, device_id);
                    self.session.device_id = Some(device_id);
                    return StepOutcome::Advance(OptionsStep::EditSchedule, None);
                }
                None => {
                    errors.insert("base".to_string(), "entity_not_found".to_string());
                }
            }
        }

        let devices: Vec<SelectOption> = self
            .entities
            .entities_for(CLIMATE_DOMAIN, DOMAIN)
            .iter()
            .filter_map(|entry| {
                let name = self.entity_display_name(&entry.entity_id)?;
                Some(SelectOption::new(entry.entity_id.clone(), name))
            })
            .collect();

        if devices.is_empty() {
            return StepOutcome::Done(FlowResult::abort("no_devices"));
        }

        let device_count = devices.len();
        StepOutcome::Done(
            FlowResult::form(
                OptionsStep::SelectDevice.id(),
                vec![FormField::select("entity_id", devices).required()],
            )
            .with_errors(errors)
            .with_placeholder("device_count", device_count.to_string()),
        )
    }

    pub(super) async fn step_edit_schedule(&mut self, user_input: Option<UserInput>) -> StepOutcome {
        let Some(client) = self.data.client(&self.entry.entry_id) else {
            return StepOutcome::Done(Self::bare_error_form(
                OptionsStep::EditSchedule,
                "api_client_unavailable",
            ));
        };

        let mut errors = HashMap::new();

        if self.session.draft.is_none() {
            if let Some(device_id) = self.session.device_id.clone() {
                match load_device_draft(client.as_ref(), &device_id).await {
                    Ok(draft) => self.session.draft = Some(draft),
                    Err(e) => {
                        error!("Failed to get schedule: {} ({:?})", e, e);
                        errors.insert("base".to_string(), "failed_to_load_schedule".to_string());
                        self.session.draft = Some(ScheduleDraft::default());
                    }
                }
            }
        }

        if let Some(input) = user_input {
            match parse_submission(&input) {
                Ok(payload) if errors.is_empty() => {
                    match self.save_schedule(&client, payload).await {
                        Ok(SaveOutcome::Saved) => {
                            return StepOutcome::Done(self.save_existing_options())
                        }
                        Ok(SaveOutcome::MissingDevice) => {
                            errors.insert(
                                "base".to_string(),
                                "device_id_required_for_creation".to_string(),
                            );
                        }
                        Err(e) => {
                            error!("Error saving schedule: {} ({:?})", e, e);
                            errors.insert(
                                "base".to_string(),
                                "failed_to_save_schedule".to_string(),
                            );
                        }
                    }
                }
                Ok(_) => {}
                Err(parse_errors) => {
                    // Only the last problem is shown
                    if let Some(last) = parse_errors.last() {
                        errors.insert("time_entries".to_string(), last.to_string());
                    }
                }
            }
        }

        StepOutcome::Done(self.edit_schedule_form().with_errors(errors))
    }

    /// Update the schedule if one is known, else create one for the device,
    /// then refresh the device
    async fn save_schedule(
        &self,
        client: &Arc<dyn EnviClient>,
        mut payload: SchedulePayload,
    ) -> EnviResult<SaveOutcome> {
        let schedule_id = self
            .session
            .selected_schedule()
            .or_else(|| self.session.draft.as_ref().and_then(|d| d.schedule_id));

        match schedule_id {
            Some(schedule_id) => {
                client.update_schedule(schedule_id, &payload).await?;
                info!("Updated schedule {}", schedule_id);
            }
            None => {
                let Some(device_id) = self.session.device_id.clone() else {
                    return Ok(SaveOutcome::MissingDevice);
                };
                payload.device_id = Some(device_id.clone());
                client.create_schedule(&payload).await?;
                info!("Created schedule for device {}", device_id);
            }
        }

        if let (Some(coordinator), Some(device_id)) = (
            self.data.coordinator(&self.entry.entry_id),
            self.session.device_id.as_deref(),
        ) {
            if coordinator.tracks_device(device_id) {
                coordinator.refresh_device(device_id).await?;
            }
        }

        Ok(SaveOutcome::Saved)
    }

    fn edit_schedule_form(&self) -> FlowResult {
        let draft = self.session.draft.clone().unwrap_or_default();

        let device_name = match self.session.entity_id.as_deref() {
            Some(entity_id) => self
                .entity_display_name(entity_id)
                .unwrap_or_else(|| entity_id.to_string()),
            None => "Unknown".to_string(),
        };

        FlowResult::form(
            OptionsStep::EditSchedule.id(),
            vec![
                FormField::boolean("enabled")
                    .required()
                    .with_default(draft.enabled)
                    .with_description("Turn the schedule on or off"),
                FormField::string("name")
                    .with_default(draft.name.clone().unwrap_or_default())
                    .with_description("Optional name for this schedule"),
                FormField::string("time_entries")
                    .with_default(draft.rendered_times())
                    .with_description(
                        "HH:MM:SS,temperature,enabled entries separated by |, temperature 50-86°F",
                    ),
            ],
        )
        .with_placeholder("device_name", device_name)
    }
}

/// Draft from the device's embedded schedule summary, completed from the
/// schedule list when the summary names a schedule
async fn load_device_draft(client: &dyn EnviClient, device_id: &str) -> EnviResult<ScheduleDraft> {
    let device = client.get_device_state(device_id).await?;
    let mut draft = ScheduleDraft::from_device(device_id, device.schedule.as_ref());

    if let Some(schedule_id) = draft.schedule_id {
        match client.get_schedule_list().await {
            Ok(schedules) => {
                if let Some(schedule) = schedules.iter().find(|s| s.id == schedule_id) {
                    draft.overlay(schedule);
                }
            }
            Err(e) => debug!("Could not fetch full schedule details: {}", e),
        }
    }

    Ok(draft)
}
