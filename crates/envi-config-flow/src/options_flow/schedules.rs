//! Account-wide schedule management: list, view, edit, delete

use std::collections::HashMap;
use std::sync::Arc;

use envi_api::{EnviClient, EnviResult};
use envi_host::{FlowResult, FormField, SelectOption, UserInput};
use serde_json::Value;
use tracing::{debug, error, info};

use super::{EnviOptionsFlow, OptionsStep, StepOutcome};
use crate::constants::{CLIMATE_DOMAIN, DOMAIN, UNIQUE_ID_PREFIX};
use crate::options::coerce_int;
use crate::schedule::ScheduleDraft;

const ACTION_EDIT: &str = "edit";
const ACTION_DELETE: &str = "delete";

/// Schedule id from a `list_schedules` submission
///
/// `Ok(None)` when nothing was picked, `Err(())` when the value is not an
/// integer.
fn selected_schedule_id(input: &UserInput) -> Result<Option<i64>, ()> {
    match input.get("schedule_id") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.is_empty() => Ok(None),
        Some(value) => coerce_int(value).map(Some).ok_or(()),
    }
}

impl EnviOptionsFlow {
    pub(super) async fn step_list_schedules(
        &mut self,
        user_input: Option<UserInput>,
    ) -> StepOutcome {
        let Some(client) = self.data.client(&self.entry.entry_id) else {
            return StepOutcome::Done(Self::bare_error_form(
                OptionsStep::ListSchedules,
                "api_client_unavailable",
            ));
        };

        if self.session.schedules.is_empty() {
            match client.get_schedule_list().await {
                Ok(schedules) => {
                    debug!("Fetched {} schedules", schedules.len());
                    self.session.schedules = schedules;
                }
                Err(e) => {
                    // Cache stays empty so the next submission fetches again
                    error!("Failed to fetch schedules: {} ({:?})", e, e);
                    return StepOutcome::Done(Self::bare_error_form(
                        OptionsStep::ListSchedules,
                        "failed_to_load_schedules",
                    ));
                }
            }
        }

        let mut errors = HashMap::new();

        if let Some(input) = user_input {
            match selected_schedule_id(&input) {
                Ok(Some(schedule_id)) => {
                    self.session.schedule_id = Some(schedule_id);
                    return StepOutcome::Advance(OptionsStep::ViewSchedule, None);
                }
                Ok(None) => {}
                Err(()) => {
                    errors.insert(
                        "schedule_id".to_string(),
                        "Invalid schedule selection".to_string(),
                    );
                }
            }
        }

        let device_names = self.device_names();
        let options: Vec<SelectOption> = self
            .session
            .schedules
            .iter()
            .filter(|schedule| schedule.id != 0)
            .map(|schedule| {
                let status = if schedule.is_enabled() { "✓" } else { "✗" };
                let name = schedule
                    .name
                    .as_deref()
                    .filter(|n| !n.is_empty())
                    .unwrap_or("Unnamed Schedule");
                let device_id = schedule.device_id.as_deref();
                let device_name = device_id
                    .and_then(|id| device_names.get(id).cloned())
                    .unwrap_or_else(|| format!("Device {}", device_id.unwrap_or("unknown")));

                SelectOption::new(
                    schedule.id.to_string(),
                    format!("{} {} ({})", status, name, device_name),
                )
            })
            .collect();

        if options.is_empty() {
            return StepOutcome::Done(FlowResult::abort("no_schedules"));
        }

        StepOutcome::Done(
            FlowResult::form(
                OptionsStep::ListSchedules.id(),
                vec![FormField::select("schedule_id", options)
                    .required()
                    .with_description(
                        "Select a schedule to view or edit. ✓ marks enabled schedules, ✗ disabled ones",
                    )],
            )
            .with_errors(errors),
        )
    }

    pub(super) async fn step_view_schedule(
        &mut self,
        user_input: Option<UserInput>,
    ) -> StepOutcome {
        let Some(schedule_id) = self.session.selected_schedule() else {
            return StepOutcome::Done(FlowResult::abort("no_schedule_selected"));
        };

        let Some(client) = self.data.client(&self.entry.entry_id) else {
            return StepOutcome::Done(Self::bare_error_form(
                OptionsStep::ViewSchedule,
                "api_client_unavailable",
            ));
        };

        let mut errors = HashMap::new();

        if self.session.draft.is_none() {
            if let Err(e) = self.load_schedule_draft(client.as_ref(), schedule_id).await {
                error!("Failed to load schedule {}: {} ({:?})", schedule_id, e, e);
                errors.insert("base".to_string(), "failed_to_load_schedule".to_string());
                self.session.draft = Some(ScheduleDraft::default());
            }
        }

        if let Some(input) = user_input {
            let action = input.get("action").and_then(Value::as_str);
            if action == Some(ACTION_DELETE) {
                match self.delete_schedule(&client, schedule_id).await {
                    Ok(()) => return StepOutcome::Done(self.save_existing_options()),
                    Err(e) => {
                        error!("Failed to delete schedule: {} ({:?})", e, e);
                        errors.insert(
                            "base".to_string(),
                            "failed_to_delete_schedule".to_string(),
                        );
                    }
                }
            } else if action == Some(ACTION_EDIT) {
                return StepOutcome::Advance(OptionsStep::EditScheduleFromList, None);
            }
        }

        StepOutcome::Done(self.view_schedule_form().with_errors(errors))
    }

    pub(super) async fn step_edit_schedule_from_list(
        &mut self,
        user_input: Option<UserInput>,
    ) -> StepOutcome {
        let needs_load = self
            .session
            .draft
            .as_ref()
            .map_or(true, ScheduleDraft::is_empty);
        let client = self.data.client(&self.entry.entry_id);

        if let (Some(schedule_id), Some(client)) = (self.session.selected_schedule(), client) {
            if needs_load {
                if let Err(e) = self.load_schedule_draft(client.as_ref(), schedule_id).await {
                    error!("Failed to load schedule: {}", e);
                }
            }
        }

        StepOutcome::Advance(OptionsStep::EditSchedule, user_input)
    }

    /// Fetch a schedule into the draft and take its device as the session's
    async fn load_schedule_draft(
        &mut self,
        client: &dyn EnviClient,
        schedule_id: i64,
    ) -> EnviResult<()> {
        let schedule = client.get_schedule(schedule_id).await?;
        self.session.device_id = schedule.device_id.clone();
        self.session.draft = Some(ScheduleDraft::from_schedule(&schedule));
        Ok(())
    }

    async fn delete_schedule(
        &self,
        client: &Arc<dyn EnviClient>,
        schedule_id: i64,
    ) -> EnviResult<()> {
        client.delete_schedule(schedule_id).await?;
        info!("Deleted schedule {}", schedule_id);

        if let Some(coordinator) = self.data.coordinator(&self.entry.entry_id) {
            coordinator.refresh_all().await?;
        }
        Ok(())
    }

    /// Name of the Envi heater with `device_id`
    ///
    /// Falls back to `Unknown Device` when no climate entity carries the
    /// device or the entity has no state.
    fn device_display_name(&self, device_id: Option<&str>) -> String {
        let unknown = || "Unknown Device".to_string();
        let Some(device_id) = device_id.filter(|id| !id.is_empty()) else {
            return unknown();
        };

        self.entities
            .entities_for(CLIMATE_DOMAIN, DOMAIN)
            .iter()
            .find(|entry| {
                entry
                    .unique_id
                    .as_deref()
                    .and_then(|uid| uid.strip_prefix(UNIQUE_ID_PREFIX))
                    == Some(device_id)
            })
            .and_then(|entry| self.entity_display_name(&entry.entity_id))
            .unwrap_or_else(unknown)
    }

    fn view_schedule_form(&self) -> FlowResult {
        let draft = self.session.draft.clone().unwrap_or_default();
        let schedule_name = draft
            .name
            .clone()
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| "Unnamed Schedule".to_string());
        let device_name = self.device_display_name(self.session.device_id.as_deref());

        FlowResult::form(
            OptionsStep::ViewSchedule.id(),
            vec![FormField::select(
                "action",
                vec![
                    SelectOption::new(ACTION_EDIT, "Edit Schedule"),
                    SelectOption::new(ACTION_DELETE, "Delete Schedule"),
                ],
            )
            .required()
            .with_description(format!(
                "Schedule: {} for {}. Choose an action",
                schedule_name, device_name
            ))],
        )
        .with_placeholder("schedule_name", schedule_name)
        .with_placeholder("device_name", device_name)
        .with_placeholder(
            "enabled",
            if draft.enabled { "Enabled" } else { "Disabled" },
        )
        .with_placeholder("time_count", draft.times.len().to_string())
        .with_placeholder("time_entries", draft.rendered_times())
    }
}
