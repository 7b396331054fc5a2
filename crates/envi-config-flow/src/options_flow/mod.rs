//! Options flow
//!
//! ```text
//! init --(menu: integration)--> integration_options --> saved
//! init --(menu: schedules)----> schedule_options
//! schedule_options --(device)--> select_device --> edit_schedule --> saved
//! schedule_options --(all)-----> list_schedules --> view_schedule
//! view_schedule --(edit)-------> edit_schedule_from_list --> edit_schedule --> saved
//! view_schedule --(delete)-----> saved
//! ```
//!
//! The host enters a step either from the `init` menu or by submitting the
//! form a step returned. A step may also forward to another step within the
//! same call; every forward is checked against [`OptionsStep::try_transition`].
//!
//! Every terminal step saves the entry's options. Only `integration_options`
//! changes them; the schedule steps write the existing options back.

mod device;
mod integration;
mod schedules;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use envi_api::Schedule;
use envi_host::{
    ConfigEntry, EntityLookup, FlowError, FlowHandler, FlowResult, UserInput,
};
use thiserror::Error;
use tracing::{debug, error};

use crate::constants::{CLIMATE_DOMAIN, DOMAIN, UNIQUE_ID_PREFIX};
use crate::runtime::EnviData;
use crate::schedule::ScheduleDraft;

/// The steps of the options flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptionsStep {
    Init,
    Integration,
    Schedules,
    IntegrationOptions,
    ScheduleOptions,
    SelectDevice,
    EditSchedule,
    ListSchedules,
    ViewSchedule,
    EditScheduleFromList,
}

/// A forward between two steps that the flow does not allow
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Invalid step transition from {from} to {to}: {reason}")]
pub struct InvalidTransition {
    pub from: OptionsStep,
    pub to: OptionsStep,
    pub reason: &'static str,
}

impl OptionsStep {
    pub const ALL: [OptionsStep; 10] = [
        OptionsStep::Init,
        OptionsStep::Integration,
        OptionsStep::Schedules,
        OptionsStep::IntegrationOptions,
        OptionsStep::ScheduleOptions,
        OptionsStep::SelectDevice,
        OptionsStep::EditSchedule,
        OptionsStep::ListSchedules,
        OptionsStep::ViewSchedule,
        OptionsStep::EditScheduleFromList,
    ];

    pub fn id(self) -> &'static str {
        match self {
            OptionsStep::Init => "init",
            OptionsStep::Integration => "integration",
            OptionsStep::Schedules => "schedules",
            OptionsStep::IntegrationOptions => "integration_options",
            OptionsStep::ScheduleOptions => "schedule_options",
            OptionsStep::SelectDevice => "select_device",
            OptionsStep::EditSchedule => "edit_schedule",
            OptionsStep::ListSchedules => "list_schedules",
            OptionsStep::ViewSchedule => "view_schedule",
            OptionsStep::EditScheduleFromList => "edit_schedule_from_list",
        }
    }

    pub fn from_id(step_id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|step| step.id() == step_id)
    }

    /// Attempt a forward from this step to `to`
    pub fn try_transition(self, to: OptionsStep) -> Result<OptionsStep, InvalidTransition> {
        use OptionsStep::*;

        let valid = match (self, to) {
            // Menu entries
            (Integration, IntegrationOptions) => true,
            (Schedules, ScheduleOptions) => true,

            // Schedule management
            (ScheduleOptions, SelectDevice) => true,
            (ScheduleOptions, ListSchedules) => true,
            (SelectDevice, EditSchedule) => true,
            (ListSchedules, ViewSchedule) => true,
            (ViewSchedule, EditScheduleFromList) => true,
            (EditScheduleFromList, EditSchedule) => true,

            _ => false,
        };

        if valid {
            Ok(to)
        } else {
            Err(InvalidTransition {
                from: self,
                to,
                reason: Self::transition_error_reason(self, to),
            })
        }
    }

    pub fn can_transition_to(self, to: OptionsStep) -> bool {
        self.try_transition(to).is_ok()
    }

    fn transition_error_reason(from: OptionsStep, to: OptionsStep) -> &'static str {
        use OptionsStep::*;

        match (from, to) {
            (_, Init) => "init is only entered when the flow starts",
            (_, Integration) | (_, Schedules) => "menu steps are only entered from the init menu",
            (IntegrationOptions, _) | (EditSchedule, _) => "step only finishes or re-renders",
            (from, to) if from == to => "a step cannot forward to itself",
            _ => "Invalid step transition",
        }
    }
}

impl fmt::Display for OptionsStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// State kept between the steps of one options flow
#[derive(Debug, Default)]
pub struct OptionsSession {
    /// Device whose schedule is being edited
    pub device_id: Option<String>,
    /// Climate entity picked in `select_device`
    pub entity_id: Option<String>,
    /// Schedule picked in `list_schedules`
    pub schedule_id: Option<i64>,
    /// `None` until first loaded; an empty draft after a failed load
    pub draft: Option<ScheduleDraft>,
    /// Schedule list, fetched once per session
    pub schedules: Vec<Schedule>,
}

impl OptionsSession {
    /// Picked schedule id; zero counts as none
    pub fn selected_schedule(&self) -> Option<i64> {
        self.schedule_id.filter(|id| *id != 0)
    }
}

/// What a step hands back to the run loop
pub(crate) enum StepOutcome {
    /// Return this to the host
    Done(FlowResult),
    /// Run another step within the same call
    Advance(OptionsStep, Option<UserInput>),
}

/// Options flow for one Smart Envi entry
pub struct EnviOptionsFlow {
    entry: ConfigEntry,
    data: Arc<EnviData>,
    entities: Arc<dyn EntityLookup>,
    session: OptionsSession,
    step: OptionsStep,
}

impl EnviOptionsFlow {
    pub fn new(entry: ConfigEntry, data: Arc<EnviData>, entities: Arc<dyn EntityLookup>) -> Self {
        Self {
            entry,
            data,
            entities,
            session: OptionsSession::default(),
            step: OptionsStep::Init,
        }
    }

    pub fn session(&self) -> &OptionsSession {
        &self.session
    }

    async fn run(&mut self, step: OptionsStep, user_input: Option<UserInput>) -> FlowResult {
        self.step = step;
        let mut user_input = user_input;

        loop {
            debug!("Options flow step {} called", self.step);
            let outcome = match self.step {
                OptionsStep::Init => self.step_init(),
                OptionsStep::Integration => {
                    StepOutcome::Advance(OptionsStep::IntegrationOptions, user_input)
                }
                OptionsStep::Schedules => {
                    StepOutcome::Advance(OptionsStep::ScheduleOptions, user_input)
                }
                OptionsStep::IntegrationOptions => self.step_integration_options(user_input),
                OptionsStep::ScheduleOptions => self.step_schedule_options(user_input),
                OptionsStep::SelectDevice => self.step_select_device(user_input),
                OptionsStep::EditSchedule => self.step_edit_schedule(user_input).await,
                OptionsStep::ListSchedules => self.step_list_schedules(user_input).await,
                OptionsStep::ViewSchedule => self.step_view_schedule(user_input).await,
                OptionsStep::EditScheduleFromList => {
                    self.step_edit_schedule_from_list(user_input).await
                }
            };

            match outcome {
                StepOutcome::Done(result) => return result,
                StepOutcome::Advance(next, input) => match self.step.try_transition(next) {
                    Ok(next) => {
                        self.step = next;
                        user_input = input;
                    }
                    Err(e) => {
                        error!("Error in options flow: {} ({:?})", e, e);
                        return self.unknown_error_form();
                    }
                },
            }
        }
    }

    /// Re-render the current step with `errors.base = unknown`
    fn unknown_error_form(&self) -> FlowResult {
        let form = match self.step {
            OptionsStep::IntegrationOptions => {
                self.integration_form(crate::options::IntegrationOptions::default())
            }
            step => FlowResult::form(step.id(), vec![]),
        };
        form.with_error("base", "unknown")
    }

    /// Finish the flow writing the entry's options back unchanged
    fn save_existing_options(&self) -> FlowResult {
        FlowResult::create_entry("", self.entry.options.clone().into_iter().collect())
    }

    /// Form with no fields and a single base error
    fn bare_error_form(step: OptionsStep, error: &str) -> FlowResult {
        FlowResult::form(step.id(), vec![]).with_error("base", error)
    }

    /// Display name of an entity: its `friendly_name`, else the entity id.
    /// `None` if the entity has no current state.
    fn entity_display_name(&self, entity_id: &str) -> Option<String> {
        self.entities.state(entity_id).map(|state| {
            state
                .friendly_name()
                .unwrap_or(entity_id)
                .to_string()
        })
    }

    /// Device id -> display name for every Envi climate entity with a state
    fn device_names(&self) -> HashMap<String, String> {
        self.entities
            .entities_for(CLIMATE_DOMAIN, DOMAIN)
            .iter()
            .filter_map(|entry| {
                let device_id = entry.unique_id.as_deref()?.strip_prefix(UNIQUE_ID_PREFIX)?;
                let name = self.entity_display_name(&entry.entity_id)?;
                Some((device_id.to_string(), name))
            })
            .collect()
    }
}

#[async_trait]
impl FlowHandler for EnviOptionsFlow {
    fn handler(&self) -> &str {
        DOMAIN
    }

    fn init_step(&self) -> &str {
        OptionsStep::Init.id()
    }

    async fn async_step(
        &mut self,
        step_id: &str,
        user_input: Option<UserInput>,
    ) -> Result<FlowResult, FlowError> {
        let step = OptionsStep::from_id(step_id).ok_or_else(|| FlowError::UnknownStep {
            handler: DOMAIN.to_string(),
            step_id: step_id.to_string(),
        })?;
        Ok(self.run(step, user_input).await)
    }
}
