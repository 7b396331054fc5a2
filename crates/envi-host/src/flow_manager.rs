//! Flow Manager
//!
//! Drives config and options flows one step at a time. A flow lives in the
//! active set between steps and is taken out of it while a step runs, so no
//! lock is held across the handler's remote calls.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use ulid::Ulid;

use crate::entries::{ConfigEntries, ConfigEntriesError};
use crate::entry::{ConfigEntry, ConfigEntryUpdate};
use crate::flow::{FlowResult, FlowResultType, UserInput};

#[derive(Debug, Error)]
pub enum FlowError {
    #[error("Flow {0} not found")]
    UnknownFlow(String),

    #[error("Handler {handler} has no step {step_id}")]
    UnknownStep { handler: String, step_id: String },

    #[error("Step {step_id} does not offer menu option {option}")]
    InvalidMenuOption { step_id: String, option: String },

    #[error(transparent)]
    Entries(#[from] ConfigEntriesError),
}

/// A flow implementation for one integration
#[async_trait]
pub trait FlowHandler: Send + Sync {
    /// Integration domain
    fn handler(&self) -> &str;

    /// Step run when the flow starts
    fn init_step(&self) -> &str;

    /// Unique id for the entry a config flow creates
    fn unique_id(&self) -> Option<&str> {
        None
    }

    /// Run one step. `user_input` is `None` when the step is first shown.
    async fn async_step(
        &mut self,
        step_id: &str,
        user_input: Option<UserInput>,
    ) -> Result<FlowResult, FlowError>;
}

/// What a flow's create_entry result applies to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowContext {
    /// Creates a new config entry
    Config,
    /// Replaces the options of an existing entry
    Options { entry_id: String },
}

impl FlowContext {
    fn source(&self) -> &'static str {
        match self {
            FlowContext::Config => "user",
            FlowContext::Options { .. } => "options",
        }
    }
}

struct ActiveFlow {
    handler: Box<dyn FlowHandler>,
    context: FlowContext,
    current_step: String,
    /// Options offered if the current step is a menu
    menu_options: Option<Vec<String>>,
}

pub struct FlowManager {
    entries: Arc<ConfigEntries>,
    flows: RwLock<HashMap<String, ActiveFlow>>,
}

impl FlowManager {
    pub fn new(entries: Arc<ConfigEntries>) -> Self {
        Self {
            entries,
            flows: RwLock::new(HashMap::new()),
        }
    }

    pub fn entries(&self) -> &Arc<ConfigEntries> {
        &self.entries
    }

    /// Start a flow and run its initial step
    pub async fn start(
        &self,
        handler: Box<dyn FlowHandler>,
        context: FlowContext,
    ) -> Result<FlowResult, FlowError> {
        let flow_id = Ulid::new().to_string().to_lowercase();
        let init_step = handler.init_step().to_string();
        info!(
            "Starting {} flow for {} with flow_id {}",
            context.source(),
            handler.handler(),
            flow_id
        );

        let flow = ActiveFlow {
            handler,
            context,
            current_step: init_step.clone(),
            menu_options: None,
        };
        self.run_step(flow_id, flow, &init_step, None).await
    }

    /// Submit input to a flow's current step
    ///
    /// If the current step is a menu, the input must carry `next_step_id`
    /// naming one of the offered options, and that step is run without input.
    pub async fn progress(
        &self,
        flow_id: &str,
        user_input: Option<UserInput>,
    ) -> Result<FlowResult, FlowError> {
        let flow = self
            .flows
            .write()
            .await
            .remove(flow_id)
            .ok_or_else(|| FlowError::UnknownFlow(flow_id.to_string()))?;

        let (step_id, user_input) = match &flow.menu_options {
            Some(options) => {
                let choice = user_input
                    .as_ref()
                    .and_then(|input| input.get("next_step_id"))
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();

                if !options.iter().any(|o| *o == choice) {
                    let err = FlowError::InvalidMenuOption {
                        step_id: flow.current_step.clone(),
                        option: choice,
                    };
                    self.flows.write().await.insert(flow_id.to_string(), flow);
                    return Err(err);
                }
                (choice, None)
            }
            None => (flow.current_step.clone(), user_input),
        };

        debug!(
            "Progressing flow {} for {} at step {}",
            flow_id,
            flow.handler.handler(),
            step_id
        );
        self.run_step(flow_id.to_string(), flow, &step_id, user_input)
            .await
    }

    /// Drop an active flow
    pub async fn abort_flow(&self, flow_id: &str) -> Result<(), FlowError> {
        self.flows
            .write()
            .await
            .remove(flow_id)
            .ok_or_else(|| FlowError::UnknownFlow(flow_id.to_string()))?;
        info!("Aborted flow {}", flow_id);
        Ok(())
    }

    pub async fn list_flows(&self) -> Vec<Value> {
        let flows = self.flows.read().await;
        flows
            .iter()
            .map(|(flow_id, flow)| {
                json!({
                    "flow_id": flow_id,
                    "handler": flow.handler.handler(),
                    "step_id": flow.current_step,
                    "context": {
                        "source": flow.context.source()
                    }
                })
            })
            .collect()
    }

    async fn run_step(
        &self,
        flow_id: String,
        mut flow: ActiveFlow,
        step_id: &str,
        user_input: Option<UserInput>,
    ) -> Result<FlowResult, FlowError> {
        let mut result = match flow.handler.async_step(step_id, user_input).await {
            Ok(result) => result,
            Err(e) => {
                warn!("Flow {} failed at step {}: {}", flow_id, step_id, e);
                self.flows.write().await.insert(flow_id, flow);
                return Err(e);
            }
        };

        result.flow_id = flow_id.clone();
        result.handler = flow.handler.handler().to_string();

        match result.result_type {
            FlowResultType::Form | FlowResultType::Menu => {
                if let Some(step_id) = &result.step_id {
                    flow.current_step = step_id.clone();
                }
                flow.menu_options = match result.result_type {
                    FlowResultType::Menu => result.menu_options.clone(),
                    _ => None,
                };
                self.flows.write().await.insert(flow_id, flow);
            }
            FlowResultType::CreateEntry => {
                self.apply_entry(&flow, &mut result).await?;
                info!("Flow {} finished with create_entry", flow_id);
            }
            FlowResultType::Abort => {
                info!(
                    "Flow {} aborted: {}",
                    flow_id,
                    result.reason.as_deref().unwrap_or("unknown")
                );
            }
        }

        Ok(result)
    }

    async fn apply_entry(
        &self,
        flow: &ActiveFlow,
        result: &mut FlowResult,
    ) -> Result<(), FlowError> {
        let data: HashMap<String, Value> = result
            .data
            .clone()
            .unwrap_or_default()
            .into_iter()
            .collect();

        let entry = match &flow.context {
            FlowContext::Config => {
                let mut entry = ConfigEntry::new(
                    flow.handler.handler(),
                    result.title.clone().unwrap_or_default(),
                )
                .with_data(data);
                if let Some(unique_id) = flow.handler.unique_id() {
                    entry = entry.with_unique_id(unique_id);
                }

                match self.entries.add(entry).await {
                    Ok(entry) => entry,
                    Err(ConfigEntriesError::AlreadyExists { .. }) => {
                        let flow_id = std::mem::take(&mut result.flow_id);
                        let handler = std::mem::take(&mut result.handler);
                        *result = FlowResult::abort("already_configured");
                        result.flow_id = flow_id;
                        result.handler = handler;
                        return Ok(());
                    }
                    Err(e) => return Err(e.into()),
                }
            }
            FlowContext::Options { entry_id } => {
                self.entries
                    .update(entry_id, ConfigEntryUpdate::new().options(data))
                    .await?
            }
        };

        result.result = serde_json::to_value(&entry).ok();
        Ok(())
    }
}
