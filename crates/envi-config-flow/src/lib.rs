//! Smart Envi integration
//!
//! Setup and configuration for Envi smart heaters:
//!
//! - [`EnviConfigFlow`] - logs in to the Envi cloud and creates the entry
//! - [`EnviOptionsFlow`] - integration settings plus viewing, creating,
//!   editing and deleting heating schedules
//! - [`EnviIntegration`] - loads and unloads entries and hands out flows
//!
//! Schedules are edited as text, see [`schedule`] for the encoding.

pub mod config_flow;
pub mod constants;
pub mod coordinator;
pub mod options;
pub mod options_flow;
pub mod runtime;
pub mod schedule;
pub mod setup;

pub use config_flow::EnviConfigFlow;
pub use constants::DOMAIN;
pub use coordinator::{Coordinator, EnviCoordinator};
pub use options::IntegrationOptions;
pub use options_flow::{EnviOptionsFlow, InvalidTransition, OptionsSession, OptionsStep};
pub use runtime::EnviData;
pub use schedule::{parse_time_entries, render_time_entries, ScheduleDraft, TimeEntryError};
pub use setup::{EnviIntegration, SetupError};
