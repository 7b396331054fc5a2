//! Host collaborators
//!
//! The parts of the home-automation host that an integration's config flows
//! talk to:
//!
//! - [`ConfigEntries`] - integration instances, persisted under `.storage/`
//! - [`EntityRegistry`] and [`StateStore`] - local entities and their state,
//!   exposed to integrations through [`EntityLookup`]
//! - [`FlowResult`] / [`FormField`] - what a flow step hands back to the UI
//! - [`FlowManager`] - drives [`FlowHandler`]s step by step and applies
//!   their results to the config entries

pub mod entities;
pub mod entries;
pub mod entry;
pub mod entity_registry;
pub mod flow;
pub mod flow_manager;
pub mod state_store;
pub mod storage;

pub use entities::{Entities, EntityLookup};
pub use entries::{
    ConfigEntries, ConfigEntriesData, ConfigEntriesError, ConfigEntriesResult, STORAGE_KEY,
    STORAGE_MINOR_VERSION, STORAGE_VERSION,
};
pub use entry::{ConfigEntry, ConfigEntryUpdate, EntryMap};
pub use entity_registry::{EntityEntry, EntityRegistry, EntityRegistryError};
pub use flow::{FieldType, FlowResult, FlowResultType, FormField, SelectOption, UserInput};
pub use flow_manager::{FlowContext, FlowError, FlowHandler, FlowManager};
pub use state_store::{State, StateStore};
pub use storage::{Storable, Storage, StorageError, StorageFile, StorageResult};
