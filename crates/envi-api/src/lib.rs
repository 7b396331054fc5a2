//! Envi Cloud API
//!
//! This crate provides the client used by the Smart Envi integration to talk
//! to the vendor cloud: authentication, device state and heating schedules.
//!
//! # Key Types
//!
//! - [`EnviClient`] - The operations the integration consumes
//! - [`HttpEnviClient`] - reqwest-backed implementation against the REST API
//! - [`ClientFactory`] - Builds a client from a credential pair
//! - [`EnviApiError`] - Error type, with authentication failures kept distinct

pub mod client;
pub mod config;
pub mod error;
pub mod models;

pub use client::{ClientFactory, EnviClient, HttpClientFactory, HttpEnviClient};
pub use config::{ApiSettings, DEFAULT_BASE_URL};
pub use error::{EnviApiError, EnviResult};
pub use models::{Credentials, DeviceState, Schedule, ScheduleInfo, SchedulePayload, TimeEntry};
