//! Common test utilities for the Smart Envi integration
//!
//! In-memory fakes for the cloud client and coordinator, plus a harness
//! wiring them to a flow manager backed by a temporary config directory.

#![allow(dead_code)]

mod fake_client;
mod fake_coordinator;
mod harness;

pub use fake_client::*;
pub use fake_coordinator::*;
pub use harness::*;

use serde_json::Value;

/// Route test logs through the test writer. Honors `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

/// Build user input from a JSON object literal
pub fn input(value: Value) -> envi_host::UserInput {
    value
        .as_object()
        .cloned()
        .expect("test input must be a JSON object")
}
