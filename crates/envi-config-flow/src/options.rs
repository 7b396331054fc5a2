//! Integration options
//!
//! `scan_interval` and `api_timeout`, as stored in a config entry's options.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::{
    CONF_API_TIMEOUT, CONF_SCAN_INTERVAL, DEFAULT_API_TIMEOUT, DEFAULT_SCAN_INTERVAL,
    MAX_API_TIMEOUT, MAX_SCAN_INTERVAL, MIN_API_TIMEOUT, MIN_SCAN_INTERVAL,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrationOptions {
    /// Seconds between polls
    pub scan_interval: i64,
    /// HTTP timeout in seconds
    pub api_timeout: i64,
}

impl Default for IntegrationOptions {
    fn default() -> Self {
        Self {
            scan_interval: DEFAULT_SCAN_INTERVAL,
            api_timeout: DEFAULT_API_TIMEOUT,
        }
    }
}

/// Integer coercion for option values
///
/// Accepts integers, floats (truncated), numeric strings and booleans.
pub fn coerce_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Value::String(s) => s.trim().parse().ok(),
        Value::Bool(b) => Some(i64::from(*b)),
        _ => None,
    }
}

impl IntegrationOptions {
    /// Stored options as they are, falling back to defaults for missing or
    /// non-integer values. Not range checked.
    pub fn from_options(options: &HashMap<String, Value>) -> Self {
        let read = |key: &str, default: i64| {
            options.get(key).and_then(coerce_int).unwrap_or(default)
        };
        Self {
            scan_interval: read(CONF_SCAN_INTERVAL, DEFAULT_SCAN_INTERVAL),
            api_timeout: read(CONF_API_TIMEOUT, DEFAULT_API_TIMEOUT),
        }
    }

    /// Values forced into their allowed ranges
    pub fn clamped(self) -> Self {
        Self {
            scan_interval: self.scan_interval.clamp(MIN_SCAN_INTERVAL, MAX_SCAN_INTERVAL),
            api_timeout: self.api_timeout.clamp(MIN_API_TIMEOUT, MAX_API_TIMEOUT),
        }
    }

    /// Polling interval, clamped
    pub fn update_interval(&self) -> Duration {
        Duration::from_secs(self.clamped().scan_interval.unsigned_abs())
    }

    /// HTTP timeout, clamped
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.clamped().api_timeout.unsigned_abs())
    }

    /// Validate a submission of the integration options form
    ///
    /// Missing fields take their defaults. On failure the map holds one
    /// message per offending field.
    pub fn validate(
        input: &serde_json::Map<String, Value>,
    ) -> Result<Self, HashMap<String, String>> {
        let mut errors = HashMap::new();

        let scan_interval = validate_field(
            input.get(CONF_SCAN_INTERVAL),
            DEFAULT_SCAN_INTERVAL,
            MIN_SCAN_INTERVAL..=MAX_SCAN_INTERVAL,
            "Scan interval",
        )
        .map_err(|e| errors.insert(CONF_SCAN_INTERVAL.to_string(), e))
        .ok();

        let api_timeout = validate_field(
            input.get(CONF_API_TIMEOUT),
            DEFAULT_API_TIMEOUT,
            MIN_API_TIMEOUT..=MAX_API_TIMEOUT,
            "API timeout",
        )
        .map_err(|e| errors.insert(CONF_API_TIMEOUT.to_string(), e))
        .ok();

        match (scan_interval, api_timeout) {
            (Some(scan_interval), Some(api_timeout)) => Ok(Self {
                scan_interval,
                api_timeout,
            }),
            _ => Err(errors),
        }
    }

    /// The entry options map
    pub fn to_options(&self) -> serde_json::Map<String, Value> {
        let mut map = serde_json::Map::new();
        map.insert(CONF_SCAN_INTERVAL.to_string(), Value::from(self.scan_interval));
        map.insert(CONF_API_TIMEOUT.to_string(), Value::from(self.api_timeout));
        map
    }
}

fn validate_field(
    value: Option<&Value>,
    default: i64,
    range: std::ops::RangeInclusive<i64>,
    label: &str,
) -> Result<i64, String> {
    let value = match value {
        None => default,
        Some(v) => coerce_int(v).ok_or_else(|| format!("{} must be a number", label))?,
    };
    if !range.contains(&value) {
        return Err(format!(
            "{} must be between {} and {} seconds",
            label,
            range.start(),
            range.end()
        ));
    }
    Ok(value)
}
