//! Schedule drafts and the time-entry text encoding
//!
//! Schedules are edited as a single line of text:
//!
//! ```text
//! HH:MM:SS,temperature,enabled|HH:MM:SS,temperature,enabled|...
//! ```
//!
//! `enabled` may be left out and defaults to true. `HH:MM` is accepted and
//! stored as `HH:MM:00`.

use envi_api::{Schedule, ScheduleInfo, TimeEntry};
use thiserror::Error;

use crate::constants::{MAX_TEMPERATURE, MIN_TEMPERATURE};

/// Why a time entry was rejected. The `Display` text is shown to the user.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TimeEntryError {
    #[error("Invalid format in entry '{entry}'. Use: HH:MM:SS,temp,enabled")]
    InvalidFormat { entry: String },

    #[error("Invalid time format: {time}. Use HH:MM:SS")]
    InvalidTime { time: String },

    #[error("Temperature {temperature} must be between {min} and {max}°F", min = MIN_TEMPERATURE, max = MAX_TEMPERATURE)]
    TemperatureOutOfRange { temperature: f64 },
}

/// Parse the text encoding
///
/// Blank input yields no entries. Every malformed entry is skipped and
/// reported; if any were, the error list is returned in input order.
pub fn parse_time_entries(input: &str) -> Result<Vec<TimeEntry>, Vec<TimeEntryError>> {
    let mut entries = Vec::new();
    let mut errors = Vec::new();

    for raw in input.trim().split('|') {
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }
        match parse_entry(raw) {
            Ok(entry) => entries.push(entry),
            Err(e) => errors.push(e),
        }
    }

    if errors.is_empty() {
        Ok(entries)
    } else {
        Err(errors)
    }
}

fn parse_entry(raw: &str) -> Result<TimeEntry, TimeEntryError> {
    let parts: Vec<&str> = raw.split(',').collect();
    let invalid_format = || TimeEntryError::InvalidFormat {
        entry: raw.to_string(),
    };

    if parts.len() < 2 {
        return Err(invalid_format());
    }

    let temperature: f64 = parts[1].trim().parse().map_err(|_| invalid_format())?;
    let enabled = parts
        .get(2)
        .map_or(true, |p| p.trim().eq_ignore_ascii_case("true"));

    let time = normalize_time(parts[0].trim())?;

    if !(MIN_TEMPERATURE..=MAX_TEMPERATURE).contains(&temperature) {
        return Err(TimeEntryError::TemperatureOutOfRange { temperature });
    }

    Ok(TimeEntry {
        time,
        temperature,
        enabled,
    })
}

/// `HH:MM` becomes `HH:MM:00`; `HH:MM:SS` is kept. Components must be
/// integers but are not range checked.
fn normalize_time(time: &str) -> Result<String, TimeEntryError> {
    let time = match time.split(':').count() {
        2 => format!("{}:00", time),
        3 => time.to_string(),
        _ => {
            return Err(TimeEntryError::InvalidTime {
                time: time.to_string(),
            })
        }
    };

    if time.split(':').all(|part| part.trim().parse::<i64>().is_ok()) {
        Ok(time)
    } else {
        Err(TimeEntryError::InvalidTime { time })
    }
}

/// Render entries in the text encoding
pub fn render_time_entries(entries: &[TimeEntry]) -> String {
    entries
        .iter()
        .map(|e| format!("{},{},{}", e.time, e.temperature, e.enabled))
        .collect::<Vec<_>>()
        .join("|")
}

/// The schedule being viewed or edited in an options flow session
///
/// A draft with no `schedule_id` is saved by creating a schedule; one with
/// an id is saved by updating it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScheduleDraft {
    pub device_id: Option<String>,
    pub schedule_id: Option<i64>,
    pub enabled: bool,
    pub name: Option<String>,
    /// Schedule-level temperature. Carried along but never submitted.
    pub temperature: Option<f64>,
    pub times: Vec<TimeEntry>,
}

impl ScheduleDraft {
    /// True for the placeholder left behind by a failed load
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Draft from the schedule summary embedded in a device record
    pub fn from_device(device_id: &str, info: Option<&ScheduleInfo>) -> Self {
        let info = info.cloned().unwrap_or_default();
        Self {
            device_id: Some(device_id.to_string()),
            schedule_id: info.resolved_id(),
            enabled: info.enabled.unwrap_or(false),
            name: info.display_name().map(String::from),
            temperature: info.temperature,
            times: info.times.unwrap_or_default(),
        }
    }

    /// Draft from a full schedule record
    pub fn from_schedule(schedule: &Schedule) -> Self {
        Self {
            device_id: schedule.device_id.clone(),
            schedule_id: Some(schedule.id).filter(|id| *id != 0),
            enabled: schedule.is_enabled(),
            name: schedule.name.clone().filter(|n| !n.is_empty()),
            temperature: schedule.temperature,
            times: schedule.times.clone().unwrap_or_default(),
        }
    }

    /// Take the full record's values where it has them
    pub fn overlay(&mut self, schedule: &Schedule) {
        if let Some(enabled) = schedule.enabled {
            self.enabled = enabled;
        }
        if let Some(name) = schedule.name.as_ref().filter(|n| !n.is_empty()) {
            self.name = Some(name.clone());
        }
        if let Some(temperature) = schedule.temperature.filter(|t| *t != 0.0) {
            self.temperature = Some(temperature);
        }
        if let Some(times) = &schedule.times {
            self.times = times.clone();
        }
    }

    pub fn rendered_times(&self) -> String {
        render_time_entries(&self.times)
    }
}
