//! Envi cloud data types
//!
//! The cloud is loose about types: ids and temperatures arrive as numbers
//! or strings, flags as booleans or 0/1, and optional fields missing or
//! `null`. These types accept all of them.

use std::fmt;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

/// Account credentials
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

fn default_true() -> bool {
    true
}

fn int_from_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn float_from_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn bool_from_value(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|f| f != 0.0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Some(true),
            "false" | "0" | "no" | "off" | "" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Integer id sent as a JSON number or numeric string
fn deserialize_int_id<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    int_from_value(&value).ok_or_else(|| D::Error::custom(format!("invalid id: {}", value)))
}

/// Like [`deserialize_int_id`], with `null` and unparseable values as `None`
fn deserialize_opt_int_id<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(int_from_value))
}

fn deserialize_opt_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(bool_from_value))
}

fn deserialize_opt_float<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(float_from_value))
}

fn deserialize_temperature<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    float_from_value(&value)
        .ok_or_else(|| D::Error::custom(format!("invalid temperature: {}", value)))
}

/// Entry flag; missing, `null` or unreadable counts as enabled
fn deserialize_entry_enabled<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(bool_from_value).unwrap_or(true))
}

/// A single setpoint within a schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeEntry {
    /// Time of day, `HH:MM:SS`
    pub time: String,
    /// Target temperature in °F
    #[serde(deserialize_with = "deserialize_temperature")]
    pub temperature: f64,
    #[serde(default = "default_true", deserialize_with = "deserialize_entry_enabled")]
    pub enabled: bool,
}

impl TimeEntry {
    pub fn new(time: impl Into<String>, temperature: f64, enabled: bool) -> Self {
        Self {
            time: time.into(),
            temperature,
            enabled,
        }
    }
}

/// Accept an id sent as either a JSON number or string
fn deserialize_opt_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// A schedule record as returned by the schedule endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    #[serde(deserialize_with = "deserialize_int_id")]
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_opt_id")]
    pub device_id: Option<String>,
    #[serde(default, deserialize_with = "deserialize_opt_bool")]
    pub enabled: Option<bool>,
    /// Schedule-level temperature. Read but never written back.
    #[serde(default, deserialize_with = "deserialize_opt_float")]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub times: Option<Vec<TimeEntry>>,
}

impl Schedule {
    pub fn is_enabled(&self) -> bool {
        self.enabled.unwrap_or(false)
    }
}

/// Schedule summary embedded in a device record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScheduleInfo {
    #[serde(default, deserialize_with = "deserialize_opt_int_id")]
    pub schedule_id: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_opt_int_id")]
    pub id: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_opt_bool")]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "deserialize_opt_float")]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub times: Option<Vec<TimeEntry>>,
}

impl ScheduleInfo {
    /// The schedule id, preferring `schedule_id` over `id`. Zero means none.
    pub fn resolved_id(&self) -> Option<i64> {
        self.schedule_id
            .filter(|id| *id != 0)
            .or(self.id.filter(|id| *id != 0))
    }

    /// `name`, falling back to `title` when the name is missing or blank
    pub fn display_name(&self) -> Option<&str> {
        self.name
            .as_deref()
            .filter(|n| !n.is_empty())
            .or(self.title.as_deref())
    }
}

/// A `schedule` field that is not an object counts as absent
fn deserialize_schedule_info<'de, D>(deserializer: D) -> Result<Option<ScheduleInfo>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(value @ Value::Object(_)) => match serde_json::from_value(value.clone()) {
            Ok(info) => Some(info),
            Err(e) => {
                warn!("Ignoring unreadable schedule summary {}: {}", value, e);
                None
            }
        },
        _ => None,
    })
}

/// Current device record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceState {
    #[serde(default, deserialize_with = "deserialize_schedule_info")]
    pub schedule: Option<ScheduleInfo>,
    /// Everything else the cloud reports for the device
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

/// Body of schedule create and update requests
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulePayload {
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub times: Vec<TimeEntry>,
    /// Only set when creating
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_credentials_debug_hides_password() {
        let creds = Credentials::new("alice@example.com", "hunter2");
        let debug = format!("{:?}", creds);
        assert!(debug.contains("alice@example.com"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_schedule_accepts_numeric_device_id() {
        let schedule: Schedule = serde_json::from_value(json!({
            "id": 12,
            "name": "Weekdays",
            "device_id": 3401,
            "enabled": true,
            "times": [{"time": "08:00:00", "temperature": 72}]
        }))
        .unwrap();

        assert_eq!(schedule.device_id.as_deref(), Some("3401"));
        assert!(schedule.is_enabled());
        let times = schedule.times.unwrap();
        assert_eq!(times, vec![TimeEntry::new("08:00:00", 72.0, true)]);
    }

    #[test]
    fn test_schedule_tolerates_nulls() {
        let schedule: Schedule = serde_json::from_value(json!({
            "id": 5,
            "name": null,
            "device_id": null,
            "times": null
        }))
        .unwrap();

        assert!(schedule.name.is_none());
        assert!(schedule.device_id.is_none());
        assert!(schedule.times.is_none());
        assert!(!schedule.is_enabled());
    }

    #[test]
    fn test_device_state_non_object_schedule_is_absent() {
        let device: DeviceState = serde_json::from_value(json!({
            "id": 3401,
            "name": "Bedroom",
            "schedule": "none"
        }))
        .unwrap();

        assert!(device.schedule.is_none());
        assert_eq!(device.attributes["name"], json!("Bedroom"));
    }

    #[test]
    fn test_schedule_info_id_and_name_fallbacks() {
        let info: ScheduleInfo = serde_json::from_value(json!({
            "id": 9,
            "title": "Night",
            "name": ""
        }))
        .unwrap();
        assert_eq!(info.resolved_id(), Some(9));
        assert_eq!(info.display_name(), Some("Night"));

        let info = ScheduleInfo {
            schedule_id: Some(4),
            id: Some(9),
            ..Default::default()
        };
        assert_eq!(info.resolved_id(), Some(4));
    }

    #[test]
    fn test_schedule_info_accepts_loose_types() {
        let device: DeviceState = serde_json::from_value(json!({
            "schedule": {
                "schedule_id": "12",
                "enabled": 1,
                "name": "Weekdays",
                "temperature": "70",
                "times": [{"time": "08:00:00", "temperature": "72.5", "enabled": 0}]
            }
        }))
        .unwrap();

        let info = device.schedule.unwrap();
        assert_eq!(info.resolved_id(), Some(12));
        assert_eq!(info.enabled, Some(true));
        assert_eq!(info.temperature, Some(70.0));
        assert_eq!(info.times, Some(vec![TimeEntry::new("08:00:00", 72.5, false)]));
    }

    #[test]
    fn test_schedule_accepts_string_id() {
        let schedule: Schedule = serde_json::from_value(json!({
            "id": "15",
            "enabled": "false"
        }))
        .unwrap();
        assert_eq!(schedule.id, 15);
        assert_eq!(schedule.enabled, Some(false));

        let err = serde_json::from_value::<Schedule>(json!({"id": "abc"}));
        assert!(err.is_err());
    }

    #[test]
    fn test_unreadable_schedule_summary_is_absent() {
        let device: DeviceState = serde_json::from_value(json!({
            "schedule": {"times": [{"time": "08:00:00", "temperature": "warm"}]}
        }))
        .unwrap();
        assert!(device.schedule.is_none());
    }

    #[test]
    fn test_payload_omits_absent_fields() {
        let payload = SchedulePayload {
            enabled: true,
            name: None,
            times: vec![TimeEntry::new("06:30:00", 70.0, false)],
            device_id: None,
        };
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            value,
            json!({
                "enabled": true,
                "times": [{"time": "06:30:00", "temperature": 70.0, "enabled": false}]
            })
        );
    }
}
