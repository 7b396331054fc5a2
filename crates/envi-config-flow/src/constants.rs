//! Integration constants

/// Integration domain
pub const DOMAIN: &str = "smart_envi";

/// Prefix of the registry unique id of every Envi climate entity
pub const UNIQUE_ID_PREFIX: &str = "smart_envi_";

/// Entity domain of the heaters
pub const CLIMATE_DOMAIN: &str = "climate";

pub const CONF_USERNAME: &str = "username";
pub const CONF_PASSWORD: &str = "password";
pub const CONF_SCAN_INTERVAL: &str = "scan_interval";
pub const CONF_API_TIMEOUT: &str = "api_timeout";

/// Polling interval in seconds
pub const DEFAULT_SCAN_INTERVAL: i64 = 30;
pub const MIN_SCAN_INTERVAL: i64 = 10;
pub const MAX_SCAN_INTERVAL: i64 = 300;

/// HTTP timeout in seconds
pub const DEFAULT_API_TIMEOUT: i64 = 15;
pub const MIN_API_TIMEOUT: i64 = 5;
pub const MAX_API_TIMEOUT: i64 = 60;

/// Setpoint bounds in °F
pub const MIN_TEMPERATURE: f64 = 50.0;
pub const MAX_TEMPERATURE: f64 = 86.0;
