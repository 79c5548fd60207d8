//! System-wide default constants.
//!
//! Grouped by subsystem for easy discovery.

// ============================================================================
// Config discovery
// ============================================================================

/// Environment variable pointing at a TOML config file.
pub const CONFIG_ENV_VAR: &str = "FERMENTWATCH_CONFIG";

/// Config file looked up in the current working directory.
pub const LOCAL_CONFIG_FILE: &str = "fermentwatch.toml";

// ============================================================================
// Analysis
// ============================================================================

/// Minimum drift (°C) for both the window trend and the distance to setpoint.
pub const ACCEPTABLE_DELTA: f64 = 0.5;

/// Buckets handed to the analyzer.
///
/// 6 buckets of 5 minutes = the last 30 minutes.
pub const WINDOW_POINTS: usize = 6;

/// Averaging bucket width (minutes).
pub const GROUP_MINUTES: u32 = 5;

/// Extra fetch attempts on an empty window, each doubling its span.
pub const MAX_FETCH_RETRIES: u32 = 2;

// ============================================================================
// InfluxDB
// ============================================================================

pub const INFLUX_URL: &str = "localhost";
pub const INFLUX_DATABASE: &str = "telegraf";
pub const INFLUX_RETENTION_POLICY: &str = "autogen";
pub const INFLUX_MEASUREMENT: &str = "mqtt_consumer_float";
pub const INFLUX_TOPIC_PREFIX: &str = "fermenters";

/// HTTP timeout for InfluxDB queries (seconds).
pub const INFLUX_HTTP_TIMEOUT_SECS: u64 = 30;

// ============================================================================
// Alerts
// ============================================================================

/// Free Mobile SMS notification endpoint.
pub const SMS_ENDPOINT: &str = "https://smsapi.free-mobile.fr/sendmsg";

/// HTTP timeout for SMS gateway requests (seconds).
pub const SMS_HTTP_TIMEOUT_SECS: u64 = 30;

pub const CREDENTIALS_PATH: &str = "credentials.txt";

// ============================================================================
// Storage
// ============================================================================

pub const DATA_DIR: &str = "./data";

/// Sled database directory name inside the data directory.
pub const VESSEL_STATE_DB: &str = "vessel_state.db";
