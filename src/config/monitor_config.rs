//! Monitor configuration structs and loading.
//!
//! Every section implements `Default`, so a partial (or absent) TOML file is
//! always valid as long as the values it does set pass validation.

use super::defaults;
use crate::acquisition::WindowPolicy;
use crate::detection::{CeilingRule, WindowAnalyzer};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Root configuration for a monitoring deployment.
///
/// Load with `MonitorConfig::load()` which searches:
/// 1. `$FERMENTWATCH_CONFIG` env var
/// 2. `./fermentwatch.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Vessels evaluated on every run
    #[serde(default)]
    pub vessels: VesselsConfig,

    /// Telemetry backend
    #[serde(default)]
    pub influx: InfluxConfig,

    /// Detection thresholds and window shape
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Notification delivery
    #[serde(default)]
    pub alerts: AlertsConfig,

    /// Persistent state location
    #[serde(default)]
    pub storage: StorageConfig,
}

impl MonitorConfig {
    /// Load configuration using the standard search order.
    ///
    /// A file that fails to load is reported and skipped, matching the
    /// fall-through behaviour for missing files.
    pub fn load() -> Self {
        if let Ok(path) = std::env::var(defaults::CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded config from {}", defaults::CONFIG_ENV_VAR);
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config, falling back");
                    }
                }
            } else {
                warn!(path = %path, "{} points to non-existent file, falling back", defaults::CONFIG_ENV_VAR);
            }
        }

        let local = PathBuf::from(defaults::LOCAL_CONFIG_FILE);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!("Loaded config from ./{}", defaults::LOCAL_CONFIG_FILE);
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./{}, using defaults", defaults::LOCAL_CONFIG_FILE);
                }
            }
        }

        info!("No config file found, using built-in defaults");
        Self::default()
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Self::from_toml_str(&contents).map_err(|e| match e {
            ConfigError::Parse(_, inner) => ConfigError::Parse(path.to_path_buf(), inner),
            other => other,
        })
    }

    /// Parse and validate a TOML document.
    ///
    /// Unknown keys are logged as warnings and otherwise ignored.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        for w in super::validation::validate_unknown_keys(contents) {
            warn!("{}", w);
        }

        let config: Self =
            toml::from_str(contents).map_err(|e| ConfigError::Parse(PathBuf::new(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the current config to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Validate all settings, collecting every problem.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors: Vec<String> = Vec::new();
        let a = &self.analysis;

        if !a.acceptable_delta.is_finite() || a.acceptable_delta <= 0.0 {
            errors.push(format!(
                "analysis.acceptable_delta must be a positive number (got {})",
                a.acceptable_delta
            ));
        }
        if let Some(max) = a.max_temperature {
            if !max.is_finite() {
                errors.push(format!("analysis.max_temperature must be finite (got {max})"));
            }
        }
        if a.window_points == 0 {
            errors.push("analysis.window_points must be > 0".to_string());
        }
        if a.group_minutes == 0 {
            errors.push("analysis.group_minutes must be > 0".to_string());
        }

        if self.vessels.ids.is_empty() {
            errors.push("vessels.ids must list at least one vessel".to_string());
        }
        for id in &self.vessels.ids {
            if !is_valid_vessel_id(id) {
                errors.push(format!(
                    "vessels.ids: '{id}' is not a valid vessel id (letters, digits, '-' and '_' only)"
                ));
            }
        }

        if self.influx.url.trim().is_empty() {
            errors.push("influx.url must not be empty".to_string());
        }
        if self.influx.timeout_secs == 0 || self.alerts.timeout_secs == 0 {
            errors.push("HTTP timeouts must be > 0".to_string());
        }

        let (range_errors, range_warnings) = super::validation::validate_ranges(self);
        errors.extend(range_errors);
        for w in &range_warnings {
            warn!("{}", w);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// Analyzer built from the `[analysis]` section.
    pub fn analyzer(&self) -> WindowAnalyzer {
        WindowAnalyzer::new(
            self.analysis.acceptable_delta,
            CeilingRule::new(self.analysis.max_temperature),
        )
    }

    /// Fetch policy built from the `[analysis]` section.
    pub fn window_policy(&self) -> WindowPolicy {
        WindowPolicy {
            window_points: self.analysis.window_points,
            group_minutes: self.analysis.group_minutes,
            max_retries: self.analysis.max_retries,
        }
    }

    /// Location of the sled vessel state database.
    pub fn state_db_path(&self) -> PathBuf {
        self.storage.data_dir.join(defaults::VESSEL_STATE_DB)
    }
}

/// Vessel ids are interpolated into InfluxQL topic literals.
pub fn is_valid_vessel_id(id: &str) -> bool {
    static VESSEL_ID: OnceLock<Option<Regex>> = OnceLock::new();
    VESSEL_ID
        .get_or_init(|| Regex::new(r"^[A-Za-z0-9_-]+$").ok())
        .as_ref()
        .is_some_and(|re| re.is_match(id))
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(PathBuf, std::io::Error),
    Parse(PathBuf, toml::de::Error),
    Serialize(toml::ser::Error),
    Validation(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(path, e) => write!(f, "Config I/O error ({}): {}", path.display(), e),
            ConfigError::Parse(path, e) => {
                write!(f, "Config parse error ({}): {}", path.display(), e)
            }
            ConfigError::Serialize(e) => write!(f, "Config serialization error: {}", e),
            ConfigError::Validation(errors) => {
                writeln!(f, "Config validation failed:")?;
                for e in errors {
                    writeln!(f, "  - {}", e)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Vessels
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VesselsConfig {
    /// Vessel short codes, evaluated in this order
    #[serde(default = "default_vessel_ids")]
    pub ids: Vec<String>,
}

fn default_vessel_ids() -> Vec<String> {
    vec!["f1".to_string(), "f2".to_string(), "f3".to_string()]
}

impl Default for VesselsConfig {
    fn default() -> Self {
        Self {
            ids: default_vessel_ids(),
        }
    }
}

// ============================================================================
// InfluxDB
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InfluxConfig {
    /// Host, host:port or full base URL
    #[serde(default = "default_influx_url")]
    pub url: String,

    #[serde(default = "default_influx_database")]
    pub database: String,

    #[serde(default = "default_influx_retention_policy")]
    pub retention_policy: String,

    #[serde(default = "default_influx_measurement")]
    pub measurement: String,

    /// Topic tag prefix; topics are `<prefix>/<vessel>/<series>`
    #[serde(default = "default_influx_topic_prefix")]
    pub topic_prefix: String,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    #[serde(default = "default_influx_timeout")]
    pub timeout_secs: u64,
}

fn default_influx_url() -> String { defaults::INFLUX_URL.to_string() }
fn default_influx_database() -> String { defaults::INFLUX_DATABASE.to_string() }
fn default_influx_retention_policy() -> String { defaults::INFLUX_RETENTION_POLICY.to_string() }
fn default_influx_measurement() -> String { defaults::INFLUX_MEASUREMENT.to_string() }
fn default_influx_topic_prefix() -> String { defaults::INFLUX_TOPIC_PREFIX.to_string() }
fn default_influx_timeout() -> u64 { defaults::INFLUX_HTTP_TIMEOUT_SECS }

impl Default for InfluxConfig {
    fn default() -> Self {
        Self {
            url: default_influx_url(),
            database: default_influx_database(),
            retention_policy: default_influx_retention_policy(),
            measurement: default_influx_measurement(),
            topic_prefix: default_influx_topic_prefix(),
            username: None,
            password: None,
            timeout_secs: default_influx_timeout(),
        }
    }
}

// ============================================================================
// Analysis
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Tolerance (°C) below which drift is not alert-worthy.
    #[serde(default = "default_acceptable_delta")]
    pub acceptable_delta: f64,

    /// Hard ceiling (°C). Absent disables the ceiling rule.
    #[serde(default)]
    pub max_temperature: Option<f64>,

    /// Number of most recent buckets evaluated.
    #[serde(default = "default_window_points")]
    pub window_points: usize,

    /// Averaging bucket width (minutes).
    #[serde(default = "default_group_minutes")]
    pub group_minutes: u32,

    /// Widening retries when the window comes back empty.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_acceptable_delta() -> f64 { defaults::ACCEPTABLE_DELTA }
fn default_window_points() -> usize { defaults::WINDOW_POINTS }
fn default_group_minutes() -> u32 { defaults::GROUP_MINUTES }
fn default_max_retries() -> u32 { defaults::MAX_FETCH_RETRIES }

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            acceptable_delta: default_acceptable_delta(),
            max_temperature: None,
            window_points: default_window_points(),
            group_minutes: default_group_minutes(),
            max_retries: default_max_retries(),
        }
    }
}

// ============================================================================
// Alerts
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertsConfig {
    /// Log messages instead of sending them.
    #[serde(default)]
    pub dry_run: bool,

    /// File with one `user:password` pair per SMS recipient.
    #[serde(default = "default_credentials_path")]
    pub credentials_path: PathBuf,

    /// Whether `no-data` anomalies are sent out or only logged and recorded.
    #[serde(default)]
    pub notify_on_no_data: bool,

    #[serde(default = "default_sms_endpoint")]
    pub sms_endpoint: String,

    #[serde(default = "default_sms_timeout")]
    pub timeout_secs: u64,
}

fn default_credentials_path() -> PathBuf { PathBuf::from(defaults::CREDENTIALS_PATH) }
fn default_sms_endpoint() -> String { defaults::SMS_ENDPOINT.to_string() }
fn default_sms_timeout() -> u64 { defaults::SMS_HTTP_TIMEOUT_SECS }

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            dry_run: false,
            credentials_path: default_credentials_path(),
            notify_on_no_data: false,
            sms_endpoint: default_sms_endpoint(),
            timeout_secs: default_sms_timeout(),
        }
    }
}

// ============================================================================
// Storage
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Holds the vessel state database and the run lock
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

fn default_data_dir() -> PathBuf { PathBuf::from(defaults::DATA_DIR) }

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}
