//! Monitor Configuration Module
//!
//! Thresholds, telemetry backend, alerting and storage settings loaded from
//! TOML, then overridden by command-line flags.
//!
//! ## Loading Order
//!
//! 1. `FERMENTWATCH_CONFIG` environment variable (path to TOML file)
//! 2. `fermentwatch.toml` in the current working directory
//! 3. Built-in defaults
//!
//! The loaded config is passed explicitly to the components that need it;
//! there is no global instance.

mod monitor_config;
pub mod defaults;
pub mod validation;

pub use monitor_config::*;
