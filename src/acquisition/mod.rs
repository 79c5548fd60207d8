//! Telemetry acquisition
//!
//! Provides a unified trait for reading vessel telemetry and the bounded
//! widening-retry loop that turns it into a [`TemperatureWindow`].
//!
//! - [`TelemetrySource`]: temperature buckets, setpoint and cooling state
//! - [`InfluxClient`]: InfluxDB 1.x implementation over HTTP/InfluxQL
//! - [`fetch_window`]: doubles the trailing window on empty results

pub mod influx;

pub use influx::{normalize_server_url, InfluxClient};

use crate::types::{EvaluationTime, TemperatureWindow};
use async_trait::async_trait;
use tracing::{debug, warn};

/// Errors raised while talking to the telemetry backend.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Server returned status {0}")]
    ServerError(reqwest::StatusCode),
    #[error("Query error: {0}")]
    Query(String),
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
    #[error("No {series} value recorded for vessel {vessel}")]
    MissingSeries { vessel: String, series: &'static str },
}

/// Trait abstracting where vessel telemetry comes from.
#[async_trait]
pub trait TelemetrySource: Send + Sync {
    /// Mean temperature per `group_minutes` bucket over the `window_minutes`
    /// ending at `at`, oldest first, empty buckets dropped.
    async fn temperatures(
        &self,
        vessel: &str,
        at: EvaluationTime,
        window_minutes: u32,
        group_minutes: u32,
    ) -> Result<Vec<f64>, FetchError>;

    /// Most recent setpoint at or before `at`.
    async fn setpoint(&self, vessel: &str, at: EvaluationTime) -> Result<f64, FetchError>;

    /// Whether the cooling actuator was last reported active at or before `at`.
    async fn cooling(&self, vessel: &str, at: EvaluationTime) -> Result<bool, FetchError>;

    /// Human-readable name for logging
    fn source_name(&self) -> &str;
}

/// Shape of the trailing window and its retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowPolicy {
    /// Number of most recent buckets handed to the analyzer
    pub window_points: usize,
    /// Bucket width in minutes
    pub group_minutes: u32,
    /// Extra attempts after the first empty result, each doubling the window
    pub max_retries: u32,
}

impl WindowPolicy {
    /// Window covering exactly `window_points` buckets.
    pub fn initial_window_minutes(&self) -> u32 {
        let points = u32::try_from(self.window_points).unwrap_or(u32::MAX);
        points.max(1).saturating_mul(self.group_minutes.max(1))
    }
}

/// Fetch the temperature window for a vessel.
///
/// Returns `Ok(None)` when every attempt came back empty; the caller turns
/// that into a `NoData` anomaly. Transport errors abort immediately.
pub async fn fetch_window<S: TelemetrySource + ?Sized>(
    source: &S,
    vessel: &str,
    at: EvaluationTime,
    policy: &WindowPolicy,
) -> Result<Option<TemperatureWindow>, FetchError> {
    let mut window_minutes = policy.initial_window_minutes();
    let attempts = policy.max_retries + 1;

    for attempt in 1..=attempts {
        let samples = source
            .temperatures(vessel, at, window_minutes, policy.group_minutes)
            .await?;

        if let Some(window) = TemperatureWindow::new(samples) {
            debug!(vessel = %vessel, attempt, window_minutes, points = window.len(), "Temperature window fetched");
            return Ok(Some(window.tail(policy.window_points)));
        }

        if attempt < attempts {
            let widened = window_minutes.saturating_mul(2);
            warn!(
                vessel = %vessel,
                attempt,
                window_minutes,
                next_window_minutes = widened,
                "No temperature data, widening window"
            );
            window_minutes = widened;
        }
    }

    Ok(None)
}
