//! InfluxDB 1.x telemetry source
//!
//! Vessel telemetry is published over MQTT and stored by telegraf as one
//! measurement with a `topic` tag: `<prefix>/<vessel>/temperature`,
//! `<prefix>/<vessel>/setpoint` and `<prefix>/<vessel>/cooling`.

use super::{FetchError, TelemetrySource};
use crate::config::InfluxConfig;
use crate::types::EvaluationTime;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Default InfluxDB HTTP port, used when the server address has none.
const DEFAULT_PORT: u16 = 8086;

/// HTTP client for the InfluxDB `/query` endpoint.
#[derive(Clone)]
pub struct InfluxClient {
    http: reqwest::Client,
    base_url: String,
    database: String,
    retention_policy: String,
    measurement: String,
    topic_prefix: String,
    username: Option<String>,
    password: Option<String>,
}

impl InfluxClient {
    pub fn new(config: &InfluxConfig) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: normalize_server_url(&config.url),
            database: config.database.clone(),
            retention_policy: config.retention_policy.clone(),
            measurement: config.measurement.clone(),
            topic_prefix: config.topic_prefix.trim_end_matches('/').to_string(),
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn topic(&self, vessel: &str, series: &str) -> String {
        escape_literal(&format!("{}/{}/{}", self.topic_prefix, vessel, series))
    }

    fn from_clause(&self) -> String {
        format!(
            "\"{}\".\"{}\"",
            escape_identifier(&self.retention_policy),
            escape_identifier(&self.measurement)
        )
    }

    /// Bucketed mean temperature over a trailing window.
    pub fn temperature_query(
        &self,
        vessel: &str,
        at: EvaluationTime,
        window_minutes: u32,
        group_minutes: u32,
    ) -> String {
        let at = at.to_influxql();
        format!(
            "SELECT mean(\"value\") FROM {} WHERE (\"topic\" = '{}') \
             AND time >= {at} - {window_minutes}m AND time <= {at} \
             GROUP BY time({group_minutes}m) fill(previous)",
            self.from_clause(),
            self.topic(vessel, "temperature"),
        )
    }

    /// Last value of a scalar series at or before `at`.
    pub fn last_value_query(&self, vessel: &str, series: &str, at: EvaluationTime) -> String {
        format!(
            "SELECT last(\"value\") FROM {} WHERE (\"topic\" = '{}') AND time <= {}",
            self.from_clause(),
            self.topic(vessel, series),
            at.to_influxql(),
        )
    }

    async fn query(&self, q: &str) -> Result<Vec<Option<f64>>, FetchError> {
        debug!(query = %q, "InfluxQL");

        let mut req = self
            .http
            .get(format!("{}/query", self.base_url))
            .query(&[("db", self.database.as_str()), ("q", q)]);
        if let (Some(u), Some(p)) = (&self.username, &self.password) {
            req = req.query(&[("u", u.as_str()), ("p", p.as_str())]);
        }

        let resp = req.send().await?;
        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            // InfluxDB reports bad queries as 4xx with a JSON error body
            if let Ok(parsed) = serde_json::from_str::<QueryResponse>(&body) {
                if let Some(err) = parsed.error {
                    return Err(FetchError::Query(err));
                }
            }
            return Err(FetchError::ServerError(status));
        }

        parse_values(&body)
    }

    async fn last_value(
        &self,
        vessel: &str,
        series: &'static str,
        at: EvaluationTime,
    ) -> Result<f64, FetchError> {
        let values = self.query(&self.last_value_query(vessel, series, at)).await?;
        values
            .into_iter()
            .flatten()
            .last()
            .ok_or_else(|| FetchError::MissingSeries {
                vessel: vessel.to_string(),
                series,
            })
    }
}

#[async_trait]
impl TelemetrySource for InfluxClient {
    async fn temperatures(
        &self,
        vessel: &str,
        at: EvaluationTime,
        window_minutes: u32,
        group_minutes: u32,
    ) -> Result<Vec<f64>, FetchError> {
        let q = self.temperature_query(vessel, at, window_minutes, group_minutes);
        Ok(self.query(&q).await?.into_iter().flatten().collect())
    }

    async fn setpoint(&self, vessel: &str, at: EvaluationTime) -> Result<f64, FetchError> {
        self.last_value(vessel, "setpoint", at).await
    }

    async fn cooling(&self, vessel: &str, at: EvaluationTime) -> Result<bool, FetchError> {
        Ok(self.last_value(vessel, "cooling", at).await? != 0.0)
    }

    fn source_name(&self) -> &str {
        "InfluxDB"
    }
}

// ============================================================================
// Response parsing
// ============================================================================

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    results: Vec<StatementResult>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatementResult {
    #[serde(default)]
    series: Vec<Series>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Series {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

/// Extract the value column (last column of each row) from a `/query` body.
///
/// Rows whose value is null come back as `None`; a statement with no series
/// yields an empty list.
pub(crate) fn parse_values(body: &str) -> Result<Vec<Option<f64>>, FetchError> {
    let response: QueryResponse =
        serde_json::from_str(body).map_err(|e| FetchError::MalformedResponse(e.to_string()))?;

    if let Some(err) = response.error {
        return Err(FetchError::Query(err));
    }

    let Some(result) = response.results.into_iter().next() else {
        return Err(FetchError::MalformedResponse("no statement results".to_string()));
    };
    if let Some(err) = result.error {
        return Err(FetchError::Query(err));
    }

    let Some(series) = result.series.into_iter().next() else {
        return Ok(Vec::new());
    };

    Ok(series
        .values
        .iter()
        .map(|row| row.last().and_then(value_as_f64))
        .collect())
}

fn value_as_f64(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        other => other.as_f64(),
    }
}

/// Turn a bare host (`influx.local`, `influx.local:8086`) into a base URL.
pub fn normalize_server_url(server: &str) -> String {
    let server = server.trim().trim_end_matches('/');
    if server.contains("://") {
        return server.to_string();
    }
    if server.contains(':') {
        format!("http://{server}")
    } else {
        format!("http://{server}:{DEFAULT_PORT}")
    }
}

fn escape_literal(s: &str) -> String {
    s.replace('\\', "\\\\").replace('\'', "\\'")
}

fn escape_identifier(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}
