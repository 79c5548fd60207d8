//! Telemetry inputs for a single evaluation

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Chronological, non-empty window of averaged temperature samples (°C).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct TemperatureWindow {
    samples: Vec<f64>,
}

impl TemperatureWindow {
    /// Build a window; returns `None` for an empty sequence.
    pub fn new(samples: Vec<f64>) -> Option<Self> {
        if samples.is_empty() {
            None
        } else {
            Some(Self { samples })
        }
    }

    /// Keep only the most recent `points` samples (at least one is always kept).
    #[must_use]
    pub fn tail(mut self, points: usize) -> Self {
        let keep = points.max(1);
        if self.samples.len() > keep {
            self.samples.drain(..self.samples.len() - keep);
        }
        self
    }

    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    /// Oldest sample in the window.
    pub fn first(&self) -> f64 {
        self.samples[0]
    }

    /// Most recent sample in the window.
    pub fn last(&self) -> f64 {
        self.samples[self.samples.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Always false; present for API symmetry with slices.
    pub fn is_empty(&self) -> bool {
        false
    }
}

impl TryFrom<Vec<f64>> for TemperatureWindow {
    type Error = &'static str;

    fn try_from(samples: Vec<f64>) -> Result<Self, Self::Error> {
        Self::new(samples).ok_or("temperature window must not be empty")
    }
}

impl From<TemperatureWindow> for Vec<f64> {
    fn from(window: TemperatureWindow) -> Self {
        window.samples
    }
}

/// The instant an evaluation is anchored to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EvaluationTime {
    /// Live evaluation against the database clock
    #[default]
    Now,
    /// Replay of a past instant
    At(DateTime<Utc>),
}

impl EvaluationTime {
    /// InfluxQL time expression (`now()` or a quoted RFC 3339 literal).
    pub fn to_influxql(&self) -> String {
        match self {
            EvaluationTime::Now => "now()".to_string(),
            EvaluationTime::At(t) => format!("'{}'", t.to_rfc3339_opts(SecondsFormat::Secs, true)),
        }
    }
}

impl std::fmt::Display for EvaluationTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EvaluationTime::Now => f.write_str("now"),
            EvaluationTime::At(t) => write!(f, "{}", t.to_rfc3339_opts(SecondsFormat::Secs, true)),
        }
    }
}

/// Error returned when an evaluation date cannot be parsed.
#[derive(Debug, thiserror::Error)]
#[error("invalid evaluation date '{0}': expected 'now', YYYY-MM-DD or an RFC 3339 timestamp")]
pub struct EvaluationTimeParseError(String);

impl FromStr for EvaluationTime {
    type Err = EvaluationTimeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("now") {
            return Ok(EvaluationTime::Now);
        }
        if let Ok(t) = DateTime::parse_from_rfc3339(s) {
            return Ok(EvaluationTime::At(t.with_timezone(&Utc)));
        }
        if let Some(t) = NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
        {
            return Ok(EvaluationTime::At(t.and_utc()));
        }
        Err(EvaluationTimeParseError(s.to_string()))
    }
}
