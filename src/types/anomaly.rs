//! Anomaly taxonomy and per-vessel status

use serde::{Deserialize, Serialize};

/// The kind of condition detected for a vessel during one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnomalyKind {
    /// No temperature samples were returned, even after widening the window
    NoData,
    /// Temperature climbs while the vessel is cooling towards a lower setpoint
    TemperatureRising,
    /// Temperature drops while the setpoint is above the current reading
    TemperatureFalling,
    /// A sample in the window is above the configured hard ceiling
    TemperatureExceedsMax,
}

impl AnomalyKind {
    /// Stable kebab-case tag, also used as the persisted representation.
    pub const fn tag(self) -> &'static str {
        match self {
            AnomalyKind::NoData => "no-data",
            AnomalyKind::TemperatureRising => "temperature-rising",
            AnomalyKind::TemperatureFalling => "temperature-falling",
            AnomalyKind::TemperatureExceedsMax => "temperature-exceeds-max",
        }
    }
}

impl std::fmt::Display for AnomalyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

/// Last-known alert state of a vessel.
///
/// `Ok` after a clean evaluation, otherwise the kind of the last anomaly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VesselStatus {
    #[default]
    Ok,
    NoData,
    TemperatureRising,
    TemperatureFalling,
    TemperatureExceedsMax,
}

impl VesselStatus {
    pub const fn is_ok(self) -> bool {
        matches!(self, VesselStatus::Ok)
    }

    /// The anomaly kind this status represents, if any.
    pub const fn anomaly_kind(self) -> Option<AnomalyKind> {
        match self {
            VesselStatus::Ok => None,
            VesselStatus::NoData => Some(AnomalyKind::NoData),
            VesselStatus::TemperatureRising => Some(AnomalyKind::TemperatureRising),
            VesselStatus::TemperatureFalling => Some(AnomalyKind::TemperatureFalling),
            VesselStatus::TemperatureExceedsMax => Some(AnomalyKind::TemperatureExceedsMax),
        }
    }
}

impl From<AnomalyKind> for VesselStatus {
    fn from(kind: AnomalyKind) -> Self {
        match kind {
            AnomalyKind::NoData => VesselStatus::NoData,
            AnomalyKind::TemperatureRising => VesselStatus::TemperatureRising,
            AnomalyKind::TemperatureFalling => VesselStatus::TemperatureFalling,
            AnomalyKind::TemperatureExceedsMax => VesselStatus::TemperatureExceedsMax,
        }
    }
}

impl std::fmt::Display for VesselStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.anomaly_kind() {
            Some(kind) => f.write_str(kind.tag()),
            None => f.write_str("ok"),
        }
    }
}

/// Everything needed to render a human message for an anomaly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyContext {
    /// Vessel short code (e.g. "f1")
    pub vessel: String,
    /// The window that was evaluated, oldest first. Empty for `NoData`.
    pub samples: Vec<f64>,
    /// Target temperature at evaluation time, when it was known
    pub setpoint: Option<f64>,
    /// Hard ceiling in force, for `TemperatureExceedsMax`
    pub max_temperature: Option<f64>,
}

/// A classified anomaly plus its rendering context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anomaly {
    pub kind: AnomalyKind,
    pub context: AnomalyContext,
}

impl Anomaly {
    /// Anomaly raised when the fetcher comes back empty after all retries.
    pub fn no_data(vessel: impl Into<String>) -> Self {
        Self {
            kind: AnomalyKind::NoData,
            context: AnomalyContext {
                vessel: vessel.into(),
                samples: Vec::new(),
                setpoint: None,
                max_temperature: None,
            },
        }
    }

    pub fn vessel(&self) -> &str {
        &self.context.vessel
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trips_through_kind() {
        for kind in [
            AnomalyKind::NoData,
            AnomalyKind::TemperatureRising,
            AnomalyKind::TemperatureFalling,
            AnomalyKind::TemperatureExceedsMax,
        ] {
            assert_eq!(VesselStatus::from(kind).anomaly_kind(), Some(kind));
        }
        assert_eq!(VesselStatus::Ok.anomaly_kind(), None);
    }

    #[test]
    fn test_serialized_tags_are_kebab_case() {
        let json = serde_json::to_string(&VesselStatus::TemperatureExceedsMax).unwrap();
        assert_eq!(json, "\"temperature-exceeds-max\"");
        let json = serde_json::to_string(&VesselStatus::Ok).unwrap();
        assert_eq!(json, "\"ok\"");
        assert_eq!(AnomalyKind::NoData.to_string(), "no-data");
    }

    #[test]
    fn test_no_data_context_is_empty() {
        let anomaly = Anomaly::no_data("f2");
        assert_eq!(anomaly.kind, AnomalyKind::NoData);
        assert_eq!(anomaly.vessel(), "f2");
        assert!(anomaly.context.samples.is_empty());
        assert!(anomaly.context.setpoint.is_none());
    }
}
