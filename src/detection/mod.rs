//! Anomaly detection over a temperature window
//!
//! - [`convergence`]: direction-aware drift check against the setpoint
//! - [`ceiling`]: optional absolute-maximum rule
//!
//! [`WindowAnalyzer`] runs both as separate passes and reports exactly one
//! anomaly per evaluation: convergence first (rising before falling), then the
//! ceiling. The ceiling outcome never prevents the convergence check.

pub mod ceiling;
pub mod convergence;

pub use ceiling::CeilingRule;
pub use convergence::{evaluate, WindowDeltas};

use crate::types::{Anomaly, AnomalyContext, TemperatureWindow};
use tracing::debug;

/// Analysis thresholds shared by every vessel in a run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowAnalyzer {
    acceptable_delta: f64,
    ceiling: CeilingRule,
}

impl WindowAnalyzer {
    pub const fn new(acceptable_delta: f64, ceiling: CeilingRule) -> Self {
        Self {
            acceptable_delta,
            ceiling,
        }
    }

    pub const fn acceptable_delta(&self) -> f64 {
        self.acceptable_delta
    }

    pub const fn ceiling(&self) -> CeilingRule {
        self.ceiling
    }

    /// Classify one vessel's window.
    pub fn analyze(
        &self,
        vessel: &str,
        window: &TemperatureWindow,
        is_cooling: bool,
        setpoint: f64,
    ) -> Result<(), Anomaly> {
        let deltas = WindowDeltas::compute(window, setpoint);
        debug!(
            vessel = %vessel,
            inner_delta = deltas.inner,
            absolute_delta = deltas.absolute,
            is_cooling,
            setpoint,
            "Window deltas"
        );

        let outcome = evaluate(window, is_cooling, setpoint, self.acceptable_delta)
            .and_then(|()| self.ceiling.check(window));

        outcome.map_err(|kind| Anomaly {
            kind,
            context: AnomalyContext {
                vessel: vessel.to_string(),
                samples: window.samples().to_vec(),
                setpoint: Some(setpoint),
                max_temperature: self.ceiling.max_temperature(),
            },
        })
    }
}
