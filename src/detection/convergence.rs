//! Convergence Analyzer
//!
//! Decides whether a vessel is drifting away from its setpoint. Two deltas gate
//! every alert:
//!
//! - **inner delta** (`first - last`): net movement across the window. Positive
//!   means the temperature went down, negative means it went up.
//! - **absolute delta** (`last - setpoint`): how far the latest reading is from
//!   the target.
//!
//! Both magnitudes must exceed the acceptable delta. A short uptick near the
//! setpoint, or a real but tiny divergence, therefore never raises an alert.
//!
//! The rising branch additionally requires the cooling actuator to be active;
//! the falling branch has no actuator gate. That asymmetry is kept as observed
//! in production and should be reviewed before it is changed.

use crate::types::{AnomalyKind, TemperatureWindow};

/// Signed deltas computed from one window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowDeltas {
    /// `first - last`
    pub inner: f64,
    /// `last - setpoint`
    pub absolute: f64,
}

impl WindowDeltas {
    pub fn compute(window: &TemperatureWindow, setpoint: f64) -> Self {
        let first = window.first();
        let last = window.last();
        Self {
            inner: first - last,
            absolute: last - setpoint,
        }
    }

    /// Net decrease over the window.
    pub fn is_decreasing(&self) -> bool {
        self.inner > 0.0
    }

    /// Net increase over the window.
    pub fn is_increasing(&self) -> bool {
        self.inner < 0.0
    }

    /// True when both the drift and the distance to the setpoint exceed `acceptable_delta`.
    pub fn exceeds(&self, acceptable_delta: f64) -> bool {
        self.inner.abs() > acceptable_delta && self.absolute.abs() > acceptable_delta
    }
}

/// Evaluate one window against its setpoint.
///
/// Returns `Ok(())` when the vessel is converging (or the drift is within
/// tolerance), otherwise the anomaly kind. Rising is checked before falling.
/// A single-sample window always succeeds since its inner delta is zero.
pub fn evaluate(
    window: &TemperatureWindow,
    is_cooling: bool,
    setpoint: f64,
    acceptable_delta: f64,
) -> Result<(), AnomalyKind> {
    let last = window.last();
    let deltas = WindowDeltas::compute(window, setpoint);

    let should_decrease = setpoint < last;
    let should_increase = setpoint > last;
    let significant = deltas.exceeds(acceptable_delta);

    if should_decrease && deltas.is_increasing() && is_cooling && significant {
        return Err(AnomalyKind::TemperatureRising);
    }

    if should_increase && deltas.is_decreasing() && significant {
        return Err(AnomalyKind::TemperatureFalling);
    }

    Ok(())
}
