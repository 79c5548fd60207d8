//! Hard temperature ceiling
//!
//! Independent of direction and setpoint: fires when any sample in the window
//! is strictly above the configured maximum. Disabled when no maximum is set.

use crate::types::{AnomalyKind, TemperatureWindow};

/// Separately toggleable absolute-maximum rule.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CeilingRule {
    max_temperature: Option<f64>,
}

impl CeilingRule {
    pub const fn new(max_temperature: Option<f64>) -> Self {
        Self { max_temperature }
    }

    pub const fn is_enabled(&self) -> bool {
        self.max_temperature.is_some()
    }

    pub const fn max_temperature(&self) -> Option<f64> {
        self.max_temperature
    }

    pub fn check(&self, window: &TemperatureWindow) -> Result<(), AnomalyKind> {
        match self.max_temperature {
            Some(max) if window.samples().iter().any(|&t| t > max) => {
                Err(AnomalyKind::TemperatureExceedsMax)
            }
            _ => Ok(()),
        }
    }
}
