//! Human-readable alert messages

use crate::types::{Anomaly, AnomalyKind};

/// Render the SMS text for an anomaly.
pub fn render_message(anomaly: &Anomaly) -> String {
    let ctx = &anomaly.context;
    let vessel = &ctx.vessel;
    let samples = format_samples(&ctx.samples);

    match anomaly.kind {
        AnomalyKind::TemperatureRising => match ctx.setpoint {
            Some(sp) => format!(
                "Warning: vessel {vessel} is warming up ({samples}) while it should be cooling down to {}!",
                format_temperature(sp)
            ),
            None => format!(
                "Warning: vessel {vessel} is warming up ({samples}) while it should be cooling down!"
            ),
        },
        AnomalyKind::TemperatureFalling => match ctx.setpoint {
            Some(sp) => format!(
                "Warning: vessel {vessel} is cooling down ({samples}) while it should be warming up to {}.",
                format_temperature(sp)
            ),
            None => format!(
                "Warning: vessel {vessel} is cooling down ({samples}) while it should be warming up."
            ),
        },
        AnomalyKind::NoData => format!("No temperature is being recorded for vessel {vessel}."),
        AnomalyKind::TemperatureExceedsMax => match ctx.max_temperature {
            Some(max) => format!(
                "Warning: vessel {vessel} is above the maximum temperature of {} ({samples})!",
                format_temperature(max)
            ),
            None => format!("Warning: vessel {vessel} is above its maximum temperature ({samples})!"),
        },
    }
}

/// Comma-separated samples rounded to two decimals, whole degrees as `18.0`.
pub fn format_samples(samples: &[f64]) -> String {
    samples
        .iter()
        .map(|&t| format_temperature(t))
        .collect::<Vec<_>>()
        .join(", ")
}

fn format_temperature(t: f64) -> String {
    // Adding 0.0 turns -0.0 into 0.0
    let rounded = (t * 100.0).round() / 100.0 + 0.0;
    if rounded.fract() == 0.0 {
        format!("{rounded:.1}")
    } else {
        format!("{rounded}")
    }
}
