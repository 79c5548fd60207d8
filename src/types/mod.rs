//! Shared data structures for fermentation vessel monitoring
//!
//! - `TemperatureWindow`, `EvaluationTime`: inputs fetched fresh for each evaluation
//! - `AnomalyKind`, `Anomaly`: the classified outcome of one evaluation
//! - `VesselStatus`: the per-vessel state persisted between runs

mod anomaly;
mod telemetry;

pub use anomaly::*;
pub use telemetry::*;
