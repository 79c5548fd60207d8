//! Run orchestration
//!
//! ```text
//! for each vessel, sequentially:
//!   fetch window   (empty after retries -> no-data anomaly)
//!   fetch cooling + setpoint
//!   analyze        (convergence, then ceiling)
//!   record state   (dedup: notify only on a change into an anomaly)
//!   dispatch       (only when the tracker says so)
//! ```
//!
//! A failing vessel is reported in the [`RunSummary`] and never stops the
//! remaining ones.

mod orchestrator;

pub use orchestrator::{RunOrchestrator, RunSummary, VesselOutcome, VesselReport};
