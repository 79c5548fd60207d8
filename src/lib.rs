//! fermentwatch: fermentation vessel temperature monitoring
//!
//! Periodically checks that each vessel's temperature is converging toward
//! its setpoint and sends an SMS when it is not.
//!
//! ## Architecture
//!
//! - **Acquisition**: trailing temperature window, setpoint and cooling state
//!   from InfluxDB, widening the window when it comes back empty
//! - **Detection**: pure convergence analysis plus an optional hard ceiling
//! - **Storage**: per-vessel last status (sled) for alert deduplication
//! - **Notify**: message rendering and Free Mobile SMS delivery
//! - **Pipeline**: the sequential run over all vessels

pub mod acquisition;
pub mod config;
pub mod detection;
pub mod notify;
pub mod pipeline;
pub mod storage;
pub mod types;

pub use config::MonitorConfig;

pub use types::{Anomaly, AnomalyContext, AnomalyKind, EvaluationTime, TemperatureWindow, VesselStatus};

pub use acquisition::{fetch_window, FetchError, InfluxClient, TelemetrySource, WindowPolicy};
pub use detection::{CeilingRule, WindowAnalyzer};
pub use notify::{AlertDispatcher, ChannelError, DispatchOutcome, NotifyChannel};
pub use pipeline::{RunOrchestrator, RunSummary, VesselOutcome};
pub use storage::{StorageError, VesselStateStore, VesselStateTracker};
