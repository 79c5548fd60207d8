//! Pipeline Regression Tests
//!
//! Drives whole runs through the public API with a scripted telemetry source,
//! a recording SMS channel and a sled store in a temporary directory. Each
//! run builds a fresh orchestrator and reopens the store, the way separate
//! scheduled invocations would.

use async_trait::async_trait;
use fermentwatch::acquisition::{FetchError, TelemetrySource, WindowPolicy};
use fermentwatch::detection::{CeilingRule, WindowAnalyzer};
use fermentwatch::notify::{AlertDispatcher, ChannelError, NotifyChannel};
use fermentwatch::pipeline::{RunOrchestrator, RunSummary, VesselOutcome};
use fermentwatch::storage::{SledVesselStateStore, VesselStateStore, VesselStateTracker};
use fermentwatch::types::{AnomalyKind, EvaluationTime, VesselStatus};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

// ============================================================================
// Test doubles
// ============================================================================

/// Serves fixed readings; temperatures only appear once the requested
/// window is at least `min_window_minutes` wide.
#[derive(Default)]
struct ScriptedSource {
    readings: HashMap<String, (Vec<f64>, f64, bool)>,
    min_window_minutes: u32,
    requested_windows: Mutex<Vec<u32>>,
}

impl ScriptedSource {
    fn with(mut self, vessel: &str, temps: &[f64], setpoint: f64, cooling: bool) -> Self {
        self.readings
            .insert(vessel.to_string(), (temps.to_vec(), setpoint, cooling));
        self
    }
}

#[async_trait]
impl TelemetrySource for ScriptedSource {
    async fn temperatures(
        &self,
        vessel: &str,
        _at: EvaluationTime,
        window_minutes: u32,
        _group_minutes: u32,
    ) -> Result<Vec<f64>, FetchError> {
        self.requested_windows.lock().unwrap().push(window_minutes);
        if window_minutes < self.min_window_minutes {
            return Ok(Vec::new());
        }
        Ok(self
            .readings
            .get(vessel)
            .map(|(t, _, _)| t.clone())
            .unwrap_or_default())
    }

    async fn setpoint(&self, vessel: &str, _at: EvaluationTime) -> Result<f64, FetchError> {
        self.readings
            .get(vessel)
            .map(|(_, sp, _)| *sp)
            .ok_or_else(|| FetchError::MissingSeries {
                vessel: vessel.to_string(),
                series: "setpoint",
            })
    }

    async fn cooling(&self, vessel: &str, _at: EvaluationTime) -> Result<bool, FetchError> {
        Ok(self.readings.get(vessel).is_some_and(|(_, _, c)| *c))
    }

    fn source_name(&self) -> &str {
        "scripted"
    }
}

#[derive(Default)]
struct Outbox {
    messages: Mutex<Vec<String>>,
}

#[async_trait]
impl NotifyChannel for Outbox {
    fn name(&self) -> &'static str {
        "outbox"
    }

    fn recipient(&self) -> &str {
        "brewer"
    }

    async fn send(&self, message: &str) -> Result<(), ChannelError> {
        self.messages.lock().unwrap().push(message.to_string());
        Ok(())
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn policy() -> WindowPolicy {
    WindowPolicy {
        window_points: 6,
        group_minutes: 5,
        max_retries: 2,
    }
}

async fn run_once(
    db: &Path,
    source: Arc<ScriptedSource>,
    outbox: Arc<Outbox>,
    vessels: &[&str],
    notify_on_no_data: bool,
) -> RunSummary {
    let store = SledVesselStateStore::open(db).unwrap();
    let orchestrator = RunOrchestrator::new(
        source,
        WindowAnalyzer::new(0.5, CeilingRule::new(Some(25.0))),
        policy(),
        VesselStateTracker::new(Arc::new(store)),
        AlertDispatcher::new(vec![outbox], false, notify_on_no_data),
    );
    let vessels: Vec<String> = vessels.iter().map(ToString::to_string).collect();
    orchestrator.run(&vessels, EvaluationTime::Now).await
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn dedup_survives_across_runs() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("vessel_state.db");
    let outbox = Arc::new(Outbox::default());
    let warming = Arc::new(ScriptedSource::default().with("f1", &[18.0, 18.5, 18.7], 12.0, true));

    let first = run_once(&db, warming.clone(), outbox.clone(), &["f1"], false).await;
    assert_eq!(first.notified(), 1);

    let second = run_once(&db, warming, outbox.clone(), &["f1"], false).await;
    assert_eq!(second.anomalies(), 1);
    assert_eq!(second.notified(), 0, "same anomaly must not be re-sent");

    let messages = outbox.messages.lock().unwrap();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("f1"));
    assert!(messages[0].contains("18.0, 18.5, 18.7"));
}

#[tokio::test]
async fn kind_change_notifies_again() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("vessel_state.db");
    let outbox = Arc::new(Outbox::default());

    let rising = Arc::new(ScriptedSource::default().with("f1", &[18.0, 18.5, 18.7], 12.0, true));
    run_once(&db, rising, outbox.clone(), &["f1"], false).await;

    // Above the ceiling but converging: a different kind, so a new alert
    let hot = Arc::new(ScriptedSource::default().with("f1", &[27.0, 26.0, 25.4], 20.0, true));
    let summary = run_once(&db, hot, outbox.clone(), &["f1"], false).await;
    assert!(matches!(
        summary.outcome("f1"),
        Some(VesselOutcome::Anomaly {
            kind: AnomalyKind::TemperatureExceedsMax,
            notified: true,
            ..
        })
    ));
    assert_eq!(outbox.messages.lock().unwrap().len(), 2);

    let store = SledVesselStateStore::open(&db).unwrap();
    let record = store.load("f1").unwrap().unwrap();
    assert_eq!(record.status, VesselStatus::TemperatureExceedsMax);
}

#[tokio::test]
async fn widening_retry_finds_sparse_data() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("vessel_state.db");
    let outbox = Arc::new(Outbox::default());
    let source = Arc::new(ScriptedSource {
        min_window_minutes: 100,
        ..ScriptedSource::default()
    }
    .with("f2", &[20.0, 19.0, 18.1], 18.0, true));

    let summary = run_once(&db, source.clone(), outbox, &["f2"], false).await;
    assert_eq!(summary.clear(), 1);
    // 6 points x 5 minutes, then doubled twice
    assert_eq!(*source.requested_windows.lock().unwrap(), vec![30, 60, 120]);
}

#[tokio::test]
async fn no_data_after_retries_is_sent_only_when_enabled() {
    let dir = tempfile::tempdir().unwrap();
    let outbox = Arc::new(Outbox::default());

    let silent = Arc::new(ScriptedSource::default());
    let quiet = run_once(&dir.path().join("a.db"), silent.clone(), outbox.clone(), &["f3"], false).await;
    assert_eq!(quiet.anomalies(), 1);
    assert_eq!(quiet.messages_sent(), 0);
    assert_eq!(silent.requested_windows.lock().unwrap().len(), 3);

    let loud = run_once(
        &dir.path().join("b.db"),
        Arc::new(ScriptedSource::default()),
        outbox.clone(),
        &["f3"],
        true,
    )
    .await;
    assert_eq!(loud.messages_sent(), 1);
    assert_eq!(
        outbox.messages.lock().unwrap()[0],
        "No temperature is being recorded for vessel f3."
    );
}

#[tokio::test]
async fn one_failing_vessel_does_not_stop_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("vessel_state.db");
    let outbox = Arc::new(Outbox::default());

    // "f9" has temperatures but no setpoint series
    let source = Arc::new(ScriptedSource::default().with("f1", &[16.0, 15.0, 14.2], 14.0, true));

    struct NoSetpoint(Arc<ScriptedSource>);

    #[async_trait]
    impl TelemetrySource for NoSetpoint {
        async fn temperatures(
            &self,
            vessel: &str,
            at: EvaluationTime,
            window_minutes: u32,
            group_minutes: u32,
        ) -> Result<Vec<f64>, FetchError> {
            if vessel == "f9" {
                return Ok(vec![20.0, 21.0]);
            }
            self.0.temperatures(vessel, at, window_minutes, group_minutes).await
        }

        async fn setpoint(&self, vessel: &str, at: EvaluationTime) -> Result<f64, FetchError> {
            self.0.setpoint(vessel, at).await
        }

        async fn cooling(&self, vessel: &str, at: EvaluationTime) -> Result<bool, FetchError> {
            self.0.cooling(vessel, at).await
        }

        fn source_name(&self) -> &str {
            "no-setpoint"
        }
    }

    let store = SledVesselStateStore::open(&db).unwrap();
    let orchestrator = RunOrchestrator::new(
        Arc::new(NoSetpoint(source)),
        WindowAnalyzer::new(0.5, CeilingRule::default()),
        policy(),
        VesselStateTracker::new(Arc::new(store.clone())),
        AlertDispatcher::new(vec![outbox], false, false),
    );
    let summary = orchestrator
        .run(&["f9".to_string(), "f1".to_string()], EvaluationTime::Now)
        .await;

    assert!(matches!(summary.outcome("f9"), Some(VesselOutcome::Failed(_))));
    assert_eq!(summary.outcome("f1"), Some(&VesselOutcome::Clear));
    assert!(store.load("f9").unwrap().is_none());
    assert_eq!(store.list_all().unwrap().len(), 1);
}
