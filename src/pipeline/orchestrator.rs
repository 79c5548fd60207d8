//! Sequential per-vessel evaluation loop.

use crate::acquisition::{fetch_window, FetchError, TelemetrySource, WindowPolicy};
use crate::detection::WindowAnalyzer;
use crate::notify::{AlertDispatcher, DispatchOutcome};
use crate::storage::VesselStateTracker;
use crate::types::{Anomaly, AnomalyKind, EvaluationTime, VesselStatus};
use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Result of evaluating one vessel.
#[derive(Debug, Clone, PartialEq)]
pub enum VesselOutcome {
    /// Window converging (or holding) toward the setpoint
    Clear,
    /// An anomaly was detected
    Anomaly {
        kind: AnomalyKind,
        /// Whether the tracker asked for a notification
        notified: bool,
        /// Dispatcher result, present only when `notified`
        dispatch: Option<DispatchOutcome>,
    },
    /// Telemetry could not be read; state left untouched
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct VesselReport {
    pub vessel: String,
    pub outcome: VesselOutcome,
}

/// Everything that happened during one run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub reports: Vec<VesselReport>,
}

impl RunSummary {
    pub fn clear(&self) -> usize {
        self.count(|o| matches!(o, VesselOutcome::Clear))
    }

    pub fn anomalies(&self) -> usize {
        self.count(|o| matches!(o, VesselOutcome::Anomaly { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, VesselOutcome::Failed(_)))
    }

    /// Anomalies the tracker let through to the dispatcher.
    pub fn notified(&self) -> usize {
        self.count(|o| matches!(o, VesselOutcome::Anomaly { notified: true, .. }))
    }

    /// Notified anomalies that no recipient received.
    pub fn undelivered(&self) -> usize {
        self.count(|o| match o {
            VesselOutcome::Anomaly {
                dispatch: Some(d @ DispatchOutcome::Delivered { .. }),
                ..
            } => !d.reached_anyone(),
            _ => false,
        })
    }

    /// Individual messages accepted by a channel.
    pub fn messages_sent(&self) -> usize {
        self.reports
            .iter()
            .map(|r| match r.outcome {
                VesselOutcome::Anomaly {
                    dispatch: Some(DispatchOutcome::Delivered { sent, .. }),
                    ..
                } => sent,
                _ => 0,
            })
            .sum()
    }

    pub fn outcome(&self, vessel: &str) -> Option<&VesselOutcome> {
        self.reports
            .iter()
            .find(|r| r.vessel == vessel)
            .map(|r| &r.outcome)
    }

    fn count(&self, pred: impl Fn(&VesselOutcome) -> bool) -> usize {
        self.reports.iter().filter(|r| pred(&r.outcome)).count()
    }
}

impl std::fmt::Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Run: {} vessels, {} clear, {} anomalous ({} notified), {} failed, {} SMS sent",
            self.reports.len(),
            self.clear(),
            self.anomalies(),
            self.notified(),
            self.failed(),
            self.messages_sent()
        )
    }
}

/// Wires the fetcher, analyzer, state tracker and dispatcher together.
pub struct RunOrchestrator {
    source: Arc<dyn TelemetrySource>,
    analyzer: WindowAnalyzer,
    policy: WindowPolicy,
    tracker: VesselStateTracker,
    dispatcher: AlertDispatcher,
}

impl RunOrchestrator {
    pub fn new(
        source: Arc<dyn TelemetrySource>,
        analyzer: WindowAnalyzer,
        policy: WindowPolicy,
        tracker: VesselStateTracker,
        dispatcher: AlertDispatcher,
    ) -> Self {
        Self {
            source,
            analyzer,
            policy,
            tracker,
            dispatcher,
        }
    }

    /// Evaluate every vessel in order. Never fails as a whole.
    pub async fn run(&self, vessels: &[String], at: EvaluationTime) -> RunSummary {
        info!(
            vessels = vessels.len(),
            at = %at,
            source = self.source.source_name(),
            acceptable_delta = self.analyzer.acceptable_delta(),
            max_temperature = ?self.analyzer.ceiling().max_temperature(),
            dry_run = self.dispatcher.is_dry_run(),
            "→ Starting run"
        );

        let mut summary = RunSummary::default();
        for vessel in vessels {
            let outcome = self.run_vessel(vessel, at).await;
            summary.reports.push(VesselReport {
                vessel: vessel.clone(),
                outcome,
            });
        }

        info!("{}", summary);
        if summary.undelivered() > 0 {
            error!(
                count = summary.undelivered(),
                "Some alerts reached no recipient and will not be retried until the status changes"
            );
        }
        summary
    }

    async fn run_vessel(&self, vessel: &str, at: EvaluationTime) -> VesselOutcome {
        info!(vessel = %vessel, "→ Checking vessel {}", vessel);

        let anomaly = match self.evaluate(vessel, at).await {
            Ok(Ok(())) => {
                self.record(vessel, VesselStatus::Ok);
                info!(vessel = %vessel, "✓ No anomaly detected for {}", vessel);
                return VesselOutcome::Clear;
            }
            Ok(Err(anomaly)) => anomaly,
            Err(e) => {
                error!(vessel = %vessel, error = %e, "Failed to evaluate vessel, no notification sent");
                return VesselOutcome::Failed(e.to_string());
            }
        };

        let kind = anomaly.kind;
        warn!(vessel = %vessel, kind = %kind, "Anomaly detected");

        let notified = self.record(vessel, kind.into());
        if !notified {
            info!(vessel = %vessel, kind = %kind, "Already reported, no notification sent");
            return VesselOutcome::Anomaly {
                kind,
                notified,
                dispatch: None,
            };
        }

        let dispatch = self.dispatcher.dispatch(&anomaly).await;
        VesselOutcome::Anomaly {
            kind,
            notified,
            dispatch: Some(dispatch),
        }
    }

    /// Fetch and analyze. The outer error is a telemetry failure, the inner
    /// one a detected anomaly.
    async fn evaluate(
        &self,
        vessel: &str,
        at: EvaluationTime,
    ) -> Result<Result<(), Anomaly>, FetchError> {
        let source = self.source.as_ref();
        let Some(window) = fetch_window(source, vessel, at, &self.policy).await? else {
            return Ok(Err(Anomaly::no_data(vessel)));
        };

        let is_cooling = source.cooling(vessel, at).await?;
        let setpoint = source.setpoint(vessel, at).await?;

        Ok(self.analyzer.analyze(vessel, &window, is_cooling, setpoint))
    }

    /// Persist the status and return whether to notify. Store failures
    /// are logged and fail open for anomalies.
    fn record(&self, vessel: &str, status: VesselStatus) -> bool {
        match self.tracker.record_and_should_notify(vessel, status, Utc::now()) {
            Ok(notify) => notify,
            Err(e) => {
                warn!(vessel = %vessel, status = %status, error = %e, "Could not record vessel state");
                !status.is_ok()
            }
        }
    }
}
