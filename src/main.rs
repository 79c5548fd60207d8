//! fermentwatch - fermentation vessel temperature watchdog
//!
//! One invocation evaluates every configured vessel once and exits. Schedule
//! it (cron, systemd timer) at the cadence you want alerts checked.
//!
//! # Usage
//!
//! ```bash
//! # Check f1 and f2 against a local InfluxDB, log messages instead of sending
//! fermentwatch --vessels f1,f2 --dry-run
//!
//! # Replay a past instant with a hard ceiling
//! fermentwatch --date 2024-03-02T06:00:00Z --max-temperature 24
//! ```
//!
//! # Environment Variables
//!
//! - `FERMENTWATCH_CONFIG`: path to the TOML config file
//! - `RUST_LOG`: logging filter (default: info, or debug with `--verbose`)

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use fermentwatch::acquisition::InfluxClient;
use fermentwatch::config::MonitorConfig;
use fermentwatch::notify::{
    load_credentials, AlertDispatcher, CredentialsError, FreeMobileChannel, NotifyChannel,
};
use fermentwatch::pipeline::RunOrchestrator;
use fermentwatch::storage::{
    InMemoryVesselStateStore, ProcessLock, SledVesselStateStore, VesselStateStore,
    VesselStateTracker,
};
use fermentwatch::types::EvaluationTime;

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "fermentwatch")]
#[command(about = "Alert when fermentation vessels drift away from their setpoint")]
#[command(version)]
struct CliArgs {
    /// Vessels to check, comma separated (e.g. f1,f2,f3)
    #[arg(long, value_delimiter = ',')]
    vessels: Option<Vec<String>>,

    /// InfluxDB server (HOST, HOST:PORT or full URL)
    #[arg(long)]
    server: Option<String>,

    /// Minimum temperature change, in °C, considered significant
    #[arg(long)]
    acceptable_delta: Option<f64>,

    /// Alert when any sample exceeds this temperature
    #[arg(long)]
    max_temperature: Option<f64>,

    /// File with one `user:password` SMS credential pair per line
    #[arg(short, long, value_name = "PATH")]
    credentials: Option<PathBuf>,

    /// Log alert messages without sending them
    #[arg(long)]
    dry_run: bool,

    /// Evaluation time: `now`, an RFC 3339 timestamp or a date
    #[arg(long, default_value = "now")]
    date: EvaluationTime,

    /// Width of each averaged temperature bucket, in minutes
    #[arg(long)]
    group_minutes: Option<u32>,

    /// Debug logging, including every query sent
    #[arg(short, long)]
    verbose: bool,

    /// Directory holding vessel state and the run lock
    #[arg(long, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// Config file to use instead of the standard search
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    print_config: bool,
}

impl CliArgs {
    /// Layer command line overrides on top of the file configuration.
    fn apply(&self, config: &mut MonitorConfig) {
        if let Some(ref vessels) = self.vessels {
            config.vessels.ids = vessels
                .iter()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .collect();
        }
        if let Some(ref server) = self.server {
            config.influx.url.clone_from(server);
        }
        if let Some(delta) = self.acceptable_delta {
            config.analysis.acceptable_delta = delta;
        }
        if let Some(max) = self.max_temperature {
            config.analysis.max_temperature = Some(max);
        }
        if let Some(ref path) = self.credentials {
            config.alerts.credentials_path.clone_from(path);
        }
        if self.dry_run {
            config.alerts.dry_run = true;
        }
        if let Some(minutes) = self.group_minutes {
            config.analysis.group_minutes = minutes;
        }
        if let Some(ref dir) = self.data_dir {
            config.storage.data_dir.clone_from(dir);
        }
    }
}

// ============================================================================
// Startup
// ============================================================================

fn load_config(args: &CliArgs) -> Result<MonitorConfig> {
    let mut config = match args.config {
        Some(ref path) => MonitorConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => MonitorConfig::load(),
    };
    args.apply(&mut config);
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// Dry runs keep state in memory so their anomalies never suppress a real
/// alert in a later scheduled run.
fn open_state_store(config: &MonitorConfig) -> Result<Arc<dyn VesselStateStore>> {
    if config.alerts.dry_run {
        info!("Dry run: vessel state kept in memory, durable state left untouched");
        return Ok(Arc::new(InMemoryVesselStateStore::new()));
    }
    let store = SledVesselStateStore::open(config.state_db_path())
        .context("Failed to open vessel state database")?;
    Ok(Arc::new(store))
}

/// One SMS channel per credential pair. A missing file is tolerated in dry-run.
fn build_channels(config: &MonitorConfig) -> Result<Vec<Arc<dyn NotifyChannel>>> {
    let alerts = &config.alerts;
    let recipients = match load_credentials(&alerts.credentials_path) {
        Ok(recipients) => recipients,
        Err(CredentialsError::Io { ref path, .. }) if alerts.dry_run => {
            warn!(path = %path.display(), "Credentials file not readable, continuing in dry-run mode");
            Vec::new()
        }
        Err(e) => return Err(e).context("Failed to load SMS credentials"),
    };

    if recipients.is_empty() && !alerts.dry_run {
        warn!("No SMS recipients configured, alerts will only be logged");
    }

    let channels = FreeMobileChannel::for_recipients(
        &alerts.sms_endpoint,
        recipients,
        Duration::from_secs(alerts.timeout_secs),
    )
    .context("Failed to build SMS client")?;

    Ok(channels
        .into_iter()
        .map(|c| Arc::new(c) as Arc<dyn NotifyChannel>)
        .collect())
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = CliArgs::parse();

    let default_filter = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .with_target(false)
        .init();

    let config = load_config(&args)?;

    if args.print_config {
        print!("{}", config.to_toml().context("Failed to render configuration")?);
        return Ok(());
    }

    let _process_lock = ProcessLock::acquire(&config.storage.data_dir)
        .context("Failed to acquire process lock")?;

    let store = open_state_store(&config)?;
    let tracker = VesselStateTracker::new(store.clone());

    let channels = build_channels(&config)?;
    let dispatcher = AlertDispatcher::new(
        channels,
        config.alerts.dry_run,
        config.alerts.notify_on_no_data,
    );

    let source = InfluxClient::new(&config.influx).context("Failed to build InfluxDB client")?;
    info!(
        server = %source.base_url(),
        database = %config.influx.database,
        recipients = dispatcher.channel_count(),
        state = store.backend_name(),
        "✓ Initialized"
    );

    let analyzer = config.analyzer();
    if !analyzer.ceiling().is_enabled() {
        info!("Temperature ceiling disabled (no max_temperature set)");
    }

    let orchestrator = RunOrchestrator::new(
        Arc::new(source),
        analyzer,
        config.window_policy(),
        tracker,
        dispatcher,
    );

    // Anomalies are reported, not process failures
    orchestrator.run(&config.vessels.ids, args.date).await;

    match store.list_all() {
        Ok(records) => {
            for (vessel, record) in records {
                debug!(vessel = %vessel, status = %record.status, since = %record.since, "Stored vessel state");
            }
        }
        Err(e) => warn!(error = %e, "Could not list vessel state"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides_config() {
        let args = CliArgs::parse_from([
            "fermentwatch",
            "--vessels",
            "f4,f5",
            "--max-temperature",
            "24.5",
            "--group-minutes",
            "10",
            "--dry-run",
        ]);
        let mut config = MonitorConfig::default();
        args.apply(&mut config);

        assert_eq!(config.vessels.ids, vec!["f4", "f5"]);
        assert_eq!(config.analysis.max_temperature, Some(24.5));
        assert_eq!(config.analysis.group_minutes, 10);
        assert!(config.alerts.dry_run);
        assert_eq!(args.date, EvaluationTime::Now);
    }

    #[test]
    fn test_date_flag_parses_rfc3339() {
        let args = CliArgs::parse_from(["fermentwatch", "--date", "2024-03-02T06:00:00Z"]);
        assert!(matches!(args.date, EvaluationTime::At(_)));
    }

    #[test]
    fn test_missing_credentials_tolerated_in_dry_run() {
        let mut config = MonitorConfig::default();
        config.alerts.credentials_path = PathBuf::from("/nonexistent/credentials.txt");
        config.alerts.dry_run = true;
        assert!(build_channels(&config).unwrap().is_empty());

        config.alerts.dry_run = false;
        assert!(build_channels(&config).is_err());
    }

    #[test]
    fn test_dry_run_leaves_durable_state_alone() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut config = MonitorConfig::default();
        config.storage.data_dir = temp_dir.path().to_path_buf();
        config.alerts.dry_run = true;

        let store = open_state_store(&config).unwrap();
        assert_eq!(store.backend_name(), "InMemory");
        assert!(!config.state_db_path().exists());

        config.alerts.dry_run = false;
        let store = open_state_store(&config).unwrap();
        assert_eq!(store.backend_name(), "Sled");
        assert!(config.state_db_path().exists());
    }

    #[test]
    fn test_print_config_renders_overrides() {
        let args = CliArgs::parse_from(["fermentwatch", "--print-config", "--vessels", "f7"]);
        assert!(args.print_config);

        let mut config = MonitorConfig::default();
        args.apply(&mut config);
        let rendered = config.to_toml().unwrap();
        assert!(rendered.contains("\"f7\""));
        assert_eq!(MonitorConfig::from_toml_str(&rendered).unwrap().vessels.ids, vec!["f7"]);
    }
}
