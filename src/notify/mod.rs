//! Alert delivery
//!
//! - [`NotifyChannel`]: one delivery target (an SMS recipient)
//! - [`AlertDispatcher`]: renders the message and fans it out, gated by
//!   dry-run mode and `no-data` suppression
//!
//! Delivery failures are logged and counted. They never feed back into the
//! detection decision or the recorded vessel state.

pub mod message;
pub mod sms;

pub use message::render_message;
pub use sms::{load_credentials, parse_credentials, CredentialsError, FreeMobileChannel, SmsCredentials};

use crate::types::{Anomaly, AnomalyKind};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Errors that can occur when sending a notification.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Server returned status {0}")]
    ServerError(reqwest::StatusCode),

    #[error("Channel not configured: {0}")]
    NotConfigured(String),

    #[error("Rate limited by the gateway")]
    RateLimited,
}

/// Trait for notification channels.
#[async_trait]
pub trait NotifyChannel: Send + Sync {
    /// Channel kind, for logging
    fn name(&self) -> &'static str;

    /// Who this channel delivers to, for logging
    fn recipient(&self) -> &str;

    async fn send(&self, message: &str) -> Result<(), ChannelError>;
}

/// What happened to one anomaly at the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Sent to the channels; counts per recipient
    Delivered { sent: usize, failed: usize },
    /// Dry-run mode: logged only
    DryRun,
    /// `no-data` anomalies are not sent unless enabled
    Suppressed,
    /// Nobody to send to
    NoChannels,
}

impl DispatchOutcome {
    /// True when at least one recipient received the message.
    pub const fn reached_anyone(&self) -> bool {
        matches!(self, DispatchOutcome::Delivered { sent, .. } if *sent > 0)
    }
}

/// Renders anomalies and forwards them to every channel in turn.
pub struct AlertDispatcher {
    channels: Vec<Arc<dyn NotifyChannel>>,
    dry_run: bool,
    notify_on_no_data: bool,
}

impl AlertDispatcher {
    pub fn new(channels: Vec<Arc<dyn NotifyChannel>>, dry_run: bool, notify_on_no_data: bool) -> Self {
        Self {
            channels,
            dry_run,
            notify_on_no_data,
        }
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub async fn dispatch(&self, anomaly: &Anomaly) -> DispatchOutcome {
        let message = render_message(anomaly);

        if anomaly.kind == AnomalyKind::NoData && !self.notify_on_no_data {
            info!(vessel = %anomaly.vessel(), "💥 {} (not sent)", message);
            return DispatchOutcome::Suppressed;
        }

        if self.dry_run {
            warn!(vessel = %anomaly.vessel(), "💥 {} (dry run)", message);
            return DispatchOutcome::DryRun;
        }

        if self.channels.is_empty() {
            warn!(vessel = %anomaly.vessel(), "💥 {} (no recipients configured, not sent)", message);
            return DispatchOutcome::NoChannels;
        }

        let mut sent = 0;
        let mut failed = 0;
        for channel in &self.channels {
            match channel.send(&message).await {
                Ok(()) => {
                    sent += 1;
                    info!(channel = channel.name(), recipient = channel.recipient(), "📱 SMS sent: {}", message);
                }
                Err(e) => {
                    failed += 1;
                    error!(
                        channel = channel.name(),
                        recipient = channel.recipient(),
                        error = %e,
                        "Notification delivery failed"
                    );
                }
            }
        }

        DispatchOutcome::Delivered { sent, failed }
    }
}
