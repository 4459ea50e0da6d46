//! Periodic escalation sweep job.
//!
//! Wraps [`EscalationService::sweep`] in a poll loop. A single-flight guard
//! keeps one sweep in flight at a time: if a poll fires while the previous
//! sweep is still running, the new poll returns immediately instead of
//! stacking up.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::error::Result;
use crate::services::{EscalationService, SweepSummary};

/// Default polling interval in seconds (5 minutes).
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 300;

/// Job that periodically sweeps overdue work items for escalation.
pub struct EscalationJob {
    service: Arc<EscalationService>,
    poll_interval_secs: u64,
    sweep_guard: Mutex<()>,
}

impl EscalationJob {
    /// Create a new escalation job.
    pub fn new(service: Arc<EscalationService>) -> Self {
        Self {
            service,
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            sweep_guard: Mutex::new(()),
        }
    }

    /// Create with a custom polling interval.
    #[must_use]
    pub fn with_poll_interval_secs(mut self, secs: u64) -> Self {
        self.poll_interval_secs = secs.max(1);
        self
    }

    /// The configured poll interval.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Run a single poll cycle.
    ///
    /// Returns an empty summary without touching the store when a previous
    /// sweep is still in flight.
    #[instrument(skip(self))]
    pub async fn poll(&self) -> Result<SweepSummary> {
        let Ok(_guard) = self.sweep_guard.try_lock() else {
            warn!("Previous escalation sweep still running, skipping this cycle");
            return Ok(SweepSummary::default());
        };

        debug!("Starting escalation poll cycle");
        let summary = self.service.sweep(Utc::now()).await?;

        if summary.processed > 0 {
            info!(
                processed = summary.processed,
                escalated = summary.escalated,
                skipped = summary.skipped,
                failed = summary.errors.len(),
                "Completed escalation poll cycle"
            );
        }

        Ok(summary)
    }

    /// Run the job until the task is cancelled.
    ///
    /// Poll failures are logged and the loop keeps going; a transient store
    /// outage must not kill the job.
    pub async fn run(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(self.poll_interval());
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        info!(
            interval_secs = self.poll_interval_secs,
            "Starting escalation job loop"
        );

        loop {
            ticker.tick().await;
            if let Err(e) = self.poll().await {
                warn!(error = %e, "Escalation poll cycle failed");
            }
        }
    }
}
