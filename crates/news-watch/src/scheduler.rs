//! Supervised poll loop.
//!
//! Runs a [`PollCycle`] forever: cycle, sleep, repeat. A failed cycle does not
//! end the loop; it is logged and retried after an exponential backoff that
//! resets on the next success. Only configuration errors, which no retry can
//! fix, stop the scheduler.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::pipeline::PollCycle;

/// Timing for the poll loop.
#[derive(Debug, Clone)]
pub struct ScheduleConfig {
    /// Sleep after a successful cycle.
    pub interval: Duration,
    /// Delay after the first consecutive failure.
    pub base_backoff: Duration,
    /// Backoff multiplier on errors.
    pub backoff_multiplier: f32,
    /// Max backoff duration.
    pub max_backoff: Duration,
}

impl ScheduleConfig {
    /// Default timing for a given poll interval; backoff never exceeds it.
    #[must_use]
    pub fn with_interval(interval: Duration) -> Self {
        Self {
            interval,
            base_backoff: Duration::from_secs(60).min(interval),
            backoff_multiplier: 2.0,
            max_backoff: interval,
        }
    }

    /// Get the backoff duration after `failures` consecutive failed cycles.
    #[must_use]
    pub fn backoff_duration(&self, failures: u32) -> Duration {
        if failures == 0 {
            return Duration::ZERO;
        }

        let exponent = failures.saturating_sub(1).min(32) as i32;
        let backoff_secs = self.base_backoff.as_secs_f32() * self.backoff_multiplier.powi(exponent);
        let capped_secs = backoff_secs.min(self.max_backoff.as_secs_f32());

        Duration::from_secs_f32(capped_secs)
    }
}

/// Runs poll cycles on a fixed interval until cancelled.
pub struct Scheduler {
    cycle: Arc<dyn PollCycle>,
    config: ScheduleConfig,
}

impl Scheduler {
    /// Create a new scheduler.
    #[must_use]
    pub fn new(cycle: Arc<dyn PollCycle>, config: ScheduleConfig) -> Self {
        Self { cycle, config }
    }

    /// Run until `shutdown` is cancelled or a non-retryable error occurs.
    ///
    /// Cancellation is observed between cycles and during sleeps; a cycle in
    /// progress runs to completion.
    pub async fn run(&self, shutdown: CancellationToken) -> Result<()> {
        let mut failures: u32 = 0;

        tracing::info!(
            interval_secs = self.config.interval.as_secs(),
            "Scheduler started"
        );

        while !shutdown.is_cancelled() {
            let delay = match self.cycle.run_cycle().await {
                Ok(result) => {
                    if failures > 0 {
                        tracing::info!(failures, "Poll cycle recovered");
                    }
                    failures = 0;
                    tracing::debug!(sent = result.sent, "Cycle finished");
                    self.config.interval
                }
                Err(e) if !e.is_retryable() => {
                    tracing::error!(
                        error = %e,
                        "Poll cycle failed permanently, stopping scheduler"
                    );
                    return Err(e);
                }
                Err(e) => {
                    failures = failures.saturating_add(1);
                    let delay = self.config.backoff_duration(failures);
                    tracing::error!(
                        error = %e,
                        failures,
                        retry_in_secs = delay.as_secs(),
                        "Poll cycle failed"
                    );
                    delay
                }
            };

            tokio::select! {
                () = shutdown.cancelled() => {}
                () = tokio::time::sleep(delay) => {}
            }
        }

        tracing::info!("Scheduler stopped");
        Ok(())
    }
}
