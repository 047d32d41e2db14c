// src/fleet/scheduler.rs

//! Fleet Scheduler: periodic sequential sweeps over the tracked set.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::tracked_set::TrackedSet;
use super::lock;

/// Whether the scheduler keeps sweeping or stops after the first pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepMode {
    Forever,
    Once,
}

/// Summary of one pass over the tracked set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SweepReport {
    pub refreshed: usize,
    pub failed: usize,
    pub needs_attention: usize,
    /// True if shutdown cut the sweep short.
    pub interrupted: bool,
}

/// How long to wait before the next sweep.
///
/// Sweeps start `interval` apart measured from their start. A sweep that
/// overran gets no wait at all, and missed ticks are not made up.
pub fn next_sweep_delay(interval: Duration, elapsed: Duration) -> Duration {
    interval.saturating_sub(elapsed)
}

#[derive(Debug)]
pub struct SweepScheduler {
    set: Arc<Mutex<TrackedSet>>,
    interval: Duration,
    shutdown: CancellationToken,
    mode: SweepMode,
}

impl SweepScheduler {
    pub fn new(
        set: Arc<Mutex<TrackedSet>>,
        interval: Duration,
        shutdown: CancellationToken,
        mode: SweepMode,
    ) -> Self {
        Self {
            set,
            interval,
            shutdown,
            mode,
        }
    }

    /// Sweep until shutdown (or once, in [`SweepMode::Once`]).
    ///
    /// Returns the number of sweeps started.
    pub async fn run(self) -> u64 {
        info!(interval = ?self.interval, mode = ?self.mode, "scheduler started");
        let mut sweeps = 0u64;

        loop {
            if self.shutdown.is_cancelled() {
                break;
            }

            let start = Instant::now();
            sweeps += 1;
            let report = self.sweep().await;
            let elapsed = start.elapsed();

            info!(
                sweep = sweeps,
                refreshed = report.refreshed,
                failed = report.failed,
                needs_attention = report.needs_attention,
                elapsed_ms = elapsed.as_millis() as u64,
                "sweep complete"
            );

            if report.interrupted || self.mode == SweepMode::Once {
                break;
            }

            let delay = next_sweep_delay(self.interval, elapsed);
            if delay.is_zero() {
                debug!(?elapsed, interval = ?self.interval, "sweep overran interval; starting next immediately");
                continue;
            }

            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        info!(sweeps, "scheduler stopped");
        sweeps
    }

    /// Refresh every tracker once, one at a time, in tracked-set order.
    ///
    /// Works on a copy of the ordering taken when the sweep starts: trackers
    /// added meanwhile wait for the next sweep and removed ones are skipped.
    pub async fn sweep(&self) -> SweepReport {
        let trackers = lock(&self.set).to_vec();
        let mut report = SweepReport::default();

        for tracker in trackers {
            if self.shutdown.is_cancelled() {
                report.interrupted = true;
                break;
            }
            if tracker.is_cancelled() {
                debug!(path = %tracker.path().display(), "skipping removed repository");
                continue;
            }

            let outcome = tracker.refresh(true, true).await;
            report.refreshed += 1;
            if outcome.error.is_some() {
                report.failed += 1;
            } else if outcome.status.needs_attention() {
                report.needs_attention += 1;
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn short_sweep_waits_out_the_interval() {
        assert_eq!(
            next_sweep_delay(Duration::from_secs(60), Duration::from_secs(20)),
            Duration::from_secs(40)
        );
    }

    #[test]
    fn overrun_sweep_does_not_wait() {
        assert_eq!(
            next_sweep_delay(Duration::from_secs(10), Duration::from_secs(25)),
            Duration::ZERO
        );
    }

    proptest! {
        #[test]
        fn next_start_is_max_of_interval_and_duration(
            interval_ms in 1u64..100_000,
            elapsed_ms in 0u64..200_000,
        ) {
            let interval = Duration::from_millis(interval_ms);
            let elapsed = Duration::from_millis(elapsed_ms);
            let next_start = elapsed + next_sweep_delay(interval, elapsed);
            prop_assert_eq!(next_start, interval.max(elapsed));
        }
    }
}
