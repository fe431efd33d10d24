//! Fixed-timestep scheduler for the control loop.
//!
//! Drives the lockstep tick at a fixed `fixed_delta` cadence with a
//! skip-on-overrun policy: when an iteration runs long, missed ticks
//! are skipped and the cadence resumes from now. Catching up would
//! burst duplicate frames at clients already behind.

use std::time::Duration;

use rand::Rng;
use tokio::time::{self, Instant as TokioInstant};

/// Configuration for the fixed step.
#[derive(Debug, Clone)]
pub struct FixedStepConfig {
    /// Interval between fixed updates. This is the lockstep frame
    /// cadence every client simulates against.
    ///
    /// Default: 100 ms (10 frames per second).
    pub fixed_delta: Duration,

    /// Random jitter (0–max µs) added before the first tick, so
    /// servers started at the same instant don't tick in phase.
    pub initial_jitter_us: u64,
}

impl Default for FixedStepConfig {
    fn default() -> Self {
        Self {
            fixed_delta: Duration::from_millis(100),
            initial_jitter_us: 2_000,
        }
    }
}

/// Information about a fired tick, returned by [`FixedStep::wait`].
#[derive(Debug, Clone)]
pub struct StepInfo {
    /// Monotonically increasing tick number (starts at 1).
    pub tick: u64,
    /// The fixed delta. Game logic uses this, not wall-clock elapsed
    /// time, so the simulation stays deterministic.
    pub dt: Duration,
    /// `true` if this tick fired late.
    pub overrun: bool,
    /// How many ticks were skipped due to overrun.
    pub ticks_skipped: u64,
}

/// Fixed-timestep scheduler. One per server control loop.
pub struct FixedStep {
    fixed_delta: Duration,
    tick_count: u64,
    next_tick: TokioInstant,
    skipped_total: u64,
}

impl FixedStep {
    /// Creates a scheduler whose first tick fires one `fixed_delta`
    /// (plus jitter) from now.
    pub fn new(config: FixedStepConfig) -> Self {
        let jitter = if config.initial_jitter_us > 0 {
            Duration::from_micros(rand::rng().random_range(0..config.initial_jitter_us))
        } else {
            Duration::ZERO
        };
        tracing::debug!(
            fixed_delta_ms = config.fixed_delta.as_millis() as u64,
            "fixed step scheduler created"
        );
        Self {
            fixed_delta: config.fixed_delta,
            tick_count: 0,
            next_tick: TokioInstant::now() + config.fixed_delta + jitter,
            skipped_total: 0,
        }
    }

    /// Ticks fired so far.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Ticks skipped to overruns so far.
    pub fn skipped_total(&self) -> u64 {
        self.skipped_total
    }

    /// The configured delta.
    pub fn fixed_delta(&self) -> Duration {
        self.fixed_delta
    }

    /// Waits until the next tick is due.
    pub async fn wait(&mut self) -> StepInfo {
        time::sleep_until(self.next_tick).await;

        let now = TokioInstant::now();
        self.tick_count += 1;

        // Waking >10% late counts as an overrun.
        let late_by = now.saturating_duration_since(self.next_tick);
        let overrun = late_by > self.fixed_delta / 10;
        let mut ticks_skipped = 0u64;

        if overrun {
            ticks_skipped = (late_by.as_nanos() / self.fixed_delta.as_nanos()) as u64;
            if ticks_skipped > 0 {
                tracing::warn!(
                    tick = self.tick_count,
                    skipped = ticks_skipped,
                    late_ms = late_by.as_secs_f64() * 1000.0,
                    "tick overrun, skipping ahead"
                );
                self.skipped_total += ticks_skipped;
            }
            // Resume the cadence from now, not the missed deadline.
            self.next_tick = now + self.fixed_delta;
        } else {
            self.next_tick += self.fixed_delta;
        }

        tracing::trace!(tick = self.tick_count, overrun, "tick fired");
        StepInfo {
            tick: self.tick_count,
            dt: self.fixed_delta,
            overrun,
            ticks_skipped,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scheduler(delta_ms: u64) -> FixedStep {
        FixedStep::new(FixedStepConfig {
            fixed_delta: Duration::from_millis(delta_ms),
            initial_jitter_us: 0,
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_fire_at_fixed_cadence() {
        let mut step = scheduler(100);
        let start = TokioInstant::now();

        let info = step.wait().await;
        assert_eq!(info.tick, 1);
        assert_eq!(info.dt, Duration::from_millis(100));
        assert!(!info.overrun);
        assert_eq!(start.elapsed(), Duration::from_millis(100));

        step.wait().await;
        step.wait().await;
        assert_eq!(step.tick_count(), 3);
        assert_eq!(start.elapsed(), Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn test_overrun_skips_missed_ticks() {
        let mut step = scheduler(100);
        step.wait().await;

        // Simulate a long iteration: 350 ms of work on a 100 ms budget.
        tokio::time::sleep(Duration::from_millis(350)).await;
        let info = step.wait().await;
        assert!(info.overrun);
        assert_eq!(info.ticks_skipped, 2);
        assert_eq!(step.skipped_total(), 2);

        // Cadence resumes cleanly afterwards.
        let info = step.wait().await;
        assert!(!info.overrun);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tick_numbers_are_strictly_increasing() {
        let mut step = scheduler(50);
        let mut last = 0;
        for _ in 0..5 {
            let info = step.wait().await;
            assert_eq!(info.tick, last + 1);
            last = info.tick;
        }
    }
}
