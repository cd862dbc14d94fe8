//! Step progress events for long runs.

use std::time::{Duration, Instant};

use tracing::info;

/// Roughly this many progress events are emitted per run.
const PROGRESS_EVENTS: usize = 20;

/// Emits throttled progress events while the engine steps.
pub(crate) struct Progress {
    total: usize,
    interval: usize,
    started: Instant,
    enabled: bool,
}

impl Progress {
    pub(crate) fn start(total: usize, enabled: bool) -> Self {
        Self {
            total,
            interval: (total / PROGRESS_EVENTS).max(1),
            started: Instant::now(),
            enabled,
        }
    }

    /// Called after step `step` (0-based) completed with state mean `mean`.
    pub(crate) fn step(&self, step: usize, mean: f64) {
        if !self.enabled || !self.should_report(step) {
            return;
        }
        let done = step + 1;
        let elapsed = self.started.elapsed().as_secs_f64();
        let rate = if elapsed > 0.0 { done as f64 / elapsed } else { f64::INFINITY };
        let eta = (self.total - done) as f64 / rate;
        info!(
            step = done,
            total = self.total,
            percent = format_args!("{:.1}", 100.0 * done as f64 / self.total as f64),
            mean = format_args!("{mean:.6}"),
            elapsed_s = format_args!("{elapsed:.1}"),
            eta_s = format_args!("{eta:.1}"),
            steps_per_s = format_args!("{rate:.0}"),
            "diffusion progress"
        );
    }

    pub(crate) fn finish(&self) -> Duration {
        let elapsed = self.started.elapsed();
        if self.enabled {
            let secs = elapsed.as_secs_f64();
            let rate = if secs > 0.0 { self.total as f64 / secs } else { f64::INFINITY };
            info!(
                steps = self.total,
                seconds = format_args!("{secs:.2}"),
                steps_per_s = format_args!("{rate:.0}"),
                "diffusion completed"
            );
        }
        elapsed
    }

    #[inline]
    fn should_report(&self, step: usize) -> bool {
        step % self.interval == 0 || step + 1 == self.total
    }
}
