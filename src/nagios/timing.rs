//! Timed blocks that turn elapsed wall-clock time into performance data.

use std::future::Future;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use super::{format_value, ServiceState, StatusAggregator};

/// Warning and critical limits, in seconds, for a timed block.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub warning: f64,
    pub critical: f64,
}

impl Thresholds {
    pub fn new(warning: f64, critical: f64) -> Self {
        Self { warning, critical }
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self::new(3.0, 5.0)
    }
}

/// Scope guard measuring the time between `start` and drop.
///
/// The measurement is recorded when the guard goes out of scope, including
/// early returns through `?` and panics, so a failing step still leaves its
/// timing behind. Use [`TimedAction::status`] to reach the aggregator while
/// the block is running.
pub struct TimedAction<'a> {
    status: &'a mut StatusAggregator,
    label: String,
    thresholds: Thresholds,
    start: Instant,
    recorded: bool,
}

impl<'a> TimedAction<'a> {
    pub fn start(
        status: &'a mut StatusAggregator,
        label: impl Into<String>,
        thresholds: Thresholds,
    ) -> Self {
        Self {
            status,
            label: label.into(),
            thresholds,
            start: Instant::now(),
            recorded: false,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn status(&mut self) -> &mut StatusAggregator {
        self.status
    }

    /// End the block now and return the recorded elapsed seconds.
    pub fn finish(mut self) -> f64 {
        self.record()
    }

    fn record(&mut self) -> f64 {
        self.recorded = true;
        // Millisecond resolution is plenty for browser timings.
        let elapsed = (self.start.elapsed().as_secs_f64() * 1000.0).round() / 1000.0;
        let Thresholds { warning, critical } = self.thresholds;

        self.status.add_message(format!(
            "{} executed in {} seconds",
            self.label,
            format_value(elapsed)
        ));
        let triggered = self
            .status
            .add_performance_point(&self.label, elapsed, warning, critical);
        match triggered {
            Some(ServiceState::Critical) => self.status.add_message(format!(
                "'{}' exceeded critical threshold of {}",
                self.label, critical
            )),
            Some(_) => self.status.add_message(format!(
                "'{}' exceeded warning threshold of {}",
                self.label, warning
            )),
            None => {}
        }

        tracing::debug!(label = %self.label, elapsed, "timed action recorded");
        elapsed
    }
}

impl Drop for TimedAction<'_> {
    fn drop(&mut self) {
        if !self.recorded {
            self.record();
        }
    }
}

/// Await `fut` inside a [`TimedAction`] and hand back its output untouched.
///
/// An `Err` output is timed like any other and still returned to the caller.
///
/// ```ignore
/// timed(&mut ctx.status, "open_homepage", Thresholds::new(2.0, 5.0),
///       ctx.driver.goto("https://duckduckgo.com/")).await?;
/// ```
pub async fn timed<F>(
    status: &mut StatusAggregator,
    label: &str,
    thresholds: Thresholds,
    fut: F,
) -> F::Output
where
    F: Future,
{
    let _action = TimedAction::start(status, label, thresholds);
    fut.await
}
