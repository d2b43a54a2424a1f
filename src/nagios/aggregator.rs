//! Accumulates the verdict, message fragments, and performance data of one
//! check run, and renders them as a single Nagios status line.

use serde::Serialize;
use tracing::debug;

use super::perfdata::{PerfData, Uom};
use super::ServiceState;

/// Mutable status of a single check run.
///
/// The state only ever moves up in severity. Performance data labels are
/// unique: re-adding a label replaces the earlier point in place.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StatusAggregator {
    state: ServiceState,
    messages: Vec<String>,
    perfdata: Vec<PerfData>,
}

impl StatusAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ServiceState {
        self.state
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    pub fn perfdata(&self) -> &[PerfData] {
        &self.perfdata
    }

    /// Raise the aggregate state to `state` if it is more severe.
    pub fn escalate(&mut self, state: ServiceState) {
        if state > self.state {
            debug!(from = %self.state, to = %state, "escalating status");
            self.state = state;
        }
    }

    /// Append a message fragment. Line breaks and `|` are replaced so the
    /// fragment cannot split the status line or the perfdata section.
    pub fn add_message(&mut self, text: impl AsRef<str>) {
        let clean: String = text
            .as_ref()
            .chars()
            .map(|c| match c {
                '\r' | '\n' => ' ',
                '|' => '/',
                other => other,
            })
            .collect();
        self.messages.push(clean.trim().to_string());
    }

    /// Record a timing in seconds and escalate when a threshold is reached.
    ///
    /// Thresholds are inclusive: `seconds == critical` is CRITICAL. Returns
    /// the state the measurement triggered, if any.
    pub fn add_performance_point(
        &mut self,
        label: &str,
        seconds: f64,
        warning: f64,
        critical: f64,
    ) -> Option<ServiceState> {
        self.add_perfdata(
            PerfData::new(label, seconds, Uom::Seconds).with_thresholds(warning, critical),
        );

        let triggered = if seconds >= critical {
            Some(ServiceState::Critical)
        } else if seconds >= warning {
            Some(ServiceState::Warning)
        } else {
            None
        };
        if let Some(state) = triggered {
            self.escalate(state);
        }
        triggered
    }

    /// Record a performance data point without evaluating its thresholds.
    pub fn add_perfdata(&mut self, point: PerfData) {
        match self.perfdata.iter_mut().find(|p| p.label == point.label) {
            Some(existing) => {
                debug!(label = %point.label, "replacing performance data point");
                *existing = point;
            }
            None => self.perfdata.push(point),
        }
    }

    /// Render the status line: `STATE: msg, msg | 'a'=1s;3;5;; 'b'=...`.
    pub fn render(&self) -> String {
        let mut line = self.state.as_str().to_string();
        if !self.messages.is_empty() {
            line.push_str(": ");
            line.push_str(&self.messages.join(", "));
        }
        if !self.perfdata.is_empty() {
            let points: Vec<String> = self.perfdata.iter().map(ToString::to_string).collect();
            line.push_str(" | ");
            line.push_str(&points.join(" "));
        }
        line
    }

    pub fn exit_code(&self) -> i32 {
        self.state.exit_code()
    }
}

impl std::fmt::Display for StatusAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.render())
    }
}
