//! Nagios plugin output: service states, performance data, and the per-run
//! status aggregator that timed blocks and assertions feed into.

pub mod aggregator;
pub mod assertions;
pub mod perfdata;
pub mod timing;

pub use aggregator::StatusAggregator;
pub use perfdata::{PerfData, Uom};
pub use timing::{timed, TimedAction, Thresholds};

use serde::{Deserialize, Serialize};

/// Nagios service state, ordered by severity.
///
/// The derived ordering follows the numeric exit codes, so escalating to
/// the maximum of two states is plain `Ord::max`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ServiceState {
    #[default]
    Ok,
    Warning,
    Critical,
    Unknown,
}

impl ServiceState {
    /// Process exit code a Nagios-compatible monitor expects for this state.
    pub fn exit_code(self) -> i32 {
        match self {
            ServiceState::Ok => 0,
            ServiceState::Warning => 1,
            ServiceState::Critical => 2,
            ServiceState::Unknown => 3,
        }
    }

    /// Upper-case name used as the status line prefix.
    pub fn as_str(self) -> &'static str {
        match self {
            ServiceState::Ok => "OK",
            ServiceState::Warning => "WARNING",
            ServiceState::Critical => "CRITICAL",
            ServiceState::Unknown => "UNKNOWN",
        }
    }
}

impl std::fmt::Display for ServiceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Format a measured value the way check output shows it: whole numbers keep
/// one decimal place (`2.0`), everything else uses the shortest exact form.
pub(crate) fn format_value(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}
