//! selcheck -- Browser-driven Nagios checks over a remote WebDriver session.
//!
//! A check implements [`plugin::Check`], wraps timed steps with
//! [`nagios::timed`] or [`nagios::TimedAction`], and flags failures with the
//! helpers in [`nagios::assertions`]. [`plugin::run_plugin`] parses the
//! standard `-H/-t/-b` flags, runs the check under a global deadline, prints
//! one Nagios status line with performance data, and exits with the Nagios
//! exit code.

pub mod config;
pub mod nagios;
pub mod plugin;
pub mod scenario;
pub mod webdriver;

pub use nagios::assertions::{
    verify_equals, verify_no_broken_images, verify_text_present, verify_text_present_in_elem,
};
pub use nagios::{timed, PerfData, ServiceState, StatusAggregator, TimedAction, Thresholds, Uom};
pub use plugin::{run_plugin, Check, PluginArgs, RunContext};
pub use webdriver::session::keys;
pub use webdriver::{
    BrowserKind, Deferred, Element, Locator, Session, WaitConfig, WebDriverError,
};
