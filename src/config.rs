//! TOML configuration for selcheck plugins.
//!
//! Everything here has a compiled-in default, so a plugin runs without any
//! config file. A file only tunes session timeouts, deferred element lookup,
//! default timing thresholds, and the watchdog grace period.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::nagios::Thresholds;
use crate::webdriver::WaitConfig;

/// Environment variable naming a config file to load.
pub const CONFIG_ENV: &str = "SELCHECK_CONFIG";

/// System-wide config location, tried after [`CONFIG_ENV`].
pub const SYSTEM_CONFIG_PATH: &str = "/etc/selcheck/selcheck.toml";

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Root configuration for a plugin run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PluginConfig {
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub lookup: LookupConfig,
    #[serde(default)]
    pub thresholds: ThresholdConfig,
    #[serde(default)]
    pub watchdog: WatchdogConfig,
}

impl PluginConfig {
    /// Load configuration from a TOML file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        info!(path = %path.display(), "loaded plugin configuration");
        Ok(config)
    }

    /// Resolve the configuration for a run, in order:
    /// 1. `explicit`, when given on the command line (errors are returned).
    /// 2. The path in the `SELCHECK_CONFIG` environment variable.
    /// 3. `/etc/selcheck/selcheck.toml`.
    /// 4. Compiled-in defaults.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        if let Ok(env_path) = std::env::var(CONFIG_ENV) {
            let path = Path::new(&env_path);
            match Self::load(path) {
                Ok(cfg) => return Ok(cfg),
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        error = %e,
                        "SELCHECK_CONFIG set but file could not be loaded, trying fallback"
                    );
                }
            }
        }

        let system_path = Path::new(SYSTEM_CONFIG_PATH);
        if system_path.exists() {
            match Self::load(system_path) {
                Ok(cfg) => return Ok(cfg),
                Err(e) => {
                    warn!(
                        path = %system_path.display(),
                        error = %e,
                        "system config file exists but could not be loaded, using defaults"
                    );
                }
            }
        }

        debug!("no config file found, using compiled-in defaults");
        Ok(Self::default())
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// HTTP behaviour of the remote WebDriver session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Per-request timeout for WebDriver calls, in seconds.
    pub request_timeout_secs: u64,
    /// Upper bound on closing the session at the end of a run, in seconds.
    pub quit_timeout_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
            quit_timeout_secs: 10,
        }
    }
}

impl SessionConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn quit_timeout(&self) -> Duration {
        Duration::from_secs(self.quit_timeout_secs)
    }
}

// ---------------------------------------------------------------------------
// Deferred lookup
// ---------------------------------------------------------------------------

/// Defaults for polling elements that are not in the DOM yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LookupConfig {
    pub timeout_secs: u64,
    pub poll_interval_ms: u64,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 5,
            poll_interval_ms: 500,
        }
    }
}

impl From<&LookupConfig> for WaitConfig {
    fn from(cfg: &LookupConfig) -> Self {
        WaitConfig::new(
            Duration::from_secs(cfg.timeout_secs),
            Duration::from_millis(cfg.poll_interval_ms),
        )
    }
}

// ---------------------------------------------------------------------------
// Thresholds
// ---------------------------------------------------------------------------

/// Default warning/critical seconds for timed blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    pub warning: f64,
    pub critical: f64,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        let t = Thresholds::default();
        Self {
            warning: t.warning,
            critical: t.critical,
        }
    }
}

impl From<&ThresholdConfig> for Thresholds {
    fn from(cfg: &ThresholdConfig) -> Self {
        Thresholds::new(cfg.warning, cfg.critical)
    }
}

// ---------------------------------------------------------------------------
// Watchdog
// ---------------------------------------------------------------------------

/// Hard stop applied on top of the run deadline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchdogConfig {
    /// Extra seconds after the deadline before the process is terminated.
    pub grace_secs: u64,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self { grace_secs: 5 }
    }
}
