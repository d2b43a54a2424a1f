//! Checks described as a TOML list of browser steps.
//!
//! ```toml
//! name = "duckduckgo search"
//!
//! [[steps]]
//! action = "open"
//! url = "https://duckduckgo.com/"
//! benchmark = { label = "open_homepage", warning = 2.0 }
//!
//! [[steps]]
//! action = "type"
//! locator = { name = "q" }
//! text = "selenium"
//! submit = true
//! benchmark = { label = "submit_form" }
//!
//! [[steps]]
//! action = "assert_text"
//! locator = { css = "body" }
//! text = "selenium"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::nagios::assertions::{
    verify_equals, verify_no_broken_images, verify_text_present_in_elem,
};
use crate::nagios::{ServiceState, StatusAggregator, TimedAction, Thresholds};
use crate::plugin::{Check, RunContext};
use crate::webdriver::session::keys;
use crate::webdriver::{Locator, Session, WaitConfig};

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("failed to read scenario {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse scenario {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("scenario {0} has no steps")]
    Empty(PathBuf),
}

/// Severity an assertion step escalates to when it fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    #[default]
    Critical,
}

impl From<Severity> for ServiceState {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Warning => ServiceState::Warning,
            Severity::Critical => ServiceState::Critical,
        }
    }
}

/// Times a step as performance data. Missing thresholds fall back to the
/// configured defaults.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Benchmark {
    pub label: String,
    pub warning: Option<f64>,
    pub critical: Option<f64>,
}

impl Benchmark {
    fn thresholds(&self, defaults: Thresholds) -> Thresholds {
        Thresholds::new(
            self.warning.unwrap_or(defaults.warning),
            self.critical.unwrap_or(defaults.critical),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    Open {
        url: String,
    },
    Click {
        locator: Locator,
    },
    Type {
        locator: Locator,
        text: String,
        #[serde(default)]
        submit: bool,
    },
    WaitFor {
        locator: Locator,
        timeout_secs: Option<u64>,
    },
    AssertText {
        locator: Locator,
        text: String,
        #[serde(default)]
        severity: Severity,
    },
    AssertTitle {
        expected: String,
        #[serde(default)]
        severity: Severity,
    },
    BrokenImages {
        #[serde(default)]
        severity: Severity,
    },
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::Open { .. } => "open",
            Action::Click { .. } => "click",
            Action::Type { .. } => "type",
            Action::WaitFor { .. } => "wait_for",
            Action::AssertText { .. } => "assert_text",
            Action::AssertTitle { .. } => "assert_title",
            Action::BrokenImages { .. } => "broken_images",
        }
    }

    async fn perform(&self, driver: &Session, status: &mut StatusAggregator) -> anyhow::Result<()> {
        match self {
            Action::Open { url } => driver.goto(url).await?,
            Action::Click { locator } => driver.find_element(locator).await?.click().await?,
            Action::Type {
                locator,
                text,
                submit,
            } => {
                let element = driver.find_element(locator).await?;
                element.send_keys(text).await?;
                if *submit {
                    element.send_keys(keys::RETURN).await?;
                }
            }
            Action::WaitFor {
                locator,
                timeout_secs,
            } => {
                let wait = timeout_secs
                    .map(|secs| WaitConfig::with_timeout(Duration::from_secs(secs)))
                    .unwrap_or_else(|| driver.lookup());
                driver.find_deferred(locator, wait).await?;
            }
            Action::AssertText {
                locator,
                text,
                severity,
            } => {
                let element = driver.find_deferred(locator, driver.lookup()).await?;
                verify_text_present_in_elem(status, &element, text, (*severity).into()).await?;
            }
            Action::AssertTitle { expected, severity } => {
                let title = driver.title().await?;
                verify_equals(
                    status,
                    "title",
                    title.as_str(),
                    expected.as_str(),
                    (*severity).into(),
                );
            }
            Action::BrokenImages { severity } => {
                verify_no_broken_images(status, driver, (*severity).into()).await?;
            }
        }
        Ok(())
    }
}

/// One scenario step: an action, optionally timed.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Step {
    #[serde(flatten)]
    pub action: Action,
    pub benchmark: Option<Benchmark>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Scenario {
    pub name: Option<String>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Scenario {
    pub fn load(path: &Path) -> Result<Self, ScenarioError> {
        let content = std::fs::read_to_string(path).map_err(|source| ScenarioError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let scenario: Self = toml::from_str(&content).map_err(|source| ScenarioError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        if scenario.steps.is_empty() {
            return Err(ScenarioError::Empty(path.to_path_buf()));
        }
        info!(path = %path.display(), steps = scenario.steps.len(), "loaded scenario");
        Ok(scenario)
    }
}

/// A [`Check`] that plays a [`Scenario`] step by step.
///
/// A failing assertion escalates and moves on; any other step failure ends
/// the run.
pub struct ScenarioCheck {
    scenario: Scenario,
}

impl ScenarioCheck {
    pub fn new(scenario: Scenario) -> Self {
        Self { scenario }
    }
}

#[async_trait::async_trait]
impl Check for ScenarioCheck {
    async fn run(&self, ctx: &mut RunContext) -> anyhow::Result<()> {
        if let Some(name) = &self.scenario.name {
            info!(%name, "running scenario");
        }

        for (index, step) in self.scenario.steps.iter().enumerate() {
            let number = index + 1;
            debug!(step = number, action = step.action.name(), "scenario step");

            let result = match &step.benchmark {
                Some(benchmark) => {
                    let thresholds = benchmark.thresholds(ctx.thresholds());
                    let mut timer =
                        TimedAction::start(&mut ctx.status, benchmark.label.as_str(), thresholds);
                    let outcome = step.action.perform(&ctx.driver, timer.status()).await;
                    drop(timer);
                    outcome
                }
                None => step.action.perform(&ctx.driver, &mut ctx.status).await,
            };
            result.with_context(|| format!("step {number} ({})", step.action.name()))?;
        }
        Ok(())
    }
}
