//! Plugin runner: turns a [`Check`] into a Nagios plugin process.
//!
//! A run opens one remote browser session, gives the check a [`RunContext`]
//! under a global deadline, and always ends with exactly one status line on
//! stdout and the matching exit code, whatever the check did.

pub mod args;
pub mod watchdog;

pub use args::PluginArgs;
pub use watchdog::SessionSlot;

use std::any::Any;
use std::io::Write;
use std::panic::AssertUnwindSafe;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use clap::Parser;
use futures::FutureExt;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{info, warn};

use self::args::{classify, ParseFailure};
use crate::config::PluginConfig;
use crate::nagios::assertions;
use crate::nagios::{ServiceState, StatusAggregator, TimedAction, Thresholds};
use crate::webdriver::{Session, WaitConfig, WebDriverError};

/// Ways a run can end other than the check completing.
#[derive(Debug, Error)]
pub enum PluginError {
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Connection to WebDriver server failed: {0}")]
    Session(#[from] WebDriverError),

    #[error("Connection to WebDriver server timed out after {0} seconds")]
    SessionTimeout(u64),

    #[error("Global timeout of {0} seconds reached")]
    Timeout(u64),

    #[error("FAILED: {0}")]
    CheckFailed(String),
}

impl PluginError {
    /// Setup problems are UNKNOWN; anything that went wrong while checking
    /// is CRITICAL.
    pub fn state(&self) -> ServiceState {
        match self {
            PluginError::InvalidArguments(_)
            | PluginError::Configuration(_)
            | PluginError::Session(_)
            | PluginError::SessionTimeout(_) => ServiceState::Unknown,
            PluginError::Timeout(_) | PluginError::CheckFailed(_) => ServiceState::Critical,
        }
    }

    /// Add this outcome to `status`.
    pub fn record(&self, status: &mut StatusAggregator) {
        status.add_message(self.to_string());
        status.escalate(self.state());
    }
}

/// The browser-driven logic of a plugin.
///
/// ```ignore
/// struct DuckDuckGo;
///
/// #[async_trait::async_trait]
/// impl Check for DuckDuckGo {
///     async fn run(&self, ctx: &mut RunContext) -> anyhow::Result<()> {
///         timed(&mut ctx.status, "open_homepage", Thresholds::new(2.0, 5.0),
///               ctx.driver.goto("https://duckduckgo.com/")).await?;
///         let search = ctx.driver.find_element(&Locator::Name("q".into())).await?;
///         search.send_keys("selenium").await?;
///         timed(&mut ctx.status, "submit_form", ctx.thresholds(),
///               search.send_keys(keys::RETURN)).await?;
///         let body = ctx.driver.find_deferred_by_css_selector("body").await?;
///         verify_text_present_in_elem(&mut ctx.status, &body, "selenium",
///                                     ServiceState::Critical).await?;
///         Ok(())
///     }
/// }
///
/// fn main() {
///     selcheck::plugin::run_plugin(DuckDuckGo)
/// }
/// ```
#[async_trait::async_trait]
pub trait Check: Send + Sync {
    /// Perform the check. Returning `Err` makes the run CRITICAL with the
    /// error chain as the message.
    async fn run(&self, ctx: &mut RunContext) -> anyhow::Result<()>;
}

/// Everything a check works with during one run.
///
/// Fields are public so a check can borrow the driver and the status at the
/// same time, e.g. `timed(&mut ctx.status, .., ctx.driver.goto(..))`.
pub struct RunContext {
    pub driver: Session,
    pub status: StatusAggregator,
    pub config: PluginConfig,
}

impl RunContext {
    pub fn new(driver: Session, config: PluginConfig) -> Self {
        Self {
            driver,
            status: StatusAggregator::new(),
            config,
        }
    }

    pub fn driver(&self) -> &Session {
        &self.driver
    }

    pub fn status(&self) -> &StatusAggregator {
        &self.status
    }

    pub fn status_mut(&mut self) -> &mut StatusAggregator {
        &mut self.status
    }

    /// Default thresholds for timed blocks, from config.
    pub fn thresholds(&self) -> Thresholds {
        Thresholds::from(&self.config.thresholds)
    }

    /// Start a timed block with the configured default thresholds.
    pub fn timed_action(&mut self, label: &str) -> TimedAction<'_> {
        let thresholds = self.thresholds();
        TimedAction::start(&mut self.status, label, thresholds)
    }

    pub fn verify_equals<T>(
        &mut self,
        label: &str,
        actual: T,
        expected: T,
        error_state: ServiceState,
    ) -> bool
    where
        T: PartialEq + std::fmt::Display,
    {
        assertions::verify_equals(&mut self.status, label, actual, expected, error_state)
    }

    pub async fn verify_no_broken_images(
        &mut self,
        error_state: ServiceState,
    ) -> Result<bool, WebDriverError> {
        assertions::verify_no_broken_images(&mut self.status, &self.driver, error_state).await
    }
}

/// Run `check` once against the server named in `args`.
///
/// Never fails: every outcome, including setup errors, timeouts and panics,
/// ends up in the returned aggregator. The session is closed before this
/// returns whenever one was opened.
pub async fn execute<C>(check: &C, args: &PluginArgs, config: PluginConfig) -> StatusAggregator
where
    C: Check + ?Sized,
{
    execute_watched(check, args, config, &SessionSlot::new()).await
}

/// [`execute`], publishing the open session in `session` so a
/// [`watchdog`] can release it.
///
/// Opening the session and running the check share one `args.timeout`
/// budget; closing the session afterwards is bounded separately by
/// `session.quit_timeout_secs`.
pub async fn execute_watched<C>(
    check: &C,
    args: &PluginArgs,
    config: PluginConfig,
    session: &SessionSlot,
) -> StatusAggregator
where
    C: Check + ?Sized,
{
    let deadline = Instant::now() + Duration::from_secs(args.timeout);

    let opened = tokio::time::timeout_at(
        deadline,
        Session::open(&args.host, args.browser, &config.session),
    )
    .await;
    let driver = match opened {
        Ok(Ok(driver)) => driver.with_lookup(WaitConfig::from(&config.lookup)),
        Ok(Err(e)) => return setup_failure(PluginError::Session(e)),
        Err(_) => return setup_failure(PluginError::SessionTimeout(args.timeout)),
    };
    session.set(driver.endpoint());

    let quit_timeout = config.session.quit_timeout();
    let mut ctx = RunContext::new(driver, config);

    let outcome = tokio::time::timeout_at(
        deadline,
        AssertUnwindSafe(check.run(&mut ctx)).catch_unwind(),
    )
    .await;

    let failure = match outcome {
        Ok(Ok(Ok(()))) => None,
        Ok(Ok(Err(e))) => Some(PluginError::CheckFailed(format!("{e:#}"))),
        Ok(Err(panic)) => Some(PluginError::CheckFailed(format!(
            "check panicked: {}",
            panic_message(panic.as_ref())
        ))),
        Err(_) => Some(PluginError::Timeout(args.timeout)),
    };
    match &failure {
        None => info!(state = %ctx.status.state(), "check completed"),
        Some(err) => {
            warn!(error = %err, "check did not complete");
            err.record(&mut ctx.status);
        }
    }

    match tokio::time::timeout(quit_timeout, ctx.driver.quit()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(error = %e, "failed to close WebDriver session"),
        Err(_) => warn!(?quit_timeout, "timed out closing WebDriver session"),
    }
    session.clear();

    ctx.status
}

fn setup_failure(err: PluginError) -> StatusAggregator {
    warn!(error = %err, "plugin setup failed");
    let mut status = StatusAggregator::new();
    err.record(&mut status);
    status
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "no message".to_string()
    }
}

/// Parse the process arguments into `T`.
///
/// `--help` and `--version` print and exit 0. Any other parse error, such
/// as an unknown browser kind, prints an UNKNOWN line and exits 3.
pub fn parse_args<T: Parser>() -> T {
    match T::try_parse() {
        Ok(parsed) => parsed,
        Err(err) => match classify(&err) {
            ParseFailure::Informational => {
                let _ = err.print();
                std::process::exit(0)
            }
            ParseFailure::Invalid(msg) => exit_with_error(PluginError::InvalidArguments(msg)),
        },
    }
}

/// Run `check` as the whole process: load config, arm the watchdog, execute,
/// print the status line and exit.
pub fn start<C: Check>(check: C, args: PluginArgs) -> ! {
    init_tracing();

    let config = match PluginConfig::resolve(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => exit_with(&setup_failure(PluginError::Configuration(format!("{e:#}")))),
    };

    // Armed past the longest a well-behaved run can take, quit included.
    let session = SessionSlot::new();
    let quit_timeout = config.session.quit_timeout();
    let limit = Duration::from_secs(args.timeout + config.watchdog.grace_secs) + quit_timeout;
    let _watchdog = match watchdog::arm(limit, args.timeout, session.clone(), quit_timeout) {
        Ok(w) => Some(w),
        Err(e) => {
            warn!(error = %e, "could not start watchdog thread");
            None
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => exit_with(&setup_failure(PluginError::Configuration(format!(
            "failed to start async runtime: {e}"
        )))),
    };

    info!(host = %args.host, browser = %args.browser, timeout = args.timeout, "starting check");
    let status = runtime.block_on(execute_watched(&check, &args, config, &session));
    exit_with(&status)
}

/// Report a setup failure as UNKNOWN and exit.
pub fn exit_with_error(err: PluginError) -> ! {
    exit_with(&setup_failure(err))
}

/// Parse [`PluginArgs`] from the command line and [`start`] the check.
pub fn run_plugin<C: Check>(check: C) -> ! {
    let args = parse_args::<PluginArgs>();
    start(check, args)
}

static EMIT_LOCK: Mutex<()> = Mutex::new(());

/// Print the status line and exit with its code.
///
/// Serialized so the watchdog and the main thread cannot both print.
pub fn exit_with(status: &StatusAggregator) -> ! {
    let _guard = EMIT_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
    let mut out = std::io::stdout().lock();
    let _ = writeln!(out, "{}", status.render());
    let _ = out.flush();
    std::process::exit(status.exit_code())
}

/// Log to stderr so stdout carries nothing but the status line.
///
/// Level comes from `RUST_LOG` (default `warn`); set `SELCHECK_LOG_JSON` for
/// JSON lines.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let _ = if std::env::var_os("SELCHECK_LOG_JSON").is_some() {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}
