//! Hard deadline for a plugin process.
//!
//! The async deadline in [`super::execute`] can only fire when the check
//! yields. A check that blocks its thread never yields, so a plain OS thread
//! waits out the whole run budget plus a grace period, releases the remote
//! session if one is still open, and terminates the process with a CRITICAL
//! line.

use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tracing::{error, info, warn};

use crate::nagios::{ServiceState, StatusAggregator};

/// The session endpoint of the current run, shared with the watchdog.
///
/// The runner fills it once a session is open and empties it after quit.
#[derive(Debug, Clone, Default)]
pub struct SessionSlot(Arc<Mutex<Option<String>>>);

impl SessionSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn set(&self, endpoint: String) {
        *self.lock() = Some(endpoint);
    }

    pub(crate) fn clear(&self) {
        *self.lock() = None;
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_none()
    }

    fn take(&self) -> Option<String> {
        self.lock().take()
    }

    fn lock(&self) -> MutexGuard<'_, Option<String>> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Disarmed when dropped.
pub struct Watchdog {
    _disarm: Sender<()>,
}

/// Start a watchdog that exits the process after `limit`.
///
/// Before exiting it deletes the session held in `session`, waiting at most
/// `quit_timeout` for the server.
pub fn arm(
    limit: Duration,
    timeout_secs: u64,
    session: SessionSlot,
    quit_timeout: Duration,
) -> std::io::Result<Watchdog> {
    let (tx, rx) = mpsc::channel::<()>();
    std::thread::Builder::new()
        .name("selcheck-watchdog".to_string())
        .spawn(move || {
            if let Err(RecvTimeoutError::Timeout) = rx.recv_timeout(limit) {
                error!(?limit, "check did not finish, watchdog terminating process");
                release(&session, quit_timeout);
                super::exit_with(&expired(timeout_secs));
            }
        })?;
    Ok(Watchdog { _disarm: tx })
}

/// Best-effort `DELETE` of the session left open by a blocked check.
fn release(session: &SessionSlot, quit_timeout: Duration) {
    let Some(endpoint) = session.take() else {
        return;
    };

    let result = reqwest::blocking::Client::builder()
        .timeout(quit_timeout)
        .build()
        .and_then(|client| client.delete(&endpoint).send());
    match result {
        Ok(response) => {
            info!(%endpoint, status = %response.status(), "released WebDriver session")
        }
        Err(e) => warn!(%endpoint, error = %e, "could not release WebDriver session"),
    }
}

fn expired(timeout_secs: u64) -> StatusAggregator {
    let mut status = StatusAggregator::new();
    status.add_message(format!(
        "Global timeout of {timeout_secs} seconds reached (watchdog)"
    ));
    status.escalate(ServiceState::Critical);
    status
}
