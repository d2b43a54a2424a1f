//! Check assertions that escalate the run status instead of aborting it.
//!
//! Every helper returns whether the assertion held. A failure escalates the
//! aggregator to `error_state` and appends a message; success leaves the
//! aggregator untouched.

use std::fmt::Display;

use tracing::info;

use super::{ServiceState, StatusAggregator};
use crate::webdriver::{Element, Session, WebDriverError};

/// Compare two values and flag a mismatch.
pub fn verify_equals<T>(
    status: &mut StatusAggregator,
    label: &str,
    actual: T,
    expected: T,
    error_state: ServiceState,
) -> bool
where
    T: PartialEq + Display,
{
    if actual == expected {
        return true;
    }

    info!(%label, %expected, %actual, "equality check failed");
    status.add_message(format!(
        "Test failed: {label}, expected: {expected}, actual: {actual}"
    ));
    status.escalate(error_state);
    false
}

/// Check that `text` occurs somewhere in `haystack`.
pub fn verify_text_present(
    status: &mut StatusAggregator,
    haystack: &str,
    text: &str,
    error_state: ServiceState,
) -> bool {
    if haystack.contains(text) {
        return true;
    }

    info!(%text, "expected text not present");
    status.add_message(format!("Text not present: {text}"));
    status.escalate(error_state);
    false
}

/// Check that `text` occurs in the rendered text of `element`.
///
/// Errors reading the element propagate; only a missing substring escalates.
pub async fn verify_text_present_in_elem(
    status: &mut StatusAggregator,
    element: &Element<'_>,
    text: &str,
    error_state: ServiceState,
) -> Result<bool, WebDriverError> {
    let rendered = element.text().await?;
    Ok(verify_text_present(status, &rendered, text, error_state))
}

/// Flag images on the current page that failed to load.
pub async fn verify_no_broken_images(
    status: &mut StatusAggregator,
    session: &Session,
    error_state: ServiceState,
) -> Result<bool, WebDriverError> {
    let broken = session.broken_images().await?;
    if broken.is_empty() {
        return Ok(true);
    }

    info!(count = broken.len(), "broken images on page");
    status.add_message(format!("Broken images: {}", broken.join(", ")));
    status.escalate(error_state);
    Ok(false)
}
