//! Minimal WebDriver client for driving a remote browser server.
//!
//! Speaks the W3C WebDriver protocol over HTTP and accepts the older JSON
//! wire protocol responses that Selenium 2 grids still return.

pub mod browser;
pub mod locator;
pub mod session;
pub mod wait;

pub use browser::BrowserKind;
pub use locator::Locator;
pub use session::{Element, Session};
pub use wait::{Deferred, WaitConfig, DEFAULT_POLL_INTERVAL, DEFAULT_TIMEOUT};

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WebDriverError {
    #[error("invalid WebDriver server URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("no such element: {0}")]
    NoSuchElement(String),

    #[error("timeout occurred while waiting for element: {locator} (waited {waited:?})")]
    ElementNotFound { locator: Locator, waited: Duration },

    #[error("{error}: {message}")]
    Protocol { error: String, message: String },

    #[error("unexpected WebDriver response: {0}")]
    UnexpectedResponse(String),

    #[error("session {0} is already closed")]
    SessionClosed(String),
}

pub type Result<T> = std::result::Result<T, WebDriverError>;
