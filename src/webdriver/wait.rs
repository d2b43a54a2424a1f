//! Deferred element lookup: poll for elements that appear asynchronously.
//!
//! Pages that render content from JavaScript often have no element to find
//! at the moment navigation completes. The helpers here retry a lookup at a
//! fixed interval until it succeeds or the wait runs out.

use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::debug;

use super::{Element, Locator, Result, Session, WebDriverError};

/// Default time to wait for a deferred element (5 seconds).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default interval between lookups (500ms).
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// How long to keep retrying, and how often.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitConfig {
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl WaitConfig {
    pub fn new(timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            timeout,
            poll_interval,
        }
    }

    /// Custom timeout with the default poll interval.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::new(timeout, DEFAULT_POLL_INTERVAL)
    }
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT, DEFAULT_POLL_INTERVAL)
    }
}

impl Session {
    /// Poll for an element until it exists or `wait.timeout` elapses.
    ///
    /// Only "no such element" answers are retried; any other failure is
    /// returned straight away. Exhausting the wait yields
    /// [`WebDriverError::ElementNotFound`].
    pub async fn find_deferred(&self, locator: &Locator, wait: WaitConfig) -> Result<Element<'_>> {
        let start = Instant::now();
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            match self.find_element(locator).await {
                Ok(element) => {
                    debug!(%locator, attempts, "deferred element found");
                    return Ok(element);
                }
                Err(WebDriverError::NoSuchElement(_)) => {}
                Err(e) => return Err(e),
            }

            let elapsed = start.elapsed();
            if elapsed >= wait.timeout {
                debug!(%locator, attempts, "deferred element lookup exhausted");
                return Err(WebDriverError::ElementNotFound {
                    locator: locator.clone(),
                    waited: wait.timeout,
                });
            }

            sleep(wait.poll_interval.min(wait.timeout - elapsed)).await;
        }
    }

    /// Deferred lookups with a wait other than the session default.
    ///
    /// ```ignore
    /// let wait = WaitConfig::new(Duration::from_secs(20), Duration::from_secs(1));
    /// let results = session.deferred(wait).by_id("links").await?;
    /// ```
    pub fn deferred(&self, wait: WaitConfig) -> Deferred<'_> {
        Deferred {
            session: self,
            wait,
        }
    }

    pub async fn find_deferred_by_xpath(&self, xpath: &str) -> Result<Element<'_>> {
        self.deferred(self.lookup()).by_xpath(xpath).await
    }

    pub async fn find_deferred_by_class(&self, class_name: &str) -> Result<Element<'_>> {
        self.deferred(self.lookup()).by_class(class_name).await
    }

    pub async fn find_deferred_by_css_selector(&self, selector: &str) -> Result<Element<'_>> {
        self.deferred(self.lookup()).by_css_selector(selector).await
    }

    pub async fn find_deferred_by_id(&self, id: &str) -> Result<Element<'_>> {
        self.deferred(self.lookup()).by_id(id).await
    }

    pub async fn find_deferred_by_link_text(&self, link_text: &str) -> Result<Element<'_>> {
        self.deferred(self.lookup()).by_link_text(link_text).await
    }

    pub async fn find_deferred_by_tag_name(&self, tag_name: &str) -> Result<Element<'_>> {
        self.deferred(self.lookup()).by_tag_name(tag_name).await
    }

    pub async fn find_deferred_by_name(&self, name: &str) -> Result<Element<'_>> {
        self.deferred(self.lookup()).by_name(name).await
    }
}

/// Deferred lookups bound to one [`WaitConfig`]; see [`Session::deferred`].
#[derive(Debug, Clone, Copy)]
pub struct Deferred<'a> {
    session: &'a Session,
    wait: WaitConfig,
}

impl<'a> Deferred<'a> {
    pub fn wait(&self) -> WaitConfig {
        self.wait
    }

    async fn find(&self, locator: Locator) -> Result<Element<'a>> {
        self.session.find_deferred(&locator, self.wait).await
    }

    pub async fn by_xpath(&self, xpath: &str) -> Result<Element<'a>> {
        self.find(Locator::XPath(xpath.to_string())).await
    }

    pub async fn by_class(&self, class_name: &str) -> Result<Element<'a>> {
        self.find(Locator::ClassName(class_name.to_string())).await
    }

    pub async fn by_css_selector(&self, selector: &str) -> Result<Element<'a>> {
        self.find(Locator::Css(selector.to_string())).await
    }

    pub async fn by_id(&self, id: &str) -> Result<Element<'a>> {
        self.find(Locator::Id(id.to_string())).await
    }

    pub async fn by_link_text(&self, link_text: &str) -> Result<Element<'a>> {
        self.find(Locator::LinkText(link_text.to_string())).await
    }

    pub async fn by_tag_name(&self, tag_name: &str) -> Result<Element<'a>> {
        self.find(Locator::TagName(tag_name.to_string())).await
    }

    pub async fn by_name(&self, name: &str) -> Result<Element<'a>> {
        self.find(Locator::Name(name.to_string())).await
    }
}
