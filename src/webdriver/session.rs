//! Remote WebDriver session and element handles.

use reqwest::{Client, Method, StatusCode, Url};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use super::{BrowserKind, Locator, Result, WaitConfig, WebDriverError};
use crate::config::SessionConfig;

/// W3C element reference key.
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";
/// JSON wire protocol element reference key.
const LEGACY_ELEMENT_KEY: &str = "ELEMENT";

/// Collects src and natural size of every image in one round trip.
const IMAGE_INFO_SCRIPT: &str = r#"
    var imageinfo = [];
    for (var i = 0; i < document.images.length; i++) {
        imageinfo.push({
            src: document.images[i].src,
            naturalHeight: document.images[i].naturalHeight,
            naturalWidth: document.images[i].naturalWidth
        });
    }
    return imageinfo;"#;

/// Special keys for [`Element::send_keys`].
pub mod keys {
    pub const TAB: &str = "\u{E004}";
    pub const RETURN: &str = "\u{E006}";
    pub const ENTER: &str = "\u{E007}";
    pub const ESCAPE: &str = "\u{E00C}";
}

/// An open session on a remote WebDriver server.
///
/// Call [`Session::quit`] before dropping it; the plugin runner does this on
/// every exit path.
#[derive(Debug)]
pub struct Session {
    client: Client,
    base: String,
    id: String,
    browser: BrowserKind,
    lookup: WaitConfig,
    closed: bool,
}

impl Session {
    /// Open a new browser session on the server at `host`.
    pub async fn open(host: &str, browser: BrowserKind, config: &SessionConfig) -> Result<Self> {
        let base = normalize_host(host)?;
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        let body = json!({
            "capabilities": { "alwaysMatch": browser.w3c_capabilities() },
            "desiredCapabilities": browser.legacy_capabilities(),
        });

        info!(%base, %browser, "opening WebDriver session");
        let response = client
            .post(format!("{base}/session"))
            .json(&body)
            .send()
            .await?;
        let status = response.status();
        let bytes = response.bytes().await?;
        let reply = decode(status, &bytes)?;

        let id = session_id(&reply).ok_or_else(|| {
            WebDriverError::UnexpectedResponse(format!(
                "new session response has no sessionId: {reply}"
            ))
        })?;
        debug!(session = %id, "session established");

        Ok(Self {
            client,
            base,
            id,
            browser,
            lookup: WaitConfig::default(),
            closed: false,
        })
    }

    /// Set the default wait used by the `find_deferred_by_*` helpers.
    pub fn with_lookup(mut self, lookup: WaitConfig) -> Self {
        self.lookup = lookup;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn browser(&self) -> BrowserKind {
        self.browser
    }

    pub fn lookup(&self) -> WaitConfig {
        self.lookup
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// URL of this session on the server; `DELETE` on it ends the session.
    pub fn endpoint(&self) -> String {
        format!("{}/session/{}", self.base, self.id)
    }

    async fn command(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value> {
        if self.closed {
            return Err(WebDriverError::SessionClosed(self.id.clone()));
        }

        let url = format!("{}{}", self.endpoint(), path);
        debug!(%method, %url, "webdriver command");

        let mut request = self.client.request(method, &url);
        if let Some(body) = body {
            request = request.json(&body);
        }
        let response = request.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;
        decode(status, &bytes).map(take_value)
    }

    pub async fn goto(&self, url: &str) -> Result<()> {
        info!(%url, "navigating");
        self.command(Method::POST, "/url", Some(json!({ "url": url })))
            .await?;
        Ok(())
    }

    pub async fn current_url(&self) -> Result<String> {
        into_string(self.command(Method::GET, "/url", None).await?)
    }

    pub async fn title(&self) -> Result<String> {
        into_string(self.command(Method::GET, "/title", None).await?)
    }

    pub async fn page_source(&self) -> Result<String> {
        into_string(self.command(Method::GET, "/source", None).await?)
    }

    /// Find the first element matching `locator`, failing immediately with
    /// [`WebDriverError::NoSuchElement`] when there is none.
    pub async fn find_element(&self, locator: &Locator) -> Result<Element<'_>> {
        let (using, value) = locator.strategy();
        let reply = self
            .command(
                Method::POST,
                "/element",
                Some(json!({ "using": using, "value": value })),
            )
            .await?;
        let id = element_id(&reply).ok_or_else(|| {
            WebDriverError::UnexpectedResponse(format!("not an element reference: {reply}"))
        })?;
        Ok(Element { session: self, id })
    }

    pub async fn find_elements(&self, locator: &Locator) -> Result<Vec<Element<'_>>> {
        let (using, value) = locator.strategy();
        let reply = self
            .command(
                Method::POST,
                "/elements",
                Some(json!({ "using": using, "value": value })),
            )
            .await?;
        let items = match reply {
            Value::Array(items) => items,
            other => {
                return Err(WebDriverError::UnexpectedResponse(format!(
                    "expected a list of elements, got {other}"
                )))
            }
        };
        Ok(items
            .iter()
            .filter_map(element_id)
            .map(|id| Element { session: self, id })
            .collect())
    }

    /// Run synchronous JavaScript in the page and return its result.
    pub async fn execute_script(&self, script: &str, args: Vec<Value>) -> Result<Value> {
        let body = json!({ "script": script, "args": args });
        match self
            .command(Method::POST, "/execute/sync", Some(body.clone()))
            .await
        {
            Err(WebDriverError::Protocol { ref error, .. })
                if matches!(error.as_str(), "unknown command" | "unknown method" | "status 9") =>
            {
                debug!("falling back to JSON wire execute endpoint");
                self.command(Method::POST, "/execute", Some(body)).await
            }
            other => other,
        }
    }

    /// Sources of images on the current page whose natural width and height
    /// are both zero, which is how a failed load shows up in the DOM.
    pub async fn broken_images(&self) -> Result<Vec<String>> {
        let images = self.execute_script(IMAGE_INFO_SCRIPT, Vec::new()).await?;
        let images = match images {
            Value::Array(images) => images,
            other => {
                return Err(WebDriverError::UnexpectedResponse(format!(
                    "image info script returned {other}"
                )))
            }
        };

        Ok(images
            .iter()
            .filter(|img| {
                dimension(img, "naturalWidth") == 0 && dimension(img, "naturalHeight") == 0
            })
            .map(|img| img["src"].as_str().unwrap_or_default().to_string())
            .collect())
    }

    /// Delete the session on the server. Later calls are no-ops.
    pub async fn quit(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        info!(session = %self.id, "closing WebDriver session");
        let result = self.command(Method::DELETE, "", None).await;
        self.closed = true;
        result.map(|_| ())
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if !self.closed {
            warn!(session = %self.id, "WebDriver session dropped without quit");
        }
    }
}

/// Handle to an element inside a [`Session`].
#[derive(Debug, Clone)]
pub struct Element<'a> {
    session: &'a Session,
    id: String,
}

impl Element<'_> {
    pub fn id(&self) -> &str {
        &self.id
    }

    fn path(&self, suffix: &str) -> String {
        format!("/element/{}{}", self.id, suffix)
    }

    /// Rendered (visible) text of the element.
    pub async fn text(&self) -> Result<String> {
        into_string(
            self.session
                .command(Method::GET, &self.path("/text"), None)
                .await?,
        )
    }

    pub async fn attribute(&self, name: &str) -> Result<Option<String>> {
        let value = self
            .session
            .command(Method::GET, &self.path(&format!("/attribute/{name}")), None)
            .await?;
        Ok(match value {
            Value::Null => None,
            Value::String(s) => Some(s),
            other => Some(other.to_string()),
        })
    }

    pub async fn click(&self) -> Result<()> {
        self.session
            .command(Method::POST, &self.path("/click"), Some(json!({})))
            .await?;
        Ok(())
    }

    pub async fn clear(&self) -> Result<()> {
        self.session
            .command(Method::POST, &self.path("/clear"), Some(json!({})))
            .await?;
        Ok(())
    }

    /// Type `text` into the element. See [`keys`] for special keys.
    pub async fn send_keys(&self, text: &str) -> Result<()> {
        // W3C reads "text", the JSON wire protocol reads "value".
        let chars: Vec<String> = text.chars().map(String::from).collect();
        self.session
            .command(
                Method::POST,
                &self.path("/value"),
                Some(json!({ "text": text, "value": chars })),
            )
            .await?;
        Ok(())
    }
}

fn normalize_host(host: &str) -> Result<String> {
    let trimmed = host.trim().trim_end_matches('/');
    let url = Url::parse(trimmed).map_err(|e| WebDriverError::InvalidUrl {
        url: host.to_string(),
        reason: e.to_string(),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(WebDriverError::InvalidUrl {
            url: host.to_string(),
            reason: format!("unsupported scheme '{}'", url.scheme()),
        });
    }
    Ok(trimmed.to_string())
}

/// Turn an HTTP reply into the JSON document, mapping both W3C error objects
/// and JSON wire protocol status codes onto [`WebDriverError`].
pub(crate) fn decode(status: StatusCode, body: &[u8]) -> Result<Value> {
    let json: Value = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(body).map_err(|_| {
            let snippet: String = String::from_utf8_lossy(body).chars().take(200).collect();
            WebDriverError::UnexpectedResponse(format!("HTTP {status}: {snippet}"))
        })?
    };

    let message = || {
        json.pointer("/value/message")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };

    // JSON wire protocol: 0 is success, 7 is NoSuchElement.
    if let Some(code) = json.get("status").and_then(Value::as_i64) {
        match code {
            0 => {}
            7 => return Err(WebDriverError::NoSuchElement(message())),
            _ => {
                return Err(WebDriverError::Protocol {
                    error: format!("status {code}"),
                    message: message(),
                })
            }
        }
    }

    if let Some(error) = json.pointer("/value/error").and_then(Value::as_str) {
        return Err(if error == "no such element" {
            WebDriverError::NoSuchElement(message())
        } else {
            WebDriverError::Protocol {
                error: error.to_string(),
                message: message(),
            }
        });
    }

    if !status.is_success() {
        return Err(WebDriverError::UnexpectedResponse(format!(
            "HTTP {status}: {json}"
        )));
    }

    Ok(json)
}

fn take_value(mut json: Value) -> Value {
    json.get_mut("value").map(Value::take).unwrap_or(Value::Null)
}

fn session_id(reply: &Value) -> Option<String> {
    reply
        .get("sessionId")
        .or_else(|| reply.pointer("/value/sessionId"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn element_id(reference: &Value) -> Option<String> {
    reference
        .get(ELEMENT_KEY)
        .or_else(|| reference.get(LEGACY_ELEMENT_KEY))
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn dimension(image: &Value, key: &str) -> i64 {
    image
        .get(key)
        .and_then(|v| v.as_i64().or_else(|| v.as_f64().map(|f| f as i64)))
        .unwrap_or(0)
}

fn into_string(value: Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s),
        Value::Null => Ok(String::new()),
        other => Err(WebDriverError::UnexpectedResponse(format!(
            "expected a string, got {other}"
        ))),
    }
}
