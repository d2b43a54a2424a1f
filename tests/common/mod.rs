//! In-process fake WebDriver server for integration tests.
//!
//! Serves the small part of the W3C protocol selcheck uses under `/wd/hub`
//! and records what the client did, so tests can assert on navigation,
//! typing, and above all that every session was closed.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

pub const SESSION_ID: &str = "fake-session-1";

type Reply = (StatusCode, Json<Value>);

#[derive(Debug, Default)]
pub struct Recorded {
    pub sessions_opened: Vec<Value>,
    pub sessions_closed: Vec<String>,
    pub navigations: Vec<String>,
    pub typed: Vec<String>,
    pub clicks: Vec<String>,
    pub clears: Vec<String>,
    pub lookups: HashMap<String, u32>,
    /// Script endpoints hit, `execute/sync` or `execute`.
    pub scripts: Vec<&'static str>,
}

#[derive(Debug, Clone)]
struct FakeElement {
    selector: String,
    text: String,
    appears_after: u32,
    attributes: HashMap<String, String>,
}

#[derive(Debug, Clone, Default)]
pub struct FakeDriverConfig {
    title: String,
    page_source: String,
    elements: Vec<FakeElement>,
    session_delay: Duration,
    navigation_delay: Duration,
    images: Vec<Value>,
    refuse_sessions: bool,
    wire_protocol_execute: bool,
}

impl FakeDriverConfig {
    pub fn title(mut self, title: &str) -> Self {
        self.title = title.to_string();
        self
    }

    /// An element found by `selector` (the lookup `value`, e.g. `body` or
    /// `[name="q"]`) with the given rendered text.
    pub fn element(self, selector: &str, text: &str) -> Self {
        self.deferred_element(selector, text, 0)
    }

    /// An element that only exists after `appears_after` failed lookups.
    pub fn deferred_element(mut self, selector: &str, text: &str, appears_after: u32) -> Self {
        self.elements.push(FakeElement {
            selector: selector.to_string(),
            text: text.to_string(),
            appears_after,
            attributes: HashMap::new(),
        });
        self
    }

    /// Set an attribute on the most recently added element.
    pub fn attribute(mut self, name: &str, value: &str) -> Self {
        if let Some(element) = self.elements.last_mut() {
            element.attributes.insert(name.to_string(), value.to_string());
        }
        self
    }

    pub fn page_source(mut self, html: &str) -> Self {
        self.page_source = html.to_string();
        self
    }

    /// Delay answering new session requests, like a grid waiting for a node.
    pub fn session_delay(mut self, delay: Duration) -> Self {
        self.session_delay = delay;
        self
    }

    /// Answer `unknown command` on `execute/sync` and serve scripts on the
    /// JSON wire `execute` endpoint instead.
    pub fn wire_protocol_execute(mut self) -> Self {
        self.wire_protocol_execute = true;
        self
    }

    pub fn navigation_delay(mut self, delay: Duration) -> Self {
        self.navigation_delay = delay;
        self
    }

    pub fn image(mut self, src: &str, width: u32, height: u32) -> Self {
        self.images.push(json!({
            "src": src,
            "naturalWidth": width,
            "naturalHeight": height,
        }));
        self
    }

    pub fn refuse_sessions(mut self) -> Self {
        self.refuse_sessions = true;
        self
    }

    pub async fn spawn(self) -> FakeDriver {
        let shared = Arc::new(Shared {
            config: self,
            recorded: Mutex::new(Recorded::default()),
        });

        let routes = Router::new()
            .route("/session", post(new_session))
            .route("/session/{sid}", axum::routing::delete(delete_session))
            .route("/session/{sid}/url", post(navigate).get(current_url))
            .route("/session/{sid}/title", get(title))
            .route("/session/{sid}/source", get(source))
            .route("/session/{sid}/element", post(find_element))
            .route("/session/{sid}/elements", post(find_elements))
            .route("/session/{sid}/element/{eid}/text", get(element_text))
            .route(
                "/session/{sid}/element/{eid}/attribute/{name}",
                get(element_attribute),
            )
            .route("/session/{sid}/element/{eid}/click", post(click))
            .route("/session/{sid}/element/{eid}/clear", post(clear))
            .route("/session/{sid}/element/{eid}/value", post(send_keys))
            .route("/session/{sid}/execute/sync", post(execute_sync))
            .route("/session/{sid}/execute", post(execute_wire));
        let app = Router::new()
            .nest("/wd/hub", routes)
            .with_state(shared.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake WebDriver server");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("fake WebDriver server");
        });

        FakeDriver { addr, shared }
    }
}

struct Shared {
    config: FakeDriverConfig,
    recorded: Mutex<Recorded>,
}

impl Shared {
    fn recorded(&self) -> MutexGuard<'_, Recorded> {
        self.recorded.lock().unwrap()
    }
}

pub struct FakeDriver {
    addr: SocketAddr,
    shared: Arc<Shared>,
}

impl FakeDriver {
    pub fn builder() -> FakeDriverConfig {
        FakeDriverConfig::default()
    }

    /// Remote host URL to pass as `--host`.
    pub fn url(&self) -> String {
        format!("http://{}/wd/hub", self.addr)
    }

    pub fn recorded(&self) -> MutexGuard<'_, Recorded> {
        self.shared.recorded()
    }
}

fn ok(value: Value) -> Reply {
    (StatusCode::OK, Json(json!({ "value": value })))
}

fn error(status: StatusCode, error: &str, message: &str) -> Reply {
    (
        status,
        Json(json!({ "value": { "error": error, "message": message, "stacktrace": "" } })),
    )
}

fn element_index(eid: &str) -> Option<usize> {
    eid.strip_prefix('e')?.parse().ok()
}

async fn new_session(State(s): State<Arc<Shared>>, Json(body): Json<Value>) -> Reply {
    if s.config.refuse_sessions {
        return error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "session not created",
            "browser not available",
        );
    }
    if !s.config.session_delay.is_zero() {
        tokio::time::sleep(s.config.session_delay).await;
    }
    s.recorded().sessions_opened.push(body);
    ok(json!({ "sessionId": SESSION_ID, "capabilities": {} }))
}

async fn delete_session(State(s): State<Arc<Shared>>, Path(sid): Path<String>) -> Reply {
    s.recorded().sessions_closed.push(sid);
    ok(Value::Null)
}

async fn navigate(State(s): State<Arc<Shared>>, Json(body): Json<Value>) -> Reply {
    if !s.config.navigation_delay.is_zero() {
        tokio::time::sleep(s.config.navigation_delay).await;
    }
    let url = body["url"].as_str().unwrap_or_default().to_string();
    s.recorded().navigations.push(url);
    ok(Value::Null)
}

async fn current_url(State(s): State<Arc<Shared>>) -> Reply {
    let last = s.recorded().navigations.last().cloned().unwrap_or_default();
    ok(json!(last))
}

async fn title(State(s): State<Arc<Shared>>) -> Reply {
    ok(json!(s.config.title))
}

async fn source(State(s): State<Arc<Shared>>) -> Reply {
    ok(json!(s.config.page_source))
}

fn reference(index: usize) -> Value {
    json!({ "element-6066-11e4-a52e-4f735466cecf": format!("e{index}") })
}

async fn find_element(State(s): State<Arc<Shared>>, Json(body): Json<Value>) -> Reply {
    let selector = body["value"].as_str().unwrap_or_default().to_string();
    let attempts = {
        let mut recorded = s.recorded();
        let count = recorded.lookups.entry(selector.clone()).or_insert(0);
        *count += 1;
        *count
    };

    let found = s
        .config
        .elements
        .iter()
        .position(|e| e.selector == selector)
        .filter(|&i| attempts > s.config.elements[i].appears_after);
    match found {
        Some(i) => ok(reference(i)),
        None => error(
            StatusCode::NOT_FOUND,
            "no such element",
            &format!("Unable to locate element: {selector}"),
        ),
    }
}

async fn find_elements(State(s): State<Arc<Shared>>, Json(body): Json<Value>) -> Reply {
    let selector = body["value"].as_str().unwrap_or_default();
    let found: Vec<Value> = s
        .config
        .elements
        .iter()
        .enumerate()
        .filter(|(_, e)| e.selector == selector && e.appears_after == 0)
        .map(|(i, _)| reference(i))
        .collect();
    ok(Value::Array(found))
}

async fn element_text(
    State(s): State<Arc<Shared>>,
    Path((_sid, eid)): Path<(String, String)>,
) -> Reply {
    match element_index(&eid).and_then(|i| s.config.elements.get(i)) {
        Some(element) => ok(json!(element.text)),
        None => error(StatusCode::NOT_FOUND, "stale element reference", &eid),
    }
}

async fn element_attribute(
    State(s): State<Arc<Shared>>,
    Path((_sid, eid, name)): Path<(String, String, String)>,
) -> Reply {
    match element_index(&eid).and_then(|i| s.config.elements.get(i)) {
        Some(element) => ok(json!(element.attributes.get(&name))),
        None => error(StatusCode::NOT_FOUND, "stale element reference", &eid),
    }
}

async fn clear(State(s): State<Arc<Shared>>, Path((_sid, eid)): Path<(String, String)>) -> Reply {
    s.recorded().clears.push(eid);
    ok(Value::Null)
}

async fn click(State(s): State<Arc<Shared>>, Path((_sid, eid)): Path<(String, String)>) -> Reply {
    s.recorded().clicks.push(eid);
    ok(Value::Null)
}

async fn send_keys(State(s): State<Arc<Shared>>, Json(body): Json<Value>) -> Reply {
    let text = body["text"].as_str().unwrap_or_default().to_string();
    s.recorded().typed.push(text);
    ok(Value::Null)
}

async fn execute_sync(State(s): State<Arc<Shared>>) -> Reply {
    s.recorded().scripts.push("execute/sync");
    if s.config.wire_protocol_execute {
        return error(
            StatusCode::NOT_FOUND,
            "unknown command",
            "POST /execute/sync is not supported",
        );
    }
    ok(Value::Array(s.config.images.clone()))
}

async fn execute_wire(State(s): State<Arc<Shared>>) -> Reply {
    s.recorded().scripts.push("execute");
    ok(Value::Array(s.config.images.clone()))
}
