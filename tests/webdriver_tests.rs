mod common;

use std::time::Duration;

use common::{FakeDriver, SESSION_ID};
use selcheck::config::SessionConfig;
use selcheck::nagios::assertions::{verify_no_broken_images, verify_text_present_in_elem};
use selcheck::{
    BrowserKind, Locator, ServiceState, Session, StatusAggregator, WaitConfig, WebDriverError,
};

async fn open(fake: &FakeDriver, browser: BrowserKind) -> Session {
    Session::open(&fake.url(), browser, &SessionConfig::default())
        .await
        .expect("open session")
}

#[tokio::test]
async fn test_open_sends_capabilities() {
    let fake = FakeDriver::builder().spawn().await;
    let mut session = open(&fake, BrowserKind::Ie).await;
    assert_eq!(session.id(), SESSION_ID);
    assert_eq!(session.browser(), BrowserKind::Ie);

    {
        let recorded = fake.recorded();
        let body = &recorded.sessions_opened[0];
        assert_eq!(
            body["capabilities"]["alwaysMatch"]["browserName"],
            "internet explorer"
        );
        assert_eq!(body["desiredCapabilities"]["platform"], "WINDOWS");
    }

    session.quit().await.unwrap();
}

#[tokio::test]
async fn test_navigation_and_title() {
    let fake = FakeDriver::builder().title("Example Domain").spawn().await;
    let mut session = open(&fake, BrowserKind::Chrome).await;

    session.goto("https://example.com/").await.unwrap();
    assert_eq!(session.current_url().await.unwrap(), "https://example.com/");
    assert_eq!(session.title().await.unwrap(), "Example Domain");
    assert_eq!(fake.recorded().navigations, ["https://example.com/"]);

    session.quit().await.unwrap();
}

#[tokio::test]
async fn test_find_element_and_interact() {
    let fake = FakeDriver::builder()
        .element("[name=\"q\"]", "")
        .element("body", "Results for selenium")
        .spawn()
        .await;
    let mut session = open(&fake, BrowserKind::Firefox).await;

    let search = session
        .find_element(&Locator::Name("q".into()))
        .await
        .unwrap();
    search.send_keys("selenium").await.unwrap();
    search.click().await.unwrap();

    let body = session
        .find_element(&Locator::TagName("body".into()))
        .await
        .unwrap();
    assert_eq!(body.text().await.unwrap(), "Results for selenium");

    {
        let recorded = fake.recorded();
        assert_eq!(recorded.typed, ["selenium"]);
        assert_eq!(recorded.clicks, [search.id()]);
    }

    session.quit().await.unwrap();
}

#[tokio::test]
async fn test_missing_element() {
    let fake = FakeDriver::builder().spawn().await;
    let mut session = open(&fake, BrowserKind::Chrome).await;

    let err = session
        .find_element(&Locator::Css("#nope".into()))
        .await
        .unwrap_err();
    assert!(matches!(err, WebDriverError::NoSuchElement(_)), "{err:?}");

    session.quit().await.unwrap();
}

#[tokio::test]
async fn test_deferred_element_found_after_retries() {
    let fake = FakeDriver::builder()
        .deferred_element("#results", "3 results", 2)
        .spawn()
        .await;
    let mut session = open(&fake, BrowserKind::Chrome).await;

    let wait = WaitConfig::new(Duration::from_secs(5), Duration::from_millis(20));
    let element = session
        .find_deferred(&Locator::Css("#results".into()), wait)
        .await
        .unwrap();
    assert_eq!(element.text().await.unwrap(), "3 results");
    assert_eq!(fake.recorded().lookups["#results"], 3);

    session.quit().await.unwrap();
}

#[tokio::test]
async fn test_deferred_element_exhausted() {
    let fake = FakeDriver::builder().spawn().await;
    let mut session = open(&fake, BrowserKind::Chrome)
        .await
        .with_lookup(WaitConfig::new(
            Duration::from_millis(200),
            Duration::from_millis(50),
        ));

    let err = session.find_deferred_by_id("late").await.unwrap_err();
    match err {
        WebDriverError::ElementNotFound { locator, waited } => {
            assert_eq!(locator, Locator::Id("late".into()));
            assert_eq!(waited, Duration::from_millis(200));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(fake.recorded().lookups["[id=\"late\"]"] >= 2);

    session.quit().await.unwrap();
}

#[tokio::test]
async fn test_text_assertion_against_element() {
    let fake = FakeDriver::builder()
        .element("body", "Welcome back, admin")
        .spawn()
        .await;
    let mut session = open(&fake, BrowserKind::Chrome).await;
    let mut status = StatusAggregator::new();

    let body = session.find_deferred_by_css_selector("body").await.unwrap();
    let held = verify_text_present_in_elem(&mut status, &body, "Welcome", ServiceState::Critical)
        .await
        .unwrap();
    assert!(held);
    assert_eq!(status.state(), ServiceState::Ok);

    let held = verify_text_present_in_elem(&mut status, &body, "Logout", ServiceState::Warning)
        .await
        .unwrap();
    assert!(!held);
    assert_eq!(status.render(), "WARNING: Text not present: Logout");

    session.quit().await.unwrap();
}

#[tokio::test]
async fn test_broken_images() {
    let fake = FakeDriver::builder()
        .image("https://example.com/logo.png", 120, 40)
        .image("https://example.com/missing.png", 0, 0)
        .spawn()
        .await;
    let mut session = open(&fake, BrowserKind::Chrome).await;

    assert_eq!(
        session.broken_images().await.unwrap(),
        ["https://example.com/missing.png"]
    );

    let mut status = StatusAggregator::new();
    let clean = verify_no_broken_images(&mut status, &session, ServiceState::Warning)
        .await
        .unwrap();
    assert!(!clean);
    assert_eq!(
        status.render(),
        "WARNING: Broken images: https://example.com/missing.png"
    );
    assert_eq!(fake.recorded().scripts, ["execute/sync", "execute/sync"]);

    session.quit().await.unwrap();
}

#[tokio::test]
async fn test_execute_script_falls_back_to_wire_endpoint() {
    let fake = FakeDriver::builder()
        .wire_protocol_execute()
        .image("https://example.com/missing.png", 0, 0)
        .spawn()
        .await;
    let mut session = open(&fake, BrowserKind::HtmlUnitWithJs).await;

    assert_eq!(
        session.broken_images().await.unwrap(),
        ["https://example.com/missing.png"]
    );
    assert_eq!(fake.recorded().scripts, ["execute/sync", "execute"]);

    session.quit().await.unwrap();
}

#[tokio::test]
async fn test_page_source() {
    let html = "<html><head><title>Example</title></head><body>hi</body></html>";
    let fake = FakeDriver::builder().page_source(html).spawn().await;
    let mut session = open(&fake, BrowserKind::Chrome).await;

    assert_eq!(session.page_source().await.unwrap(), html);

    session.quit().await.unwrap();
}

#[tokio::test]
async fn test_find_elements() {
    let fake = FakeDriver::builder()
        .element("li", "first")
        .element("li", "second")
        .spawn()
        .await;
    let mut session = open(&fake, BrowserKind::Chrome).await;

    let items = session
        .find_elements(&Locator::TagName("li".into()))
        .await
        .unwrap();
    let mut texts = Vec::new();
    for item in &items {
        texts.push(item.text().await.unwrap());
    }
    assert_eq!(texts, ["first", "second"]);

    let none = session
        .find_elements(&Locator::Css("table".into()))
        .await
        .unwrap();
    assert!(none.is_empty());

    session.quit().await.unwrap();
}

#[tokio::test]
async fn test_attribute_and_clear() {
    let fake = FakeDriver::builder()
        .element("[name=\"q\"]", "")
        .attribute("placeholder", "Search the web")
        .spawn()
        .await;
    let mut session = open(&fake, BrowserKind::Chrome).await;

    let search = session
        .find_element(&Locator::Name("q".into()))
        .await
        .unwrap();
    assert_eq!(
        search.attribute("placeholder").await.unwrap().as_deref(),
        Some("Search the web")
    );
    assert_eq!(search.attribute("maxlength").await.unwrap(), None);

    search.clear().await.unwrap();
    assert_eq!(fake.recorded().clears, [search.id()]);

    session.quit().await.unwrap();
}

#[tokio::test]
async fn test_deferred_with_per_call_wait() {
    let fake = FakeDriver::builder()
        .deferred_element("[id=\"links\"]", "3 results", 2)
        .spawn()
        .await;
    let mut session = open(&fake, BrowserKind::Chrome)
        .await
        .with_lookup(WaitConfig::new(Duration::ZERO, Duration::from_millis(10)));

    // The session default gives up after a single miss.
    let err = session.find_deferred_by_id("links").await.unwrap_err();
    assert!(matches!(err, WebDriverError::ElementNotFound { .. }), "{err:?}");

    let wait = WaitConfig::new(Duration::from_secs(5), Duration::from_millis(20));
    let lookup = session.deferred(wait);
    assert_eq!(lookup.wait(), wait);
    let links = lookup.by_id("links").await.unwrap();
    assert_eq!(links.text().await.unwrap(), "3 results");
    assert_eq!(fake.recorded().lookups["[id=\"links\"]"], 3);

    session.quit().await.unwrap();
}

#[tokio::test]
async fn test_quit_is_idempotent_and_final() {
    let fake = FakeDriver::builder().spawn().await;
    let mut session = open(&fake, BrowserKind::Chrome).await;

    session.quit().await.unwrap();
    session.quit().await.unwrap();
    assert!(session.is_closed());
    assert_eq!(fake.recorded().sessions_closed, [SESSION_ID]);

    let err = session.title().await.unwrap_err();
    assert!(matches!(err, WebDriverError::SessionClosed(_)));
}

#[tokio::test]
async fn test_session_refused() {
    let fake = FakeDriver::builder().refuse_sessions().spawn().await;
    let err = Session::open(&fake.url(), BrowserKind::Safari, &SessionConfig::default())
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "session not created: browser not available");
}

#[tokio::test]
async fn test_unreachable_server() {
    let err = Session::open(
        "http://127.0.0.1:9/wd/hub",
        BrowserKind::Chrome,
        &SessionConfig::default(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, WebDriverError::Http(_)), "{err:?}");
}
