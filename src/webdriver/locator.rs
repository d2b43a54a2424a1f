//! Element locators and their wire-level strategy strings.

use serde::{Deserialize, Serialize};

/// How to find an element on the page.
///
/// In TOML scenarios a locator is written as an inline table with one key,
/// e.g. `{ css = "body" }` or `{ xpath = "//h1" }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Locator {
    Css(String),
    #[serde(rename = "xpath")]
    XPath(String),
    Id(String),
    Name(String),
    ClassName(String),
    LinkText(String),
    PartialLinkText(String),
    TagName(String),
}

impl Locator {
    /// The `using`/`value` pair sent to the server.
    ///
    /// W3C servers only understand css, xpath, link text, partial link text
    /// and tag name, so id, name and class lookups are rewritten as CSS.
    pub fn strategy(&self) -> (&'static str, String) {
        match self {
            Locator::Css(s) => ("css selector", s.clone()),
            Locator::XPath(s) => ("xpath", s.clone()),
            Locator::Id(s) => ("css selector", format!("[id=\"{}\"]", quote_css(s))),
            Locator::Name(s) => ("css selector", format!("[name=\"{}\"]", quote_css(s))),
            Locator::ClassName(s) => ("css selector", format!("[class~=\"{}\"]", quote_css(s))),
            Locator::LinkText(s) => ("link text", s.clone()),
            Locator::PartialLinkText(s) => ("partial link text", s.clone()),
            Locator::TagName(s) => ("tag name", s.clone()),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Locator::Css(_) => "css",
            Locator::XPath(_) => "xpath",
            Locator::Id(_) => "id",
            Locator::Name(_) => "name",
            Locator::ClassName(_) => "class",
            Locator::LinkText(_) => "link text",
            Locator::PartialLinkText(_) => "partial link text",
            Locator::TagName(_) => "tag",
        }
    }

    fn value(&self) -> &str {
        match self {
            Locator::Css(s)
            | Locator::XPath(s)
            | Locator::Id(s)
            | Locator::Name(s)
            | Locator::ClassName(s)
            | Locator::LinkText(s)
            | Locator::PartialLinkText(s)
            | Locator::TagName(s) => s,
        }
    }
}

/// Escape a value for use inside a double-quoted CSS attribute selector.
fn quote_css(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

impl std::fmt::Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}={}", self.kind(), self.value())
    }
}
