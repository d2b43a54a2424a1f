//! Supported browser kinds and the capabilities requested for each.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserKind {
    Chrome,
    Firefox,
    #[value(name = "phantomjs")]
    PhantomJs,
    Safari,
    Ie,
    Opera,
    #[value(name = "htmlunit")]
    HtmlUnit,
    #[value(name = "htmlunit_with_js", alias = "htmlunit_withjs")]
    #[serde(rename = "htmlunit_with_js", alias = "htmlunit_withjs")]
    HtmlUnitWithJs,
    #[value(name = "ipad")]
    IPad,
    #[value(name = "iphone")]
    IPhone,
    Android,
}

impl BrowserKind {
    pub fn as_str(self) -> &'static str {
        match self {
            BrowserKind::Chrome => "chrome",
            BrowserKind::Firefox => "firefox",
            BrowserKind::PhantomJs => "phantomjs",
            BrowserKind::Safari => "safari",
            BrowserKind::Ie => "ie",
            BrowserKind::Opera => "opera",
            BrowserKind::HtmlUnit => "htmlunit",
            BrowserKind::HtmlUnitWithJs => "htmlunit_with_js",
            BrowserKind::IPad => "ipad",
            BrowserKind::IPhone => "iphone",
            BrowserKind::Android => "android",
        }
    }

    /// The `browserName` capability the remote server matches on.
    pub fn browser_name(self) -> &'static str {
        match self {
            BrowserKind::Ie => "internet explorer",
            BrowserKind::HtmlUnit | BrowserKind::HtmlUnitWithJs => "htmlunit",
            BrowserKind::IPad => "iPad",
            BrowserKind::IPhone => "iPhone",
            other => other.as_str(),
        }
    }

    fn platform(self) -> &'static str {
        match self {
            BrowserKind::Ie => "WINDOWS",
            BrowserKind::IPad | BrowserKind::IPhone | BrowserKind::Safari => "MAC",
            BrowserKind::Android => "ANDROID",
            _ => "ANY",
        }
    }

    /// W3C `alwaysMatch` capabilities. Only standard keys, since strict
    /// drivers reject unknown ones.
    pub fn w3c_capabilities(self) -> Value {
        json!({ "browserName": self.browser_name() })
    }

    /// Desired capabilities for JSON wire protocol servers.
    pub fn legacy_capabilities(self) -> Value {
        let javascript = !matches!(self, BrowserKind::HtmlUnit);
        json!({
            "browserName": self.browser_name(),
            "version": "",
            "platform": self.platform(),
            "javascriptEnabled": javascript,
        })
    }
}

impl std::fmt::Display for BrowserKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
