//! Performance data points in Nagios plugin syntax.

use serde::{Deserialize, Serialize};

use super::format_value;

/// Unit of measure attached to a performance data value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Uom {
    Seconds,
    Milliseconds,
    Percent,
    Bytes,
    Kilobytes,
    Megabytes,
    Terabytes,
    Counter,
    #[default]
    None,
}

impl Uom {
    pub fn as_str(self) -> &'static str {
        match self {
            Uom::Seconds => "s",
            Uom::Milliseconds => "ms",
            Uom::Percent => "%",
            Uom::Bytes => "B",
            Uom::Kilobytes => "KB",
            Uom::Megabytes => "MB",
            Uom::Terabytes => "TB",
            Uom::Counter => "c",
            Uom::None => "",
        }
    }
}

/// A labelled measurement with optional thresholds and range.
///
/// Renders as `'label'=value[uom];[warn];[crit];[min];[max]`. Absent fields
/// stay empty, so a timing point looks like `'login'=1.52s;3;5;;`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerfData {
    pub label: String,
    pub value: f64,
    pub uom: Uom,
    pub warning: Option<f64>,
    pub critical: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl PerfData {
    pub fn new(label: impl Into<String>, value: f64, uom: Uom) -> Self {
        Self {
            label: label.into(),
            value,
            uom,
            warning: None,
            critical: None,
            min: None,
            max: None,
        }
    }

    pub fn with_thresholds(mut self, warning: f64, critical: f64) -> Self {
        self.warning = Some(warning);
        self.critical = Some(critical);
        self
    }

    pub fn with_range(mut self, min: f64, max: f64) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }
}

fn optional(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

impl std::fmt::Display for PerfData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Single quotes inside a quoted label are doubled.
        write!(
            f,
            "'{}'={}{};{};{};{};{}",
            self.label.replace('\'', "''"),
            format_value(self.value),
            self.uom.as_str(),
            optional(self.warning),
            optional(self.critical),
            optional(self.min),
            optional(self.max),
        )
    }
}
