//! Command-line arguments shared by every plugin.

use std::path::PathBuf;

use clap::error::ErrorKind;
use clap::Parser;

use crate::webdriver::BrowserKind;

/// Flags every selcheck plugin accepts.
///
/// Plugins needing more flags flatten this into their own parser:
///
/// ```ignore
/// #[derive(Parser)]
/// struct Cli {
///     #[command(flatten)]
///     plugin: PluginArgs,
///     #[arg(long)]
///     query: String,
/// }
/// ```
#[derive(Debug, Clone, Parser)]
pub struct PluginArgs {
    /// WebDriver remote host, e.g. http://127.0.0.1:4444/wd/hub
    #[arg(short = 'H', long)]
    pub host: String,

    /// Timeout in seconds for the whole execution
    #[arg(short = 't', long, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: u64,

    /// Browser to request from the remote host
    #[arg(short = 'b', long, value_enum)]
    pub browser: BrowserKind,

    /// Configuration file (TOML); defaults to $SELCHECK_CONFIG or /etc/selcheck/selcheck.toml
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,
}

/// What to do with a failed argument parse.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum ParseFailure {
    /// `--help` or `--version`: print clap's output and exit 0.
    Informational,
    /// Anything else: report UNKNOWN with this one-line description.
    Invalid(String),
}

pub(crate) fn classify(err: &clap::Error) -> ParseFailure {
    match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ParseFailure::Informational,
        _ => {
            let rendered = err.to_string();
            let first = rendered
                .lines()
                .map(str::trim)
                .find(|line| !line.is_empty())
                .unwrap_or("invalid arguments");
            ParseFailure::Invalid(first.trim_start_matches("error: ").to_string())
        }
    }
}
