use std::path::PathBuf;

use clap::Parser;
use selcheck::plugin::{self, PluginArgs, PluginError};
use selcheck::scenario::{Scenario, ScenarioCheck};

#[derive(Parser)]
#[command(
    name = "selcheck",
    about = "Browser-driven Nagios checks over a remote WebDriver session",
    version,
    long_about = None
)]
struct Cli {
    #[command(flatten)]
    plugin: PluginArgs,

    /// Scenario file (TOML) listing the browser steps to run
    #[arg(short = 's', long)]
    scenario: PathBuf,
}

fn main() {
    let cli: Cli = plugin::parse_args();

    let scenario = match Scenario::load(&cli.scenario) {
        Ok(scenario) => scenario,
        Err(e) => plugin::exit_with_error(PluginError::Configuration(e.to_string())),
    };

    plugin::start(ScenarioCheck::new(scenario), cli.plugin)
}
