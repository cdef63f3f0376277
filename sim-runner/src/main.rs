// sim-runner/src/main.rs
// anomaly-sim - run any workload generator by name

use anyhow::{Context, Result};
use clap::{Arg, ArgAction, Command};
use sim_runner::config::{Config, DEFAULT_CONFIG_PATH};
use sim_runner::launch::{self, RunOptions, EXIT_USAGE};
use sim_runner::telemetry;
use sim_runner::{LogFormat, ScenarioKind};
use std::net::SocketAddr;
use tracing::{debug, warn};

fn cli() -> Command {
    Command::new("anomaly-sim")
        .version(env!("CARGO_PKG_VERSION"))
        .author("SentinelEdge Team")
        .about("Phased resource-pressure workloads for anomaly detector testing")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value(DEFAULT_CONFIG_PATH),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .help("Print a JSON run summary as the last line of stdout")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("log-format")
                .long("log-format")
                .value_name("FORMAT")
                .help("Log format on stderr")
                .value_parser(["text", "json"]),
        )
        .arg(
            Arg::new("metrics-addr")
                .long("metrics-addr")
                .value_name("ADDR")
                .help("Serve Prometheus metrics on this address during the run")
                .value_parser(clap::value_parser!(SocketAddr)),
        )
        .arg(
            Arg::new("list")
                .long("list")
                .help("List available scenarios and exit")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("scenario")
                .value_name("SCENARIO")
                .help("Scenario to run, see --list")
                .required_unless_present("list"),
        )
        .arg(
            Arg::new("value")
                .value_name("VALUE")
                .help("MAX_THREADS for fork-bomb-gradual, PATTERN for ml-test-pattern")
                .allow_negative_numbers(true),
        )
}

fn print_scenarios() {
    println!("📚 Available scenarios:");
    for kind in ScenarioKind::ALL {
        let name = match kind.argument() {
            Some(arg) => format!("{} [{}]", kind.name(), arg),
            None => kind.name().to_string(),
        };
        println!("   • {:<32} {}", name, kind.summary());
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();

    if matches.get_flag("list") {
        print_scenarios();
        return Ok(());
    }

    let config_path = matches
        .get_one::<String>("config")
        .map(String::as_str)
        .unwrap_or(DEFAULT_CONFIG_PATH);
    let mut config = Config::load(config_path)?;
    if let Some(format) = matches.get_one::<String>("log-format") {
        config.logging.format = format.parse::<LogFormat>()?;
    }
    if let Some(addr) = matches.get_one::<SocketAddr>("metrics-addr") {
        config.metrics.listen = Some(*addr);
    }

    telemetry::init_logging(&config.logging, "info");
    match &config.source {
        Some(path) => debug!("Loaded config from {}", path.display()),
        None if matches.value_source("config") == Some(clap::parser::ValueSource::CommandLine) => {
            warn!("Config file {} not found, using defaults", config_path)
        }
        None => debug!("No config file, using defaults"),
    }

    let scenario = matches
        .get_one::<String>("scenario")
        .context("missing SCENARIO")?;
    let kind = match scenario.parse::<ScenarioKind>() {
        Ok(kind) => kind,
        Err(e) => {
            eprintln!("{}", e);
            print_scenarios();
            std::process::exit(EXIT_USAGE);
        }
    };
    let value = match launch::parse_value(kind, matches.get_one::<String>("value").map(String::as_str)) {
        Ok(value) => value,
        Err(usage) => {
            eprint!("{}", usage);
            std::process::exit(EXIT_USAGE);
        }
    };

    if let Some(addr) = config.metrics.listen {
        telemetry::install_metrics(addr)?;
    }

    let options = RunOptions {
        config,
        json: matches.get_flag("json"),
    };
    let code = launch::run(kind, value, &options).await?;
    std::process::exit(code);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_consistent() {
        cli().debug_assert();
    }

    #[test]
    fn test_list_needs_no_scenario() {
        let matches = cli().try_get_matches_from(["anomaly-sim", "--list"]).unwrap();
        assert!(matches.get_flag("list"));
        assert!(cli().try_get_matches_from(["anomaly-sim"]).is_err());
    }

    #[test]
    fn test_negative_value_reaches_the_parser() {
        let matches = cli()
            .try_get_matches_from(["anomaly-sim", "--json", "ml-test-pattern", "-2"])
            .unwrap();
        assert_eq!(matches.get_one::<String>("value").map(String::as_str), Some("-2"));
        assert!(matches.get_flag("json"));
    }
}
