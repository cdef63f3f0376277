// sim-runner/src/launch.rs
// Runs one scenario end to end: validate, baseline, drive, summarize

use crate::config::{Config, LoggingConfig};
use crate::telemetry::{self, Baseline};
use anomaly_sim::config_validation::ConfigValidator;
use anomaly_sim::{ConsoleReporter, PhasedDriver, RunFlag, RunSummary, ScenarioKind, SimError};
use anyhow::Result;
use chrono::Utc;
use clap::{Arg, ArgAction, Command};
use tracing::{info, warn};

/// Exit code for usage errors and invalid selectors
pub const EXIT_USAGE: i32 = 1;

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub config: Config,
    /// Print the JSON run summary as the last stdout line
    pub json: bool,
}

/// Parse the optional positional number. `Err` carries the usage text.
///
/// Only the leading integer counts: `"12abc"` reads as 12 and text with no
/// digits reads as 0, which the scenario then clamps or rejects.
pub fn parse_value(kind: ScenarioKind, raw: Option<&str>) -> std::result::Result<Option<i64>, String> {
    match raw {
        None => Ok(None),
        Some(text) if kind.argument().is_some() => Ok(Some(leading_integer(text))),
        Some(_) => Err(kind.usage()),
    }
}

/// Optional sign plus the digits that follow it, saturating on overflow
fn leading_integer(text: &str) -> i64 {
    let text = text.trim_start();
    let digits_start = usize::from(text.starts_with(&['+', '-'][..]));
    let end = text[digits_start..]
        .find(|c: char| !c.is_ascii_digit())
        .map_or(text.len(), |i| i + digits_start);
    match text[..end].parse::<i64>() {
        Ok(n) => n,
        Err(_) if end > digits_start && text.starts_with('-') => i64::MIN,
        Err(_) if end > digits_start => i64::MAX,
        Err(_) => 0,
    }
}

/// Run `kind` to completion and return the process exit code
pub async fn run(kind: ScenarioKind, value: Option<i64>, options: &RunOptions) -> Result<i32> {
    let report = ConfigValidator::new().validate(&options.config.scenarios);
    report.log();
    report.into_result()?;

    let plan = match kind.plan(&options.config.scenarios, value) {
        Ok(plan) => plan,
        Err(SimError::InvalidPattern(pattern)) => {
            warn!("Invalid pattern {}", pattern);
            eprint!("{}", kind.usage());
            return Ok(EXIT_USAGE);
        }
        Err(e) => return Err(e.into()),
    };

    Baseline::capture().log();

    let cancel = RunFlag::new();
    let handler_flag = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || handler_flag.stop()) {
        warn!("Ctrl+C handler not installed: {}", e);
    }

    let started_at = Utc::now();
    info!("🚀 Running {} (pid {})", kind, std::process::id());
    let mut driver = PhasedDriver::new(plan, ConsoleReporter::new()).with_cancel_flag(cancel);
    let outcome = driver.run().await;
    info!(
        status = %outcome.status,
        elapsed_ms = outcome.elapsed.as_millis() as u64,
        "Scenario {} finished",
        kind
    );

    if options.json {
        let summary = RunSummary::new(driver.plan(), &outcome, started_at);
        println!("{}", serde_json::to_string(&summary)?);
    }
    Ok(outcome.exit_code())
}

/// Entry point shared by the single-scenario executables
pub async fn standalone(kind: ScenarioKind) -> i32 {
    let mut command = Command::new(kind.name())
        .version(env!("CARGO_PKG_VERSION"))
        .about(kind.summary());
    if let Some(name) = kind.argument() {
        command = command.arg(
            Arg::new("value")
                .value_name(name)
                .help("Optional numeric parameter")
                .allow_negative_numbers(true)
                .action(ArgAction::Set),
        );
    }
    let matches = command.get_matches();

    telemetry::init_logging(&LoggingConfig::default(), "warn");

    let raw = matches
        .try_get_one::<String>("value")
        .ok()
        .flatten()
        .map(String::as_str);
    let value = match parse_value(kind, raw) {
        Ok(value) => value,
        Err(usage) => {
            eprint!("{}", usage);
            return EXIT_USAGE;
        }
    };

    match run(kind, value, &RunOptions::default()).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("❌ {}: {:#}", kind, e);
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_value_only_for_scenarios_that_take_one() {
        assert_eq!(parse_value(ScenarioKind::ForkBombGradual, Some("30")), Ok(Some(30)));
        assert_eq!(parse_value(ScenarioKind::ForkBombGradual, None), Ok(None));
        assert_eq!(parse_value(ScenarioKind::MlTestPattern, Some("-1")), Ok(Some(-1)));
        assert!(parse_value(ScenarioKind::CpuSpike, Some("3")).is_err());
    }

    #[test]
    fn test_non_numeric_value_reads_as_leading_integer() {
        use anomaly_sim::scenarios::ForkBombGradualParams;

        assert_eq!(parse_value(ScenarioKind::ForkBombGradual, Some("lots")), Ok(Some(0)));
        assert_eq!(parse_value(ScenarioKind::ForkBombGradual, Some(" 12abc")), Ok(Some(12)));
        assert_eq!(parse_value(ScenarioKind::ForkBombGradual, Some("+7")), Ok(Some(7)));
        assert_eq!(parse_value(ScenarioKind::ForkBombGradual, Some("-")), Ok(Some(0)));
        assert_eq!(
            parse_value(ScenarioKind::ForkBombGradual, Some("99999999999999999999")),
            Ok(Some(i64::MAX))
        );
        // Garbage still runs, at the minimum thread count
        assert_eq!(ForkBombGradualParams::default().effective_max(Some(0)), 5);
    }

    #[tokio::test]
    async fn test_non_numeric_pattern_exits_with_usage_code() {
        let value = parse_value(ScenarioKind::MlTestPattern, Some("abc")).unwrap();
        assert_eq!(value, Some(0));
        let code = run(ScenarioKind::MlTestPattern, value, &RunOptions::default())
            .await
            .unwrap();
        assert_eq!(code, EXIT_USAGE);
    }

    #[tokio::test]
    async fn test_invalid_pattern_exits_with_usage_code() {
        let code = run(ScenarioKind::MlTestPattern, Some(7), &RunOptions::default())
            .await
            .unwrap();
        assert_eq!(code, EXIT_USAGE);
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected_before_running() {
        let mut options = RunOptions::default();
        options.config.scenarios.io_storm.chunk_bytes = 0;
        assert!(run(ScenarioKind::IoStorm, None, &options).await.is_err());
    }

    proptest! {
        #[test]
        fn numeric_values_always_parse(n in any::<i64>()) {
            prop_assert_eq!(
                parse_value(ScenarioKind::ForkBombGradual, Some(n.to_string().as_str())),
                Ok(Some(n))
            );
        }
    }
}
