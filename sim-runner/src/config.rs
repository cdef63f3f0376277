// sim-runner/src/config.rs
// Configuration management

use anomaly_sim::Parameters;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "anomaly-sim.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub logging: LoggingConfig,
    pub metrics: MetricsConfig,
    /// Per-scenario parameter overrides, e.g. `[scenarios.memory_leak]`
    pub scenarios: Parameters,
    /// File this was read from, `None` for built-in defaults
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset
    pub level: Option<String>,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => anyhow::bail!("unknown log format '{}', expected text or json", other),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Serve Prometheus metrics here for the duration of the run
    pub listen: Option<SocketAddr>,
}

impl Config {
    /// Read a TOML file. A missing file yields the defaults with `source`
    /// unset; a file that does not parse is an error.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let mut config: Config = toml::from_str(&content)
                    .with_context(|| format!("failed to parse config file {}", path.display()))?;
                config.source = Some(path.to_path_buf());
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e).with_context(|| format!("failed to read config file {}", path.display())),
        }
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("failed to serialize config")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anomaly_sim::MB;

    fn scratch(name: &str, content: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("sim_runner_{}_{}.toml", name, std::process::id()));
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = Config::load("/nonexistent/anomaly-sim.toml").unwrap();
        assert_eq!(config, Config::default());
        assert!(config.source.is_none());
    }

    #[test]
    fn test_partial_overrides_keep_other_defaults() {
        let path = scratch(
            "partial",
            r#"
[logging]
level = "debug"
format = "json"

[metrics]
listen = "127.0.0.1:9100"

[scenarios.memory_leak]
leak_iterations = 3
increment_bytes = 1048576

[scenarios.network_test]
addr = "127.0.0.1:8080"
"#,
        );
        let config = Config::load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(config.logging.level.as_deref(), Some("debug"));
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.metrics.listen, Some("127.0.0.1:9100".parse().unwrap()));
        assert_eq!(config.scenarios.memory_leak.leak_iterations, 3);
        assert_eq!(config.scenarios.memory_leak.increment_bytes, MB);
        assert_eq!(config.scenarios.memory_leak.max_blocks, 30);
        assert_eq!(config.scenarios.network_test.delay_ms, 3000);
        assert_eq!(config.source.as_deref(), Some(path.as_path()));
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let path = scratch("broken", "[scenarios.memory_leak\nleak_iterations = ");
        let result = Config::load(&path);
        std::fs::remove_file(&path).unwrap();
        assert!(result.is_err());
    }

    #[test]
    fn test_defaults_survive_serialization() {
        let text = Config::default().to_toml().unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed, Config::default());
    }

    #[test]
    fn test_log_format_parses_case_insensitively() {
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("text".parse::<LogFormat>().unwrap(), LogFormat::Text);
        assert!("yaml".parse::<LogFormat>().is_err());
    }
}
