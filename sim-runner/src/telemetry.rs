// sim-runner/src/telemetry.rs
// Logging, Prometheus export and the host baseline snapshot

use crate::config::{LogFormat, LoggingConfig};
use anomaly_sim::MB;
use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use sysinfo::{ProcessExt, System, SystemExt};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber. Logs always go to stderr so stdout carries
/// only scenario narration. `RUST_LOG` wins over the configured level.
pub fn init_logging(config: &LoggingConfig, default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_deref().unwrap_or(default_level)));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    // A second init (tests, repeated calls) keeps the first subscriber
    let _ = match config.format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}

/// Serve `/metrics` on `addr` until the process exits
pub fn install_metrics(addr: SocketAddr) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .with_context(|| format!("failed to start Prometheus exporter on {}", addr))?;
    anomaly_sim::observability::describe_metrics();
    info!("📈 Serving Prometheus metrics on http://{}/metrics", addr);
    Ok(())
}

#[derive(Debug, Clone, PartialEq)]
pub struct Baseline {
    pub cpus: usize,
    pub total_memory_mb: u64,
    pub available_memory_mb: u64,
    pub load_one: f64,
    pub load_five: f64,
    pub own_rss_mb: Option<u64>,
}

impl Baseline {
    pub fn capture() -> Self {
        let mut system = System::new();
        system.refresh_memory();
        let load = system.load_average();
        let own_rss_mb = sysinfo::get_current_pid().ok().and_then(|pid| {
            system.refresh_process(pid);
            system.process(pid).map(|p| p.memory() / MB)
        });
        Self {
            cpus: num_cpus::get(),
            total_memory_mb: system.total_memory() / MB,
            available_memory_mb: system.available_memory() / MB,
            load_one: load.one,
            load_five: load.five,
            own_rss_mb,
        }
    }

    pub fn log(&self) {
        info!(
            cpus = self.cpus,
            total_memory_mb = self.total_memory_mb,
            available_memory_mb = self.available_memory_mb,
            load_1m = self.load_one,
            load_5m = self.load_five,
            own_rss_mb = self.own_rss_mb,
            "🖥️  System baseline"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_baseline_reads_host() {
        let baseline = Baseline::capture();
        assert!(baseline.cpus >= 1);
        assert!(baseline.total_memory_mb >= baseline.available_memory_mb);
        assert!(baseline.load_one >= 0.0);
    }

    #[test]
    fn test_repeated_logging_init_is_harmless() {
        init_logging(&LoggingConfig::default(), "warn");
        init_logging(
            &LoggingConfig {
                level: Some("debug".into()),
                format: LogFormat::Json,
            },
            "info",
        );
    }
}
