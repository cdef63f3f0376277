// sim-runner/src/lib.rs
// Shared plumbing for the launcher and the standalone generator binaries

pub mod config;
pub mod launch;
pub mod telemetry;

pub use anomaly_sim::{ScenarioKind, SimError};
pub use config::{Config, LogFormat};
