// anomaly-sim/src/lib.rs
// Phased resource-pressure workloads for exercising anomaly detectors

pub mod action;
pub mod config_validation;
pub mod driver;
pub mod error;
pub mod observability;
pub mod phase;
pub mod plan;
pub mod report;
pub mod resources;
pub mod scenarios;
pub mod workers;


pub use action::{Action, ResourceKind, WorkerKind, WriteTarget};
pub use driver::{PhaseStats, PhasedDriver, RunOutcome, RunStatus};
pub use error::{ErrorCategory, Result, SimError};
pub use phase::{Checkpoints, Delay, FailurePolicy, Intensity, Iterations, Label, Phase, PhaseKind, Schedule, Step};
pub use plan::{Cleanup, Expectation, ScenarioPlan};
pub use report::{ConsoleReporter, Counters, Event, RecordingReporter, Reporter, RunSummary};
pub use resources::{HeldResources, ReleaseReport, ResourceLimits};
pub use scenarios::{Parameters, ScenarioKind};
pub use workers::RunFlag;

pub const MB: u64 = 1024 * 1024;
