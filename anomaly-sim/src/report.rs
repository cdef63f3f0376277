// anomaly-sim/src/report.rs
// Driver events and the reporters that narrate them

use crate::action::ResourceKind;
use crate::driver::{PhaseStats, RunOutcome, RunStatus};
use crate::error::SimError;
use crate::phase::{FailurePolicy, Label, Milestone, Phase, PhaseKind};
use crate::plan::{Expectation, ScenarioPlan};
use crate::resources::ReleaseReport;
use crate::MB;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use uuid::Uuid;

/// Running totals for console output. Nothing downstream consumes them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counters {
    pub cpu_busy_ms: u64,
    pub cpu_rounds: u64,
    pub memory_blocks: u64,
    pub memory_bytes: u64,
    pub last_block_bytes: u64,
    pub threads_spawned: u64,
    pub processes_spawned: u64,
    pub last_pid: Option<i32>,
    pub bytes_written: u64,
    pub files_opened: u64,
    pub connect_attempts: u64,
    pub connects_succeeded: u64,
    pub connects_failed: u64,
    pub failures: u64,
}

impl Counters {
    fn describe(&self, kind: ResourceKind, bytes_in_phase: u64, elapsed: Duration) -> String {
        match kind {
            ResourceKind::Cpu => format!("CPU busy {} ms ({} rounds)", self.cpu_busy_ms, self.cpu_rounds),
            ResourceKind::Memory => format!(
                "Leaked {} MB | Total: {} MB",
                self.last_block_bytes / MB,
                self.memory_bytes / MB
            ),
            ResourceKind::Thread => format!("{} threads", self.threads_spawned),
            ResourceKind::Process => match self.last_pid {
                Some(pid) => format!("Forked {} processes (latest PID: {})", self.processes_spawned, pid),
                None => format!("Forked {} processes", self.processes_spawned),
            },
            ResourceKind::File => format!("{} open files", self.files_opened),
            ResourceKind::Output => {
                let secs = elapsed.as_secs_f64().max(1.0);
                format!(
                    "Written: {} MB | Rate: {:.1} MB/s",
                    self.bytes_written / MB,
                    bytes_in_phase as f64 / secs / MB as f64
                )
            }
            ResourceKind::Network => format!(
                "{} attempts ({} connected, {} failed)",
                self.connect_attempts, self.connects_succeeded, self.connects_failed
            ),
        }
    }

    fn holding(&self) -> String {
        let mut parts = Vec::new();
        if self.memory_blocks > 0 {
            parts.push(format!("{} MB leaked", self.memory_bytes / MB));
        }
        if self.threads_spawned > 0 {
            parts.push(format!("{} threads", self.threads_spawned));
        }
        if self.files_opened > 0 {
            parts.push(format!("{} open files", self.files_opened));
        }
        if parts.is_empty() {
            "idle".to_string()
        } else {
            parts.join(", ")
        }
    }
}

/// Everything the driver tells its reporter
#[derive(Debug)]
pub enum Event<'a> {
    ScenarioStarted {
        plan: &'a ScenarioPlan,
    },
    PhaseStarted {
        index: usize,
        total: usize,
        phase: &'a Phase,
        counters: &'a Counters,
    },
    Checkpoint {
        phase: &'a Phase,
        iteration: u64,
        elapsed: Duration,
        counters: &'a Counters,
    },
    Milestone {
        phase: &'a Phase,
        milestone: &'a Milestone,
        counters: &'a Counters,
    },
    ConnectAttempt {
        attempt: u64,
        addr: SocketAddr,
        result: Result<(), &'a io::Error>,
    },
    StepFailed {
        phase: &'a Phase,
        iteration: u64,
        error: &'a SimError,
    },
    PhaseFinished {
        phase: &'a Phase,
        stats: &'a PhaseStats,
    },
    CleanupFinished {
        report: &'a ReleaseReport,
    },
    Interrupted,
    ScenarioFinished {
        plan: &'a ScenarioPlan,
        outcome: &'a RunOutcome,
    },
}

/// Thin presentation callback invoked by the driver at defined points
pub trait Reporter {
    fn on_event(&mut self, event: &Event<'_>);
}

/// Prints human narration to stdout and diagnostics to stderr
#[derive(Debug, Default)]
pub struct ConsoleReporter {
    phase_bytes_start: u64,
}

impl ConsoleReporter {
    pub fn new() -> Self {
        Self::default()
    }

    fn banner(title: &str) {
        println!("╔══════════════════════════════════════════════════════════╗");
        println!("║ {:^56} ║", title);
        println!("╚══════════════════════════════════════════════════════════╝");
    }

    fn status(&self, phase: &Phase, elapsed: Duration, counters: &Counters) -> String {
        let bytes_in_phase = counters.bytes_written.saturating_sub(self.phase_bytes_start);
        let mut kinds: Vec<ResourceKind> = Vec::new();
        for step in &phase.steps {
            let kind = step.action.resource();
            if !kinds.contains(&kind) {
                kinds.push(kind);
            }
        }
        if kinds.is_empty() {
            return format!("Holding {}", counters.holding());
        }
        kinds
            .into_iter()
            .map(|k| counters.describe(k, bytes_in_phase, elapsed))
            .collect::<Vec<_>>()
            .join(" | ")
    }
}

fn label_icon(label: Label) -> &'static str {
    match label {
        Label::Normal => "ℹ️ ",
        Label::Suspicious => "⚠️ ",
        Label::Critical => "🚨",
    }
}

fn describe_expectation(expectation: &Expectation) -> String {
    format!(
        "{} (score: {:.2}-{:.2})",
        expectation.anomaly_type, expectation.score_min, expectation.score_max
    )
}

impl Reporter for ConsoleReporter {
    fn on_event(&mut self, event: &Event<'_>) {
        match event {
            Event::ScenarioStarted { plan } => {
                Self::banner(&plan.title);
                println!();
                for note in &plan.notes {
                    println!("{}", note);
                }
                if let Some(expectation) = &plan.expectation {
                    println!("📊 Expected: {}", describe_expectation(expectation));
                }
                println!();
            }
            Event::PhaseStarted { index, total, phase, counters } => {
                self.phase_bytes_start = counters.bytes_written;
                let marker = if phase.kind == PhaseKind::Attack { "🚨 " } else { "" };
                let description = if phase.description.is_empty() {
                    phase.name.as_str()
                } else {
                    phase.description.as_str()
                };
                println!("\n{}Phase {}/{}: {}", marker, index + 1, total, description);
            }
            Event::Checkpoint { phase, iteration, elapsed, counters } => {
                let of = phase
                    .iterations
                    .count()
                    .map(|n| format!("/{}", n))
                    .unwrap_or_default();
                println!(
                    "  [{}{}] {} ({})",
                    iteration,
                    of,
                    self.status(phase, *elapsed, counters),
                    phase.label
                );
            }
            Event::Milestone { milestone, .. } => {
                println!("\n  {} {}\n", label_icon(milestone.label), milestone.message);
            }
            Event::ConnectAttempt { attempt, addr, result } => match result {
                Ok(()) => println!("Attempt {}: Connection to {} successful!", attempt, addr),
                Err(e) => eprintln!("Attempt {}: Connection to {} failed (network blocked?) - {}", attempt, addr, e),
            },
            Event::StepFailed { phase, iteration, error } => {
                eprintln!("  ❌ [{}] {}", iteration, error);
                match phase.on_failure {
                    FailurePolicy::AbortPhase => eprintln!("     (system limit reached - ending phase early)"),
                    FailurePolicy::RetryAfter(delay) => eprintln!("     (retrying in {:?})", delay),
                    FailurePolicy::Continue => eprintln!("     (continuing with the pattern)"),
                    FailurePolicy::Terminate => {}
                }
            }
            Event::PhaseFinished { phase, stats } => {
                if phase.kind == PhaseKind::Attack {
                    println!(
                        "\n📊 {} finished: {} iterations in {:.1}s{}",
                        phase.name,
                        stats.iterations_completed,
                        stats.elapsed.as_secs_f64(),
                        if stats.ended_early { " (ended early)" } else { "" }
                    );
                }
            }
            Event::CleanupFinished { report } => {
                println!(
                    "\nCleaning up: freed {} blocks ({} MB), joined {} threads, reaped {} processes, closed {} files",
                    report.memory_blocks,
                    report.memory_bytes / MB,
                    report.threads_joined,
                    report.processes_reaped,
                    report.files_closed + report.outputs_closed
                );
            }
            Event::Interrupted => {
                println!("\n🛑 Interrupted - stopping");
            }
            Event::ScenarioFinished { plan, outcome } => {
                println!();
                Self::banner(&format!("{} COMPLETE", plan.title));
                let c = &outcome.counters;
                println!("\n📈 Elapsed: {:.1}s", outcome.elapsed.as_secs_f64());
                if c.cpu_busy_ms > 0 {
                    println!("   CPU busy: {} ms", c.cpu_busy_ms);
                }
                if c.memory_blocks > 0 {
                    println!("   Memory: {} MB in {} blocks", c.memory_bytes / MB, c.memory_blocks);
                }
                if c.threads_spawned > 0 {
                    println!("   Threads: {} created", c.threads_spawned);
                }
                if c.processes_spawned > 0 {
                    println!("   Processes: {} forked", c.processes_spawned);
                }
                if c.bytes_written > 0 {
                    println!("   Written: {} MB", c.bytes_written / MB);
                }
                if c.files_opened > 0 {
                    println!("   Files: {} opened", c.files_opened);
                }
                if c.connect_attempts > 0 {
                    println!("   Connects: {} attempted, {} failed", c.connect_attempts, c.connects_failed);
                }
                if let RunStatus::Terminated(error) = &outcome.status {
                    eprintln!("   Terminated: {}", error);
                }
                if let Some(expectation) = &plan.expectation {
                    println!("🔍 Check the anomaly detector for analysis.");
                    println!(
                        "✓ Expected: isAnomalous=true, anomalyType='{}'",
                        expectation.anomaly_type
                    );
                }
                println!();
            }
        }
    }
}

/// Owned copy of an event, kept by `RecordingReporter`
#[derive(Debug, Clone, PartialEq)]
pub enum Recorded {
    ScenarioStarted(String),
    PhaseStarted(String),
    Checkpoint {
        phase: String,
        iteration: u64,
        counters: Counters,
    },
    Milestone {
        phase: String,
        at: u64,
        label: Label,
    },
    ConnectAttempt {
        attempt: u64,
        connected: bool,
    },
    StepFailed {
        phase: String,
        iteration: u64,
        message: String,
    },
    PhaseFinished {
        phase: String,
        iterations: u64,
        ended_early: bool,
    },
    CleanupFinished(ReleaseReport),
    Interrupted,
    ScenarioFinished,
}

/// Keeps every event for later inspection
#[derive(Debug, Default)]
pub struct RecordingReporter {
    pub events: Vec<Recorded>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn checkpoints(&self, phase: &str) -> Vec<&Counters> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Recorded::Checkpoint { phase: p, counters, .. } if p == phase => Some(counters),
                _ => None,
            })
            .collect()
    }

    pub fn failures(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Recorded::StepFailed { message, .. } => Some(message.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl Reporter for RecordingReporter {
    fn on_event(&mut self, event: &Event<'_>) {
        let recorded = match event {
            Event::ScenarioStarted { plan } => Recorded::ScenarioStarted(plan.name.clone()),
            Event::PhaseStarted { phase, .. } => Recorded::PhaseStarted(phase.name.clone()),
            Event::Checkpoint { phase, iteration, counters, .. } => Recorded::Checkpoint {
                phase: phase.name.clone(),
                iteration: *iteration,
                counters: (*counters).clone(),
            },
            Event::Milestone { phase, milestone, .. } => Recorded::Milestone {
                phase: phase.name.clone(),
                at: milestone.at,
                label: milestone.label,
            },
            Event::ConnectAttempt { attempt, result, .. } => Recorded::ConnectAttempt {
                attempt: *attempt,
                connected: result.is_ok(),
            },
            Event::StepFailed { phase, iteration, error } => Recorded::StepFailed {
                phase: phase.name.clone(),
                iteration: *iteration,
                message: error.to_string(),
            },
            Event::PhaseFinished { phase, stats } => Recorded::PhaseFinished {
                phase: phase.name.clone(),
                iterations: stats.iterations_completed,
                ended_early: stats.ended_early,
            },
            Event::CleanupFinished { report } => Recorded::CleanupFinished((*report).clone()),
            Event::Interrupted => Recorded::Interrupted,
            Event::ScenarioFinished { .. } => Recorded::ScenarioFinished,
        };
        self.events.push(recorded);
    }
}

/// Machine-readable record of one run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub scenario: String,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    pub status: String,
    pub exit_code: i32,
    pub expectation: Option<Expectation>,
    pub counters: Counters,
    pub phases: Vec<PhaseStats>,
    pub released: Option<ReleaseReport>,
}

impl RunSummary {
    pub fn new(plan: &ScenarioPlan, outcome: &RunOutcome, started_at: DateTime<Utc>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            scenario: plan.name.clone(),
            started_at,
            elapsed_ms: outcome.elapsed.as_millis() as u64,
            status: outcome.status.to_string(),
            exit_code: outcome.exit_code(),
            expectation: plan.expectation.clone(),
            counters: outcome.counters.clone(),
            phases: outcome.phases.clone(),
            released: outcome.released.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::Action;
    use crate::phase::{Intensity, Step};

    #[test]
    fn test_counters_describe_each_resource() {
        let counters = Counters {
            memory_blocks: 2,
            memory_bytes: 15 * MB,
            last_block_bytes: 10 * MB,
            processes_spawned: 3,
            last_pid: Some(4242),
            bytes_written: 20 * MB,
            ..Counters::default()
        };
        assert_eq!(
            counters.describe(ResourceKind::Memory, 0, Duration::ZERO),
            "Leaked 10 MB | Total: 15 MB"
        );
        assert_eq!(
            counters.describe(ResourceKind::Process, 0, Duration::ZERO),
            "Forked 3 processes (latest PID: 4242)"
        );
        assert_eq!(
            counters.describe(ResourceKind::Output, 10 * MB, Duration::from_secs(2)),
            "Written: 20 MB | Rate: 5.0 MB/s"
        );
        assert_eq!(counters.holding(), "15 MB leaked");
        assert_eq!(Counters::default().holding(), "idle");
    }

    #[test]
    fn test_status_joins_distinct_step_resources() {
        let phase = Phase::new(PhaseKind::Attack, "combo")
            .step(Step::new(Action::BurnCpu, Intensity::Fixed(1)))
            .step(Step::new(Action::BurnCpu, Intensity::Fixed(2)))
            .step(Step::new(Action::AllocateMemory { fill: 0 }, Intensity::Fixed(MB)));
        let counters = Counters {
            cpu_busy_ms: 30,
            cpu_rounds: 7,
            memory_bytes: MB,
            last_block_bytes: MB,
            memory_blocks: 1,
            ..Counters::default()
        };
        let status = ConsoleReporter::new().status(&phase, Duration::ZERO, &counters);
        assert_eq!(status, "CPU busy 30 ms (7 rounds) | Leaked 1 MB | Total: 1 MB");
    }

    #[test]
    fn test_run_summary_serializes_outcome() {
        let plan = ScenarioPlan::new("io-storm", "I/O")
            .expected(Expectation::new("io_storm", 0.6, 0.8));
        let outcome = RunOutcome {
            status: RunStatus::Completed,
            counters: Counters {
                bytes_written: 3 * MB,
                ..Counters::default()
            },
            phases: Vec::new(),
            released: Some(ReleaseReport {
                outputs_closed: 1,
                files_removed: 1,
                ..ReleaseReport::default()
            }),
            acquired: 1,
            elapsed: Duration::from_millis(1500),
        };

        let summary = RunSummary::new(&plan, &outcome, Utc::now());
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["scenario"], "io-storm");
        assert_eq!(json["status"], "completed");
        assert_eq!(json["exit_code"], 0);
        assert_eq!(json["elapsed_ms"], 1500);
        assert_eq!(json["counters"]["bytes_written"], 3 * MB);
        assert_eq!(json["expectation"]["anomaly_type"], "io_storm");
        assert_eq!(json["released"]["files_removed"], 1);
        assert!(json["run_id"].as_str().is_some());
    }
}
