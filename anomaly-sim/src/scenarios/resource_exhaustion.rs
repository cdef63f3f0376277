// anomaly-sim/src/scenarios/resource_exhaustion.rs
// Memory, CPU-burning threads and open descriptors, all at once

use crate::action::{Action, WorkerKind};
use crate::phase::{Checkpoints, Intensity, Label, Phase, PhaseKind, Schedule, Step};
use crate::plan::{Expectation, ScenarioPlan};
use crate::resources::ResourceLimits;
use crate::MB;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceExhaustionParams {
    pub startup_ms: u64,
    pub attack_iterations: u64,
    pub delay_ms: u64,
    /// Leak `k` (0-based) is `(k + 1) * memory_increment_bytes`
    pub memory_increment_bytes: u64,
    pub threads_per_burst: u64,
    pub max_threads: usize,
    pub max_files: usize,
    pub max_memory_blocks: usize,
    pub sustain_iterations: u64,
    pub sustain_delay_ms: u64,
    pub file_prefix: String,
    pub fill: u8,
}

impl Default for ResourceExhaustionParams {
    fn default() -> Self {
        Self {
            startup_ms: 2000,
            attack_iterations: 20,
            delay_ms: 1000,
            memory_increment_bytes: 8 * MB,
            threads_per_burst: 3,
            max_threads: 60,
            max_files: 100,
            max_memory_blocks: 30,
            sustain_iterations: 8,
            sustain_delay_ms: 1000,
            file_prefix: "exhaust".to_string(),
            fill: 0xBB,
        }
    }
}

pub fn plan(params: &ResourceExhaustionParams) -> ScenarioPlan {
    let leak = Step::new(
        Action::AllocateMemory { fill: params.fill },
        Intensity::Linear {
            base: params.memory_increment_bytes,
            step: params.memory_increment_bytes,
        },
    )
    .on(Schedule::Every { period: 2, offset: 0 });

    let threads = Step::new(
        Action::SpawnThread {
            worker: WorkerKind::CpuBurn,
        },
        Intensity::Fixed(params.threads_per_burst),
    )
    .on(Schedule::Every { period: 3, offset: 0 });

    let files = Step::new(
        Action::OpenFile {
            prefix: params.file_prefix.clone(),
        },
        Intensity::Fixed(1),
    )
    .on(Schedule::Every { period: 2, offset: 1 });

    ScenarioPlan::new("resource-exhaustion", "RESOURCE EXHAUSTION COMBO ATTACK (ML Test)")
        .note("⚠️  This program is designed to trigger ML anomaly detection.")
        .note("🎯 Pattern: Simultaneous CPU + Memory + Threads + Files")
        .note(format!(
            "🖥️  Up to {} CPU-burning threads on {} logical CPUs",
            params.max_threads,
            num_cpus::get()
        ))
        .expected(Expectation::new("resource_exhaustion", 0.9, 1.0))
        .limits(ResourceLimits {
            max_memory_blocks: Some(params.max_memory_blocks),
            max_threads: Some(params.max_threads),
            max_files: Some(params.max_files),
            max_processes: None,
        })
        .phase(
            Phase::new(PhaseKind::Baseline, "startup")
                .describe("Normal startup...")
                .iterations(1)
                .every(Duration::from_millis(params.startup_ms))
                .checkpoints(Checkpoints::Never),
        )
        .phase(
            Phase::new(PhaseKind::Attack, "combined")
                .describe("COMBINED ATTACK! Triggering all attack vectors simultaneously...")
                .iterations(params.attack_iterations)
                .step(leak)
                .step(threads)
                .step(files)
                .every(Duration::from_millis(params.delay_ms))
                .milestone(6, Label::Suspicious, "WARNING: Resource consumption elevated")
                .milestone(11, Label::Critical, "CRITICAL: Multiple resource exhaustion vectors active")
                .milestone(16, Label::Critical, "SEVERE: System resources critically depleted"),
        )
        .phase(
            Phase::new(PhaseKind::Sustain, "sustain")
                .describe("Sustaining attack for ML detection...")
                .iterations(params.sustain_iterations)
                .every(Duration::from_millis(params.sustain_delay_ms)),
        )
}
