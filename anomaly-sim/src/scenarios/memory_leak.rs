// anomaly-sim/src/scenarios/memory_leak.rs
// Allocations that grow by a fixed increment and are never freed mid-run

use crate::action::Action;
use crate::phase::{FailurePolicy, Intensity, Label, Phase, PhaseKind, Step};
use crate::plan::{Expectation, ScenarioPlan};
use crate::resources::ResourceLimits;
use crate::MB;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryLeakParams {
    pub leak_iterations: u64,
    /// Block `i` (0-based) is `(i + 1) * increment_bytes`
    pub increment_bytes: u64,
    pub delay_ms: u64,
    pub hold_iterations: u64,
    pub hold_delay_ms: u64,
    pub max_blocks: usize,
    pub fill: u8,
}

impl Default for MemoryLeakParams {
    fn default() -> Self {
        Self {
            leak_iterations: 25,
            increment_bytes: 5 * MB,
            delay_ms: 1000,
            hold_iterations: 5,
            hold_delay_ms: 1000,
            max_blocks: 30,
            fill: 0xAA,
        }
    }
}

pub fn plan(params: &MemoryLeakParams) -> ScenarioPlan {
    ScenarioPlan::new("memory-leak", "MEMORY LEAK PROGRESSIVE SIMULATOR (ML Test)")
        .note("⚠️  This program is designed to trigger ML anomaly detection.")
        .note(format!(
            "🎯 Pattern: Progressive memory growth (+{} MB per step)",
            params.increment_bytes / MB
        ))
        .expected(Expectation::new("memory_leak", 0.75, 0.90))
        .limits(ResourceLimits {
            max_memory_blocks: Some(params.max_blocks),
            ..ResourceLimits::default()
        })
        .phase(
            Phase::new(PhaseKind::Attack, "leak")
                .describe("Starting memory leak...")
                .iterations(params.leak_iterations)
                .step(Step::new(
                    Action::AllocateMemory { fill: params.fill },
                    Intensity::Linear {
                        base: params.increment_bytes,
                        step: params.increment_bytes,
                    },
                ))
                .every(Duration::from_millis(params.delay_ms))
                .on_failure(FailurePolicy::AbortPhase)
                .milestone(6, Label::Suspicious, "Memory leak detected! Continuing to worsen...")
                .milestone(11, Label::Critical, "Critical memory leak! Growth accelerating...")
                .milestone(16, Label::Critical, "Severe memory leak! System resources depleting..."),
        )
        .phase(
            Phase::new(PhaseKind::Sustain, "hold")
                .describe("Memory leak sustained (NOT cleaning up)...")
                .iterations(params.hold_iterations)
                .every(Duration::from_millis(params.hold_delay_ms)),
        )
}
