// anomaly-sim/src/scenarios/memory_hog.rs
// Fixed-size blocks allocated forever, never freed

use crate::action::Action;
use crate::phase::{Checkpoints, FailurePolicy, Intensity, Phase, PhaseKind, Step};
use crate::plan::{Cleanup, ScenarioPlan};
use crate::MB;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryHogParams {
    pub chunk_bytes: u64,
    pub delay_ms: u64,
    pub report_every: u64,
    pub fill: u8,
}

impl Default for MemoryHogParams {
    fn default() -> Self {
        Self {
            chunk_bytes: 10 * MB,
            delay_ms: 100,
            report_every: 10,
            fill: 0xAB,
        }
    }
}

pub fn plan(params: &MemoryHogParams) -> ScenarioPlan {
    ScenarioPlan::new("memory-hog", "Memory leak test")
        .note(format!(
            "🧠 Allocating {} MB every {}ms",
            params.chunk_bytes / MB,
            params.delay_ms
        ))
        .cleanup(Cleanup::Abandon)
        .phase(
            Phase::new(PhaseKind::Attack, "allocate")
                .describe("Allocating without freeing...")
                .unbounded()
                .step(Step::new(
                    Action::AllocateMemory { fill: params.fill },
                    Intensity::Fixed(params.chunk_bytes),
                ))
                .every(Duration::from_millis(params.delay_ms))
                .on_failure(FailurePolicy::Terminate)
                .checkpoints(Checkpoints::Every(params.report_every.max(1))),
        )
}
