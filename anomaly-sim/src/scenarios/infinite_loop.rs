// anomaly-sim/src/scenarios/infinite_loop.rs
// One core pegged at 100% until interrupted

use crate::action::Action;
use crate::phase::{Checkpoints, FailurePolicy, Intensity, Phase, PhaseKind, Step};
use crate::plan::{Cleanup, ScenarioPlan};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InfiniteLoopParams {
    /// Burst length between cancellation checks
    pub burst_ms: u64,
    pub report_every: u64,
}

impl Default for InfiniteLoopParams {
    fn default() -> Self {
        Self {
            burst_ms: 1000,
            report_every: 1,
        }
    }
}

pub fn plan(params: &InfiniteLoopParams) -> ScenarioPlan {
    ScenarioPlan::new("infinite-loop", "CPU spike test")
        .note("🔥 Burning one core until interrupted")
        .cleanup(Cleanup::Abandon)
        .phase(
            Phase::new(PhaseKind::Attack, "burn")
                .describe("Tight compute loop...")
                .unbounded()
                .step(Step::new(Action::BurnCpu, Intensity::Fixed(params.burst_ms)))
                .on_failure(FailurePolicy::Terminate)
                .checkpoints(Checkpoints::Every(params.report_every.max(1))),
        )
}
