// anomaly-sim/src/scenarios/fork_bomb.rs
// Child processes forked forever, each sleeping before it exits

use crate::action::Action;
use crate::phase::{Checkpoints, FailurePolicy, Intensity, Phase, PhaseKind, Step};
use crate::plan::{Cleanup, ScenarioPlan};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForkBombParams {
    pub delay_ms: u64,
    pub retry_delay_ms: u64,
    pub child_linger_secs: u32,
    pub report_every: u64,
}

impl Default for ForkBombParams {
    fn default() -> Self {
        Self {
            delay_ms: 50,
            retry_delay_ms: 1000,
            child_linger_secs: 60,
            report_every: 10,
        }
    }
}

pub fn plan(params: &ForkBombParams) -> ScenarioPlan {
    ScenarioPlan::new("fork-bomb", "Fork bomb test")
        .note("⚠️  WARNING: This will create many processes!")
        .note(format!(
            "💤 Each child sleeps {}s, then exits",
            params.child_linger_secs
        ))
        .cleanup(Cleanup::Abandon)
        .phase(
            Phase::new(PhaseKind::Attack, "fork")
                .describe("Forking child processes...")
                .unbounded()
                .step(Step::new(
                    Action::SpawnProcess {
                        linger_secs: params.child_linger_secs,
                    },
                    Intensity::Fixed(1),
                ))
                .every(Duration::from_millis(params.delay_ms))
                .on_failure(FailurePolicy::RetryAfter(Duration::from_millis(
                    params.retry_delay_ms,
                )))
                .checkpoints(Checkpoints::Every(params.report_every.max(1))),
        )
}
