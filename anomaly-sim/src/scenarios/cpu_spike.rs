// anomaly-sim/src/scenarios/cpu_spike.rs
// Low CPU, then a sudden sustained spike, then back to normal

use crate::action::Action;
use crate::phase::{Intensity, Phase, PhaseKind, Step};
use crate::plan::{Expectation, ScenarioPlan};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CpuSpikeParams {
    pub baseline_iterations: u64,
    pub attack_iterations: u64,
    pub cooldown_iterations: u64,
    /// Length of one iteration; attack iterations burn for the whole tick
    pub tick_ms: u64,
    /// CPU burned per baseline tick, the rest is sleep
    pub baseline_burn_ms: u64,
}

impl Default for CpuSpikeParams {
    fn default() -> Self {
        Self {
            baseline_iterations: 5,
            attack_iterations: 15,
            cooldown_iterations: 3,
            tick_ms: 1000,
            baseline_burn_ms: 50,
        }
    }
}

pub fn plan(params: &CpuSpikeParams) -> ScenarioPlan {
    let tick = Duration::from_millis(params.tick_ms);
    let idle = Duration::from_millis(params.tick_ms.saturating_sub(params.baseline_burn_ms));

    ScenarioPlan::new("cpu-spike", "CPU SPIKE ATTACK SIMULATOR (ML Test)")
        .note("⚠️  This program is designed to trigger ML anomaly detection.")
        .note("🎯 Pattern: Low CPU (5%) → Sudden spike to 95%+ sustained")
        .note(format!("🖥️  Host has {} logical CPUs, one of them is driven", num_cpus::get()))
        .expected(Expectation::new("cpu_spike", 0.8, 0.95))
        .phase(
            Phase::new(PhaseKind::Baseline, "benign")
                .describe("Benign behavior (low CPU)...")
                .iterations(params.baseline_iterations)
                .step(Step::new(Action::BurnCpu, Intensity::Fixed(params.baseline_burn_ms)))
                .every(idle),
        )
        .phase(
            Phase::new(PhaseKind::Attack, "spike")
                .describe("ATTACK - CPU SPIKE! Consuming 95%+ CPU...")
                .iterations(params.attack_iterations)
                .step(Step::new(Action::BurnCpu, Intensity::Fixed(params.tick_ms))),
        )
        .phase(
            Phase::new(PhaseKind::Cooldown, "cooldown")
                .describe("Returning to normal behavior...")
                .iterations(params.cooldown_iterations)
                .every(tick),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_run_lasts_23_seconds() {
        let plan = plan(&CpuSpikeParams::default());
        assert_eq!(plan.phases.len(), 3);
        assert!(plan.is_bounded());
        assert_eq!(plan.nominal_duration(), Some(Duration::from_secs(23)));
    }
}
