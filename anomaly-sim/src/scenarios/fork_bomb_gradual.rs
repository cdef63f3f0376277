// anomaly-sim/src/scenarios/fork_bomb_gradual.rs
// Thread count climbing from a handful to the configured maximum

use crate::action::{Action, WorkerKind};
use crate::phase::{Checkpoints, Delay, FailurePolicy, Intensity, Label, Phase, PhaseKind, Step};
use crate::plan::{Expectation, ScenarioPlan};
use crate::resources::ResourceLimits;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Delay used while the total thread count is below `below_threads`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayStage {
    pub below_threads: u64,
    pub delay_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForkBombGradualParams {
    /// Used when no value is given on the command line
    pub max_threads: u64,
    pub min_threads: u64,
    pub hard_limit: u64,
    pub warmup_threads: u64,
    pub warmup_delay_ms: u64,
    /// Delay once every stage is passed
    pub tail_delay_ms: u64,
    pub sustain_iterations: u64,
    pub sustain_delay_ms: u64,
    pub stages: Vec<DelayStage>,
}

impl Default for ForkBombGradualParams {
    fn default() -> Self {
        Self {
            max_threads: 80,
            min_threads: 5,
            hard_limit: 80,
            warmup_threads: 5,
            warmup_delay_ms: 1000,
            tail_delay_ms: 100,
            sustain_iterations: 10,
            sustain_delay_ms: 1000,
            stages: vec![
                DelayStage { below_threads: 20, delay_ms: 500 },
                DelayStage { below_threads: 40, delay_ms: 300 },
            ],
        }
    }
}

impl ForkBombGradualParams {
    /// Clamp the requested maximum into `min_threads..=hard_limit`
    pub fn effective_max(&self, requested: Option<i64>) -> u64 {
        let floor = self.min_threads.min(self.hard_limit);
        match requested {
            Some(value) => (value.max(0) as u64).clamp(floor, self.hard_limit),
            None => self.max_threads.clamp(floor, self.hard_limit),
        }
    }
}

pub fn plan(params: &ForkBombGradualParams, requested: Option<i64>) -> ScenarioPlan {
    let max = params.effective_max(requested);
    let warmup = params.warmup_threads.min(max);
    let idle_thread = || {
        Step::new(
            Action::SpawnThread { worker: WorkerKind::Idle },
            Intensity::Fixed(1),
        )
    };

    // Stage bounds are total thread counts; attack indices start after warm-up
    let stages = params
        .stages
        .iter()
        .map(|s| (s.below_threads.saturating_sub(warmup), Duration::from_millis(s.delay_ms)))
        .collect();

    let mut attack = Phase::new(PhaseKind::Attack, "spawn")
        .describe("ATTACK - Rapid thread spawning!")
        .iterations(max - warmup)
        .step(idle_thread())
        .delay(Delay::Stepped {
            stages,
            tail: Duration::from_millis(params.tail_delay_ms),
        })
        .on_failure(FailurePolicy::AbortPhase)
        .checkpoints(Checkpoints::Shifted {
            every: 10,
            offset: warmup,
        });

    let milestones = [
        (10, Label::Suspicious, "Thread count suspicious: 10 threads"),
        (25, Label::Critical, "Thread count alarming: 25 threads"),
        (50, Label::Critical, "CRITICAL thread count: 50 threads (FORK BOMB!)"),
    ];
    for (threads, label, message) in milestones {
        if threads > warmup && threads <= max {
            attack = attack.milestone(threads - warmup, label, message);
        }
    }

    ScenarioPlan::new("fork-bomb-gradual", "GRADUAL FORK BOMB SIMULATOR (ML Test)")
        .note("⚠️  This program is designed to trigger ML anomaly detection.")
        .note(format!("🎯 Pattern: Gradual thread growth from 1 → {} threads", max))
        .expected(Expectation::new("fork_bomb", 0.85, 0.95))
        .limits(ResourceLimits {
            max_threads: Some(max as usize),
            ..ResourceLimits::default()
        })
        .phase(
            Phase::new(PhaseKind::Baseline, "startup")
                .describe(&format!("Normal startup (1-{} threads)...", warmup))
                .iterations(warmup)
                .step(idle_thread())
                .every(Duration::from_millis(params.warmup_delay_ms)),
        )
        .phase(attack)
        .phase(
            Phase::new(PhaseKind::Sustain, "sustain")
                .describe("Sustaining high thread count...")
                .iterations(params.sustain_iterations)
                .every(Duration::from_millis(params.sustain_delay_ms)),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requested_max_is_clamped() {
        let params = ForkBombGradualParams::default();
        assert_eq!(params.effective_max(None), 80);
        assert_eq!(params.effective_max(Some(500)), 80);
        assert_eq!(params.effective_max(Some(2)), 5);
        assert_eq!(params.effective_max(Some(-3)), 5);
        assert_eq!(params.effective_max(Some(30)), 30);
    }

    #[test]
    fn test_attack_delays_accelerate() {
        let plan = plan(&ForkBombGradualParams::default(), None);
        let attack = &plan.phases[1];
        assert_eq!(attack.iterations.count(), Some(75));
        // Thread 6 is attack index 0, thread 20 is index 15
        assert_eq!(attack.delay.for_iteration(0), Duration::from_millis(500));
        assert_eq!(attack.delay.for_iteration(14), Duration::from_millis(500));
        assert_eq!(attack.delay.for_iteration(15), Duration::from_millis(300));
        assert_eq!(attack.delay.for_iteration(35), Duration::from_millis(100));
        let at: Vec<u64> = attack.milestones.iter().map(|m| m.at).collect();
        assert_eq!(at, vec![5, 20, 45]);
        assert_eq!(plan.limits.max_threads, Some(80));
    }

    #[test]
    fn test_small_maximum_drops_unreachable_milestones() {
        let plan = plan(&ForkBombGradualParams::default(), Some(12));
        let attack = &plan.phases[1];
        assert_eq!(attack.iterations.count(), Some(7));
        assert_eq!(attack.milestones.len(), 1);
    }

    #[test]
    fn test_checkpoints_land_on_total_thread_counts() {
        let plan = plan(&ForkBombGradualParams::default(), Some(40));
        let attack = &plan.phases[1];
        let totals: Vec<u64> = (1..=attack.iterations.count().unwrap_or(0))
            .filter(|i| attack.checkpoints.hit(*i))
            .map(|i| i + 5)
            .collect();
        assert_eq!(totals, vec![10, 20, 30, 40]);
    }
}
