// anomaly-sim/src/scenarios/ml_test_pattern.rs
// Five short scripted CPU/memory shapes for detector regression runs

use crate::action::Action;
use crate::error::{Result, SimError};
use crate::phase::{FailurePolicy, Intensity, Label, Phase, PhaseKind, Schedule, Step};
use crate::plan::ScenarioPlan;
use crate::MB;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MlTestPatternParams {
    pub default_pattern: i64,
    pub tick_ms: u64,
    /// Scales every CPU burst, 100 keeps the scripted lengths
    pub intensity_percent: u64,
    pub leak_increment_bytes: u64,
    pub surge_bytes: u64,
}

impl Default for MlTestPatternParams {
    fn default() -> Self {
        Self {
            default_pattern: 1,
            tick_ms: 1000,
            intensity_percent: 100,
            leak_increment_bytes: 5 * MB,
            surge_bytes: 50 * MB,
        }
    }
}

impl MlTestPatternParams {
    fn burst(&self, ms: u64) -> u64 {
        ms * self.intensity_percent / 100
    }

    fn burn(&self, ms: u64) -> Step {
        Step::new(Action::BurnCpu, Intensity::Fixed(self.burst(ms)))
    }
}

pub const PATTERNS: [(i64, &str); 5] = [
    (1, "Gradual CPU increase (normal)"),
    (2, "Sudden CPU spike (anomalous)"),
    (3, "Memory leak simulation (anomalous)"),
    (4, "Oscillating pattern (suspicious)"),
    (5, "Combined CPU + memory anomaly (anomalous)"),
];

pub fn usage() -> String {
    let mut text = String::from("Usage: ml-test-pattern [pattern]\nPatterns:\n");
    for (id, title) in PATTERNS {
        text.push_str(&format!("  {}: {}\n", id, title));
    }
    text
}

pub fn plan(params: &MlTestPatternParams, selector: Option<i64>) -> Result<ScenarioPlan> {
    let pattern = selector.unwrap_or(params.default_pattern);
    let title = PATTERNS
        .iter()
        .find(|(id, _)| *id == pattern)
        .map(|(_, title)| *title)
        .ok_or(SimError::InvalidPattern(pattern))?;
    let tick = Duration::from_millis(params.tick_ms);

    let phase = match pattern {
        1 => Phase::new(PhaseKind::Attack, "gradual-cpu")
            .label(Label::Normal)
            .iterations(20)
            .step(Step::new(
                Action::BurnCpu,
                Intensity::Linear {
                    base: params.burst(50),
                    step: params.burst(25),
                },
            ))
            .every(tick),
        2 => Phase::new(PhaseKind::Attack, "sudden-spike")
            .label(Label::Critical)
            .iterations(15)
            .step(params.burn(800).on(Schedule::At(7)))
            .step(params.burn(50).on(Schedule::Except(7)))
            .every(tick)
            .milestone(8, Label::Critical, "SUDDEN SPIKE at iteration 8"),
        3 => Phase::new(PhaseKind::Attack, "memory-leak")
            .label(Label::Critical)
            .iterations(20)
            .step(Step::new(
                Action::AllocateMemory { fill: 0xAA },
                Intensity::Linear {
                    base: params.leak_increment_bytes,
                    step: params.leak_increment_bytes,
                },
            ))
            .every(tick)
            .on_failure(FailurePolicy::AbortPhase),
        4 => Phase::new(PhaseKind::Attack, "oscillating")
            .label(Label::Suspicious)
            .iterations(20)
            .step(params.burn(600).on(Schedule::Every { period: 2, offset: 0 }))
            .step(params.burn(50).on(Schedule::Every { period: 2, offset: 1 }))
            .every(tick),
        5 => Phase::new(PhaseKind::Attack, "combined")
            .label(Label::Critical)
            .iterations(25)
            .step(params.burn(700).on(Schedule::At(10)))
            .step(
                Step::new(
                    Action::AllocateMemory { fill: 0xAA },
                    Intensity::Fixed(params.surge_bytes),
                )
                .on(Schedule::At(10)),
            )
            .step(params.burn(100).on(Schedule::Except(10)))
            .every(tick)
            .on_failure(FailurePolicy::Continue)
            .milestone(11, Label::Critical, "ANOMALY: Simultaneous CPU spike + memory surge"),
        other => return Err(SimError::InvalidPattern(other)),
    };

    Ok(ScenarioPlan::new("ml-test-pattern", "ML TEST PATTERN GENERATOR")
        .note(format!("🧪 Pattern {}: {}", pattern, title))
        .phase(phase.describe(title)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_each_pattern_builds() {
        let params = MlTestPatternParams::default();
        for (id, _) in PATTERNS {
            let plan = plan(&params, Some(id)).unwrap();
            assert_eq!(plan.phases.len(), 1);
            assert!(plan.is_bounded());
        }
    }

    #[test]
    fn test_unknown_pattern_is_rejected() {
        let params = MlTestPatternParams::default();
        assert!(matches!(plan(&params, Some(6)), Err(SimError::InvalidPattern(6))));
        assert!(matches!(plan(&params, Some(0)), Err(SimError::InvalidPattern(0))));
        assert!(usage().contains("5: Combined"));
    }

    #[test]
    fn test_gradual_pattern_ramps_by_25ms() {
        let plan = plan(&MlTestPatternParams::default(), None).unwrap();
        // 20 ticks of 1s plus bursts 50, 75, ... 525
        let bursts: u64 = (0..20).map(|i| 50 + 25 * i).sum();
        assert_eq!(
            plan.nominal_duration(),
            Some(Duration::from_millis(20_000 + bursts))
        );
    }

    #[test]
    fn test_spike_fires_once() {
        let plan = plan(&MlTestPatternParams::default(), Some(2)).unwrap();
        let phase = &plan.phases[0];
        let firing: Vec<u64> = (0..15).filter(|i| phase.steps[0].schedule.fires(*i)).collect();
        assert_eq!(firing, vec![7]);
        assert_eq!(
            (0..15).filter(|i| phase.steps[1].schedule.fires(*i)).count(),
            14
        );
    }
}
