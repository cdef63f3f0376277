// anomaly-sim/src/phase.rs
// Phase definitions: steps, intensity curves, schedules and delays

use crate::action::Action;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// How much a step does when it fires, as a function of how many times it
/// has already succeeded in the current phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intensity {
    Fixed(u64),
    Linear { base: u64, step: u64 },
}

impl Intensity {
    pub fn at(&self, occurrence: u64) -> u64 {
        match *self {
            Intensity::Fixed(amount) => amount,
            Intensity::Linear { base, step } => {
                base.saturating_add(step.saturating_mul(occurrence))
            }
        }
    }
}

/// Which iterations (0-based) a step fires on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Schedule {
    Always,
    Every { period: u64, offset: u64 },
    At(u64),
    Except(u64),
}

impl Schedule {
    pub fn fires(&self, index: u64) -> bool {
        match *self {
            Schedule::Always => true,
            Schedule::Every { period, offset } => period != 0 && index % period == offset,
            Schedule::At(k) => index == k,
            Schedule::Except(k) => index != k,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub action: Action,
    pub intensity: Intensity,
    pub schedule: Schedule,
}

impl Step {
    pub fn new(action: Action, intensity: Intensity) -> Self {
        Self {
            action,
            intensity,
            schedule: Schedule::Always,
        }
    }

    pub fn on(mut self, schedule: Schedule) -> Self {
        self.schedule = schedule;
        self
    }
}

/// Sleep applied after every iteration, including the last one
#[derive(Debug, Clone, PartialEq)]
pub enum Delay {
    None,
    Fixed(Duration),
    /// First stage whose bound exceeds the 0-based iteration index wins
    Stepped {
        stages: Vec<(u64, Duration)>,
        tail: Duration,
    },
}

impl Delay {
    pub fn for_iteration(&self, index: u64) -> Duration {
        match self {
            Delay::None => Duration::ZERO,
            Delay::Fixed(d) => *d,
            Delay::Stepped { stages, tail } => stages
                .iter()
                .find(|(bound, _)| index < *bound)
                .map(|(_, d)| *d)
                .unwrap_or(*tail),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Iterations {
    Count(u64),
    Unbounded,
}

impl Iterations {
    pub fn allows(&self, index: u64) -> bool {
        match *self {
            Iterations::Count(n) => index < n,
            Iterations::Unbounded => true,
        }
    }

    pub fn count(&self) -> Option<u64> {
        match *self {
            Iterations::Count(n) => Some(n),
            Iterations::Unbounded => None,
        }
    }
}

/// What the driver does when an action fails
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// End this phase early and move on
    AbortPhase,
    /// Sleep this long instead of the normal delay, then keep going
    RetryAfter(Duration),
    /// Report it and go on with the next iteration after the normal delay
    Continue,
    /// End the run with a failure status
    Terminate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Label {
    Normal,
    Suspicious,
    Critical,
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Label::Normal => "normal",
            Label::Suspicious => "SUSPICIOUS",
            Label::Critical => "ANOMALOUS",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseKind {
    Baseline,
    Attack,
    Sustain,
    Cooldown,
}

/// Narration attached to a specific 1-based iteration number
#[derive(Debug, Clone, PartialEq)]
pub struct Milestone {
    pub at: u64,
    pub label: Label,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Checkpoints {
    Never,
    /// After every n-th iteration (1-based numbering)
    Every(u64),
    /// After every n-th iteration counted from `offset`, so a phase that
    /// continues a running total can checkpoint on the total
    Shifted { every: u64, offset: u64 },
}

impl Checkpoints {
    pub fn hit(&self, iteration: u64) -> bool {
        match *self {
            Checkpoints::Never => false,
            Checkpoints::Every(n) => n != 0 && iteration % n == 0,
            Checkpoints::Shifted { every, offset } => {
                every != 0 && (iteration + offset) % every == 0
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Phase {
    pub name: String,
    pub description: String,
    pub kind: PhaseKind,
    pub label: Label,
    pub steps: Vec<Step>,
    pub iterations: Iterations,
    pub delay: Delay,
    pub on_failure: FailurePolicy,
    pub checkpoints: Checkpoints,
    pub milestones: Vec<Milestone>,
}

impl Phase {
    pub fn new(kind: PhaseKind, name: &str) -> Self {
        let label = match kind {
            PhaseKind::Baseline | PhaseKind::Cooldown => Label::Normal,
            PhaseKind::Attack | PhaseKind::Sustain => Label::Critical,
        };
        Self {
            name: name.to_string(),
            description: String::new(),
            kind,
            label,
            steps: Vec::new(),
            iterations: Iterations::Count(1),
            delay: Delay::None,
            on_failure: FailurePolicy::AbortPhase,
            checkpoints: Checkpoints::Every(1),
            milestones: Vec::new(),
        }
    }

    pub fn describe(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn label(mut self, label: Label) -> Self {
        self.label = label;
        self
    }

    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    pub fn iterations(mut self, count: u64) -> Self {
        self.iterations = Iterations::Count(count);
        self
    }

    pub fn unbounded(mut self) -> Self {
        self.iterations = Iterations::Unbounded;
        self
    }

    pub fn delay(mut self, delay: Delay) -> Self {
        self.delay = delay;
        self
    }

    pub fn every(self, delay: Duration) -> Self {
        self.delay(Delay::Fixed(delay))
    }

    pub fn on_failure(mut self, policy: FailurePolicy) -> Self {
        self.on_failure = policy;
        self
    }

    pub fn checkpoints(mut self, checkpoints: Checkpoints) -> Self {
        self.checkpoints = checkpoints;
        self
    }

    pub fn milestone(mut self, at: u64, label: Label, message: &str) -> Self {
        self.milestones.push(Milestone {
            at,
            label,
            message: message.to_string(),
        });
        self
    }

    /// Wall-clock lower bound for a bounded phase: sleeps plus CPU bursts
    /// that fire on every iteration they are scheduled for.
    pub fn nominal_duration(&self) -> Option<Duration> {
        let count = self.iterations.count()?;
        let mut total = Duration::ZERO;
        for index in 0..count {
            total += self.delay.for_iteration(index);
            for step in self.steps.iter().filter(|s| s.schedule.fires(index)) {
                if step.action == Action::BurnCpu {
                    // Occurrence equals the number of earlier firings
                    let occurrence = (0..index).filter(|i| step.schedule.fires(*i)).count() as u64;
                    total += Duration::from_millis(step.intensity.at(occurrence));
                }
            }
        }
        Some(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_schedule_fires() {
        let even = Schedule::Every { period: 2, offset: 0 };
        let third = Schedule::Every { period: 3, offset: 0 };
        assert!(even.fires(0) && !even.fires(1) && even.fires(4));
        assert!(third.fires(0) && !third.fires(2) && third.fires(3));
        assert!(Schedule::At(7).fires(7) && !Schedule::At(7).fires(6));
        assert!(!Schedule::Except(7).fires(7) && Schedule::Except(7).fires(8));
        assert!(!Schedule::Every { period: 0, offset: 0 }.fires(0));
    }

    #[test]
    fn test_stepped_delay() {
        let delay = Delay::Stepped {
            stages: vec![
                (15, Duration::from_millis(500)),
                (35, Duration::from_millis(300)),
            ],
            tail: Duration::from_millis(100),
        };
        assert_eq!(delay.for_iteration(0), Duration::from_millis(500));
        assert_eq!(delay.for_iteration(14), Duration::from_millis(500));
        assert_eq!(delay.for_iteration(15), Duration::from_millis(300));
        assert_eq!(delay.for_iteration(34), Duration::from_millis(300));
        assert_eq!(delay.for_iteration(35), Duration::from_millis(100));
    }

    #[test]
    fn test_checkpoints() {
        assert!(Checkpoints::Every(10).hit(10));
        assert!(!Checkpoints::Every(10).hit(11));
        assert!(!Checkpoints::Never.hit(10));
        assert!(!Checkpoints::Every(0).hit(0));
    }

    #[test]
    fn test_shifted_checkpoints_track_running_total() {
        let shifted = Checkpoints::Shifted { every: 10, offset: 5 };
        let hits: Vec<u64> = (1..=35).filter(|i| shifted.hit(*i)).collect();
        assert_eq!(hits, vec![5, 15, 25, 35]);
        assert!(!Checkpoints::Shifted { every: 0, offset: 5 }.hit(5));
        assert_eq!(
            Checkpoints::Shifted { every: 10, offset: 0 }.hit(20),
            Checkpoints::Every(10).hit(20)
        );
    }

    #[test]
    fn test_nominal_duration_counts_sleeps_and_bursts() {
        let phase = Phase::new(PhaseKind::Attack, "attack")
            .iterations(4)
            .step(Step::new(Action::BurnCpu, Intensity::Fixed(100)).on(Schedule::Every {
                period: 2,
                offset: 0,
            }))
            .every(Duration::from_millis(10));
        assert_eq!(phase.nominal_duration(), Some(Duration::from_millis(240)));
        assert_eq!(phase.clone().unbounded().nominal_duration(), None);
    }

    proptest! {
        #[test]
        fn linear_intensity_grows_by_exactly_step(base in 0u64..1 << 30, step in 1u64..1 << 24, k in 0u64..10_000) {
            let curve = Intensity::Linear { base, step };
            prop_assert_eq!(curve.at(k + 1) - curve.at(k), step);
            prop_assert!(curve.at(k + 1) > curve.at(k));
        }

        #[test]
        fn every_schedule_fires_once_per_period(period in 1u64..16, offset_seed in 0u64..16, start in 0u64..1000) {
            let offset = offset_seed % period;
            let schedule = Schedule::Every { period, offset };
            let hits = (start..start + period).filter(|i| schedule.fires(*i)).count();
            prop_assert_eq!(hits, 1);
        }
    }
}
