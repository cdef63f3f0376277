// anomaly-sim/src/plan.rs
// A scenario as data: banner, phases, caps and cleanup policy

use crate::phase::Phase;
use crate::resources::ResourceLimits;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What the external detector is expected to report for this run.
/// Documentation only; nothing here checks it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expectation {
    pub anomaly_type: String,
    pub score_min: f64,
    pub score_max: f64,
}

impl Expectation {
    pub fn new(anomaly_type: &str, score_min: f64, score_max: f64) -> Self {
        Self {
            anomaly_type: anomaly_type.to_string(),
            score_min,
            score_max,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cleanup {
    /// Give back every held resource in acquisition order
    Release,
    /// Leave everything to process termination
    Abandon,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioPlan {
    pub name: String,
    pub title: String,
    /// Banner lines printed before the first phase
    pub notes: Vec<String>,
    pub expectation: Option<Expectation>,
    pub phases: Vec<Phase>,
    pub limits: ResourceLimits,
    pub cleanup: Cleanup,
}

impl ScenarioPlan {
    pub fn new(name: &str, title: &str) -> Self {
        Self {
            name: name.to_string(),
            title: title.to_string(),
            notes: Vec::new(),
            expectation: None,
            phases: Vec::new(),
            limits: ResourceLimits::unlimited(),
            cleanup: Cleanup::Release,
        }
    }

    pub fn note(mut self, line: impl Into<String>) -> Self {
        self.notes.push(line.into());
        self
    }

    pub fn expected(mut self, expectation: Expectation) -> Self {
        self.expectation = Some(expectation);
        self
    }

    pub fn phase(mut self, phase: Phase) -> Self {
        self.phases.push(phase);
        self
    }

    pub fn limits(mut self, limits: ResourceLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn cleanup(mut self, cleanup: Cleanup) -> Self {
        self.cleanup = cleanup;
        self
    }

    pub fn is_bounded(&self) -> bool {
        self.phases.iter().all(|p| p.iterations.count().is_some())
    }

    /// Sum of phase lower bounds, `None` if any phase is unbounded
    pub fn nominal_duration(&self) -> Option<Duration> {
        self.phases.iter().map(Phase::nominal_duration).sum()
    }
}
