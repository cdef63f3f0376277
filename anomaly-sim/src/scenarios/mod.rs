// anomaly-sim/src/scenarios/mod.rs
// The eleven workload generators and their tunable parameters

pub mod cpu_spike;
pub mod file_writer;
pub mod fork_bomb;
pub mod fork_bomb_gradual;
pub mod infinite_loop;
pub mod io_storm;
pub mod memory_hog;
pub mod memory_leak;
pub mod ml_test_pattern;
pub mod network_test;
pub mod resource_exhaustion;

use crate::error::{Result, SimError};
use crate::plan::ScenarioPlan;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub use cpu_spike::CpuSpikeParams;
pub use file_writer::FileWriterParams;
pub use fork_bomb::ForkBombParams;
pub use fork_bomb_gradual::{DelayStage, ForkBombGradualParams};
pub use infinite_loop::InfiniteLoopParams;
pub use io_storm::IoStormParams;
pub use memory_hog::MemoryHogParams;
pub use memory_leak::MemoryLeakParams;
pub use ml_test_pattern::MlTestPatternParams;
pub use network_test::NetworkTestParams;
pub use resource_exhaustion::ResourceExhaustionParams;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScenarioKind {
    CpuSpike,
    ForkBombGradual,
    IoStorm,
    MemoryLeak,
    ResourceExhaustion,
    FileWriter,
    ForkBomb,
    InfiniteLoop,
    MemoryHog,
    MlTestPattern,
    NetworkTest,
}

impl ScenarioKind {
    pub const ALL: [ScenarioKind; 11] = [
        ScenarioKind::CpuSpike,
        ScenarioKind::ForkBombGradual,
        ScenarioKind::IoStorm,
        ScenarioKind::MemoryLeak,
        ScenarioKind::ResourceExhaustion,
        ScenarioKind::FileWriter,
        ScenarioKind::ForkBomb,
        ScenarioKind::InfiniteLoop,
        ScenarioKind::MemoryHog,
        ScenarioKind::MlTestPattern,
        ScenarioKind::NetworkTest,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ScenarioKind::CpuSpike => "cpu-spike",
            ScenarioKind::ForkBombGradual => "fork-bomb-gradual",
            ScenarioKind::IoStorm => "io-storm",
            ScenarioKind::MemoryLeak => "memory-leak",
            ScenarioKind::ResourceExhaustion => "resource-exhaustion",
            ScenarioKind::FileWriter => "file-writer",
            ScenarioKind::ForkBomb => "fork-bomb",
            ScenarioKind::InfiniteLoop => "infinite-loop",
            ScenarioKind::MemoryHog => "memory-hog",
            ScenarioKind::MlTestPattern => "ml-test-pattern",
            ScenarioKind::NetworkTest => "network-test",
        }
    }

    pub fn summary(&self) -> &'static str {
        match self {
            ScenarioKind::CpuSpike => "Low CPU baseline, sudden 15s spike, cooldown",
            ScenarioKind::ForkBombGradual => "Thread count climbing to a maximum",
            ScenarioKind::IoStorm => "Burst of flushed 1 MiB writes to a temp file",
            ScenarioKind::MemoryLeak => "Allocations growing by 5 MiB per step",
            ScenarioKind::ResourceExhaustion => "Memory, threads and file handles at once",
            ScenarioKind::FileWriter => "Unbounded writes to test_output.dat",
            ScenarioKind::ForkBomb => "Unbounded process forking",
            ScenarioKind::InfiniteLoop => "One core pegged until interrupted",
            ScenarioKind::MemoryHog => "Unbounded 10 MiB allocations",
            ScenarioKind::MlTestPattern => "One of five scripted CPU/memory patterns",
            ScenarioKind::NetworkTest => "Repeated outbound TCP connects",
        }
    }

    /// Name of the optional positional value, if the scenario takes one
    pub fn argument(&self) -> Option<&'static str> {
        match self {
            ScenarioKind::ForkBombGradual => Some("MAX_THREADS"),
            ScenarioKind::MlTestPattern => Some("PATTERN"),
            _ => None,
        }
    }

    pub fn usage(&self) -> String {
        match self {
            ScenarioKind::MlTestPattern => ml_test_pattern::usage(),
            other => match other.argument() {
                Some(arg) => format!("Usage: {} [{}]\n", other.name(), arg),
                None => format!("Usage: {}\n", other.name()),
            },
        }
    }

    pub fn plan(&self, params: &Parameters, value: Option<i64>) -> Result<ScenarioPlan> {
        let plan = match self {
            ScenarioKind::CpuSpike => cpu_spike::plan(&params.cpu_spike),
            ScenarioKind::ForkBombGradual => {
                fork_bomb_gradual::plan(&params.fork_bomb_gradual, value)
            }
            ScenarioKind::IoStorm => io_storm::plan(&params.io_storm),
            ScenarioKind::MemoryLeak => memory_leak::plan(&params.memory_leak),
            ScenarioKind::ResourceExhaustion => {
                resource_exhaustion::plan(&params.resource_exhaustion)
            }
            ScenarioKind::FileWriter => file_writer::plan(&params.file_writer),
            ScenarioKind::ForkBomb => fork_bomb::plan(&params.fork_bomb),
            ScenarioKind::InfiniteLoop => infinite_loop::plan(&params.infinite_loop),
            ScenarioKind::MemoryHog => memory_hog::plan(&params.memory_hog),
            ScenarioKind::MlTestPattern => {
                return ml_test_pattern::plan(&params.ml_test_pattern, value)
            }
            ScenarioKind::NetworkTest => return network_test::plan(&params.network_test),
        };
        Ok(plan)
    }
}

impl fmt::Display for ScenarioKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ScenarioKind {
    type Err = SimError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        ScenarioKind::ALL
            .into_iter()
            .find(|kind| kind.name() == wanted)
            .ok_or_else(|| SimError::UnknownScenario(s.to_string()))
    }
}

/// Parameter overrides for every scenario, keyed by the snake_case name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Parameters {
    pub cpu_spike: CpuSpikeParams,
    pub fork_bomb_gradual: ForkBombGradualParams,
    pub io_storm: IoStormParams,
    pub memory_leak: MemoryLeakParams,
    pub resource_exhaustion: ResourceExhaustionParams,
    pub file_writer: FileWriterParams,
    pub fork_bomb: ForkBombParams,
    pub infinite_loop: InfiniteLoopParams,
    pub memory_hog: MemoryHogParams,
    pub ml_test_pattern: MlTestPatternParams,
    pub network_test: NetworkTestParams,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for kind in ScenarioKind::ALL {
            assert_eq!(kind.name().parse::<ScenarioKind>().unwrap(), kind);
        }
        assert_eq!(
            "Resource_Exhaustion".parse::<ScenarioKind>().unwrap(),
            ScenarioKind::ResourceExhaustion
        );
        assert!(matches!(
            "zip-bomb".parse::<ScenarioKind>(),
            Err(SimError::UnknownScenario(_))
        ));
    }

    #[test]
    fn test_every_default_plan_builds() {
        let params = Parameters::default();
        for kind in ScenarioKind::ALL {
            let plan = kind.plan(&params, None).unwrap();
            assert_eq!(plan.name, kind.name());
            assert!(!plan.phases.is_empty());
        }
    }

    #[test]
    fn test_bounded_scenarios_release_and_carry_expectations() {
        let params = Parameters::default();
        let bounded = [
            ScenarioKind::CpuSpike,
            ScenarioKind::ForkBombGradual,
            ScenarioKind::IoStorm,
            ScenarioKind::MemoryLeak,
            ScenarioKind::ResourceExhaustion,
        ];
        for kind in bounded {
            let plan = kind.plan(&params, None).unwrap();
            assert!(plan.is_bounded(), "{} should be bounded", kind);
            assert_eq!(plan.cleanup, crate::plan::Cleanup::Release);
            assert!(plan.expectation.is_some());
        }
        for kind in [ScenarioKind::FileWriter, ScenarioKind::ForkBomb, ScenarioKind::MemoryHog] {
            assert!(!kind.plan(&params, None).unwrap().is_bounded());
        }
    }

    #[test]
    fn test_partial_overrides_keep_defaults() {
        let params: Parameters = serde_json::from_str(
            r#"{"memory_leak": {"leak_iterations": 3}, "io_storm": {"fill": 66}}"#,
        )
        .unwrap();
        assert_eq!(params.memory_leak.leak_iterations, 3);
        assert_eq!(params.memory_leak.increment_bytes, 5 * crate::MB);
        assert_eq!(params.io_storm.fill, b'B');
        assert_eq!(params.cpu_spike, CpuSpikeParams::default());
    }

    #[test]
    fn test_usage_names_the_positional() {
        assert_eq!(
            ScenarioKind::ForkBombGradual.usage(),
            "Usage: fork-bomb-gradual [MAX_THREADS]\n"
        );
        assert!(ScenarioKind::MlTestPattern.usage().contains("Patterns:"));
    }
}
