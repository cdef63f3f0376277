// anomaly-sim/src/scenarios/io_storm.rs
// Sustained high write throughput with forced flushes

use crate::action::{Action, WriteTarget};
use crate::phase::{Checkpoints, Intensity, Phase, PhaseKind, Step};
use crate::plan::{Expectation, ScenarioPlan};
use crate::MB;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IoStormParams {
    pub chunk_bytes: u64,
    pub baseline_writes: u64,
    pub baseline_delay_ms: u64,
    pub storm_writes: u64,
    pub storm_delay_ms: u64,
    pub cooldown_writes: u64,
    pub cooldown_delay_ms: u64,
    pub file_prefix: String,
    pub fill: u8,
}

impl Default for IoStormParams {
    fn default() -> Self {
        Self {
            chunk_bytes: MB,
            baseline_writes: 3,
            baseline_delay_ms: 1000,
            storm_writes: 150,
            storm_delay_ms: 10,
            cooldown_writes: 3,
            cooldown_delay_ms: 1000,
            file_prefix: "io_storm_test".to_string(),
            fill: b'A',
        }
    }
}

pub fn plan(params: &IoStormParams) -> ScenarioPlan {
    let write = || {
        Step::new(
            Action::WriteBytes {
                target: WriteTarget::Temp {
                    prefix: params.file_prefix.clone(),
                },
                fill: params.fill,
            },
            Intensity::Fixed(params.chunk_bytes),
        )
    };

    ScenarioPlan::new("io-storm", "I/O STORM SIMULATOR (ML Test)")
        .note("⚠️  This program is designed to trigger ML anomaly detection.")
        .note("🎯 Pattern: Sustained high I/O throughput (>10 MB/s)")
        .expected(Expectation::new("io_storm", 0.6, 0.8))
        .phase(
            Phase::new(PhaseKind::Baseline, "baseline")
                .describe("Normal I/O (low throughput)...")
                .iterations(params.baseline_writes)
                .step(write())
                .every(Duration::from_millis(params.baseline_delay_ms)),
        )
        .phase(
            Phase::new(PhaseKind::Attack, "storm")
                .describe("I/O STORM - Rapid writes!")
                .iterations(params.storm_writes)
                .step(write())
                .every(Duration::from_millis(params.storm_delay_ms))
                .checkpoints(Checkpoints::Every(10)),
        )
        .phase(
            Phase::new(PhaseKind::Cooldown, "cooldown")
                .describe("Returning to normal I/O...")
                .iterations(params.cooldown_writes)
                .step(write())
                .every(Duration::from_millis(params.cooldown_delay_ms)),
        )
}
