// anomaly-sim/src/scenarios/file_writer.rs
// Unbounded 1 MiB writes to a fixed path until the disk says no

use crate::action::{Action, WriteTarget};
use crate::phase::{Checkpoints, FailurePolicy, Intensity, Phase, PhaseKind, Step};
use crate::plan::{Cleanup, ScenarioPlan};
use crate::MB;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileWriterParams {
    pub path: PathBuf,
    pub chunk_bytes: u64,
    pub delay_ms: u64,
    pub report_every: u64,
    pub fill: u8,
}

impl Default for FileWriterParams {
    fn default() -> Self {
        Self {
            path: PathBuf::from("test_output.dat"),
            chunk_bytes: MB,
            delay_ms: 10,
            report_every: 100,
            fill: 0xCD,
        }
    }
}

pub fn plan(params: &FileWriterParams) -> ScenarioPlan {
    ScenarioPlan::new("file-writer", "High I/O test")
        .note(format!("📁 Writing to {}", params.path.display()))
        .cleanup(Cleanup::Abandon)
        .phase(
            Phase::new(PhaseKind::Attack, "write")
                .describe("Writing 1 MB chunks with a flush after each...")
                .unbounded()
                .step(Step::new(
                    Action::WriteBytes {
                        target: WriteTarget::Path {
                            path: params.path.clone(),
                        },
                        fill: params.fill,
                    },
                    Intensity::Fixed(params.chunk_bytes),
                ))
                .every(Duration::from_millis(params.delay_ms))
                .on_failure(FailurePolicy::Terminate)
                .checkpoints(Checkpoints::Every(params.report_every.max(1))),
        )
}
