// anomaly-sim/src/action.rs
// Resource-consuming actions a phase step can perform

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;

/// What a step does each time it fires. The step's intensity is interpreted
/// per action: milliseconds for `BurnCpu`, bytes for `AllocateMemory` and
/// `WriteBytes`, a count for everything else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Action {
    BurnCpu,
    AllocateMemory { fill: u8 },
    SpawnThread { worker: WorkerKind },
    SpawnProcess { linger_secs: u32 },
    WriteBytes { target: WriteTarget, fill: u8 },
    OpenFile { prefix: String },
    ConnectSocket { addr: SocketAddr },
}

impl Action {
    pub fn resource(&self) -> ResourceKind {
        match self {
            Action::BurnCpu => ResourceKind::Cpu,
            Action::AllocateMemory { .. } => ResourceKind::Memory,
            Action::SpawnThread { .. } => ResourceKind::Thread,
            Action::SpawnProcess { .. } => ResourceKind::Process,
            Action::WriteBytes { .. } => ResourceKind::Output,
            Action::OpenFile { .. } => ResourceKind::File,
            Action::ConnectSocket { .. } => ResourceKind::Network,
        }
    }
}

/// Body of a spawned subject thread
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerKind {
    /// Parks until told to stop
    Idle,
    /// Spins on arithmetic until told to stop
    CpuBurn,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteTarget {
    /// `<temp dir>/<prefix>_<pid>.dat`, removed on release
    Temp { prefix: String },
    /// Fixed path, never removed
    Path { path: PathBuf },
}

impl WriteTarget {
    pub fn resolve(&self) -> PathBuf {
        match self {
            WriteTarget::Temp { prefix } => {
                std::env::temp_dir().join(format!("{}_{}.dat", prefix, std::process::id()))
            }
            WriteTarget::Path { path } => path.clone(),
        }
    }

    pub fn is_temporary(&self) -> bool {
        matches!(self, WriteTarget::Temp { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Cpu,
    Memory,
    Thread,
    Process,
    File,
    Output,
    Network,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResourceKind::Cpu => "cpu",
            ResourceKind::Memory => "memory",
            ResourceKind::Thread => "threads",
            ResourceKind::Process => "processes",
            ResourceKind::File => "files",
            ResourceKind::Output => "disk",
            ResourceKind::Network => "network",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temp_target_is_named_by_pid() {
        let target = WriteTarget::Temp {
            prefix: "io_storm_test".to_string(),
        };
        let path = target.resolve();
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert_eq!(name, format!("io_storm_test_{}.dat", std::process::id()));
        assert!(path.starts_with(std::env::temp_dir()));
        assert!(target.is_temporary());
    }

    #[test]
    fn test_action_serde_shape() {
        let action = Action::SpawnThread {
            worker: WorkerKind::CpuBurn,
        };
        let json = serde_json::to_string(&action).unwrap();
        assert_eq!(json, r#"{"kind":"spawn_thread","worker":"cpu_burn"}"#);
        assert_eq!(action.resource(), ResourceKind::Thread);
    }
}
