// anomaly-sim/src/resources.rs
// Held resource set: everything a run has acquired and must give back

use crate::action::ResourceKind;
use crate::error::{Result, SimError};
use crate::workers::RunFlag;
use nix::sys::signal::{kill, Signal};
use nix::sys::wait::waitpid;
use nix::unistd::Pid;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::thread::JoinHandle;
use tracing::{debug, warn};

/// A retained, fully touched heap block
#[derive(Debug)]
pub struct MemoryBlock {
    data: Vec<u8>,
}

impl MemoryBlock {
    /// Reserve `bytes` without aborting on failure, then write `fill` into
    /// every byte so the pages are resident.
    pub fn allocate(bytes: u64, fill: u8, held: u64) -> Result<Self> {
        let size = usize::try_from(bytes).map_err(|_| SimError::Allocation { requested: bytes, held })?;
        let mut data = Vec::new();
        data.try_reserve_exact(size)
            .map_err(|_| SimError::Allocation { requested: bytes, held })?;
        data.resize(size, fill);
        Ok(Self { data })
    }

    pub fn len(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn fill_byte(&self) -> Option<u8> {
        self.data.first().copied()
    }
}

/// Open descriptor on a temp file that is unlinked on release
#[derive(Debug)]
pub struct TempFile {
    _file: File,
    path: PathBuf,
}

impl TempFile {
    pub fn create(path: PathBuf) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .open(&path)
            .map_err(|source| SimError::FileOpen { path: path.clone(), source })?;
        Ok(Self { _file: file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Sink for `WriteBytes` steps
#[derive(Debug)]
pub struct OutputFile {
    writer: BufWriter<File>,
    path: PathBuf,
    remove_on_release: bool,
    written: u64,
}

impl OutputFile {
    pub fn create(path: PathBuf, remove_on_release: bool) -> Result<Self> {
        let file = File::create(&path).map_err(|source| SimError::FileOpen { path: path.clone(), source })?;
        Ok(Self {
            writer: BufWriter::new(file),
            path,
            remove_on_release,
            written: 0,
        })
    }

    /// Write the whole chunk and force it out of the user-space buffer
    pub fn write_chunk(&mut self, chunk: &[u8]) -> Result<()> {
        let written = self.written;
        self.writer
            .write_all(chunk)
            .and_then(|_| self.writer.flush())
            .map_err(|source| SimError::Write { written, source })?;
        self.written += chunk.len() as u64;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn written(&self) -> u64 {
        self.written
    }
}

#[derive(Debug)]
pub enum HeldResource {
    Memory(MemoryBlock),
    Thread(JoinHandle<()>),
    Process(Pid),
    File(TempFile),
    Output(OutputFile),
}

impl HeldResource {
    pub fn kind(&self) -> ResourceKind {
        match self {
            HeldResource::Memory(_) => ResourceKind::Memory,
            HeldResource::Thread(_) => ResourceKind::Thread,
            HeldResource::Process(_) => ResourceKind::Process,
            HeldResource::File(_) => ResourceKind::File,
            HeldResource::Output(_) => ResourceKind::Output,
        }
    }
}

/// Per-kind caps. `None` means unlimited.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceLimits {
    pub max_memory_blocks: Option<usize>,
    pub max_threads: Option<usize>,
    pub max_processes: Option<usize>,
    pub max_files: Option<usize>,
}

impl ResourceLimits {
    pub fn unlimited() -> Self {
        Self::default()
    }

    pub fn limit_for(&self, kind: ResourceKind) -> Option<usize> {
        match kind {
            ResourceKind::Memory => self.max_memory_blocks,
            ResourceKind::Thread => self.max_threads,
            ResourceKind::Process => self.max_processes,
            ResourceKind::File => self.max_files,
            ResourceKind::Cpu | ResourceKind::Output | ResourceKind::Network => None,
        }
    }
}

/// What cleanup gave back
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseReport {
    pub memory_blocks: u64,
    pub memory_bytes: u64,
    pub threads_joined: u64,
    pub threads_panicked: u64,
    pub processes_reaped: u64,
    pub files_closed: u64,
    pub files_removed: u64,
    pub outputs_closed: u64,
}

impl ReleaseReport {
    pub fn total(&self) -> u64 {
        self.memory_blocks + self.threads_joined + self.threads_panicked + self.processes_reaped
            + self.files_closed + self.outputs_closed
    }
}

/// Ordered collection of acquired resources, owned by the driver
#[derive(Debug)]
pub struct HeldResources {
    items: Vec<HeldResource>,
    limits: ResourceLimits,
    keep_running: RunFlag,
    acquired: u64,
}

impl HeldResources {
    pub fn new(limits: ResourceLimits) -> Self {
        Self {
            items: Vec::new(),
            limits,
            keep_running: RunFlag::new(),
            acquired: 0,
        }
    }

    /// Flag handed to spawned worker threads
    pub fn keep_running(&self) -> RunFlag {
        self.keep_running.clone()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Resources acquired over the lifetime of the set
    pub fn acquired(&self) -> u64 {
        self.acquired
    }

    pub fn count(&self, kind: ResourceKind) -> usize {
        self.items.iter().filter(|r| r.kind() == kind).count()
    }

    pub fn memory_bytes(&self) -> u64 {
        self.items
            .iter()
            .map(|r| match r {
                HeldResource::Memory(block) => block.len(),
                _ => 0,
            })
            .sum()
    }

    /// Remaining capacity for `kind` before its cap
    pub fn room(&self, kind: ResourceKind) -> Option<usize> {
        self.limits
            .limit_for(kind)
            .map(|limit| limit.saturating_sub(self.count(kind)))
    }

    pub fn has_room(&self, kind: ResourceKind) -> bool {
        self.room(kind).map_or(true, |room| room > 0)
    }

    pub fn push(&mut self, resource: HeldResource) {
        self.acquired += 1;
        self.items.push(resource);
    }

    pub fn output_mut(&mut self, path: &Path) -> Option<&mut OutputFile> {
        self.items.iter_mut().find_map(|r| match r {
            HeldResource::Output(out) if out.path() == path => Some(out),
            _ => None,
        })
    }

    /// Give everything back in acquisition order. Worker threads are all
    /// signalled first so joining one never waits on the others.
    pub fn release(&mut self) -> ReleaseReport {
        let mut report = ReleaseReport::default();
        self.keep_running.stop();

        for resource in self.items.drain(..) {
            match resource {
                HeldResource::Memory(block) => {
                    report.memory_blocks += 1;
                    report.memory_bytes += block.len();
                    drop(block);
                }
                HeldResource::Thread(handle) => {
                    handle.thread().unpark();
                    match handle.join() {
                        Ok(()) => report.threads_joined += 1,
                        Err(_) => {
                            warn!("Worker thread panicked before join");
                            report.threads_panicked += 1;
                        }
                    }
                }
                HeldResource::Process(pid) => {
                    if let Err(e) = kill(pid, Signal::SIGKILL) {
                        debug!("kill({}) failed: {}", pid, e);
                    }
                    if let Err(e) = waitpid(pid, None) {
                        debug!("waitpid({}) failed: {}", pid, e);
                    }
                    report.processes_reaped += 1;
                }
                HeldResource::File(temp) => {
                    let path = temp.path().to_path_buf();
                    drop(temp);
                    report.files_closed += 1;
                    match std::fs::remove_file(&path) {
                        Ok(()) => report.files_removed += 1,
                        Err(e) => warn!("Failed to remove {}: {}", path.display(), e),
                    }
                }
                HeldResource::Output(mut out) => {
                    if let Err(e) = out.writer.flush() {
                        warn!("Final flush of {} failed: {}", out.path.display(), e);
                    }
                    let path = out.path.clone();
                    let remove = out.remove_on_release;
                    drop(out);
                    report.outputs_closed += 1;
                    if remove {
                        match std::fs::remove_file(&path) {
                            Ok(()) => report.files_removed += 1,
                            Err(e) => warn!("Failed to remove {}: {}", path.display(), e),
                        }
                    }
                }
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::WorkerKind;
    use crate::workers::spawn_worker;

    fn scratch_path(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("anomaly_sim_{}_{}", tag, uuid::Uuid::new_v4()))
    }

    #[test]
    fn test_memory_block_is_filled() {
        let block = MemoryBlock::allocate(64 * 1024, 0xAA, 0).unwrap();
        assert_eq!(block.len(), 64 * 1024);
        assert_eq!(block.fill_byte(), Some(0xAA));
    }

    #[test]
    fn test_impossible_allocation_fails_cleanly() {
        let err = MemoryBlock::allocate(u64::MAX / 2, 0xAA, 0).unwrap_err();
        assert!(matches!(err, SimError::Allocation { .. }));
    }

    #[test]
    fn test_limits_bound_room() {
        let mut held = HeldResources::new(ResourceLimits {
            max_memory_blocks: Some(2),
            ..ResourceLimits::default()
        });
        assert_eq!(held.room(ResourceKind::Memory), Some(2));
        held.push(HeldResource::Memory(MemoryBlock::allocate(16, 0, 0).unwrap()));
        held.push(HeldResource::Memory(MemoryBlock::allocate(16, 0, 16).unwrap()));
        assert!(!held.has_room(ResourceKind::Memory));
        assert!(held.has_room(ResourceKind::Thread));
        assert_eq!(held.memory_bytes(), 32);
    }

    #[test]
    fn test_release_gives_back_everything() {
        let mut held = HeldResources::new(ResourceLimits::unlimited());
        for i in 0..3 {
            let handle = spawn_worker(i, WorkerKind::Idle, held.keep_running(), i).unwrap();
            held.push(HeldResource::Thread(handle));
        }
        held.push(HeldResource::Memory(MemoryBlock::allocate(1024, 0xBB, 0).unwrap()));
        let temp_path = scratch_path("fd");
        held.push(HeldResource::File(TempFile::create(temp_path.clone()).unwrap()));
        let out_path = scratch_path("out");
        held.push(HeldResource::Output(OutputFile::create(out_path.clone(), true).unwrap()));
        held.output_mut(&out_path).unwrap().write_chunk(&[1u8; 128]).unwrap();

        let report = held.release();
        assert_eq!(report.total(), held.acquired());
        assert_eq!(report.threads_joined, 3);
        assert_eq!(report.memory_bytes, 1024);
        assert_eq!(report.files_removed, 2);
        assert!(!temp_path.exists());
        assert!(!out_path.exists());
        assert!(held.is_empty());
    }

    #[test]
    fn test_fixed_output_is_kept() {
        let path = scratch_path("kept");
        let mut held = HeldResources::new(ResourceLimits::unlimited());
        held.push(HeldResource::Output(OutputFile::create(path.clone(), false).unwrap()));
        held.output_mut(&path).unwrap().write_chunk(&[0xCD; 4096]).unwrap();
        assert_eq!(held.output_mut(&path).unwrap().written(), 4096);

        let report = held.release();
        assert_eq!(report.outputs_closed, 1);
        assert_eq!(report.files_removed, 0);
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 4096);
        std::fs::remove_file(&path).unwrap();
    }
}
