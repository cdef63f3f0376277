// anomaly-sim/src/workers.rs
// Subject workers: CPU burners, idle threads and forked children

use crate::action::WorkerKind;
use crate::error::{Result, SimError};
use std::hint::black_box;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::debug;

const IDLE_POLL: Duration = Duration::from_secs(1);

/// Shared keep-running flag. Cloned into every worker at spawn time; cleared
/// once to stop them all.
#[derive(Debug, Clone)]
pub struct RunFlag(Arc<AtomicBool>);

impl RunFlag {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    pub fn is_running(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    pub fn stop(&self) {
        self.0.store(false, Ordering::Relaxed);
    }
}

impl Default for RunFlag {
    fn default() -> Self {
        Self::new()
    }
}

/// Spin on integer arithmetic for `duration` of wall-clock time.
/// Returns the number of inner rounds completed.
pub fn burn_cpu(duration: Duration) -> u64 {
    let start = Instant::now();
    let mut sum = 0u64;
    let mut counter = 0u64;
    let mut rounds = 0u64;

    while start.elapsed() < duration {
        for _ in 0..10_000 {
            sum = black_box(sum.wrapping_add(counter.wrapping_mul(counter) % 997));
            counter = counter.wrapping_add(1);
        }
        rounds += 1;
    }

    black_box(sum);
    rounds
}

fn cpu_burn_loop(flag: &RunFlag) {
    let mut sum = 0u64;
    while flag.is_running() {
        for i in 0..100_000u64 {
            sum = black_box(sum.wrapping_mul(31).wrapping_add(i) % 997);
        }
    }
}

fn idle_loop(flag: &RunFlag) {
    while flag.is_running() {
        thread::park_timeout(IDLE_POLL);
    }
}

/// Spawn one named OS thread running `kind`. `created` is the number of
/// threads this run already owns, used only for the error context.
pub fn spawn_worker(id: u64, kind: WorkerKind, flag: RunFlag, created: u64) -> Result<JoinHandle<()>> {
    thread::Builder::new()
        .name(format!("sim-worker-{}", id))
        .spawn(move || {
            debug!("Thread {} started ({:?})", id, kind);
            match kind {
                WorkerKind::Idle => idle_loop(&flag),
                WorkerKind::CpuBurn => cpu_burn_loop(&flag),
            }
        })
        .map_err(|source| SimError::ThreadSpawn { created, source })
}

/// Fork a child that sleeps for `linger_secs` and exits without returning
/// into the parent's code.
pub fn fork_sleeper(linger_secs: u32, created: u64) -> Result<nix::unistd::Pid> {
    use nix::unistd::{fork, ForkResult};

    // SAFETY: the child only calls async-signal-safe functions (sleep, _exit)
    // before terminating, so no runtime or allocator state is touched.
    match unsafe { fork() } {
        Ok(ForkResult::Parent { child }) => Ok(child),
        Ok(ForkResult::Child) => {
            nix::unistd::sleep(linger_secs);
            unsafe { libc::_exit(0) }
        }
        Err(source) => Err(SimError::ProcessSpawn { created, source }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_burn_cpu_runs_for_duration() {
        let start = Instant::now();
        let rounds = burn_cpu(Duration::from_millis(30));
        assert!(start.elapsed() >= Duration::from_millis(30));
        assert!(rounds > 0);
        assert_eq!(burn_cpu(Duration::ZERO), 0);
    }

    #[test]
    fn test_workers_stop_on_flag() {
        let flag = RunFlag::new();
        let idle = spawn_worker(1, WorkerKind::Idle, flag.clone(), 0).unwrap();
        let busy = spawn_worker(2, WorkerKind::CpuBurn, flag.clone(), 1).unwrap();
        assert_eq!(idle.thread().name(), Some("sim-worker-1"));

        flag.stop();
        idle.thread().unpark();
        idle.join().unwrap();
        busy.join().unwrap();
        assert!(!flag.is_running());
    }
}
