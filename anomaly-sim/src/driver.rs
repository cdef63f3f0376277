// anomaly-sim/src/driver.rs
// Phased workload driver: runs a plan's phases, then releases or abandons

use crate::action::{Action, ResourceKind};
use crate::error::{Result, SimError};
use crate::observability;
use crate::phase::{FailurePolicy, Phase, PhaseKind};
use crate::plan::{Cleanup, ScenarioPlan};
use crate::report::{Counters, Event, Reporter};
use crate::resources::{HeldResource, HeldResources, MemoryBlock, OutputFile, ReleaseReport, TempFile};
use crate::workers::{burn_cpu, fork_sleeper, spawn_worker, RunFlag};
use serde::{Deserialize, Serialize};
use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

const CANCEL_POLL: Duration = Duration::from_millis(100);

#[derive(Debug)]
pub enum RunStatus {
    Completed,
    /// A `Terminate` policy fired, or setup failed before the first phase
    Terminated(SimError),
    Interrupted,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Completed => f.write_str("completed"),
            RunStatus::Terminated(e) => write!(f, "terminated: {}", e),
            RunStatus::Interrupted => f.write_str("interrupted"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseStats {
    pub name: String,
    pub kind: PhaseKind,
    pub iterations_completed: u64,
    pub ended_early: bool,
    pub elapsed: Duration,
    /// Totals as they stood when the phase ended
    pub counters: Counters,
}

#[derive(Debug)]
pub struct RunOutcome {
    pub status: RunStatus,
    pub counters: Counters,
    pub phases: Vec<PhaseStats>,
    /// `None` when the plan abandons its resources
    pub released: Option<ReleaseReport>,
    /// Resources acquired over the whole run
    pub acquired: u64,
    pub elapsed: Duration,
}

impl RunOutcome {
    pub fn exit_code(&self) -> i32 {
        match &self.status {
            RunStatus::Completed => 0,
            RunStatus::Terminated(e) => e.exit_code(),
            RunStatus::Interrupted => 130,
        }
    }

    pub fn phase(&self, name: &str) -> Option<&PhaseStats> {
        self.phases.iter().find(|p| p.name == name)
    }
}

/// Mutable state of a run, kept apart from the plan and reporter so phases
/// can be iterated while it is updated.
struct RunState {
    held: HeldResources,
    counters: Counters,
    chunk: Option<MemoryBlock>,
}

impl RunState {
    fn ensure_chunk(&mut self, bytes: u64, fill: u8) -> Result<()> {
        let reusable = self
            .chunk
            .as_ref()
            .map_or(false, |c| c.len() == bytes && (c.is_empty() || c.fill_byte() == Some(fill)));
        if !reusable {
            self.chunk = Some(MemoryBlock::allocate(bytes, fill, self.held.memory_bytes())?);
        }
        Ok(())
    }

    fn ensure_output(&mut self, action: &Action) -> Result<()> {
        if let Action::WriteBytes { target, .. } = action {
            let path = target.resolve();
            if self.held.output_mut(&path).is_none() {
                let output = OutputFile::create(path, target.is_temporary())?;
                info!("Opened output file {}", output.path().display());
                self.held.push(HeldResource::Output(output));
            }
        }
        Ok(())
    }

    /// Open write targets and allocate the write buffer before anything
    /// runs, so a broken environment fails the run up front.
    fn prepare(&mut self, plan: &ScenarioPlan) -> Result<()> {
        for step in plan.phases.iter().flat_map(|p| p.steps.iter()) {
            if let Action::WriteBytes { fill, .. } = &step.action {
                self.ensure_output(&step.action)?;
                if self.chunk.is_none() {
                    self.ensure_chunk(step.intensity.at(0), *fill)?;
                }
            }
        }
        Ok(())
    }

    async fn run_iteration<R: Reporter>(
        &mut self,
        phase: &Phase,
        index: u64,
        fired: &mut [u64],
        reporter: &mut R,
    ) -> Result<()> {
        for (slot, step) in phase.steps.iter().enumerate() {
            if !step.schedule.fires(index) {
                continue;
            }
            let amount = step.intensity.at(fired[slot]);
            if self.perform(&step.action, amount, reporter).await? {
                fired[slot] += 1;
            }
        }
        Ok(())
    }

    /// Returns `false` when the action was skipped because its cap is reached
    async fn perform<R: Reporter>(&mut self, action: &Action, amount: u64, reporter: &mut R) -> Result<bool> {
        match action {
            Action::BurnCpu => {
                if amount > 0 {
                    let duration = Duration::from_millis(amount);
                    let rounds = tokio::task::spawn_blocking(move || burn_cpu(duration)).await?;
                    self.counters.cpu_busy_ms += amount;
                    self.counters.cpu_rounds += rounds;
                    observability::record_cpu(amount);
                }
                Ok(true)
            }
            Action::AllocateMemory { fill } => {
                if !self.held.has_room(ResourceKind::Memory) {
                    debug!("Memory block cap reached, skipping allocation");
                    return Ok(false);
                }
                let block = MemoryBlock::allocate(amount, *fill, self.held.memory_bytes())?;
                self.held.push(HeldResource::Memory(block));
                self.counters.memory_blocks += 1;
                self.counters.memory_bytes += amount;
                self.counters.last_block_bytes = amount;
                observability::record_memory(self.counters.memory_bytes);
                Ok(true)
            }
            Action::SpawnThread { worker } => {
                let count = self.bounded_count(ResourceKind::Thread, amount);
                if count == 0 {
                    return Ok(false);
                }
                for _ in 0..count {
                    let created = self.counters.threads_spawned;
                    let handle = spawn_worker(created + 1, *worker, self.held.keep_running(), created)?;
                    self.held.push(HeldResource::Thread(handle));
                    self.counters.threads_spawned += 1;
                }
                observability::record_threads(self.counters.threads_spawned);
                Ok(true)
            }
            Action::SpawnProcess { linger_secs } => {
                let count = self.bounded_count(ResourceKind::Process, amount);
                if count == 0 {
                    return Ok(false);
                }
                for _ in 0..count {
                    let pid = fork_sleeper(*linger_secs, self.counters.processes_spawned)?;
                    self.held.push(HeldResource::Process(pid));
                    self.counters.processes_spawned += 1;
                    self.counters.last_pid = Some(pid.as_raw());
                }
                observability::record_processes(self.counters.processes_spawned);
                Ok(true)
            }
            Action::WriteBytes { target, fill } => {
                self.ensure_output(action)?;
                self.ensure_chunk(amount, *fill)?;
                let path = target.resolve();
                let chunk = self.chunk.as_ref().map(MemoryBlock::as_slice).unwrap_or_default();
                match self.held.output_mut(&path) {
                    Some(output) => output.write_chunk(chunk)?,
                    None => return Err(crate::sim_error!(io, "locate output file", std::io::ErrorKind::NotFound.into())),
                }
                self.counters.bytes_written += amount;
                observability::record_written(amount);
                Ok(true)
            }
            Action::OpenFile { prefix } => {
                let count = self.bounded_count(ResourceKind::File, amount);
                if count == 0 {
                    return Ok(false);
                }
                for _ in 0..count {
                    let name = format!("{}_{}_{}.tmp", prefix, std::process::id(), self.counters.files_opened);
                    let file = TempFile::create(std::env::temp_dir().join(name))?;
                    self.held.push(HeldResource::File(file));
                    self.counters.files_opened += 1;
                }
                observability::record_files(self.counters.files_opened);
                Ok(true)
            }
            Action::ConnectSocket { addr } => {
                for _ in 0..amount {
                    self.counters.connect_attempts += 1;
                    let attempt = self.counters.connect_attempts;
                    let socket = Socket::new(Domain::for_address(*addr), Type::STREAM, Some(Protocol::TCP))
                        .map_err(SimError::Socket)?;
                    let target = SockAddr::from(*addr);
                    debug!("Attempt {}: connecting to {}", attempt, addr);
                    // Socket is dropped, and so closed, inside the blocking task
                    let result = tokio::task::spawn_blocking(move || socket.connect(&target)).await?;
                    match &result {
                        Ok(()) => self.counters.connects_succeeded += 1,
                        Err(_) => self.counters.connects_failed += 1,
                    }
                    observability::record_connect(result.is_ok());
                    reporter.on_event(&Event::ConnectAttempt {
                        attempt,
                        addr: *addr,
                        result: result.as_ref().map(|_| ()),
                    });
                }
                Ok(true)
            }
        }
    }

    fn bounded_count(&self, kind: ResourceKind, requested: u64) -> u64 {
        match self.held.room(kind) {
            Some(room) => requested.min(room as u64),
            None => requested,
        }
    }
}

/// Runs one scenario plan against a reporter
pub struct PhasedDriver<R: Reporter> {
    plan: ScenarioPlan,
    reporter: R,
    cancel: RunFlag,
    state: RunState,
}

impl<R: Reporter> PhasedDriver<R> {
    pub fn new(plan: ScenarioPlan, reporter: R) -> Self {
        let held = HeldResources::new(plan.limits.clone());
        Self {
            plan,
            reporter,
            cancel: RunFlag::new(),
            state: RunState {
                held,
                counters: Counters::default(),
                chunk: None,
            },
        }
    }

    /// Use `flag` as the cancellation signal; clearing it stops the run
    /// before the next iteration.
    pub fn with_cancel_flag(mut self, flag: RunFlag) -> Self {
        self.cancel = flag;
        self
    }

    pub fn cancel_flag(&self) -> RunFlag {
        self.cancel.clone()
    }

    pub fn plan(&self) -> &ScenarioPlan {
        &self.plan
    }

    pub fn reporter(&self) -> &R {
        &self.reporter
    }

    pub fn into_reporter(self) -> R {
        self.reporter
    }

    /// Resources currently held
    pub fn held(&self) -> &HeldResources {
        &self.state.held
    }

    #[instrument(skip(self), fields(scenario = %self.plan.name))]
    pub async fn run(&mut self) -> RunOutcome {
        let PhasedDriver {
            plan,
            reporter,
            cancel,
            state,
        } = self;
        let plan: &ScenarioPlan = plan;
        let cancel: &RunFlag = cancel;
        let started = Instant::now();
        let total = plan.phases.len();
        let mut phases = Vec::with_capacity(total);
        let mut status = RunStatus::Completed;

        info!("Starting scenario with {} phases", total);
        reporter.on_event(&Event::ScenarioStarted { plan });

        if let Err(error) = state.prepare(plan) {
            warn!("Setup failed: {}", error);
            status = RunStatus::Terminated(error);
        }

        let runnable: &[Phase] = match status {
            RunStatus::Completed => &plan.phases,
            _ => &[],
        };
        for (index, phase) in runnable.iter().enumerate() {
            if !cancel.is_running() {
                status = RunStatus::Interrupted;
                break;
            }

            reporter.on_event(&Event::PhaseStarted {
                index,
                total,
                phase,
                counters: &state.counters,
            });
            debug!("Phase {} ({:?}) started", phase.name, phase.kind);

            let phase_start = Instant::now();
            let mut fired = vec![0u64; phase.steps.len()];
            let mut completed = 0u64;
            let mut ended_early = false;
            let mut terminal = None;
            let mut index_in_phase = 0u64;

            while phase.iterations.allows(index_in_phase) {
                if !cancel.is_running() {
                    status = RunStatus::Interrupted;
                    ended_early = true;
                    break;
                }

                let mut delay = phase.delay.for_iteration(index_in_phase);
                match state.run_iteration(phase, index_in_phase, &mut fired, reporter).await {
                    Ok(()) => {
                        completed += 1;
                        let iteration = index_in_phase + 1;
                        for milestone in phase.milestones.iter().filter(|m| m.at == iteration) {
                            reporter.on_event(&Event::Milestone {
                                phase,
                                milestone,
                                counters: &state.counters,
                            });
                        }
                        if phase.checkpoints.hit(iteration) {
                            reporter.on_event(&Event::Checkpoint {
                                phase,
                                iteration,
                                elapsed: phase_start.elapsed(),
                                counters: &state.counters,
                            });
                        }
                    }
                    Err(error) => {
                        state.counters.failures += 1;
                        observability::record_failure(&error);
                        warn!("Phase {} iteration {} failed: {}", phase.name, index_in_phase + 1, error);
                        reporter.on_event(&Event::StepFailed {
                            phase,
                            iteration: index_in_phase + 1,
                            error: &error,
                        });
                        match phase.on_failure {
                            FailurePolicy::AbortPhase => {
                                ended_early = true;
                                break;
                            }
                            FailurePolicy::RetryAfter(retry) => delay = retry,
                            FailurePolicy::Continue => {}
                            FailurePolicy::Terminate => {
                                ended_early = true;
                                terminal = Some(error);
                                break;
                            }
                        }
                    }
                }

                sleep_unless_cancelled(delay, cancel).await;
                index_in_phase += 1;
            }

            let stats = PhaseStats {
                name: phase.name.clone(),
                kind: phase.kind,
                iterations_completed: completed,
                ended_early,
                elapsed: phase_start.elapsed(),
                counters: state.counters.clone(),
            };
            reporter.on_event(&Event::PhaseFinished { phase, stats: &stats });
            phases.push(stats);

            if let Some(error) = terminal {
                status = RunStatus::Terminated(error);
                break;
            }
            if matches!(status, RunStatus::Interrupted) {
                break;
            }
        }

        if matches!(status, RunStatus::Interrupted) {
            info!("Run interrupted");
            reporter.on_event(&Event::Interrupted);
        }

        let acquired = state.held.acquired();
        let released = match plan.cleanup {
            Cleanup::Release => {
                let report = state.held.release();
                info!("Released {} of {} acquired resources", report.total(), acquired);
                reporter.on_event(&Event::CleanupFinished { report: &report });
                Some(report)
            }
            Cleanup::Abandon => {
                debug!("Abandoning {} held resources", state.held.len());
                None
            }
        };

        let outcome = RunOutcome {
            status,
            counters: state.counters.clone(),
            phases,
            released,
            acquired,
            elapsed: started.elapsed(),
        };
        reporter.on_event(&Event::ScenarioFinished {
            plan,
            outcome: &outcome,
        });
        outcome
    }
}

async fn sleep_unless_cancelled(delay: Duration, cancel: &RunFlag) {
    let deadline = tokio::time::Instant::now() + delay;
    loop {
        let now = tokio::time::Instant::now();
        if now >= deadline || !cancel.is_running() {
            return;
        }
        tokio::time::sleep((deadline - now).min(CANCEL_POLL)).await;
    }
}
