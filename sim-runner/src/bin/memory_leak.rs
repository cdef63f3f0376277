// sim-runner/src/bin/memory_leak.rs
// memory-leak standalone executable

use sim_runner::ScenarioKind;

#[tokio::main]
async fn main() {
    std::process::exit(sim_runner::launch::standalone(ScenarioKind::MemoryLeak).await);
}
