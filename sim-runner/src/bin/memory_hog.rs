// sim-runner/src/bin/memory_hog.rs
// memory-hog standalone executable

use sim_runner::ScenarioKind;

#[tokio::main]
async fn main() {
    std::process::exit(sim_runner::launch::standalone(ScenarioKind::MemoryHog).await);
}
