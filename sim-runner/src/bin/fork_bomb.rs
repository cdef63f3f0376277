// sim-runner/src/bin/fork_bomb.rs
// fork-bomb standalone executable

use sim_runner::ScenarioKind;

#[tokio::main]
async fn main() {
    std::process::exit(sim_runner::launch::standalone(ScenarioKind::ForkBomb).await);
}
