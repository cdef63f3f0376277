// sim-runner/src/bin/fork_bomb_gradual.rs
// fork-bomb-gradual standalone executable

use sim_runner::ScenarioKind;

#[tokio::main]
async fn main() {
    std::process::exit(sim_runner::launch::standalone(ScenarioKind::ForkBombGradual).await);
}
