// sim-runner/src/bin/infinite_loop.rs
// infinite-loop standalone executable

use sim_runner::ScenarioKind;

#[tokio::main]
async fn main() {
    std::process::exit(sim_runner::launch::standalone(ScenarioKind::InfiniteLoop).await);
}
