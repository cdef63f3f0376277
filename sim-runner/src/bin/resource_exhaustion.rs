// sim-runner/src/bin/resource_exhaustion.rs
// resource-exhaustion standalone executable

use sim_runner::ScenarioKind;

#[tokio::main]
async fn main() {
    std::process::exit(sim_runner::launch::standalone(ScenarioKind::ResourceExhaustion).await);
}
