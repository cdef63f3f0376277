// sim-runner/src/bin/network_test.rs
// network-test standalone executable

use sim_runner::ScenarioKind;

#[tokio::main]
async fn main() {
    std::process::exit(sim_runner::launch::standalone(ScenarioKind::NetworkTest).await);
}
