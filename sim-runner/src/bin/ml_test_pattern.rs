// sim-runner/src/bin/ml_test_pattern.rs
// ml-test-pattern standalone executable

use sim_runner::ScenarioKind;

#[tokio::main]
async fn main() {
    std::process::exit(sim_runner::launch::standalone(ScenarioKind::MlTestPattern).await);
}
