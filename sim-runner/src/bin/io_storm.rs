// sim-runner/src/bin/io_storm.rs
// io-storm standalone executable

use sim_runner::ScenarioKind;

#[tokio::main]
async fn main() {
    std::process::exit(sim_runner::launch::standalone(ScenarioKind::IoStorm).await);
}
