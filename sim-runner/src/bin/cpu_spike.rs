// sim-runner/src/bin/cpu_spike.rs
// cpu-spike standalone executable

use sim_runner::ScenarioKind;

#[tokio::main]
async fn main() {
    std::process::exit(sim_runner::launch::standalone(ScenarioKind::CpuSpike).await);
}
