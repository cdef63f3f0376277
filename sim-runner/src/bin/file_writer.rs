// sim-runner/src/bin/file_writer.rs
// file-writer standalone executable

use sim_runner::ScenarioKind;

#[tokio::main]
async fn main() {
    std::process::exit(sim_runner::launch::standalone(ScenarioKind::FileWriter).await);
}
