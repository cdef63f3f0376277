// anomaly-sim/src/observability.rs
// Metrics emitted by the driver. No-ops until a recorder is installed.

use crate::error::SimError;
use metrics::{counter, describe_counter, describe_gauge, gauge, Unit};
use std::sync::Once;

pub const CPU_BUSY_MS: &str = "anomaly_sim_cpu_busy_milliseconds_total";
pub const MEMORY_HELD_BYTES: &str = "anomaly_sim_memory_held_bytes";
pub const THREADS_SPAWNED: &str = "anomaly_sim_threads_spawned";
pub const PROCESSES_SPAWNED: &str = "anomaly_sim_processes_spawned";
pub const BYTES_WRITTEN: &str = "anomaly_sim_bytes_written_total";
pub const FILES_OPENED: &str = "anomaly_sim_files_opened";
pub const CONNECT_ATTEMPTS: &str = "anomaly_sim_connect_attempts_total";
pub const FAILURES: &str = "anomaly_sim_failures_total";

static DESCRIBE: Once = Once::new();

/// Register descriptions with whatever recorder is installed. Call after
/// installing one; later calls do nothing.
pub fn describe_metrics() {
    DESCRIBE.call_once(|| {
        describe_counter!(CPU_BUSY_MS, Unit::Milliseconds, "CPU time burned by scripted bursts");
        describe_gauge!(MEMORY_HELD_BYTES, Unit::Bytes, "Bytes retained in leaked blocks");
        describe_gauge!(THREADS_SPAWNED, Unit::Count, "Subject threads created");
        describe_gauge!(PROCESSES_SPAWNED, Unit::Count, "Child processes forked");
        describe_counter!(BYTES_WRITTEN, Unit::Bytes, "Bytes written to output files");
        describe_gauge!(FILES_OPENED, Unit::Count, "Temp file descriptors held open");
        describe_counter!(CONNECT_ATTEMPTS, Unit::Count, "Outbound TCP connect attempts");
        describe_counter!(FAILURES, Unit::Count, "Resource acquisition failures");
    });
}

pub fn record_cpu(ms: u64) {
    counter!(CPU_BUSY_MS).increment(ms);
}

pub fn record_memory(held_bytes: u64) {
    gauge!(MEMORY_HELD_BYTES).set(held_bytes as f64);
}

pub fn record_threads(total: u64) {
    gauge!(THREADS_SPAWNED).set(total as f64);
}

pub fn record_processes(total: u64) {
    gauge!(PROCESSES_SPAWNED).set(total as f64);
}

pub fn record_written(bytes: u64) {
    counter!(BYTES_WRITTEN).increment(bytes);
}

pub fn record_files(total: u64) {
    gauge!(FILES_OPENED).set(total as f64);
}

pub fn record_connect(connected: bool) {
    let outcome = if connected { "connected" } else { "failed" };
    counter!(CONNECT_ATTEMPTS, "outcome" => outcome).increment(1);
}

pub fn record_failure(error: &SimError) {
    let category = format!("{:?}", error.category());
    counter!(FAILURES, "category" => category).increment(1);
}
