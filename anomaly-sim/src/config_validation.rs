// anomaly-sim/src/config_validation.rs
// Parameter validation against fixed rules and the host's limits

use crate::error::{Result, SimError};
use crate::scenarios::{ml_test_pattern, Parameters};
use nix::sys::resource::{getrlimit, Resource};
use tracing::{debug, error, info, warn};

/// Host facts the rules compare against
#[derive(Debug, Clone)]
pub struct SystemConstraints {
    pub cpu_cores: u64,
    /// Soft RLIMIT_NPROC, `None` when unlimited or unreadable
    pub max_user_processes: Option<u64>,
}

impl SystemConstraints {
    pub fn detect() -> Self {
        let max_user_processes = match getrlimit(Resource::RLIMIT_NPROC) {
            Ok((soft, _)) if soft != libc::RLIM_INFINITY => Some(soft),
            Ok(_) => None,
            Err(e) => {
                debug!("RLIMIT_NPROC unreadable: {}", e);
                None
            }
        };
        Self {
            cpu_cores: num_cpus::get() as u64,
            max_user_processes,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ValidationRule {
    pub name: &'static str,
    pub field: &'static str,
    pub validator: fn(&Parameters, &SystemConstraints) -> ValidationResult,
    pub severity: ValidationSeverity,
}

#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub message: String,
}

impl ValidationResult {
    fn ok() -> Self {
        Self {
            is_valid: true,
            message: String::new(),
        }
    }

    fn fail(message: String) -> Self {
        Self {
            is_valid: false,
            message,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ValidationSeverity {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone)]
pub struct ValidationIssue {
    pub rule_name: String,
    pub severity: ValidationSeverity,
    pub field: String,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn errors(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues
            .iter()
            .filter(|i| i.severity >= ValidationSeverity::Error)
    }

    /// Emit every issue at a log level matching its severity
    pub fn log(&self) {
        for issue in &self.issues {
            match issue.severity {
                ValidationSeverity::Info => info!("config [{}] {}", issue.field, issue.message),
                ValidationSeverity::Warning => warn!("config [{}] {}", issue.field, issue.message),
                ValidationSeverity::Error => error!("config [{}] {}", issue.field, issue.message),
            }
        }
    }

    /// First error as a `SimError::Config`
    pub fn into_result(self) -> Result<()> {
        match self.errors().next() {
            Some(issue) => Err(SimError::Config {
                field: issue.field.clone(),
                message: issue.message.clone(),
            }),
            None => Ok(()),
        }
    }
}

pub struct ConfigValidator {
    system_constraints: SystemConstraints,
    validation_rules: Vec<ValidationRule>,
}

impl ConfigValidator {
    pub fn new() -> Self {
        Self::with_constraints(SystemConstraints::detect())
    }

    pub fn with_constraints(system_constraints: SystemConstraints) -> Self {
        let validation_rules = Self::create_validation_rules();
        debug!(
            "Config validator: {} rules, constraints {:?}",
            validation_rules.len(),
            system_constraints
        );
        Self {
            system_constraints,
            validation_rules,
        }
    }

    pub fn validate(&self, params: &Parameters) -> ValidationReport {
        let issues: Vec<ValidationIssue> = self
            .validation_rules
            .iter()
            .filter_map(|rule| {
                let result = (rule.validator)(params, &self.system_constraints);
                (!result.is_valid).then(|| ValidationIssue {
                    rule_name: rule.name.to_string(),
                    severity: rule.severity,
                    field: rule.field.to_string(),
                    message: result.message,
                })
            })
            .collect();

        let is_valid = issues.iter().all(|i| i.severity < ValidationSeverity::Error);
        ValidationReport { is_valid, issues }
    }

    fn create_validation_rules() -> Vec<ValidationRule> {
        vec![
            ValidationRule {
                name: "chunk_sizes_nonzero",
                field: "*.chunk_bytes",
                validator: |p, _| {
                    let chunks = [
                        ("io_storm.chunk_bytes", p.io_storm.chunk_bytes),
                        ("file_writer.chunk_bytes", p.file_writer.chunk_bytes),
                        ("memory_hog.chunk_bytes", p.memory_hog.chunk_bytes),
                        ("memory_leak.increment_bytes", p.memory_leak.increment_bytes),
                        (
                            "resource_exhaustion.memory_increment_bytes",
                            p.resource_exhaustion.memory_increment_bytes,
                        ),
                        ("ml_test_pattern.leak_increment_bytes", p.ml_test_pattern.leak_increment_bytes),
                    ];
                    let zero: Vec<&str> = chunks
                        .iter()
                        .filter(|(_, bytes)| *bytes == 0)
                        .map(|(name, _)| *name)
                        .collect();
                    if zero.is_empty() {
                        ValidationResult::ok()
                    } else {
                        ValidationResult::fail(format!("must be non-zero: {}", zero.join(", ")))
                    }
                },
                severity: ValidationSeverity::Error,
            },
            ValidationRule {
                name: "thread_floor_below_ceiling",
                field: "fork_bomb_gradual.min_threads",
                validator: |p, _| {
                    let g = &p.fork_bomb_gradual;
                    if g.min_threads == 0 || g.min_threads > g.hard_limit {
                        ValidationResult::fail(format!(
                            "min_threads {} must be within 1..={}",
                            g.min_threads, g.hard_limit
                        ))
                    } else {
                        ValidationResult::ok()
                    }
                },
                severity: ValidationSeverity::Error,
            },
            ValidationRule {
                name: "thread_default_clamped",
                field: "fork_bomb_gradual.max_threads",
                validator: |p, _| {
                    let g = &p.fork_bomb_gradual;
                    let effective = g.effective_max(None);
                    if effective != g.max_threads {
                        ValidationResult::fail(format!(
                            "max_threads {} will be clamped to {}",
                            g.max_threads, effective
                        ))
                    } else {
                        ValidationResult::ok()
                    }
                },
                severity: ValidationSeverity::Warning,
            },
            ValidationRule {
                name: "ml_default_pattern",
                field: "ml_test_pattern.default_pattern",
                validator: |p, _| {
                    let pattern = p.ml_test_pattern.default_pattern;
                    if ml_test_pattern::PATTERNS.iter().any(|(id, _)| *id == pattern) {
                        ValidationResult::ok()
                    } else {
                        ValidationResult::fail(format!("pattern {} is not one of 1-5", pattern))
                    }
                },
                severity: ValidationSeverity::Error,
            },
            ValidationRule {
                name: "network_address",
                field: "network_test.addr",
                validator: |p, _| match p.network_test.socket_addr() {
                    Ok(_) => ValidationResult::ok(),
                    Err(e) => ValidationResult::fail(e.to_string()),
                },
                severity: ValidationSeverity::Error,
            },
            ValidationRule {
                name: "leak_iterations_vs_block_cap",
                field: "memory_leak.max_blocks",
                validator: |p, _| {
                    let m = &p.memory_leak;
                    if m.leak_iterations > m.max_blocks as u64 {
                        ValidationResult::fail(format!(
                            "{} leak iterations but only {} blocks kept, later leaks are skipped",
                            m.leak_iterations, m.max_blocks
                        ))
                    } else {
                        ValidationResult::ok()
                    }
                },
                severity: ValidationSeverity::Warning,
            },
            ValidationRule {
                name: "combo_leaks_vs_block_cap",
                field: "resource_exhaustion.max_memory_blocks",
                validator: |p, _| {
                    let r = &p.resource_exhaustion;
                    let leaks = (r.attack_iterations + 1) / 2;
                    if leaks > r.max_memory_blocks as u64 {
                        ValidationResult::fail(format!(
                            "{} leaks scheduled but only {} blocks kept",
                            leaks, r.max_memory_blocks
                        ))
                    } else {
                        ValidationResult::ok()
                    }
                },
                severity: ValidationSeverity::Warning,
            },
            ValidationRule {
                name: "baseline_burn_fits_tick",
                field: "cpu_spike.baseline_burn_ms",
                validator: |p, _| {
                    let c = &p.cpu_spike;
                    if c.baseline_burn_ms > c.tick_ms {
                        ValidationResult::fail(format!(
                            "baseline burn {}ms is longer than the {}ms tick",
                            c.baseline_burn_ms, c.tick_ms
                        ))
                    } else {
                        ValidationResult::ok()
                    }
                },
                severity: ValidationSeverity::Warning,
            },
            ValidationRule {
                name: "unbounded_loops_pace",
                field: "*.delay_ms",
                validator: |p, _| {
                    let busy: Vec<&str> = [
                        ("file_writer.delay_ms", p.file_writer.delay_ms),
                        ("fork_bomb.delay_ms", p.fork_bomb.delay_ms),
                        ("memory_hog.delay_ms", p.memory_hog.delay_ms),
                        ("network_test.delay_ms", p.network_test.delay_ms),
                    ]
                    .into_iter()
                    .filter(|(_, ms)| *ms == 0)
                    .map(|(name, _)| name)
                    .collect();
                    if busy.is_empty() {
                        ValidationResult::ok()
                    } else {
                        ValidationResult::fail(format!(
                            "zero delay on an unbounded loop: {}",
                            busy.join(", ")
                        ))
                    }
                },
                severity: ValidationSeverity::Warning,
            },
            ValidationRule {
                name: "burners_vs_cores",
                field: "resource_exhaustion.max_threads",
                validator: |p, constraints| {
                    let threads = p.resource_exhaustion.max_threads as u64;
                    if threads > constraints.cpu_cores {
                        ValidationResult::fail(format!(
                            "up to {} CPU-burning threads on {} cores",
                            threads, constraints.cpu_cores
                        ))
                    } else {
                        ValidationResult::ok()
                    }
                },
                severity: ValidationSeverity::Info,
            },
            ValidationRule {
                name: "fork_bomb_process_limit",
                field: "fork_bomb",
                validator: |_, constraints| match constraints.max_user_processes {
                    Some(_) => ValidationResult::ok(),
                    None => ValidationResult::fail(
                        "RLIMIT_NPROC is unlimited, fork-bomb runs until interrupted".to_string(),
                    ),
                },
                severity: ValidationSeverity::Info,
            },
        ]
    }
}

impl Default for ConfigValidator {
    fn default() -> Self {
        Self::new()
    }
}

/// Validate with detected host constraints
pub fn validate(params: &Parameters) -> ValidationReport {
    ConfigValidator::new().validate(params)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator() -> ConfigValidator {
        ConfigValidator::with_constraints(SystemConstraints {
            cpu_cores: 64,
            max_user_processes: Some(4096),
        })
    }

    #[test]
    fn test_defaults_are_valid() {
        let report = validator().validate(&Parameters::default());
        assert!(report.is_valid, "{:?}", report.issues);
        assert_eq!(report.errors().count(), 0);
        assert!(report.into_result().is_ok());
    }

    #[test]
    fn test_zero_chunk_is_an_error() {
        let mut params = Parameters::default();
        params.io_storm.chunk_bytes = 0;
        let report = validator().validate(&params);
        assert!(!report.is_valid);
        let issue = report.errors().next().unwrap();
        assert_eq!(issue.rule_name, "chunk_sizes_nonzero");
        assert!(issue.message.contains("io_storm.chunk_bytes"));
    }

    #[test]
    fn test_bad_pattern_and_address_fail() {
        let mut params = Parameters::default();
        params.ml_test_pattern.default_pattern = 9;
        params.network_test.addr = "nowhere".to_string();
        let report = validator().validate(&params);
        assert_eq!(report.errors().count(), 2);
        assert!(matches!(report.into_result(), Err(SimError::Config { .. })));
    }

    #[test]
    fn test_clamped_maximum_only_warns() {
        let mut params = Parameters::default();
        params.fork_bomb_gradual.max_threads = 500;
        params.memory_leak.max_blocks = 10;
        let report = validator().validate(&params);
        assert!(report.is_valid);
        let warned: Vec<&str> = report
            .issues
            .iter()
            .filter(|i| i.severity == ValidationSeverity::Warning)
            .map(|i| i.rule_name.as_str())
            .collect();
        assert_eq!(warned, vec!["thread_default_clamped", "leak_iterations_vs_block_cap"]);
    }

    #[test]
    fn test_small_host_gets_info_notes() {
        let report = ConfigValidator::with_constraints(SystemConstraints {
            cpu_cores: 2,
            max_user_processes: None,
        })
        .validate(&Parameters::default());
        assert!(report.is_valid);
        assert_eq!(
            report
                .issues
                .iter()
                .filter(|i| i.severity == ValidationSeverity::Info)
                .count(),
            2
        );
    }
}
