// anomaly-sim/src/error.rs
// Error handling for the workload generators

use std::io;
use std::path::PathBuf;
use std::result;
use thiserror::Error;

/// Main error type for the anomaly simulators
#[derive(Error, Debug)]
pub enum SimError {
    /// Memory reservation refused by the allocator
    #[error("memory allocation of {} MB failed (held: {} MB)", .requested / crate::MB, .held / crate::MB)]
    Allocation { requested: u64, held: u64 },

    /// OS refused to create another thread
    #[error("thread creation failed after {created} threads - {source}")]
    ThreadSpawn {
        created: u64,
        #[source]
        source: io::Error,
    },

    /// fork(2) failed
    #[error("fork failed after {created} processes - {source}")]
    ProcessSpawn {
        created: u64,
        #[source]
        source: nix::Error,
    },

    /// Output or temp file could not be created
    #[error("failed to open {} - {source}", .path.display())]
    FileOpen {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Write or flush failed part way through the run
    #[error("write failed after {} MB - {source}", .written / crate::MB)]
    Write {
        written: u64,
        #[source]
        source: io::Error,
    },

    /// socket(2) failed; connect failures are not errors
    #[error("socket creation failed - {0}")]
    Socket(#[source] io::Error),

    /// Configuration validation errors
    #[error("Configuration error: {field} - {message}")]
    Config { field: String, message: String },

    #[error("unknown scenario: {0}")]
    UnknownScenario(String),

    #[error("invalid pattern {0} (expected 1-5)")]
    InvalidPattern(i64),

    /// Other I/O errors
    #[error("I/O error: {operation} failed - {source}")]
    Io {
        operation: String,
        #[source]
        source: io::Error,
    },

    /// A blocking task panicked or was cancelled
    #[error("worker task failed: {0}")]
    Task(String),
}

/// Result type alias for convenience
pub type Result<T> = result::Result<T, SimError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The OS refused more of a resource. Expected during attack phases.
    ResourceExhausted,
    /// Bad parameters or a broken environment, detected before or between phases
    Setup,
    /// Bug or panic inside a worker
    Internal,
}

impl SimError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            SimError::Allocation { .. }
            | SimError::ThreadSpawn { .. }
            | SimError::ProcessSpawn { .. }
            | SimError::Write { .. }
            | SimError::Socket(_) => ErrorCategory::ResourceExhausted,
            SimError::FileOpen { .. }
            | SimError::Config { .. }
            | SimError::UnknownScenario(_)
            | SimError::InvalidPattern(_)
            | SimError::Io { .. } => ErrorCategory::Setup,
            SimError::Task(_) => ErrorCategory::Internal,
        }
    }

    pub fn is_resource_exhaustion(&self) -> bool {
        self.category() == ErrorCategory::ResourceExhausted
    }

    /// Every failure that ends a run maps to exit code 1.
    pub fn exit_code(&self) -> i32 {
        1
    }
}

/// Helper macro for error creation
#[macro_export]
macro_rules! sim_error {
    (config, $field:expr, $msg:expr) => {
        $crate::SimError::Config {
            field: $field.to_string(),
            message: $msg.to_string(),
        }
    };
    (io, $op:expr, $source:expr) => {
        $crate::SimError::Io {
            operation: $op.to_string(),
            source: $source,
        }
    };
}

impl From<io::Error> for SimError {
    fn from(err: io::Error) -> Self {
        SimError::Io {
            operation: "unknown".to_string(),
            source: err,
        }
    }
}

impl From<tokio::task::JoinError> for SimError {
    fn from(err: tokio::task::JoinError) -> Self {
        SimError::Task(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_categorization() {
        let alloc = SimError::Allocation {
            requested: 5 * crate::MB,
            held: 10 * crate::MB,
        };
        assert!(alloc.is_resource_exhaustion());
        assert_eq!(alloc.exit_code(), 1);

        let config = sim_error!(config, "io_storm.chunk_bytes", "must be non-zero");
        assert_eq!(config.category(), ErrorCategory::Setup);
        assert!(!config.is_resource_exhaustion());
    }

    #[test]
    fn test_error_messages_carry_context() {
        let alloc = SimError::Allocation {
            requested: 125 * crate::MB,
            held: 1500 * crate::MB,
        };
        assert_eq!(
            alloc.to_string(),
            "memory allocation of 125 MB failed (held: 1500 MB)"
        );

        let write = SimError::Write {
            written: 42 * crate::MB,
            source: io::Error::new(io::ErrorKind::Other, "No space left on device"),
        };
        assert!(write.to_string().starts_with("write failed after 42 MB"));

        let open = SimError::FileOpen {
            path: PathBuf::from("/nonexistent/out.dat"),
            source: io::Error::new(io::ErrorKind::NotFound, "missing"),
        };
        assert!(open.to_string().contains("/nonexistent/out.dat"));
    }

    #[test]
    fn test_io_conversion() {
        let err: SimError = io::Error::new(io::ErrorKind::PermissionDenied, "nope").into();
        assert_eq!(err.category(), ErrorCategory::Setup);
    }
}
