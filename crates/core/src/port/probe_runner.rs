// Probe Runner Port
// Abstraction for executing a built probe program in a child process

use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

/// Captured result of one probe run
#[derive(Debug, Clone)]
pub struct ProbeOutput {
    pub status: ExecutionStatus,
    pub duration_ms: i64,
    pub exit_code: Option<i32>,
    /// Full stdout of the probe; stderr is not captured
    pub stdout: Vec<u8>,
}

/// Execution status
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionStatus {
    Success,
    Failed,
}

/// Execution errors
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("Spawn failed: {0}")]
    SpawnFailed(String),

    #[error("Probe exited with {}", describe_exit(.exit_code))]
    NonZeroExit { exit_code: Option<i32> },

    #[error("IO error: {0}")]
    IoError(String),
}

fn describe_exit(exit_code: &Option<i32>) -> String {
    match exit_code {
        Some(code) => format!("status {}", code),
        None => "a signal".to_string(),
    }
}

/// Probe Runner trait
///
/// Implementations:
/// - SubprocessProbeRunner: spawns the probe as a child process
/// - MockProbeRunner: canned output for tests
#[async_trait]
pub trait ProbeRunner: Send + Sync {
    /// Run the probe at `program` and wait for it to exit
    ///
    /// No timeout is applied; a probe that never exits stalls the caller.
    ///
    /// # Errors
    /// - ExecutionError::SpawnFailed if the program cannot be started
    /// - ExecutionError::IoError if waiting on the child fails
    async fn run(&self, program: &Path) -> Result<ProbeOutput, ExecutionError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};

    /// Mock runner behavior
    #[derive(Debug, Clone)]
    pub enum MockBehavior {
        /// Exit 0 with this stdout
        Output(Vec<u8>),
        /// Exit with this non-zero code and stdout
        Exit(i32, Vec<u8>),
        /// Fail to spawn with message
        SpawnFail(String),
    }

    /// Mock Probe Runner for testing
    pub struct MockProbeRunner {
        behavior: Arc<Mutex<MockBehavior>>,
        calls: Arc<Mutex<Vec<PathBuf>>>,
    }

    impl MockProbeRunner {
        pub fn new(behavior: MockBehavior) -> Self {
            Self {
                behavior: Arc::new(Mutex::new(behavior)),
                calls: Arc::new(Mutex::new(Vec::new())),
            }
        }

        pub fn new_output(stdout: impl Into<Vec<u8>>) -> Self {
            Self::new(MockBehavior::Output(stdout.into()))
        }

        pub fn new_exit(code: i32) -> Self {
            Self::new(MockBehavior::Exit(code, Vec::new()))
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }

        pub fn calls(&self) -> Vec<PathBuf> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ProbeRunner for MockProbeRunner {
        async fn run(&self, program: &Path) -> Result<ProbeOutput, ExecutionError> {
            self.calls.lock().unwrap().push(program.to_path_buf());

            let behavior = self.behavior.lock().unwrap().clone();

            match behavior {
                MockBehavior::Output(stdout) => Ok(ProbeOutput {
                    status: ExecutionStatus::Success,
                    duration_ms: 10,
                    exit_code: Some(0),
                    stdout,
                }),
                MockBehavior::Exit(code, stdout) => Ok(ProbeOutput {
                    status: ExecutionStatus::Failed,
                    duration_ms: 10,
                    exit_code: Some(code),
                    stdout,
                }),
                MockBehavior::SpawnFail(msg) => Err(ExecutionError::SpawnFailed(msg)),
            }
        }
    }
}
