// Subprocess probe runner
// reason: async-trait, tokio for async process management
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;
use tracing::info;

use mockprobe_core::port::probe_runner::{
    ExecutionError, ExecutionStatus, ProbeOutput, ProbeRunner,
};
use mockprobe_core::port::TimeProvider;

/// Subprocess probe runner
/// Spawns the probe as a child process: stdout captured, stderr passed through
pub struct SubprocessProbeRunner {
    time_provider: Arc<dyn TimeProvider>,
}

impl SubprocessProbeRunner {
    /// Create a new subprocess runner
    ///
    /// # Arguments
    /// * `time_provider` - Time provider for duration tracking
    ///
    /// # Example
    /// ```ignore
    /// let runner = SubprocessProbeRunner::new(Arc::new(SystemTimeProvider));
    /// ```
    pub fn new(time_provider: Arc<dyn TimeProvider>) -> Self {
        Self { time_provider }
    }

    /// Spawn child process and wait for it, with no timeout
    async fn spawn_and_wait(&self, program: &Path) -> Result<std::process::Output, ExecutionError> {
        let child = Command::new(program)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| ExecutionError::SpawnFailed(format!("{}: {}", program.display(), e)))?;

        child
            .wait_with_output()
            .await
            .map_err(|e| ExecutionError::IoError(e.to_string()))
    }

    /// Build probe output from process output
    fn build_output(&self, output: std::process::Output, duration_ms: i64) -> ProbeOutput {
        let status = if output.status.success() {
            ExecutionStatus::Success
        } else {
            ExecutionStatus::Failed
        };

        ProbeOutput {
            status,
            exit_code: output.status.code(),
            duration_ms,
            stdout: output.stdout,
        }
    }
}

#[async_trait]
impl ProbeRunner for SubprocessProbeRunner {
    async fn run(&self, program: &Path) -> Result<ProbeOutput, ExecutionError> {
        let start_time = self.time_provider.now_millis();

        info!(program = %program.display(), "Starting probe process");

        let output = self.spawn_and_wait(program).await?;

        let duration_ms = self.time_provider.now_millis() - start_time;
        let result = self.build_output(output, duration_ms);

        info!(
            program = %program.display(),
            duration_ms = %duration_ms,
            exit_code = ?result.exit_code,
            status = ?result.status,
            "Probe process exited"
        );

        Ok(result)
    }
}
