// gb toolchain adapter
// `gb info KEY` for settings, `gb build DIR` for the probe
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

use mockprobe_core::port::toolchain::{Toolchain, ToolchainError};

/// Default build tool executable
pub const DEFAULT_GB_PROGRAM: &str = "gb";

/// Toolchain backed by the `gb` command
pub struct GbToolchain {
    program: PathBuf,
    working_dir: PathBuf,
}

impl Default for GbToolchain {
    fn default() -> Self {
        Self::new(DEFAULT_GB_PROGRAM, ".")
    }
}

impl GbToolchain {
    /// Create a new gb toolchain
    ///
    /// # Arguments
    /// * `program` - gb executable (name on PATH or a path)
    /// * `working_dir` - Directory gb runs in
    pub fn new(program: impl Into<PathBuf>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            working_dir: working_dir.into(),
        }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.current_dir(&self.working_dir).stdin(Stdio::null());
        cmd
    }

    fn spawn_failed(&self, e: std::io::Error) -> ToolchainError {
        ToolchainError::SpawnFailed(format!("{}: {}", self.program.display(), e))
    }
}

#[async_trait]
impl Toolchain for GbToolchain {
    async fn query(&self, key: &str) -> Result<String, ToolchainError> {
        let output = self
            .command()
            .args(["info", key])
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .output()
            .await
            .map_err(|e| self.spawn_failed(e))?;

        if !output.status.success() {
            return Err(ToolchainError::QueryFailed {
                key: key.to_string(),
                reason: format!("{} exited with {}", self.program.display(), output.status),
            });
        }

        let value = String::from_utf8(output.stdout).map_err(|_| ToolchainError::QueryFailed {
            key: key.to_string(),
            reason: "output is not valid UTF-8".to_string(),
        })?;
        let value = value.trim_matches('\n').to_string();

        debug!(key = %key, value = %value, "Toolchain query");
        Ok(value)
    }

    async fn build(&self, source_dir: &Path) -> Result<(), ToolchainError> {
        info!(
            program = %self.program.display(),
            source_dir = %source_dir.display(),
            "Running gb build"
        );

        let status = self
            .command()
            .arg("build")
            .arg(source_dir)
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|e| self.spawn_failed(e))?;

        if !status.success() {
            return Err(ToolchainError::BuildFailed {
                dir: source_dir.display().to_string(),
                reason: format!("{} exited with {}", self.program.display(), status),
            });
        }

        Ok(())
    }
}
