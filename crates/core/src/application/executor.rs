// Probe Executor
// Runs the resolved probe once and hands back its stdout

use std::path::Path;
use tracing::{error, info};

use crate::error::{ReflectError, Result};
use crate::port::{ExecutionError, ExecutionStatus, ProbeRunner};

/// Run `program` and return its captured stdout
///
/// A non-zero exit is fatal and never retried: the probe may already have
/// run package-level side effects of the target.
///
/// # Errors
/// - ReflectError::Exec if the probe cannot be started or exits non-zero
pub async fn run_probe(runner: &dyn ProbeRunner, program: &Path) -> Result<Vec<u8>> {
    let exec_err = |source| ReflectError::Exec {
        program: program.to_path_buf(),
        source,
    };

    info!(program = %program.display(), "Running probe");
    let output = runner.run(program).await.map_err(exec_err)?;

    if output.status != ExecutionStatus::Success {
        error!(
            program = %program.display(),
            exit_code = ?output.exit_code,
            duration_ms = output.duration_ms,
            "Probe failed"
        );
        return Err(exec_err(ExecutionError::NonZeroExit {
            exit_code: output.exit_code,
        }));
    }

    info!(
        program = %program.display(),
        duration_ms = output.duration_ms,
        stdout_bytes = output.stdout.len(),
        "Probe completed"
    );

    Ok(output.stdout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::probe_runner::mocks::{MockBehavior, MockProbeRunner};

    #[tokio::test]
    async fn test_run_probe_returns_stdout() {
        let runner = MockProbeRunner::new_output("hello\n");
        let stdout = run_probe(&runner, Path::new("/bin/probe")).await.unwrap();
        assert_eq!(stdout, b"hello\n");
        assert_eq!(runner.calls(), vec![Path::new("/bin/probe").to_path_buf()]);
    }

    #[tokio::test]
    async fn test_non_zero_exit_is_exec_error() {
        let runner = MockProbeRunner::new_exit(3);
        let err = run_probe(&runner, Path::new("/bin/probe")).await.unwrap_err();

        match err {
            ReflectError::Exec { program, source } => {
                assert_eq!(program, Path::new("/bin/probe"));
                assert!(matches!(
                    source,
                    ExecutionError::NonZeroExit { exit_code: Some(3) }
                ));
            }
            other => panic!("expected exec error, got {:?}", other),
        }
        assert_eq!(runner.call_count(), 1);
    }

    #[tokio::test]
    async fn test_spawn_failure_is_exec_error() {
        let runner = MockProbeRunner::new(MockBehavior::SpawnFail("no such file".to_string()));
        let err = run_probe(&runner, Path::new("/missing")).await.unwrap_err();
        assert_eq!(err.kind(), "exec");
        assert!(err.to_string().contains("no such file"));
    }
}
