// Reflect Service - Synthesize -> Build -> Execute -> Decode

use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use crate::application::build::{BuildConfig, BuildOrchestrator, Preparation, ProbeSource};
use crate::application::decoder::decode;
use crate::application::executor::run_probe;
use crate::application::synthesizer::ProbeRequest;
use crate::domain::Package;
use crate::error::Result;
use crate::port::{ProbeRunner, Toolchain};

/// Mode switches of one invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReflectOptions {
    /// Render the probe program and stop
    pub program_only: bool,
    /// Run this pre-built probe instead of building one; wins over `program_only`
    pub exec_only: Option<PathBuf>,
}

impl ReflectOptions {
    fn probe_source(&self) -> ProbeSource {
        match &self.exec_only {
            Some(path) => ProbeSource::Prebuilt(path.clone()),
            None => ProbeSource::Build {
                program_only: self.program_only,
            },
        }
    }
}

/// What an invocation produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReflectOutcome {
    /// Program-only mode: source of the probe, nothing was built or run
    ProgramOnly(String),
    /// The decoded model, ready for the mock generator
    Package(Package),
}

/// Reflect Service
///
/// Stages run strictly one after another; each invocation owns its own
/// workspace and nothing is shared between invocations.
pub struct ReflectService {
    orchestrator: BuildOrchestrator,
    runner: Arc<dyn ProbeRunner>,
}

impl ReflectService {
    /// Create a new reflect service
    ///
    /// # Arguments
    /// * `toolchain` - Build tool used in build mode
    /// * `runner` - Runs the probe executable
    /// * `config` - Work dir and model package
    ///
    /// # Example
    /// ```ignore
    /// let service = ReflectService::new(
    ///     Arc::new(GbToolchain::default()),
    ///     Arc::new(SubprocessProbeRunner::new(Arc::new(SystemTimeProvider))),
    ///     BuildConfig::default(),
    /// );
    /// let outcome = service
    ///     .reflect(&ProbeRequest::new("io", vec!["Reader".into()]), &ReflectOptions::default())
    ///     .await?;
    /// ```
    pub fn new(
        toolchain: Arc<dyn Toolchain>,
        runner: Arc<dyn ProbeRunner>,
        config: BuildConfig,
    ) -> Self {
        Self {
            orchestrator: BuildOrchestrator::new(toolchain, config),
            runner,
        }
    }

    /// Reflect on the requested interfaces
    ///
    /// # Errors
    /// Any stage error, unchanged. The workspace is gone by the time this returns.
    pub async fn reflect(
        &self,
        request: &ProbeRequest,
        options: &ReflectOptions,
    ) -> Result<ReflectOutcome> {
        info!(
            import_path = %request.import_path,
            symbols = ?request.symbols,
            "Reflecting"
        );

        let probe = match self
            .orchestrator
            .prepare(request, &options.probe_source())
            .await?
        {
            Preparation::ProgramOnly(source) => return Ok(ReflectOutcome::ProgramOnly(source)),
            Preparation::Ready(probe) => probe,
        };

        let stdout = run_probe(self.runner.as_ref(), probe.program()).await?;
        probe.release()?;

        let package = decode(&stdout)?;
        info!(
            package = %package.name,
            interfaces = package.interfaces.len(),
            "Reflection complete"
        );
        Ok(ReflectOutcome::Package(package))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::decoder::encode;
    use crate::error::ReflectError;
    use crate::port::probe_runner::mocks::MockProbeRunner;
    use crate::port::toolchain::mocks::{BuildBehavior, MockToolchain};
    use std::path::Path;

    fn request() -> ProbeRequest {
        ProbeRequest::new("sample/iface", vec!["Fooer".to_string(), "Barer".to_string()])
    }

    fn service(
        toolchain: Arc<MockToolchain>,
        runner: Arc<MockProbeRunner>,
        work_dir: &Path,
    ) -> ReflectService {
        ReflectService::new(
            toolchain,
            runner,
            BuildConfig {
                work_dir: work_dir.to_path_buf(),
                ..Default::default()
            },
        )
    }

    fn entries(dir: &Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    #[tokio::test]
    async fn test_build_mode_end_to_end() {
        let work = tempfile::tempdir().unwrap();
        let project = tempfile::tempdir().unwrap();
        let toolchain = Arc::new(MockToolchain::new(
            project.path().display().to_string(),
            BuildBehavior::Succeed,
        ));
        let mut stdout = b"noise\n".to_vec();
        stdout.extend_from_slice(&encode(&Package::new("iface")).unwrap());
        let runner = Arc::new(MockProbeRunner::new_output(stdout));

        let outcome = service(toolchain.clone(), runner.clone(), work.path())
            .reflect(&request(), &ReflectOptions::default())
            .await
            .unwrap();

        assert_eq!(outcome, ReflectOutcome::Package(Package::new("iface")));
        assert_eq!(toolchain.build_calls().len(), 1);
        let program = &runner.calls()[0];
        assert!(program.starts_with(project.path().join("bin")));
        assert_eq!(entries(work.path()), 0);
    }

    #[tokio::test]
    async fn test_prebuilt_probe_skips_toolchain() {
        let work = tempfile::tempdir().unwrap();
        let toolchain = Arc::new(MockToolchain::new("/nonexistent", BuildBehavior::Succeed));
        let runner = Arc::new(MockProbeRunner::new_output(
            encode(&Package::new("iface")).unwrap(),
        ));
        let options = ReflectOptions {
            program_only: true,
            exec_only: Some(PathBuf::from("/opt/probe")),
        };

        let outcome = service(toolchain.clone(), runner.clone(), work.path())
            .reflect(&request(), &options)
            .await
            .unwrap();

        assert_eq!(outcome, ReflectOutcome::Package(Package::new("iface")));
        assert!(toolchain.query_calls().is_empty());
        assert!(toolchain.build_calls().is_empty());
        assert_eq!(runner.calls(), vec![PathBuf::from("/opt/probe")]);
        assert_eq!(entries(work.path()), 0);
    }

    #[tokio::test]
    async fn test_program_only_runs_nothing() {
        let work = tempfile::tempdir().unwrap();
        let toolchain = Arc::new(MockToolchain::new("/nonexistent", BuildBehavior::Succeed));
        let runner = Arc::new(MockProbeRunner::new_output(Vec::new()));
        let options = ReflectOptions {
            program_only: true,
            exec_only: None,
        };

        let outcome = service(toolchain.clone(), runner.clone(), work.path())
            .reflect(&request(), &options)
            .await
            .unwrap();

        match outcome {
            ReflectOutcome::ProgramOnly(source) => assert!(source.contains("pkg_.Barer")),
            other => panic!("expected program source, got {:?}", other),
        }
        assert_eq!(runner.call_count(), 0);
        assert!(toolchain.build_calls().is_empty());
    }

    #[tokio::test]
    async fn test_probe_failure_is_exec_error_and_cleans_up() {
        let work = tempfile::tempdir().unwrap();
        let project = tempfile::tempdir().unwrap();
        let toolchain = Arc::new(MockToolchain::new(
            project.path().display().to_string(),
            BuildBehavior::Succeed,
        ));
        let runner = Arc::new(MockProbeRunner::new_exit(1));

        let err = service(toolchain, runner.clone(), work.path())
            .reflect(&request(), &ReflectOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, ReflectError::Exec { .. }));
        assert_eq!(runner.call_count(), 1);
        assert_eq!(entries(work.path()), 0);
    }

    #[tokio::test]
    async fn test_missing_sentinel_is_protocol_error() {
        let work = tempfile::tempdir().unwrap();
        let toolchain = Arc::new(MockToolchain::new("/nonexistent", BuildBehavior::Succeed));
        let runner = Arc::new(MockProbeRunner::new_output(b"just noise\n".to_vec()));

        let err = service(toolchain, runner, work.path())
            .reflect(&request(), &ReflectOptions::default())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "protocol");
        assert_eq!(entries(work.path()), 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_built_binary_is_removed_after_run() {
        let work = tempfile::tempdir().unwrap();
        let project = tempfile::tempdir().unwrap();
        let toolchain = Arc::new(
            MockToolchain::new(
                project.path().display().to_string(),
                BuildBehavior::WriteExecutable("#!/bin/sh\n".to_string()),
            )
            .with_value("GB_BIN_SUFFIX", ".probe"),
        );
        let runner = Arc::new(MockProbeRunner::new_output(
            encode(&Package::new("iface")).unwrap(),
        ));

        let outcome = service(toolchain, runner.clone(), work.path())
            .reflect(&request(), &ReflectOptions::default())
            .await
            .unwrap();

        assert_eq!(outcome, ReflectOutcome::Package(Package::new("iface")));
        let program = &runner.calls()[0];
        assert_eq!(program.parent(), Some(project.path().join("bin").as_path()));
        assert!(program.to_string_lossy().ends_with(".probe"));
        assert!(!program.exists());
        assert_eq!(entries(&project.path().join("bin")), 0);
        assert_eq!(entries(work.path()), 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_built_binary_is_removed_after_failed_run() {
        let work = tempfile::tempdir().unwrap();
        let project = tempfile::tempdir().unwrap();
        let toolchain = Arc::new(MockToolchain::new(
            project.path().display().to_string(),
            BuildBehavior::WriteExecutable("#!/bin/sh\nexit 1\n".to_string()),
        ));
        let runner = Arc::new(MockProbeRunner::new_exit(1));

        let err = service(toolchain, runner, work.path())
            .reflect(&request(), &ReflectOptions::default())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "exec");
        assert_eq!(entries(&project.path().join("bin")), 0);
    }
}
