// Build Orchestrator
// Turns a probe request into a runnable executable: synthesized and built in a
// scoped workspace, or taken as-is from a pre-built path.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tracing::{debug, info, warn};

use crate::application::constants::{
    PROBE_SOURCE_FILE, QUERY_BIN_SUFFIX, QUERY_PROJECT_DIR, WORKSPACE_PREFIX,
};
use crate::application::synthesizer::{synthesize, ProbeRequest};
use crate::error::{ReflectError, Result};
use crate::port::Toolchain;

/// Orchestrator configuration
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Directory the scoped workspace is created in
    pub work_dir: PathBuf,
    /// Go package providing `InterfaceFromInterfaceType`
    pub model_import: String,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("."),
            model_import: crate::application::constants::DEFAULT_MODEL_IMPORT.to_string(),
        }
    }
}

/// Where the probe executable comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeSource {
    /// Synthesize and build; with `program_only`, stop after rendering
    Build { program_only: bool },
    /// Run this executable; nothing is rendered or built
    Prebuilt(PathBuf),
}

/// Result of preparing a probe
#[derive(Debug)]
pub enum Preparation {
    /// Program-only mode: the rendered source, nothing built
    ProgramOnly(String),
    /// An executable ready to run
    Ready(PreparedProbe),
}

/// Removes a built probe binary when dropped
#[derive(Debug)]
struct BuiltBinary(PathBuf);

impl Drop for BuiltBinary {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.0) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %self.0.display(), error = %e, "Failed to remove probe binary");
            }
        }
    }
}

/// A runnable probe and the resources backing it
///
/// Dropping this removes the workspace and any built binary. Call
/// [`PreparedProbe::release`] on the success path to surface removal errors.
#[derive(Debug)]
pub struct PreparedProbe {
    program: PathBuf,
    // Field order matters: the binary goes before the workspace.
    binary: Option<BuiltBinary>,
    workspace: Option<TempDir>,
}

impl PreparedProbe {
    fn prebuilt(program: PathBuf) -> Self {
        Self {
            program,
            binary: None,
            workspace: None,
        }
    }

    /// Path of the executable to run
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Scoped workspace, if this probe was built
    pub fn workspace(&self) -> Option<&Path> {
        self.workspace.as_ref().map(TempDir::path)
    }

    /// Delete the built binary and the workspace
    ///
    /// # Errors
    /// - ReflectError::Workspace if the workspace cannot be removed
    pub fn release(mut self) -> Result<()> {
        drop(self.binary.take());
        if let Some(workspace) = self.workspace.take() {
            let path = workspace.path().display().to_string();
            workspace
                .close()
                .map_err(|e| ReflectError::workspace(format!("removing {}", path), e))?;
            debug!(workspace = %path, "Workspace removed");
        }
        Ok(())
    }
}

/// Build Orchestrator
pub struct BuildOrchestrator {
    toolchain: Arc<dyn Toolchain>,
    config: BuildConfig,
}

impl BuildOrchestrator {
    /// Create a new orchestrator
    ///
    /// # Arguments
    /// * `toolchain` - Toolchain used for queries and builds
    /// * `config` - Work dir and model package
    pub fn new(toolchain: Arc<dyn Toolchain>, config: BuildConfig) -> Self {
        Self { toolchain, config }
    }

    /// Produce an executable probe for `request`
    ///
    /// Build mode:
    /// 1. Render the program (program-only mode returns here)
    /// 2. Create a uniquely named workspace under the work dir
    /// 3. Write `prog.go` into it
    /// 4. Query `GB_PROJECT_DIR` and `GB_BIN_SUFFIX`
    /// 5. Build the workspace
    /// 6. Resolve `<project>/bin/<workspace name><suffix>`
    ///
    /// The workspace is removed on every failure path by the `TempDir` guard.
    pub async fn prepare(&self, request: &ProbeRequest, source: &ProbeSource) -> Result<Preparation> {
        let program_only = match source {
            ProbeSource::Prebuilt(path) => {
                info!(program = %path.display(), "Using pre-built probe");
                return Ok(Preparation::Ready(PreparedProbe::prebuilt(path.clone())));
            }
            ProbeSource::Build { program_only } => *program_only,
        };

        let program = synthesize(request, &self.config.model_import)?;
        if program_only {
            info!(import_path = %request.import_path, "Program-only mode, skipping build");
            return Ok(Preparation::ProgramOnly(program));
        }

        let workspace = tempfile::Builder::new()
            .prefix(WORKSPACE_PREFIX)
            .tempdir_in(&self.config.work_dir)
            .map_err(|e| {
                ReflectError::workspace(
                    format!("creating workspace in {}", self.config.work_dir.display()),
                    e,
                )
            })?;
        debug!(workspace = %workspace.path().display(), "Workspace created");

        let source_path = workspace.path().join(PROBE_SOURCE_FILE);
        write_program(&source_path, &program).await?;

        let executable = self.build_in(workspace.path()).await?;

        info!(
            import_path = %request.import_path,
            symbols = ?request.symbols,
            program = %executable.display(),
            "Probe built"
        );

        Ok(Preparation::Ready(PreparedProbe {
            program: executable.clone(),
            binary: Some(BuiltBinary(executable)),
            workspace: Some(workspace),
        }))
    }

    /// Query the toolchain, build, and resolve the executable path
    async fn build_in(&self, workspace: &Path) -> Result<PathBuf> {
        let project_dir = self
            .toolchain
            .query(QUERY_PROJECT_DIR)
            .await
            .map_err(ReflectError::ToolchainQuery)?;
        let bin_suffix = self
            .toolchain
            .query(QUERY_BIN_SUFFIX)
            .await
            .map_err(ReflectError::ToolchainQuery)?;

        info!(workspace = %workspace.display(), "Building probe");
        self.toolchain
            .build(workspace)
            .await
            .map_err(ReflectError::Build)?;

        Ok(resolve_executable(&project_dir, workspace, &bin_suffix))
    }
}

/// `<project_dir>/bin/<workspace basename><bin_suffix>`
pub fn resolve_executable(project_dir: &str, workspace: &Path, bin_suffix: &str) -> PathBuf {
    let name = workspace
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    Path::new(project_dir)
        .join("bin")
        .join(format!("{}{}", name, bin_suffix))
}

/// Persist the program, readable by the owner only
async fn write_program(path: &Path, program: &str) -> Result<()> {
    let write_err = |source: std::io::Error| ReflectError::Write {
        path: path.to_path_buf(),
        source,
    };

    tokio::fs::write(path, program).await.map_err(write_err)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
            .await
            .map_err(write_err)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::toolchain::mocks::{BuildBehavior, MockToolchain};
    use tokio_test::assert_ok;

    fn request() -> ProbeRequest {
        ProbeRequest::new("sample/iface", vec!["Fooer".to_string(), "Barer".to_string()])
    }

    fn orchestrator(toolchain: Arc<MockToolchain>, work_dir: &Path) -> BuildOrchestrator {
        BuildOrchestrator::new(
            toolchain,
            BuildConfig {
                work_dir: work_dir.to_path_buf(),
                ..Default::default()
            },
        )
    }

    fn entries(dir: &Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    #[test]
    fn test_resolve_executable() {
        let path = resolve_executable("/proj", Path::new("/tmp/mockprobe_reflect_ab12"), ".exe");
        assert_eq!(path, PathBuf::from("/proj/bin/mockprobe_reflect_ab12.exe"));
    }

    #[tokio::test]
    async fn test_build_mode_writes_program_and_resolves_path() {
        let work = tempfile::tempdir().unwrap();
        let project = tempfile::tempdir().unwrap();
        let toolchain = Arc::new(
            MockToolchain::new(project.path().display().to_string(), BuildBehavior::Succeed)
                .with_value("GB_BIN_SUFFIX", "-linux"),
        );
        let orch = orchestrator(toolchain.clone(), work.path());

        let prepared = match orch
            .prepare(&request(), &ProbeSource::Build { program_only: false })
            .await
            .unwrap()
        {
            Preparation::Ready(p) => p,
            Preparation::ProgramOnly(_) => panic!("expected a built probe"),
        };

        let workspace = prepared.workspace().unwrap().to_path_buf();
        let name = workspace.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("mockprobe_reflect_"));
        assert_eq!(
            prepared.program(),
            project.path().join("bin").join(format!("{}-linux", name))
        );

        assert_eq!(toolchain.query_calls(), vec!["GB_PROJECT_DIR", "GB_BIN_SUFFIX"]);
        assert_eq!(toolchain.build_calls(), vec![workspace.clone()]);
        let sources = toolchain.seen_sources();
        assert_eq!(sources.len(), 1);
        assert!(sources[0].contains("pkg_.Fooer"));

        assert_ok!(prepared.release());
        assert!(!workspace.exists());
        assert_eq!(entries(work.path()), 0);
    }

    #[tokio::test]
    async fn test_workspace_removed_on_build_failure() {
        let work = tempfile::tempdir().unwrap();
        let toolchain = Arc::new(MockToolchain::new(
            "/nonexistent",
            BuildBehavior::Fail("exit status 2".to_string()),
        ));
        let orch = orchestrator(toolchain.clone(), work.path());

        let err = orch
            .prepare(&request(), &ProbeSource::Build { program_only: false })
            .await
            .unwrap_err();

        assert!(matches!(err, ReflectError::Build(_)));
        assert_eq!(toolchain.build_calls().len(), 1);
        assert_eq!(entries(work.path()), 0);
    }

    #[tokio::test]
    async fn test_workspace_removed_on_query_failure() {
        let work = tempfile::tempdir().unwrap();
        let toolchain = Arc::new(
            MockToolchain::new("/nonexistent", BuildBehavior::Succeed).without_value("GB_BIN_SUFFIX"),
        );
        let orch = orchestrator(toolchain.clone(), work.path());

        let err = orch
            .prepare(&request(), &ProbeSource::Build { program_only: false })
            .await
            .unwrap_err();

        assert!(matches!(err, ReflectError::ToolchainQuery(_)));
        assert!(toolchain.build_calls().is_empty());
        assert_eq!(entries(work.path()), 0);
    }

    #[tokio::test]
    async fn test_missing_work_dir_is_workspace_error() {
        let toolchain = Arc::new(MockToolchain::new("/nonexistent", BuildBehavior::Succeed));
        let orch = orchestrator(toolchain.clone(), Path::new("/nonexistent/mockprobe/work"));

        let err = orch
            .prepare(&request(), &ProbeSource::Build { program_only: false })
            .await
            .unwrap_err();

        assert!(matches!(err, ReflectError::Workspace { .. }));
        assert!(toolchain.query_calls().is_empty());
    }

    #[tokio::test]
    async fn test_prebuilt_skips_workspace_and_toolchain() {
        let work = tempfile::tempdir().unwrap();
        let toolchain = Arc::new(MockToolchain::new("/nonexistent", BuildBehavior::Succeed));
        let orch = orchestrator(toolchain.clone(), work.path());

        let prepared = match orch
            .prepare(&request(), &ProbeSource::Prebuilt(PathBuf::from("/opt/probe")))
            .await
            .unwrap()
        {
            Preparation::Ready(p) => p,
            Preparation::ProgramOnly(_) => panic!("expected a ready probe"),
        };

        assert_eq!(prepared.program(), Path::new("/opt/probe"));
        assert!(prepared.workspace().is_none());
        assert!(toolchain.query_calls().is_empty());
        assert!(toolchain.build_calls().is_empty());
        assert_eq!(entries(work.path()), 0);
        prepared.release().unwrap();
    }

    #[tokio::test]
    async fn test_program_only_returns_source_without_building() {
        let work = tempfile::tempdir().unwrap();
        let toolchain = Arc::new(MockToolchain::new("/nonexistent", BuildBehavior::Succeed));
        let orch = orchestrator(toolchain.clone(), work.path());

        let outcome = orch
            .prepare(&request(), &ProbeSource::Build { program_only: true })
            .await
            .unwrap();

        match outcome {
            Preparation::ProgramOnly(source) => {
                assert_eq!(source, synthesize(&request(), &BuildConfig::default().model_import).unwrap())
            }
            Preparation::Ready(_) => panic!("expected program-only outcome"),
        }
        assert!(toolchain.query_calls().is_empty());
        assert!(toolchain.build_calls().is_empty());
        assert_eq!(entries(work.path()), 0);
    }
}
