// Toolchain Port
// Abstraction over the Go build tool used to compile probe programs

use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

/// Toolchain errors
#[derive(Error, Debug)]
pub enum ToolchainError {
    #[error("Spawn failed: {0}")]
    SpawnFailed(String),

    #[error("Query `{key}` failed: {reason}")]
    QueryFailed { key: String, reason: String },

    #[error("Build of {dir} failed: {reason}")]
    BuildFailed { dir: String, reason: String },
}

/// Toolchain trait
///
/// Implementations:
/// - GbToolchain: shells out to `gb info` / `gb build`
/// - MockToolchain: in-memory fake for tests
#[async_trait]
pub trait Toolchain: Send + Sync {
    /// Look up a toolchain setting (e.g. `GB_PROJECT_DIR`)
    ///
    /// Blocks until the query finishes. The value is trimmed of surrounding newlines.
    ///
    /// # Errors
    /// - ToolchainError::SpawnFailed if the tool cannot be started
    /// - ToolchainError::QueryFailed if the tool exits non-zero
    async fn query(&self, key: &str) -> Result<String, ToolchainError>;

    /// Build the program in `source_dir`
    ///
    /// Output of the build tool passes through to the terminal.
    ///
    /// # Errors
    /// - ToolchainError::BuildFailed if the build exits non-zero
    async fn build(&self, source_dir: &Path) -> Result<(), ToolchainError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};

    /// What the mock does when `build` is called
    #[derive(Debug, Clone)]
    pub enum BuildBehavior {
        /// Succeed without producing anything
        Succeed,
        /// Fail with message
        Fail(String),
        /// Write `contents` to `<GB_PROJECT_DIR>/bin/<dir name><GB_BIN_SUFFIX>`
        WriteExecutable(String),
    }

    /// Mock Toolchain for testing
    pub struct MockToolchain {
        values: HashMap<String, String>,
        build_behavior: BuildBehavior,
        query_calls: Arc<Mutex<Vec<String>>>,
        build_calls: Arc<Mutex<Vec<PathBuf>>>,
        seen_sources: Arc<Mutex<Vec<String>>>,
    }

    impl MockToolchain {
        pub fn new(project_dir: impl Into<String>, build_behavior: BuildBehavior) -> Self {
            let mut values = HashMap::new();
            values.insert("GB_PROJECT_DIR".to_string(), project_dir.into());
            values.insert("GB_BIN_SUFFIX".to_string(), String::new());
            Self {
                values,
                build_behavior,
                query_calls: Arc::new(Mutex::new(Vec::new())),
                build_calls: Arc::new(Mutex::new(Vec::new())),
                seen_sources: Arc::new(Mutex::new(Vec::new())),
            }
        }

        pub fn with_value(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
            self.values.insert(key.into(), value.into());
            self
        }

        pub fn without_value(mut self, key: &str) -> Self {
            self.values.remove(key);
            self
        }

        pub fn query_calls(&self) -> Vec<String> {
            self.query_calls.lock().unwrap().clone()
        }

        pub fn build_calls(&self) -> Vec<PathBuf> {
            self.build_calls.lock().unwrap().clone()
        }

        /// Contents of `prog.go` as it was when `build` ran
        pub fn seen_sources(&self) -> Vec<String> {
            self.seen_sources.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Toolchain for MockToolchain {
        async fn query(&self, key: &str) -> Result<String, ToolchainError> {
            self.query_calls.lock().unwrap().push(key.to_string());
            self.values
                .get(key)
                .cloned()
                .ok_or_else(|| ToolchainError::QueryFailed {
                    key: key.to_string(),
                    reason: "unknown key".to_string(),
                })
        }

        async fn build(&self, source_dir: &Path) -> Result<(), ToolchainError> {
            self.build_calls.lock().unwrap().push(source_dir.to_path_buf());
            if let Ok(source) = std::fs::read_to_string(source_dir.join("prog.go")) {
                self.seen_sources.lock().unwrap().push(source);
            }

            match &self.build_behavior {
                BuildBehavior::Succeed => Ok(()),
                BuildBehavior::Fail(msg) => Err(ToolchainError::BuildFailed {
                    dir: source_dir.display().to_string(),
                    reason: msg.clone(),
                }),
                BuildBehavior::WriteExecutable(contents) => {
                    let name = source_dir
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_default();
                    let suffix = self.values.get("GB_BIN_SUFFIX").cloned().unwrap_or_default();
                    let project_dir =
                        self.values.get("GB_PROJECT_DIR").cloned().unwrap_or_default();
                    let bin_dir = PathBuf::from(project_dir).join("bin");
                    let target = bin_dir.join(format!("{}{}", name, suffix));

                    std::fs::create_dir_all(&bin_dir)
                        .and_then(|_| std::fs::write(&target, contents))
                        .map_err(|e| ToolchainError::BuildFailed {
                            dir: source_dir.display().to_string(),
                            reason: e.to_string(),
                        })?;

                    #[cfg(unix)]
                    {
                        use std::os::unix::fs::PermissionsExt;
                        std::fs::set_permissions(&target, std::fs::Permissions::from_mode(0o755))
                            .map_err(|e| ToolchainError::BuildFailed {
                                dir: source_dir.display().to_string(),
                                reason: e.to_string(),
                            })?;
                    }
                    Ok(())
                }
            }
        }
    }
}
