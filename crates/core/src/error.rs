// Central Error Type for the reflection pipeline

use std::path::PathBuf;
use thiserror::Error;

use crate::port::{ExecutionError, ToolchainError};

/// Pipeline error type
///
/// Every stage returns the first error it hits; nothing is retried.
#[derive(Error, Debug)]
pub enum ReflectError {
    #[error("Workspace error: {context}: {source}")]
    Workspace {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Render error: {0}")]
    Render(String),

    #[error("Write error: {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Toolchain query error: {0}")]
    ToolchainQuery(#[source] ToolchainError),

    #[error("Build error: {0}")]
    Build(#[source] ToolchainError),

    #[error("Execution error: {}: {source}", .program.display())]
    Exec {
        program: PathBuf,
        #[source]
        source: ExecutionError,
    },

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ReflectError {
    pub(crate) fn workspace(context: impl Into<String>, source: std::io::Error) -> Self {
        ReflectError::Workspace {
            context: context.into(),
            source,
        }
    }

    /// Short machine-friendly name of the failing stage
    pub fn kind(&self) -> &'static str {
        match self {
            ReflectError::Workspace { .. } => "workspace",
            ReflectError::Render(_) => "render",
            ReflectError::Write { .. } => "write",
            ReflectError::ToolchainQuery(_) => "toolchain_query",
            ReflectError::Build(_) => "build",
            ReflectError::Exec { .. } => "exec",
            ReflectError::Protocol(_) => "protocol",
            ReflectError::Decode(_) => "decode",
        }
    }
}

impl From<askama::Error> for ReflectError {
    fn from(err: askama::Error) -> Self {
        ReflectError::Render(err.to_string())
    }
}

/// Result type alias using ReflectError
pub type Result<T> = std::result::Result<T, ReflectError>;
