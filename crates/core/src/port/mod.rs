// Port Layer - Interfaces for external dependencies

pub mod probe_runner;
pub mod time_provider;
pub mod toolchain;

// Re-exports
pub use probe_runner::{ExecutionError, ExecutionStatus, ProbeOutput, ProbeRunner};
pub use time_provider::TimeProvider;
pub use toolchain::{Toolchain, ToolchainError};
