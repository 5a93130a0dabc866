// mockprobe Core - Intermediate model, ports and the reflection pipeline
// NO process spawning here: the toolchain and the probe runner are ports

pub mod application;
pub mod domain;
pub mod error;
pub mod port;

pub use error::{ReflectError, Result};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
