// Application Layer - Reflection pipeline stages and the use case tying them together

pub mod build;
pub mod constants;
pub mod decoder;
pub mod executor;
pub mod reflect;
pub mod synthesizer;

// Re-exports
pub use build::{BuildConfig, BuildOrchestrator, Preparation, PreparedProbe, ProbeSource};
pub use reflect::{ReflectOptions, ReflectOutcome, ReflectService};
pub use synthesizer::{synthesize, ProbeRequest};
