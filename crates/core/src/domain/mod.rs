// Domain Layer - Intermediate model shared by the probe and the parent process

pub mod model;

// Re-exports
pub use model::{ChanDir, Field, ImportPath, Interface, Method, Package, Parameter, Type};
