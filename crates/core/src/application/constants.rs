// Reflection pipeline constants (No magic values)

/// Line the probe prints right before the encoded package
pub const SENTINEL: &str = "ENCODED_PKG";

/// File name of the synthesized program inside the workspace
pub const PROBE_SOURCE_FILE: &str = "prog.go";

/// Prefix of scoped workspace directories
pub const WORKSPACE_PREFIX: &str = "mockprobe_reflect_";

/// Local alias the probe imports the target package under
pub const TARGET_ALIAS: &str = "pkg_";

/// Go package providing `InterfaceFromInterfaceType` inside the probe
pub const DEFAULT_MODEL_IMPORT: &str = "github.com/juno-lab/mock/mockgen/model";

/// Toolchain key for the project root (binaries land in `<root>/bin`)
pub const QUERY_PROJECT_DIR: &str = "GB_PROJECT_DIR";

/// Toolchain key for the platform executable suffix (e.g. ".exe")
pub const QUERY_BIN_SUFFIX: &str = "GB_BIN_SUFFIX";
