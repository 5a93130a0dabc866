// mockprobe Infrastructure - System Adapters
// Implements: Toolchain (gb), ProbeRunner (child process)

pub mod gb_toolchain;
pub mod subprocess_runner;

pub use gb_toolchain::GbToolchain;
pub use subprocess_runner::SubprocessProbeRunner;

// Writing a script and exec'ing it while another test thread forks can fail
// with ETXTBSY, so tests that run scripts take this lock.
#[cfg(all(test, unix))]
pub(crate) static SCRIPT_LOCK: tokio::sync::Mutex<()> = tokio::sync::Mutex::const_new(());
