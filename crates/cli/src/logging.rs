//! Logging setup
//!
//! Logs go to stderr: stdout carries the program or the package description.

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter when `RUST_LOG` is not set
const DEFAULT_FILTER: &str = "mockprobe=info";

/// Install the global subscriber
///
/// # Environment Variables
///
/// - `RUST_LOG`: filter directives (default: `mockprobe=info`)
/// - `MOCKPROBE_LOG_FORMAT`: `pretty` (default) or `json`
pub fn init_logging() -> Result<()> {
    let log_format =
        std::env::var("MOCKPROBE_LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(DEFAULT_FILTER))
        .context("Failed to create env filter")?;

    match log_format.as_str() {
        "json" => {
            // Machine-readable structured logging
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .try_init()
                .context("Failed to install JSON subscriber")?;
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().pretty().with_writer(std::io::stderr))
                .try_init()
                .context("Failed to install subscriber")?;
        }
    }

    Ok(())
}
