//! mockprobe CLI - Reflect on Go interfaces by building and running a probe program
//! Composition root: wires the gb toolchain and the subprocess runner into the core pipeline

mod logging;
mod output;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use colored::Colorize;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::info;

use mockprobe_core::application::constants::DEFAULT_MODEL_IMPORT;
use mockprobe_core::application::{
    BuildConfig, ProbeRequest, ReflectOptions, ReflectOutcome, ReflectService,
};
use mockprobe_core::port::time_provider::SystemTimeProvider;
use mockprobe_infra_system::gb_toolchain::DEFAULT_GB_PROGRAM;
use mockprobe_infra_system::{GbToolchain, SubprocessProbeRunner};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser, Debug)]
#[command(name = "mockprobe")]
#[command(about = "Describe Go interfaces by reflecting on them in a probe program", long_about = None)]
#[command(version)]
struct Cli {
    /// Import path of the package holding the interfaces
    import_path: String,

    /// Comma-separated interface names (e.g. Reader,Writer)
    #[arg(value_delimiter = ',', required = true)]
    symbols: Vec<String>,

    /// Only generate the reflection program; write it to stdout
    #[arg(long)]
    prog_only: bool,

    /// Run this pre-built reflection program instead of building one
    #[arg(long, value_name = "PATH")]
    exec_only: Option<PathBuf>,

    /// gb executable used to query and build
    #[arg(long, env = "MOCKPROBE_GB", default_value = DEFAULT_GB_PROGRAM)]
    gb: String,

    /// Directory the temporary probe workspace is created in
    #[arg(long, env = "MOCKPROBE_WORK_DIR", default_value = ".")]
    work_dir: String,

    /// Go package linked into the probe for model construction
    #[arg(long, env = "MOCKPROBE_MODEL_IMPORT", default_value = DEFAULT_MODEL_IMPORT)]
    model_import: String,

    /// Output format of the decoded package
    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,

    /// Write the result to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Table,
}

impl Cli {
    fn request(&self) -> ProbeRequest {
        let symbols = self
            .symbols
            .iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        ProbeRequest::new(self.import_path.clone(), symbols)
    }

    fn options(&self) -> ReflectOptions {
        ReflectOptions {
            program_only: self.prog_only,
            exec_only: self.exec_only.clone(),
        }
    }

    fn work_dir(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.work_dir).into_owned())
    }
}

async fn run(cli: Cli) -> Result<()> {
    let work_dir = cli.work_dir();

    // DI wiring
    let toolchain = Arc::new(GbToolchain::new(&cli.gb, "."));
    let runner = Arc::new(SubprocessProbeRunner::new(Arc::new(SystemTimeProvider)));
    let service = ReflectService::new(
        toolchain,
        runner,
        BuildConfig {
            work_dir,
            model_import: cli.model_import.clone(),
        },
    );

    let outcome = service
        .reflect(&cli.request(), &cli.options())
        .await
        .with_context(|| format!("reflecting on {}", cli.import_path))?;

    let rendered = match outcome {
        ReflectOutcome::ProgramOnly(source) => {
            // Program-only output always goes to stdout
            std::io::stdout()
                .write_all(source.as_bytes())
                .context("writing program to stdout")?;
            return Ok(());
        }
        ReflectOutcome::Package(package) => match cli.format {
            OutputFormat::Json => output::to_json(&package)?,
            OutputFormat::Table => output::to_table(&package),
        },
    };

    match &cli.output {
        Some(path) => {
            std::fs::write(path, rendered)
                .with_context(|| format!("writing {}", path.display()))?;
            info!(output = %path.display(), "Wrote package description");
        }
        None => {
            std::io::stdout()
                .write_all(rendered.as_bytes())
                .context("writing package to stdout")?;
        }
    }

    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = logging::init_logging() {
        eprintln!("{} failed to initialize logging: {:#}", "warning:".yellow().bold(), e);
    }

    info!("mockprobe v{} starting...", VERSION);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {:#}", "error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}
