use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use rv_tests::{
    Architecture, DebuggerScript, EtissRunner, ExecutionMode, Filter, JitBackend, Pipeline,
    ResultAggregator, ResultsLayout, RunOptions, Scheduler, Settings, Virt, discover, expand,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Runs a RISC-V test corpus against the ETISS simulator and writes
/// per-architecture pass/fail manifests.
#[derive(Debug, Parser)]
#[command(name = "rv-tester", version)]
struct Cli {
    /// Directory holding the test binaries and their `.dump` listings.
    tests_dir: PathBuf,

    /// Path to `bare_etiss_processor`.
    simulator: PathBuf,

    /// Simulator architecture ids to run against.
    #[arg(long, value_delimiter = ',', default_value = "RV32IMACFD")]
    arch: Vec<Architecture>,

    /// Register widths to select.
    #[arg(long, value_delimiter = ',', default_value = "32")]
    bits: Vec<u32>,

    /// Runlevels to select (`u`, `m`, `s`).
    #[arg(long, default_value = "u")]
    runlevel: String,

    /// Extensions a selected test may use.
    #[arg(long, default_value = "imcfd")]
    ext: String,

    /// Memory virtualization tags to select (`p`, `v`).
    #[arg(long, default_value = "p")]
    virt: String,

    /// Per-test timeout in seconds.
    #[arg(long, default_value_t = 5.0)]
    timeout: f64,

    /// Concurrent simulations (defaults to the number of CPUs).
    #[arg(short = 'j', long, env = "RV_TESTER_WORKERS")]
    workers: Option<usize>,

    #[arg(long, value_enum, default_value_t = JitBackend::Tcc)]
    jit: JitBackend,

    #[arg(long, value_enum, default_value_t = ExecutionMode::Debugger)]
    mode: ExecutionMode,

    /// Add the instruction printer plugin to every run.
    #[arg(long)]
    trace: bool,

    /// TOML file overriding memory layout, symbol names and debugger setup.
    #[arg(long, env = "RV_TESTER_SETTINGS")]
    settings: Option<PathBuf>,

    /// Where the `results_*` directories are created.
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,

    /// Debugger binary used in debugger mode.
    #[arg(long, env = "RV_TESTER_DEBUGGER")]
    debugger: Option<PathBuf>,

    /// Write stdout/stderr logs for passing tests too.
    #[arg(long)]
    log_all: bool,

    /// Keep generated configuration files next to the logs.
    #[arg(long)]
    keep_configs: bool,

    /// Exit non-zero when any test fails.
    #[arg(long)]
    fail_on_failure: bool,

    #[arg(long)]
    no_progress: bool,

    /// More logging (`-v` debug, `-vv` trace). `RUST_LOG` wins when set.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

const EXIT_FAILURES: u8 = 1;
const EXIT_CANCELLED: u8 = 130;

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn build_tokio_runtime() -> std::io::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    build_tokio_runtime()?.block_on(run(cli))
}

fn parse_virt(tags: &str) -> Result<Vec<Virt>> {
    tags.chars()
        .map(|tag| Virt::from_tag(tag).with_context(|| format!("unknown virt tag `{tag}`")))
        .collect()
}

fn parse_timeout(secs: f64) -> Result<Duration> {
    if secs.is_nan() || secs <= 0.0 {
        bail!("--timeout must be a positive number of seconds");
    }
    Duration::try_from_secs_f64(secs).with_context(|| format!("--timeout {secs} is out of range"))
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let timeout = parse_timeout(cli.timeout)?;
    if cli.arch.is_empty() {
        bail!("--arch needs at least one architecture");
    }

    let mut settings = match &cli.settings {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    if let Some(debugger) = &cli.debugger {
        settings.debugger.program = debugger.clone();
    }

    let filter = Filter::new(
        cli.bits.iter().copied(),
        &cli.runlevel,
        &cli.ext,
        parse_virt(&cli.virt)?,
    );
    let cases = discover(&cli.tests_dir, &filter)?;
    let items = expand(&cases, &cli.arch);
    info!(
        tests = cases.len(),
        architectures = cli.arch.len(),
        "{} work items",
        items.len()
    );

    let layout = ResultsLayout::create(&cli.output_dir, &ResultsLayout::timestamp(), &cli.arch)?;
    let options = RunOptions {
        timeout,
        mode: cli.mode,
        jit: cli.jit,
        trace: cli.trace,
        keep_config: cli.keep_configs,
        log_all: cli.log_all,
    };

    // Lives until the end of the run; the file is removed on drop.
    let script = match options.mode {
        ExecutionMode::Debugger => Some(
            DebuggerScript::from_settings(&settings)
                .write_temp()
                .context("failed to write debugger script")?,
        ),
        ExecutionMode::Direct => None,
    };
    let runner = match &script {
        Some(script) => {
            EtissRunner::with_debugger(&cli.simulator, &settings.debugger.program, script.to_path_buf())
        }
        None => EtissRunner::direct(&cli.simulator),
    };

    let scratch = tempfile::Builder::new()
        .prefix("rv_tester_")
        .tempdir()
        .context("failed to create scratch directory")?;
    let pipeline = Pipeline {
        options,
        settings,
        layout: layout.clone(),
        scratch_dir: scratch.path().to_path_buf(),
    };

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted; stopping dispatch and killing running simulations");
            on_interrupt.cancel();
        }
    });

    let progress = if cli.no_progress {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new(items.len() as u64);
        pb.set_style(
            ProgressStyle::with_template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")?
                .progress_chars("##-"),
        );
        pb
    };

    let mut scheduler = Scheduler::new(Arc::new(runner), Arc::new(pipeline), cancel).progress(progress);
    if let Some(workers) = cli.workers {
        scheduler = scheduler.workers(workers);
    }

    let mut results = ResultAggregator::new(layout);
    let report = scheduler.run(items, &mut results).await;
    let summary = results.finish(report.not_run(), report.cancelled)?;
    summary.print();

    if report.cancelled {
        return Ok(ExitCode::from(EXIT_CANCELLED));
    }
    if cli.fail_on_failure && summary.failures() > 0 {
        return Ok(ExitCode::from(EXIT_FAILURES));
    }
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_must_be_positive_and_representable() {
        assert_eq!(parse_timeout(0.25).expect("valid"), Duration::from_millis(250));
        assert!(parse_timeout(0.0).is_err());
        assert!(parse_timeout(-1.0).is_err());
        assert!(parse_timeout(f64::NAN).is_err());
        assert!(parse_timeout(f64::INFINITY).is_err());
        assert!(parse_timeout(1e20).is_err());
    }

    #[test]
    fn cli_defaults() {
        let cli = Cli::try_parse_from(["rv-tester", "tests", "sim"]).expect("parse");
        assert_eq!(cli.arch, [Architecture::new("RV32IMACFD")]);
        assert_eq!(cli.bits, [32]);
        assert_eq!(cli.mode, ExecutionMode::Debugger);
        assert_eq!(parse_virt(&cli.virt).expect("virt"), [Virt::Physical]);
        assert!(parse_virt("px").is_err());
    }
}
