use anyhow::Context;
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tickervol::config::{self, ExecutionMode, OutputFormat, Overrides};
use tickervol::{report, scan, unit};
use tracing::{debug, error, trace};

/// Rank instruments by price volatility
#[derive(Parser)]
#[command(name = "tickervol", version)]
#[command(about = "Rank trading instruments by price volatility", long_about = None)]
struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(flatten)]
    scan: ScanArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Args)]
struct ScanArgs {
    /// Directory of trade files [default: trades]; pass a directory named `worker` as ./worker
    input_dir: Option<PathBuf>,

    /// Worker pool implementation
    #[arg(short, long, value_enum)]
    mode: Option<ExecutionMode>,

    /// Number of workers [default: available CPUs]
    #[arg(short, long)]
    workers: Option<usize>,

    /// Per-worker timeout in isolated mode, e.g. "30s"
    #[arg(long, value_parser = humantime_serde::re::humantime::parse_duration)]
    worker_timeout: Option<Duration>,

    /// How many instruments to list at each end of the ranking [default: 3]
    #[arg(short = 'n', long)]
    top: Option<usize>,

    /// Only scan files with this extension
    #[arg(long)]
    extension: Option<String>,

    /// Output format
    #[arg(short, long, value_enum)]
    format: Option<OutputFormat>,

    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl ScanArgs {
    fn overrides(&self) -> Overrides {
        Overrides {
            input_dir: self.input_dir.clone(),
            mode: self.mode,
            workers: self.workers,
            worker_timeout: self.worker_timeout,
            top: self.top,
            extension: self.extension.clone(),
            format: self.format,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Process a single file and write the result message to stdout
    #[command(name = "worker", hide = true)]
    Worker { file: PathBuf },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(cli.verbose >= 2)
        .init();

    debug!("tickervol started with verbosity level: {}", cli.verbose);
    trace!("Full CLI args: {:?}", std::env::args().collect::<Vec<_>>());

    let result = match cli.command {
        Some(Commands::Worker { file }) => run_worker(file),
        None => run_scan(cli.scan).await,
    };

    if let Err(e) = result {
        error!("Fatal error: {:#}", e);
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn run_worker(file: PathBuf) -> anyhow::Result<()> {
    let stdout = std::io::stdout();
    unit::serve(&file, stdout.lock()).context("Failed to write worker message")
}

async fn run_scan(args: ScanArgs) -> anyhow::Result<()> {
    let mut config = config::load_layered(args.config.as_deref()).await?;
    config.apply_overrides(args.overrides());

    let summary = scan::run(&config).await?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match config.format {
        OutputFormat::Text => {
            report::write_text(&mut out, &summary.ranking)?;
            out.flush()?;
            report::write_failures(&mut std::io::stderr().lock(), &summary.failures)?;
        }
        OutputFormat::Json => report::write_json(&mut out, &summary)?,
    }
    out.flush()?;

    Ok(())
}
