//! damper-bench: hydraulic damper test bench
//!
//! ```text
//! recorder | damper-bench record      frames -> sled store
//! damper-bench analyze                store -> rotation / amplitude snapshots
//! damper-bench simulate | damper-bench record
//! ```

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use tokio::io::BufReader;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use damper_bench::acquisition::{format_line, record_stream};
use damper_bench::config::{self, BenchConfig};
use damper_bench::pipeline::{AnalysisLoop, BenchAnalyzer};
use damper_bench::simulation::{BenchSimulator, SimulationConfig};
use damper_bench::storage::FrameStore;
use damper_bench::types::BenchSnapshot;

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "damper-bench")]
#[command(about = "Hydraulic damper test bench: frame recording and signal analysis")]
#[command(version)]
struct CliArgs {
    /// Bench configuration file (overrides DAMPER_BENCH_CONFIG and ./bench_config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: SubCommand,
}

#[derive(clap::Subcommand, Debug)]
enum SubCommand {
    /// Read recorder lines from stdin and store the frames
    Record {
        /// Empty the frame table before recording
        #[arg(long)]
        clear: bool,

        /// Calendar day stamped on frames (recorder only prints time of day); defaults to today
        #[arg(long, value_name = "YYYY-MM-DD")]
        date: Option<NaiveDate>,
    },

    /// Periodically analyze the newest stored frames
    Analyze {
        /// Print each snapshot as a JSON line on stdout
        #[arg(long)]
        json: bool,

        /// Run a single cycle and exit
        #[arg(long)]
        once: bool,
    },

    /// Emit synthetic recorder lines on stdout
    Simulate {
        /// Number of frames to emit
        #[arg(long, default_value = "100")]
        frames: u64,

        #[arg(long, default_value = "42")]
        seed: u64,

        /// Crank speed of the simulated bench
        #[arg(long, default_value = "1500")]
        rpm: f64,

        /// Delay between frames (0 = as fast as possible)
        #[arg(long, default_value = "0")]
        interval_ms: u64,
    },
}

// ============================================================================
// Commands
// ============================================================================

async fn run_record(clear: bool, date: Option<NaiveDate>, cancel_token: CancellationToken) -> Result<()> {
    let cfg = config::get();
    let store = FrameStore::open(&cfg.storage.path)
        .with_context(|| format!("Failed to open frame store at {:?}", cfg.storage.path))?;
    let table = cfg.acquisition.table.as_str();

    if clear {
        store.clear_table(table).context("Failed to clear frame table")?;
    }

    let date = date.unwrap_or_else(|| chrono::Local::now().date_naive());
    info!("📥 Input: recorder lines on stdin -> table '{}' ({})", table, date);

    let stats = record_stream(
        BufReader::new(tokio::io::stdin()),
        &store,
        table,
        date,
        Some(cfg.acquisition.frame_size),
        cancel_token,
    )
    .await
    .context("Recording failed")?;

    info!(
        "Recorded {} frames ({} total in '{}')",
        stats.frames_stored,
        store.frame_count(table)?,
        table
    );
    Ok(())
}

async fn run_analyze(json: bool, once: bool, cancel_token: CancellationToken) -> Result<()> {
    let cfg = config::get();
    let analyzer = BenchAnalyzer::new(cfg).context("Invalid analysis configuration")?;
    let store = FrameStore::open(&cfg.storage.path)
        .with_context(|| format!("Failed to open frame store at {:?}", cfg.storage.path))?;

    if once {
        let snapshot = analyzer.poll(&store)?;
        report(&snapshot, json)?;
        return Ok(());
    }

    let interval = Duration::from_millis(cfg.analysis.poll_interval_ms);
    AnalysisLoop::new(analyzer, store, interval, cancel_token)
        .run(|snapshot| {
            if let Err(e) = report(snapshot, json) {
                warn!("Failed to write snapshot: {}", e);
            }
        })
        .await?;
    Ok(())
}

async fn run_simulate(
    frames: u64,
    seed: u64,
    rpm: f64,
    interval_ms: u64,
    cancel_token: CancellationToken,
) -> Result<()> {
    let cfg = config::get();
    let mut sim = BenchSimulator::new(SimulationConfig {
        frame_size: cfg.acquisition.frame_size,
        sampling_rate_hz: cfg.acquisition.sampling_rate_hz,
        rpm,
        seed,
        start: chrono::Local::now().naive_local(),
        ..SimulationConfig::default()
    });
    info!("🧪 Simulating {} frames at {:.0} rpm (seed {})", frames, rpm, seed);

    let stdout = std::io::stdout();
    for i in 0..frames {
        if cancel_token.is_cancelled() {
            break;
        }
        if i > 0 && interval_ms > 0 {
            tokio::select! {
                _ = cancel_token.cancelled() => break,
                _ = tokio::time::sleep(Duration::from_millis(interval_ms)) => {}
            }
        }
        let line = format_line(&sim.next_frame());
        writeln!(stdout.lock(), "{line}").context("Failed to write to stdout")?;
    }
    Ok(())
}

fn report(snapshot: &BenchSnapshot, json: bool) -> Result<()> {
    if json {
        let line = serde_json::to_string(snapshot)?;
        writeln!(std::io::stdout().lock(), "{line}")?;
    }
    info!(
        frames = snapshot.frames_used,
        sequence = ?snapshot.newest_sequence,
        "⚙️  {:.1} rpm | force {:.1} ({:.1}% noise) | displacement {:.1} ({:.1}% noise) | temp {:.1}",
        snapshot.rotation.rpm,
        snapshot.force.main_amplitude,
        snapshot.force.noise_percentage,
        snapshot.displacement.main_amplitude,
        snapshot.displacement.noise_percentage,
        snapshot.temperature_mean,
    );
    Ok(())
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries recorder lines and JSON snapshots.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args = CliArgs::parse();

    let bench_config = match &args.config {
        Some(path) => BenchConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => BenchConfig::load(),
    };
    bench_config.validate()?;
    info!(
        "Bench: {} | {} samples/frame @ {:.0} Hz | cutoff {:.0} Hz (order {})",
        bench_config.bench.name,
        bench_config.acquisition.frame_size,
        bench_config.acquisition.sampling_rate_hz,
        bench_config.filter.cutoff_hz(),
        bench_config.filter.order,
    );
    config::init(bench_config);

    // Graceful shutdown via Ctrl+C
    let cancel_token = CancellationToken::new();
    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("🛑 Received Ctrl+C, initiating shutdown...");
        shutdown_token.cancel();
    });

    match args.command {
        SubCommand::Record { clear, date } => run_record(clear, date, cancel_token).await,
        SubCommand::Analyze { json, once } => run_analyze(json, once, cancel_token).await,
        SubCommand::Simulate {
            frames,
            seed,
            rpm,
            interval_ms,
        } => run_simulate(frames, seed, rpm, interval_ms, cancel_token).await,
    }
}
