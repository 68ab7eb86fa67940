//! @ai:module:intent CLI for the tutor QA harness
//! @ai:module:layer presentation

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use qa_harness::{
    config::{FilterConfig, HarnessConfig},
    dataset::{
        DatasetLoader, DatasetLoaderTrait, Difficulty, ExamVariant, GoldenItem, TrapItem,
    },
    harness::{Harness, HarnessOutcome},
    metrics::RunSummary,
    report::{ReportContext, ReportGenerator},
    runner::{AnswerClientTrait, HttpAnswerClient, MockAnswerClient, ScheduleMode},
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

const DEFAULT_CONFIG_PATH: &str = "harness.toml";

#[derive(Parser)]
#[command(name = "qa-harness")]
#[command(about = "Quality gate harness for the AP Calculus tutor answering service")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the golden and trap suites and evaluate the quality gates
    Run(RunArgs),

    /// Validate datasets without calling the service
    Validate {
        /// Path to configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Golden dataset (JSONL)
        #[arg(long)]
        golden: Option<PathBuf>,

        /// Trap dataset (JSONL)
        #[arg(long)]
        traps: Option<PathBuf>,
    },

    /// Initialize default configuration
    Init {
        /// Output path for config file
        #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
        output: PathBuf,
    },
}

#[derive(clap::Args)]
struct RunArgs {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Golden dataset (JSONL)
    #[arg(long)]
    golden: Option<PathBuf>,

    /// Trap dataset (JSONL)
    #[arg(long)]
    traps: Option<PathBuf>,

    /// Report output path
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Answering service endpoint
    #[arg(long)]
    endpoint: Option<String>,

    /// Maximum calls in flight
    #[arg(long)]
    concurrency: Option<usize>,

    /// Per-call service timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Outer per-call guard in milliseconds (0 disables it)
    #[arg(long)]
    guard_timeout_ms: Option<u64>,

    /// How calls are scheduled under the concurrency ceiling
    #[arg(long, value_enum)]
    schedule: Option<ScheduleMode>,

    /// Filter by exam variants (comma-separated: calc_ab,calc_bc)
    #[arg(long)]
    variants: Option<String>,

    /// Run without calling the service
    #[arg(long)]
    dry_run: bool,

    #[arg(long)]
    min_verified_share: Option<f64>,

    #[arg(long)]
    min_verifier_equiv_rate: Option<f64>,

    #[arg(long)]
    max_avg_latency_ms: Option<f64>,

    #[arg(long)]
    max_error_rate: Option<f64>,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("qa_harness=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => run_harness(args).await,
        Commands::Validate {
            config,
            golden,
            traps,
        } => validate(config, golden, traps).map(|_| ExitCode::SUCCESS),
        Commands::Init { output } => init_config(output).map(|_| ExitCode::SUCCESS),
    }
}

/// @ai:intent Load, execute, aggregate, gate and report
/// @ai:post exit code 0 iff every gate passed
/// @ai:effects network, fs:read, fs:write
async fn run_harness(args: RunArgs) -> Result<ExitCode> {
    let mut config = load_or_default_config(args.config.clone())?;
    apply_overrides(&mut config, &args)?;
    config.validate().context("Invalid configuration")?;

    let (golden, traps) = load_datasets(&config)?;
    tracing::info!("Loaded {} golden and {} trap items", golden.len(), traps.len());

    if golden.is_empty() && traps.is_empty() {
        tracing::warn!("No items to run; the gate will fail on an empty run");
    }

    let run_id = uuid::Uuid::new_v4().to_string();
    tracing::info!("Run ID: {}", run_id);

    let (outcome, service) = if config.run.dry_run {
        tracing::info!("Running in dry-run mode");
        let client = Arc::new(MockAnswerClient::always_verified("dry run"));
        let outcome = execute(client, &config, &run_id, &golden, &traps).await?;
        (outcome, "dry-run".to_string())
    } else {
        tracing::info!("Using answering service at {}", config.service.endpoint);
        let client = Arc::new(HttpAnswerClient::new(&config.service)?);
        let outcome = execute(client, &config, &run_id, &golden, &traps).await?;
        (outcome, config.service.endpoint.clone())
    };

    let context = ReportContext {
        generated_at: chrono::Utc::now().to_rfc3339(),
        run_id,
        service,
    };

    let reporter = ReportGenerator::new();
    let (_, json_path) = reporter.generate_all(
        &outcome.run,
        &outcome.verdict,
        &context,
        &config.paths.report,
    )?;

    print_summary(&outcome);
    println!("Report:  {}", config.paths.report.display());
    println!("Results: {}", json_path.display());

    Ok(ExitCode::from(outcome.verdict.exit_code()))
}

/// @ai:intent Run both suites with the given client
/// @ai:effects network
async fn execute<C: AnswerClientTrait>(
    client: Arc<C>,
    config: &HarnessConfig,
    run_id: &str,
    golden: &[GoldenItem],
    traps: &[TrapItem],
) -> Result<HarnessOutcome> {
    let harness = Harness::new(client, config, run_id);
    Ok(harness.run(golden, traps).await?)
}

/// @ai:intent Apply command-line overrides on top of file config
/// @ai:effects pure
fn apply_overrides(config: &mut HarnessConfig, args: &RunArgs) -> Result<()> {
    if let Some(ref path) = args.golden {
        config.paths.golden = path.clone();
    }
    if let Some(ref path) = args.traps {
        config.paths.traps = path.clone();
    }
    if let Some(ref path) = args.output {
        config.paths.report = path.clone();
    }
    if let Some(ref endpoint) = args.endpoint {
        config.service.endpoint = endpoint.clone();
    }
    if let Some(concurrency) = args.concurrency {
        config.run.concurrency = concurrency;
    }
    if let Some(timeout_ms) = args.timeout_ms {
        config.service.timeout_ms = timeout_ms;
    }
    if args.guard_timeout_ms.is_some() {
        config.run.guard_timeout_ms = args.guard_timeout_ms;
    }
    if let Some(schedule) = args.schedule {
        config.run.schedule = schedule;
    }
    if let Some(ref variants) = args.variants {
        config.run.filter = build_filter(variants)?;
    }
    if args.dry_run {
        config.run.dry_run = true;
    }

    let gates = &mut config.gates;
    if let Some(v) = args.min_verified_share {
        gates.min_verified_share = v;
    }
    if let Some(v) = args.min_verifier_equiv_rate {
        gates.min_verifier_equiv_rate = v;
    }
    if let Some(v) = args.max_avg_latency_ms {
        gates.max_avg_latency_ms = v;
    }
    if let Some(v) = args.max_error_rate {
        gates.max_error_rate = v;
    }

    Ok(())
}

/// @ai:intent Build filter from CLI arguments
/// @ai:effects pure
fn build_filter(variants: &str) -> Result<FilterConfig> {
    let parsed = variants
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| ExamVariant::parse(s).with_context(|| format!("Unknown exam variant: {}", s)))
        .collect::<Result<Vec<_>>>()?;

    Ok(FilterConfig {
        variants: Some(parsed),
    })
}

/// @ai:intent Load both datasets, failing on the first invalid record
/// @ai:effects fs:read
fn load_datasets(config: &HarnessConfig) -> Result<(Vec<GoldenItem>, Vec<TrapItem>)> {
    let loader = DatasetLoader::new();

    tracing::info!("Loading golden set from {}", config.paths.golden.display());
    let golden: Vec<GoldenItem> = loader.load_filtered(&config.paths.golden, &config.run.filter)?;

    tracing::info!("Loading trap set from {}", config.paths.traps.display());
    let traps: Vec<TrapItem> = loader.load_filtered(&config.paths.traps, &config.run.filter)?;

    Ok((golden, traps))
}

/// @ai:intent Validate datasets and print per-variant counts
/// @ai:effects fs:read
fn validate(
    config_path: Option<PathBuf>,
    golden: Option<PathBuf>,
    traps: Option<PathBuf>,
) -> Result<()> {
    let mut config = load_or_default_config(config_path)?;
    if let Some(path) = golden {
        config.paths.golden = path;
    }
    if let Some(path) = traps {
        config.paths.traps = path;
    }
    config.validate().context("Invalid configuration")?;

    let (golden, traps) = load_datasets(&config)?;

    println!("Dataset validation passed!");
    println!("Golden items: {}", golden.len());
    for variant in ExamVariant::ALL {
        let count = golden.iter().filter(|i| i.exam_variant == variant).count();
        println!("  - {}: {}", variant, count);
    }
    for difficulty in Difficulty::ALL {
        let count = golden.iter().filter(|i| i.difficulty == difficulty).count();
        println!("  - {}: {}", difficulty, count);
    }

    println!("Trap items: {}", traps.len());
    for variant in ExamVariant::ALL {
        let count = traps.iter().filter(|i| i.exam_variant == variant).count();
        println!("  - {}: {}", variant, count);
    }

    Ok(())
}

/// @ai:intent Initialize default configuration file
/// @ai:effects fs:write
fn init_config(output: PathBuf) -> Result<()> {
    let config = HarnessConfig::default();
    config.save(&output)?;
    println!("Configuration saved to {}", output.display());
    Ok(())
}

/// @ai:intent Load configuration or use defaults
/// @ai:effects fs:read
fn load_or_default_config(path: Option<PathBuf>) -> Result<HarnessConfig> {
    match path {
        Some(p) => HarnessConfig::load(&p),
        None => {
            let default_path = PathBuf::from(DEFAULT_CONFIG_PATH);

            if default_path.exists() {
                HarnessConfig::load(&default_path)
            } else {
                Ok(HarnessConfig::default())
            }
        }
    }
}

/// @ai:intent Print summary to console
/// @ai:effects io:stdout
fn print_summary(outcome: &HarnessOutcome) {
    println!();
    println!("Tutor QA Harness Results");
    println!("========================");
    println!();

    println!(
        "{:<12} {:>8} {:>10} {:>10} {:>10} {:>8}",
        "", "Tests", "Verified", "Equiv", "Avg ms", "Errors"
    );
    println!("{}", "-".repeat(63));
    print_summary_row("Golden", outcome.run.golden.summary());
    print_summary_row("Traps", outcome.run.traps.summary());
    print_summary_row("Overall", &outcome.run.overall);
    println!();

    if outcome.verdict.passed {
        println!("Quality gates: PASSED");
    } else {
        println!("Quality gates: FAILED");
        for message in outcome.verdict.messages() {
            println!("  - {}", message);
        }
    }
    println!();
}

fn print_summary_row(label: &str, summary: &RunSummary) {
    println!(
        "{:<12} {:>8} {:>9.1}% {:>9.1}% {:>10.0} {:>8}",
        label,
        summary.total_tests,
        summary.verified_share * 100.0,
        summary.verifier_equiv_rate * 100.0,
        summary.avg_latency_ms,
        summary.error_count
    );
}
