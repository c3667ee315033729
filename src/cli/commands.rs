//! CLI command definitions for icp-journal.
//!
//! Loads a customer CSV and produces the analyst report, the raw metrics, a
//! routed view of an existing document, or the single-agent journal.

use crate::dataset::Dataset;
use crate::llm::providers::openrouter::DEFAULT_MODEL;
use crate::llm::{LiteLlmClient, LlmProvider, OpenRouterProvider};
use crate::pipeline::{JournalWriter, ReportConfig, ReportGenerator};
use crate::report::{
    extract_metrics, route, AnalystReport, ChartImage, ReportOutcome, Section, NO_DATA_MESSAGE,
};
use anyhow::Context;
use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Customer CSV analysis with multi-agent narrative reports.
#[derive(Parser)]
#[command(name = "icp-journal")]
#[command(about = "Generate Business Analyst ICP reports from customer CSV exports")]
#[command(version)]
#[command(
    long_about = "icp-journal profiles a customer CSV export: it computes plan, spend, churn and tenure metrics, runs three analyst agents over a sample of rows, and renders the result as JSON or a self-contained HTML page.\n\nWithout an API key the narrative falls back to a deterministic template.\n\nExample usage:\n  icp-journal report customers.csv --output report.html --chart \"Plans=plans.png\""
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,
}

/// Available CLI subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Generate the full analyst report for a customer CSV.
    Report(ReportArgs),

    /// Print the metrics summary of a customer CSV as JSON.
    Metrics(MetricsArgs),

    /// Route a text document into report sections and print them as JSON.
    Sections(SectionsArgs),

    /// Write the single-agent Business Analyst journal for a customer CSV.
    Journal(JournalArgs),
}

/// Provider settings shared by the generating commands.
#[derive(clap::Args, Debug)]
pub struct ProviderArgs {
    /// LLM model to use (defaults to the provider's model).
    #[arg(short = 'm', long)]
    pub model: Option<String>,

    /// OpenRouter API key (can also be set via OPENROUTER_API_KEY env var).
    #[arg(long, env = "OPENROUTER_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Per-call timeout in seconds.
    #[arg(long)]
    pub timeout_secs: Option<u64>,
}

/// Arguments for `icp-journal report`.
#[derive(Parser, Debug)]
pub struct ReportArgs {
    /// Customer CSV file.
    pub input: PathBuf,

    /// Write the report here: HTML for `.html`, JSON otherwise.
    #[arg(short = 'o', long)]
    pub output: Option<PathBuf>,

    /// Print the JSON bundle to stdout.
    #[arg(long)]
    pub json: bool,

    /// Use the deterministic template narrative instead of the agents.
    #[arg(long)]
    pub template: bool,

    /// Use the template narrative if the agents fail.
    #[arg(long)]
    pub fallback_on_error: bool,

    /// Embed a PNG chart, as TITLE=PATH. Repeatable.
    #[arg(long = "chart", value_name = "TITLE=PATH")]
    pub charts: Vec<String>,

    /// Maximum rows sent to the agents.
    #[arg(long)]
    pub sample_cap: Option<usize>,

    /// Seed for the row sample.
    #[arg(long)]
    pub seed: Option<u64>,

    #[command(flatten)]
    pub provider: ProviderArgs,
}

/// Arguments for `icp-journal metrics`.
#[derive(Parser, Debug)]
pub struct MetricsArgs {
    /// Customer CSV file.
    pub input: PathBuf,
}

/// Arguments for `icp-journal sections`.
#[derive(Parser, Debug)]
pub struct SectionsArgs {
    /// Text or Markdown document to route.
    pub input: PathBuf,
}

/// Arguments for `icp-journal journal`.
#[derive(Parser, Debug)]
pub struct JournalArgs {
    /// Customer CSV file.
    pub input: PathBuf,

    /// Write the journal to this file instead of stdout.
    #[arg(short = 'o', long)]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub provider: ProviderArgs,
}

/// Parse CLI arguments and return the Cli struct.
///
/// This allows main.rs to access CLI arguments (like log_level) before running commands.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Run the CLI by parsing arguments and executing the command.
pub async fn run() -> anyhow::Result<()> {
    run_with_cli(parse_cli()).await
}

/// Run the CLI with the parsed arguments.
pub async fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Report(args) => run_report_command(args).await,
        Commands::Metrics(args) => run_metrics_command(args),
        Commands::Sections(args) => run_sections_command(args),
        Commands::Journal(args) => run_journal_command(args).await,
    }
}

// ============================================================================
// Command Implementations
// ============================================================================

async fn run_report_command(args: ReportArgs) -> anyhow::Result<()> {
    let dataset = load_dataset(&args.input)?;
    let config = build_config(&args)?;

    let charts = args
        .charts
        .iter()
        .map(|spec| -> anyhow::Result<ChartImage> {
            let (title, path) = parse_chart_spec(spec)?;
            Ok(ChartImage::from_png_file(title, path)?)
        })
        .collect::<anyhow::Result<Vec<_>>>()
        .context("Failed to load charts")?;

    let outcome = if args.template {
        ReportGenerator::template_only(config)?.generate_template(&dataset)
    } else {
        let provider =
            build_llm_client(args.provider.api_key.clone(), args.provider.model.clone())?;
        ReportGenerator::new(config, provider)?
            .generate(&dataset)
            .await
            .context("Error generating report")?
    };

    let report = match outcome {
        ReportOutcome::NoData => {
            println!("{}", NO_DATA_MESSAGE);
            return Ok(());
        }
        ReportOutcome::Report(report) => report,
    };

    if let Some(output) = &args.output {
        report
            .write_to(output, &charts)
            .with_context(|| format!("Failed to write report to {}", output.display()))?;
        if !args.json {
            println!("Report written to {}", output.display());
        }
    }

    if args.json {
        println!("{}", report.to_json()?);
    } else if args.output.is_none() {
        print_report(&report);
    }

    Ok(())
}

fn run_metrics_command(args: MetricsArgs) -> anyhow::Result<()> {
    let dataset = load_dataset(&args.input)?;
    let metrics = extract_metrics(&dataset);
    let json = serde_json::to_string_pretty(&metrics)
        .map_err(|e| anyhow::anyhow!("Failed to serialize JSON output: {}", e))?;
    println!("{}", json);
    Ok(())
}

fn run_sections_command(args: SectionsArgs) -> anyhow::Result<()> {
    let document = fs::read_to_string(&args.input)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;
    let sections = route(&document);
    let json = serde_json::to_string_pretty(&sections)
        .map_err(|e| anyhow::anyhow!("Failed to serialize JSON output: {}", e))?;
    println!("{}", json);
    Ok(())
}

async fn run_journal_command(args: JournalArgs) -> anyhow::Result<()> {
    let dataset = load_dataset(&args.input)?;
    if dataset.is_empty() {
        println!("{}", NO_DATA_MESSAGE);
        return Ok(());
    }

    let mut config = ReportConfig::from_env()?;
    apply_provider_overrides(&mut config, &args.provider);
    config.validate()?;

    let provider = build_llm_client(args.provider.api_key.clone(), args.provider.model.clone())?
        .ok_or_else(|| {
            anyhow::anyhow!(
                "The journal needs a text generator.\n\
                 Provide --api-key <KEY>, set OPENROUTER_API_KEY, or set LITELLM_API_BASE."
            )
        })?;

    let metrics = extract_metrics(&dataset);
    let journal = JournalWriter::new(provider, &config)
        .write(&metrics)
        .await
        .context("Error generating journal")?;

    match &args.output {
        Some(path) => {
            fs::write(path, &journal)
                .with_context(|| format!("Failed to write journal to {}", path.display()))?;
            println!("Journal written to {}", path.display());
        }
        None => println!("{}", journal),
    }
    Ok(())
}

// ============================================================================
// Helpers
// ============================================================================

fn load_dataset(path: &Path) -> anyhow::Result<Dataset> {
    let dataset = Dataset::from_csv_path(path)
        .with_context(|| format!("Failed to load CSV {}", path.display()))?;
    info!(
        path = %path.display(),
        rows = dataset.row_count(),
        columns = dataset.column_count(),
        "Loaded dataset"
    );
    Ok(dataset)
}

fn build_config(args: &ReportArgs) -> anyhow::Result<ReportConfig> {
    let mut config = ReportConfig::from_env()?;
    if let Some(cap) = args.sample_cap {
        config.sample_cap = cap;
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if args.fallback_on_error {
        config.fallback_on_error = true;
    }
    apply_provider_overrides(&mut config, &args.provider);
    config.validate()?;
    Ok(config)
}

fn apply_provider_overrides(config: &mut ReportConfig, provider: &ProviderArgs) {
    if let Some(model) = &provider.model {
        config.model = model.clone();
    }
    if let Some(secs) = provider.timeout_secs {
        config.task_timeout = Duration::from_secs(secs);
    }
}

/// Resolves a text generator: OpenRouter when a key is available, LiteLLM
/// when `LITELLM_API_BASE` is set, otherwise none.
fn build_llm_client(
    api_key: Option<String>,
    model: Option<String>,
) -> anyhow::Result<Option<Arc<dyn LlmProvider>>> {
    let resolved_api_key = api_key
        .filter(|k| !k.trim().is_empty())
        .or_else(|| std::env::var("OPENROUTER_API_KEY").ok())
        .filter(|k| !k.trim().is_empty());

    if let Some(key) = resolved_api_key {
        let model = model.unwrap_or_else(|| DEFAULT_MODEL.to_string());
        info!(model = %model, "Using OpenRouter with specified API key");
        let provider: Arc<dyn LlmProvider> = Arc::new(OpenRouterProvider::with_model(key, model)?);
        return Ok(Some(provider));
    }

    if std::env::var("LITELLM_API_BASE").is_ok() {
        info!("Using LiteLLM client from environment");
        let client = LiteLlmClient::from_env()
            .map_err(|e| anyhow::anyhow!("Failed to initialize LLM client: {}", e))?;
        let provider: Arc<dyn LlmProvider> = Arc::new(client);
        return Ok(Some(provider));
    }

    Ok(None)
}

/// Splits a `TITLE=PATH` chart argument.
fn parse_chart_spec(spec: &str) -> anyhow::Result<(String, PathBuf)> {
    let (title, path) = spec
        .split_once('=')
        .ok_or_else(|| anyhow::anyhow!("Invalid chart '{}': expected TITLE=PATH", spec))?;
    let title = title.trim();
    let path = path.trim();
    if title.is_empty() || path.is_empty() {
        anyhow::bail!("Invalid chart '{}': expected TITLE=PATH", spec);
    }
    Ok((title.to_string(), PathBuf::from(path)))
}

fn print_report(report: &AnalystReport) {
    println!("=== Business Analyst ICP Report ===");
    println!("Rows:    {}", report.row_count);
    println!("Sampled: {}", report.sample_size);
    println!("Mode:    {}", report.mode);
    println!();

    println!("--- Key Metrics ---");
    for (name, value) in report.metrics.iter() {
        println!("{:<22} {}", name, value);
    }

    for (section, text) in report.sections.iter() {
        if section == Section::Intro || text.trim().is_empty() {
            continue;
        }
        println!();
        println!("{}", text.trim_end());
    }
}
