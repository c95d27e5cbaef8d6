//! ResearchHub - multi-stage research paper analyzer
//!
//! A CLI tool that searches a paper corpus, runs a pipeline of
//! Ollama-backed analyses over the matches and writes a report with
//! comparisons, research gaps, knowledge-graph patterns and a roadmap.
//!
//! Exit codes:
//!   0 - Success (confidence at or above --min-confidence, or no threshold set)
//!   1 - Runtime error (connection, config, unreadable corpus, etc.)
//!   2 - Confidence score below --min-confidence

mod agent;
mod analysis;
mod cli;
mod config;
mod error;
mod graph;
mod models;
mod pipeline;
mod report;
mod retrieval;

use agent::{AgentConfig, OllamaAgent};
use anyhow::{anyhow, Context, Result};
use cli::{Args, OutputFormat};
use config::{Config, CONFIG_FILE_NAME};
use indicatif::{ProgressBar, ProgressStyle};
use pipeline::PipelineCoordinator;
use report::generator::{generate_json_report, generate_markdown_report, ReportMetadata};
use retrieval::CorpusFile;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::level_filters::LevelFilter;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    init_logging(&args);

    info!("ResearchHub v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run_analysis(args).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Analysis failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .researchhub.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE_NAME
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", CONFIG_FILE_NAME))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE_NAME);
    println!("   Edit it to set the corpus, model, retry policy and graph limits.");
    Ok(())
}

/// Initialize logging. `RUST_LOG` overrides the level chosen by
/// --verbose/--quiet.
fn init_logging(args: &Args) {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(args.log_level()).into())
        .from_env_lossy();

    let result = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .try_init();

    if let Err(e) = result {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Run the complete analysis workflow. Returns exit code (0 or 2).
async fn run_analysis(args: Args) -> Result<i32> {
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    let query = args.query().to_string();

    let corpus_path = config.retrieval.corpus.clone().ok_or_else(|| {
        anyhow!(
            "No paper corpus given. Pass --corpus or set `corpus` under [retrieval] in {}",
            CONFIG_FILE_NAME
        )
    })?;
    let corpus = CorpusFile::load(&corpus_path, config.retrieval.max_results)?;
    if corpus.is_empty() {
        warn!("Corpus {} holds no papers", corpus_path.display());
    }

    if args.dry_run {
        return handle_dry_run(&corpus, &query);
    }

    if !args.quiet {
        println!("🤖 Initializing analysis agent...");
        println!("   Model: {}", config.model.name);
        println!("   Ollama: {}", config.model.ollama_url);
        println!("   Timeout: {}s", config.model.timeout_seconds);
        println!("   Retries: {}", config.retry.attempts);
    }

    let agent = OllamaAgent::new(AgentConfig::from(&config))?;
    let coordinator = PipelineCoordinator::from_config(Arc::new(agent), Arc::new(corpus), &config);

    let spinner = if args.quiet {
        None
    } else {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(format!("Analyzing \"{}\"...", query));
        pb.enable_steady_tick(Duration::from_millis(120));
        Some(pb)
    };

    let result = coordinator.analyze(&query).await;
    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }
    let report = result?;

    let output = match args.format {
        OutputFormat::Json => generate_json_report(&report)?,
        OutputFormat::Markdown => {
            generate_markdown_report(&report, &ReportMetadata::now(config.model.name.as_str()))
        }
    };

    let output_path = output_path(&args, &config);
    std::fs::write(&output_path, &output)
        .with_context(|| format!("Failed to write report to {}", output_path.display()))?;

    let confidence = &report.confidence_score;
    if !args.quiet {
        println!("\n📊 Analysis Summary:");
        println!("   Papers analyzed: {}", report.direct_answer.papers_found);
        if report.is_empty_result() {
            if let Some(ref reason) = report.explainability_log.error {
                println!("   ⚠️  Nothing to analyze: {}", reason);
            }
        }
        println!(
            "   Knowledge graph: {} nodes, {} edges",
            report.knowledge_graph.payload().node_count,
            report.knowledge_graph.payload().edge_count
        );
        println!(
            "   Confidence: {}/{}",
            confidence.score, confidence.max_score
        );
        if !report.fallbacks().is_empty() {
            println!("   Degraded stages: {}", report.fallbacks().len());
            for fallback in report.fallbacks() {
                println!("   - {}", fallback.reason);
            }
        }
        println!(
            "   Duration: {:.1}s",
            report.explainability_log.total_pipeline_time_seconds
        );
        println!(
            "\n✅ Analysis complete! Report saved to: {}",
            output_path.display()
        );
    }

    // Check --min-confidence threshold
    if let Some(min_confidence) = args.min_confidence {
        if confidence.score < min_confidence {
            eprintln!(
                "\n⛔ Confidence {} is below the required {}. Failing (exit code 2).",
                confidence.score, min_confidence
            );
            return Ok(2);
        }
    }

    Ok(0)
}

/// Explicit --output wins; otherwise the configured path, with a .json
/// extension for JSON output.
fn output_path(args: &Args, config: &Config) -> PathBuf {
    match args.output {
        Some(ref path) => path.clone(),
        None => {
            let path = PathBuf::from(&config.general.output);
            match args.format {
                OutputFormat::Json => path.with_extension("json"),
                OutputFormat::Markdown => path,
            }
        }
    }
}

/// Handle --dry-run: search the corpus, print what would be analyzed, exit.
fn handle_dry_run(corpus: &CorpusFile, query: &str) -> Result<i32> {
    println!("\n🔍 Dry run: searching the corpus (no LLM calls)...\n");

    let papers = corpus.matching(query);

    if papers.is_empty() {
        println!("   No papers match \"{}\".", query);
    } else {
        println!(
            "   Found {} of {} papers that would be analyzed:\n",
            papers.len(),
            corpus.len()
        );
        for paper in &papers {
            let source = if paper.source.is_empty() {
                "unknown"
            } else {
                paper.source.as_str()
            };
            println!("     📄 {} [{}]", paper.title, source);
        }
        println!("\n   Total: {} papers", papers.len());
    }

    println!("\n✅ Dry run complete. No LLM calls were made.");
    Ok(0)
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", CONFIG_FILE_NAME);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}
