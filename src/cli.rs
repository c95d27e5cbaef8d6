//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use std::path::PathBuf;

/// ResearchHub - multi-stage research paper analyzer
///
/// Searches a paper corpus for a query, runs a pipeline of local LLM
/// analyses over the matches and writes a report with comparisons,
/// research gaps, a knowledge graph and a 30-day roadmap.
///
/// Examples:
///   researchhub "retrieval augmented generation" --corpus papers.json
///   researchhub "graph neural networks" --corpus papers.json --format json -o report.json
///   researchhub "dense retrieval" --corpus papers.json --dry-run
///   researchhub --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Research question or topic to analyze
    #[arg(value_name = "QUERY", required_unless_present = "init_config")]
    pub query: Option<String>,

    /// JSON file holding the paper corpus to search
    ///
    /// An array of {title, abstract, authors, source, url} objects.
    /// Can also be set in .researchhub.toml under [retrieval].
    #[arg(long, value_name = "FILE", env = "RESEARCHHUB_CORPUS")]
    pub corpus: Option<PathBuf>,

    /// Ollama model used by every analysis stage
    #[arg(
        short,
        long,
        default_value = "llama3.2:latest",
        env = "RESEARCHHUB_MODEL"
    )]
    pub model: String,

    /// Ollama API endpoint URL
    #[arg(long, default_value = "http://localhost:11434", env = "OLLAMA_URL")]
    pub ollama_url: String,

    /// Output file path for the report
    ///
    /// Defaults to the [general] output setting, research_report.md.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Path to configuration file
    ///
    /// If not specified, looks for .researchhub.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Temperature for LLM responses (0.0 - 1.0)
    #[arg(long)]
    pub temperature: Option<f32>,

    /// Request timeout in seconds for a single agent call
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Attempts per agent call, including the first
    #[arg(long, value_name = "NUM")]
    pub retries: Option<usize>,

    /// Maximum number of papers taken from the corpus
    #[arg(long, value_name = "COUNT")]
    pub max_results: Option<usize>,

    /// Longest path, in hops, reported as a hidden graph connection
    #[arg(long, value_name = "HOPS")]
    pub max_path_length: Option<usize>,

    /// Skip the advisory query classification stage
    #[arg(long)]
    pub no_classify: bool,

    /// Fail if the confidence score is below this value
    ///
    /// Useful for CI pipelines. Exit code 2 when the score is lower.
    #[arg(long, value_name = "SCORE")]
    pub min_confidence: Option<u32>,

    /// Dry run: search the corpus without calling the LLM
    ///
    /// Shows which papers would be analyzed and exits.
    #[arg(long)]
    pub dry_run: bool,

    /// Generate a default .researchhub.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// The trimmed query, empty when none was given.
    pub fn query(&self) -> &str {
        self.query.as_deref().map(str::trim).unwrap_or("")
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if self.query().is_empty() {
            return Err("Query must not be empty".to_string());
        }

        // Validate Ollama URL format (not needed for dry-run)
        if !self.dry_run
            && !self.ollama_url.starts_with("http://")
            && !self.ollama_url.starts_with("https://")
        {
            return Err("Ollama URL must start with 'http://' or 'https://'".to_string());
        }

        if let Some(temperature) = self.temperature {
            if !(0.0..=1.0).contains(&temperature) {
                return Err("Temperature must be between 0.0 and 1.0".to_string());
            }
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if self.timeout == Some(0) {
            return Err("Timeout must be at least 1 second".to_string());
        }

        if self.retries == Some(0) {
            return Err("Retries must be at least 1".to_string());
        }

        if self.max_results == Some(0) {
            return Err("Max results must be at least 1".to_string());
        }

        if let Some(hops) = self.max_path_length {
            if hops < 2 {
                return Err("Max path length must be at least 2 hops".to_string());
            }
        }

        if let Some(score) = self.min_confidence {
            if score > 100 {
                return Err("Minimum confidence must be between 0 and 100".to_string());
            }
        }

        if let Some(ref corpus) = self.corpus {
            if !corpus.is_file() {
                return Err(format!("Corpus file does not exist: {}", corpus.display()));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
