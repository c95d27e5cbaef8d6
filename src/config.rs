//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.researchhub.toml` files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default configuration file name, looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = ".researchhub.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Model settings.
    #[serde(default)]
    pub model: ModelConfig,

    /// Retry policy of the agent client.
    #[serde(default)]
    pub retry: RetryConfig,

    /// Paper retrieval settings.
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Knowledge graph analytics settings.
    #[serde(default)]
    pub graph: GraphConfig,

    /// Pipeline stage settings.
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Default output file path.
    #[serde(default = "default_output")]
    pub output: String,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            verbose: false,
        }
    }
}

fn default_output() -> String {
    "research_report.md".to_string()
}

/// LLM model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Default model name.
    #[serde(default = "default_model")]
    pub name: String,

    /// Ollama API URL.
    #[serde(default = "default_ollama_url")]
    pub ollama_url: String,

    /// Temperature for generation.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Minimum token budget per call; stages with long replies ask for more.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: default_model(),
            ollama_url: default_ollama_url(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_model() -> String {
    "llama3.2:latest".to_string()
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_temperature() -> f32 {
    0.3
}

fn default_max_tokens() -> usize {
    500
}

fn default_timeout() -> u64 {
    300
}

/// Exponential backoff for agent calls: attempt `n` waits
/// `base_delay_ms * factor^n` before retrying.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts per call (including the first).
    #[serde(default = "default_attempts")]
    pub attempts: usize,

    /// Delay before the first retry, in milliseconds.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Multiplier applied to the delay after every failed attempt.
    #[serde(default = "default_backoff_factor")]
    pub factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: default_attempts(),
            base_delay_ms: default_base_delay_ms(),
            factor: default_backoff_factor(),
        }
    }
}

impl RetryConfig {
    /// Delay to wait after the given zero-based failed attempt.
    pub fn delay_for(&self, attempt: usize) -> Duration {
        let millis = self.base_delay_ms as f64 * self.factor.powi(attempt as i32);
        Duration::from_millis(millis.max(0.0) as u64)
    }
}

fn default_attempts() -> usize {
    3
}

fn default_base_delay_ms() -> u64 {
    1000
}

fn default_backoff_factor() -> f64 {
    2.0
}

/// Paper retrieval settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Local JSON corpus to search.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corpus: Option<PathBuf>,

    /// Maximum papers returned per query.
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            corpus: None,
            max_results: default_max_results(),
        }
    }
}

fn default_max_results() -> usize {
    10
}

/// Knowledge graph analytics limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphConfig {
    /// Longest path (in hops) still reported as a hidden connection.
    #[serde(default = "default_max_path_length")]
    pub max_path_length: usize,

    /// Only the first N inserted nodes are considered for hidden connections.
    #[serde(default = "default_candidate_node_cap")]
    pub candidate_node_cap: usize,

    /// Hidden-connection search stops after this many results.
    #[serde(default = "default_max_hidden_connections")]
    pub max_hidden_connections: usize,

    /// Number of central nodes reported.
    #[serde(default = "default_top_central")]
    pub top_central: usize,

    /// Number of clusters reported.
    #[serde(default = "default_top_clusters")]
    pub top_clusters: usize,

    /// Members listed per cluster.
    #[serde(default = "default_cluster_sample_size")]
    pub cluster_sample_size: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            max_path_length: default_max_path_length(),
            candidate_node_cap: default_candidate_node_cap(),
            max_hidden_connections: default_max_hidden_connections(),
            top_central: default_top_central(),
            top_clusters: default_top_clusters(),
            cluster_sample_size: default_cluster_sample_size(),
        }
    }
}

fn default_max_path_length() -> usize {
    3
}

fn default_candidate_node_cap() -> usize {
    30
}

fn default_max_hidden_connections() -> usize {
    10
}

fn default_top_central() -> usize {
    10
}

fn default_top_clusters() -> usize {
    5
}

fn default_cluster_sample_size() -> usize {
    5
}

/// Pipeline stage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Run the advisory query classification stage.
    #[serde(default = "default_true")]
    pub classify_intent: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            classify_intent: true,
        }
    }
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE_NAME);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// Optional flags only override when given explicitly.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        // Model settings - always override since they have defaults in CLI
        self.model.name = args.model.clone();
        self.model.ollama_url = args.ollama_url.clone();

        if let Some(temperature) = args.temperature {
            self.model.temperature = temperature;
        }
        if let Some(timeout) = args.timeout {
            self.model.timeout_seconds = timeout;
        }
        if let Some(retries) = args.retries {
            self.retry.attempts = retries;
        }

        if let Some(ref corpus) = args.corpus {
            self.retrieval.corpus = Some(corpus.clone());
        }
        if let Some(max_results) = args.max_results {
            self.retrieval.max_results = max_results;
        }

        if let Some(max_path_length) = args.max_path_length {
            self.graph.max_path_length = max_path_length;
        }

        if args.no_classify {
            self.pipeline.classify_intent = false;
        }

        // Flags always override
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.model.name, "llama3.2:latest");
        assert_eq!(config.retry.attempts, 3);
        assert_eq!(config.graph.max_path_length, 3);
        assert_eq!(config.graph.candidate_node_cap, 30);
        assert_eq!(config.graph.max_hidden_connections, 10);
        assert!(config.pipeline.classify_intent);
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
output = "custom_report.md"
verbose = true

[model]
name = "qwen2.5:14b"
temperature = 0.2

[retry]
attempts = 5
base_delay_ms = 250

[retrieval]
corpus = "papers.json"
max_results = 8

[graph]
max_path_length = 4
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.general.output, "custom_report.md");
        assert!(config.general.verbose);
        assert_eq!(config.model.name, "qwen2.5:14b");
        assert_eq!(config.model.temperature, 0.2);
        assert_eq!(config.retry.attempts, 5);
        assert_eq!(config.retry.factor, 2.0);
        assert_eq!(config.retrieval.corpus, Some(PathBuf::from("papers.json")));
        assert_eq!(config.retrieval.max_results, 8);
        assert_eq!(config.graph.max_path_length, 4);
        assert_eq!(config.graph.top_central, 10);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[pipeline]\nclassify_intent = false").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert!(!config.pipeline.classify_intent);
        assert_eq!(config.model.ollama_url, "http://localhost:11434");
    }

    #[test]
    fn test_load_rejects_malformed_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[graph\nmax_path_length = ").unwrap();
        assert!(Config::load(file.path()).is_err());
    }

    #[test]
    fn test_retry_delays_double() {
        let retry = RetryConfig::default();
        assert_eq!(retry.delay_for(0), Duration::from_millis(1000));
        assert_eq!(retry.delay_for(1), Duration::from_millis(2000));
        assert_eq!(retry.delay_for(2), Duration::from_millis(4000));
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[model]"));
        assert!(toml_str.contains("[retry]"));
        assert!(toml_str.contains("[graph]"));
    }
}
