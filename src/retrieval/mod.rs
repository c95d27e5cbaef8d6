//! Paper retrieval.
//!
//! The pipeline only depends on the `PaperSource` trait. The bundled
//! implementation searches a local JSON corpus.

use crate::models::Paper;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Query terms shorter than this are ignored.
const MIN_TERM_LEN: usize = 3;

/// Anything that can turn a query into an ordered list of papers.
///
/// An empty list is a valid answer, not an error.
#[async_trait]
pub trait PaperSource: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<Paper>>;
}

/// A JSON file holding an array of papers.
#[derive(Debug, Clone)]
pub struct CorpusFile {
    path: PathBuf,
    papers: Vec<Paper>,
    max_results: usize,
}

impl CorpusFile {
    /// Load the corpus into memory.
    pub fn load(path: &Path, max_results: usize) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read corpus file: {}", path.display()))?;

        let papers: Vec<Paper> = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse corpus file: {}", path.display()))?;

        info!("Loaded {} papers from {}", papers.len(), path.display());

        Ok(Self {
            path: path.to_path_buf(),
            papers,
            max_results,
        })
    }

    pub fn len(&self) -> usize {
        self.papers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.papers.is_empty()
    }

    /// Papers matching any query term, in corpus order.
    pub fn matching(&self, query: &str) -> Vec<Paper> {
        let terms = query_terms(query);
        if terms.is_empty() {
            return Vec::new();
        }

        self.papers
            .iter()
            .filter(|paper| {
                let haystack =
                    format!("{} {}", paper.title, paper.abstract_text).to_lowercase();
                terms.iter().any(|term| haystack.contains(term.as_str()))
            })
            .take(self.max_results)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl PaperSource for CorpusFile {
    async fn search(&self, query: &str) -> Result<Vec<Paper>> {
        let papers = self.matching(query);
        debug!(
            "Corpus {} matched {} papers for '{}'",
            self.path.display(),
            papers.len(),
            query
        );
        Ok(papers)
    }
}

fn query_terms(query: &str) -> Vec<String> {
    query
        .split(|c: char| !c.is_alphanumeric())
        .filter(|term| term.chars().count() >= MIN_TERM_LEN)
        .map(str::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn corpus_file() -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[
  {{"title": "Graph Neural Networks for Molecules", "abstract": "We apply GNNs to chemistry.", "authors": ["A. Chen"], "source": "arxiv", "url": "https://arxiv.org/abs/1"}},
  {{"title": "Protein Folding", "abstract": "A graph approach to structure prediction.", "authors": ["B. Diaz"], "source": "pubmed", "url": "https://pubmed.example/2"}},
  {{"title": "Speech Recognition", "abstract": "End-to-end acoustic models.", "authors": [], "source": "arxiv", "url": "https://arxiv.org/abs/3"}}
]"#
        )
        .unwrap();
        file
    }

    #[test]
    fn test_query_terms_drop_short_words() {
        assert_eq!(query_terms("AI in graph models"), vec!["graph", "models"]);
    }

    #[test]
    fn test_matching_keeps_corpus_order() {
        let file = corpus_file();
        let corpus = CorpusFile::load(file.path(), 10).unwrap();
        assert_eq!(corpus.len(), 3);

        let papers = corpus.matching("Graph methods");
        let titles: Vec<&str> = papers.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["Graph Neural Networks for Molecules", "Protein Folding"]);
        assert_eq!(papers[1].source, "pubmed");
    }

    #[test]
    fn test_matching_respects_max_results() {
        let file = corpus_file();
        let corpus = CorpusFile::load(file.path(), 1).unwrap();
        assert_eq!(corpus.matching("graph").len(), 1);
    }

    #[tokio::test]
    async fn test_search_without_matches_is_empty() {
        let file = corpus_file();
        let corpus = CorpusFile::load(file.path(), 10).unwrap();
        assert!(corpus.search("quantum cryptography").await.unwrap().is_empty());
        assert!(corpus.search("a b").await.unwrap().is_empty());
    }

    #[test]
    fn test_load_rejects_invalid_corpus() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{{\"not\": \"a list\"}}").unwrap();
        assert!(CorpusFile::load(file.path(), 10).is_err());
    }
}
