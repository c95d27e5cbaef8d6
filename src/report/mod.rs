//! The pipeline report and its rendering.
//!
//! `PipelineReport` serializes to the 16-section wire shape consumed
//! downstream; the generator renders the same data as Markdown.

pub mod generator;

use crate::analysis::RecommendedItems;
use crate::graph::GraphAnalytics;
use crate::models::{
    ArgumentAssessment, Comparison, ConfidenceBreakdown, ExtractionOutput, Gaps, Insights,
    IntentClassification, NoveltyAssessment, Paper, Roadmap, ScientificCritique, StageResult,
    TrendForecast,
};
use crate::pipeline::StageTimings;
use serde::Serialize;
use std::collections::BTreeMap;

/// Abstracts longer than this are truncated in the context summary.
const ABSTRACT_PREVIEW_CHARS: usize = 200;

/// Top-level keys of the wire report, in order.
#[cfg(test)]
pub const SECTION_KEYS: [&str; 16] = [
    "direct_answer",
    "context_summary",
    "knowledge_graph",
    "comparison",
    "gap_analysis",
    "deep_insights",
    "novelty_score",
    "trend_forecast",
    "recommended_methods_datasets",
    "experiment_suggestions",
    "researcher_roadmap",
    "argument_strength",
    "scientific_critique",
    "literature_review",
    "confidence_score",
    "explainability_log",
];

#[derive(Debug, Clone, Serialize)]
pub struct DirectAnswer {
    pub query: String,
    pub intent: StageResult<IntentClassification>,
    pub papers_found: usize,
    /// Paper count per source tag.
    pub sources: BTreeMap<String, usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaperContext {
    pub title: String,
    pub authors: Vec<String>,
    pub url: String,
    pub source: String,
    #[serde(rename = "abstract")]
    pub abstract_preview: String,
}

impl From<&Paper> for PaperContext {
    fn from(paper: &Paper) -> Self {
        let abstract_preview = if paper.abstract_text.chars().count() > ABSTRACT_PREVIEW_CHARS {
            let head: String = paper.abstract_text.chars().take(ABSTRACT_PREVIEW_CHARS).collect();
            format!("{}...", head)
        } else {
            paper.abstract_text.clone()
        };

        Self {
            title: paper.title.clone(),
            authors: paper.authors.clone(),
            url: paper.url.clone(),
            source: paper.source.clone(),
            abstract_preview,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ContextSummary {
    pub papers: Vec<PaperContext>,
    pub total_papers: usize,
}

impl ContextSummary {
    pub fn from_papers(papers: &[Paper]) -> Self {
        Self {
            papers: papers.iter().map(PaperContext::from).collect(),
            total_papers: papers.len(),
        }
    }
}

/// A stage whose output was replaced by its fallback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageFallback {
    pub stage: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ExplainabilityLog {
    pub agents_activated: Vec<String>,
    pub total_agents: usize,
    pub timing_breakdown: StageTimings,
    pub total_pipeline_time_seconds: f64,
    pub routing_strategy: String,
    pub reasoning_summary: String,
    pub fallbacks: Vec<StageFallback>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Complete analysis result for one query.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub direct_answer: DirectAnswer,
    pub context_summary: ContextSummary,
    pub knowledge_graph: StageResult<GraphAnalytics>,
    pub comparison: StageResult<Comparison>,
    pub gap_analysis: StageResult<Gaps>,
    pub deep_insights: StageResult<Insights>,
    pub novelty_score: StageResult<NoveltyAssessment>,
    pub trend_forecast: StageResult<TrendForecast>,
    pub recommended_methods_datasets: RecommendedItems,
    pub experiment_suggestions: Vec<String>,
    pub researcher_roadmap: StageResult<Roadmap>,
    pub argument_strength: StageResult<Vec<ArgumentAssessment>>,
    pub scientific_critique: StageResult<ScientificCritique>,
    pub literature_review: StageResult<String>,
    pub confidence_score: ConfidenceBreakdown,
    pub explainability_log: ExplainabilityLog,

    /// Per-paper summaries; feed later stages but are not a report section.
    #[serde(skip)]
    pub summaries: StageResult<ExtractionOutput>,
}

/// Paper count per source tag; papers without a tag count as "unknown".
pub fn source_counts(papers: &[Paper]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for paper in papers {
        let source = if paper.source.is_empty() {
            "unknown".to_string()
        } else {
            paper.source.to_lowercase()
        };
        *counts.entry(source).or_insert(0) += 1;
    }
    counts
}

impl PipelineReport {
    /// Terminal report for a run that found nothing to analyze. Every
    /// section is present, empty, and carries `reason`.
    pub fn empty(
        query: &str,
        reason: &str,
        intent: StageResult<IntentClassification>,
        agents_activated: Vec<String>,
        timing_breakdown: StageTimings,
        total_pipeline_time_seconds: f64,
    ) -> Self {
        let routing_strategy = intent.payload().routing_strategy.clone();

        Self {
            direct_answer: DirectAnswer {
                query: query.to_string(),
                intent,
                papers_found: 0,
                sources: BTreeMap::new(),
                error: Some(reason.to_string()),
            },
            context_summary: ContextSummary::default(),
            knowledge_graph: StageResult::degraded(reason),
            comparison: StageResult::degraded(reason),
            gap_analysis: StageResult::degraded(reason),
            deep_insights: StageResult::degraded(reason),
            novelty_score: StageResult::degraded(reason),
            trend_forecast: StageResult::degraded(reason),
            recommended_methods_datasets: RecommendedItems::default(),
            experiment_suggestions: Vec::new(),
            researcher_roadmap: StageResult::degraded(reason),
            argument_strength: StageResult::degraded(reason),
            scientific_critique: StageResult::degraded(reason),
            literature_review: StageResult::degraded(reason),
            confidence_score: ConfidenceBreakdown {
                score: 0,
                max_score: crate::analysis::confidence::MAX_SCORE,
                reasons: vec![reason.to_string()],
            },
            explainability_log: ExplainabilityLog {
                total_agents: agents_activated.len(),
                agents_activated,
                timing_breakdown,
                total_pipeline_time_seconds,
                routing_strategy,
                reasoning_summary: format!("Analysis stopped early: {}.", reason),
                fallbacks: Vec::new(),
                error: Some(reason.to_string()),
            },
            summaries: StageResult::degraded(reason),
        }
    }

    /// True when the run ended before any analysis stage.
    pub fn is_empty_result(&self) -> bool {
        self.explainability_log.error.is_some()
    }

    pub fn fallbacks(&self) -> &[StageFallback] {
        &self.explainability_log.fallbacks
    }
}
