//! Staged execution of one analysis run.
//!
//! Stages follow a fixed dependency order. Independent stages are spawned
//! as tokio tasks and awaited together; a failing task never cancels its
//! siblings. Every failure is absorbed here and replaced by the stage's
//! fallback payload, so `run` always returns a complete report.

use crate::agent::AnalysisAgent;
use crate::analysis::{confidence, recommended_items, stages, suggested_actions};
use crate::config::{Config, GraphConfig};
use crate::error::{PipelineError, StageError};
use crate::graph::GraphBuilder;
use crate::models::{
    Comparison, Critique, ExtractionOutput, Gaps, Insights, IntentClassification, Mention,
    NoveltyAssessment, Paper, Roadmap, StageResult, TrendForecast,
};
use crate::pipeline::timings::round_secs;
use crate::pipeline::StageTimings;
use crate::report::{
    source_counts, ContextSummary, DirectAnswer, ExplainabilityLog, PipelineReport, StageFallback,
};
use crate::retrieval::PaperSource;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// Reason attached to every section when retrieval finds nothing.
pub const NO_PAPERS_REASON: &str = "No papers found for this query";

/// Named pipeline stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Intent,
    Summarizer,
    Comparison,
    Insight,
    Gap,
    KnowledgeGraph,
    Novelty,
    Trend,
    Critique,
    Roadmap,
    Literature,
}

impl Stage {
    /// Name reported in `agents_activated` and in the fallback list.
    fn name(self) -> &'static str {
        match self {
            Stage::Intent => "intent_router",
            Stage::Summarizer => "summarizer",
            Stage::Comparison => "comparison",
            Stage::Insight => "insight",
            Stage::Gap => "gap",
            Stage::KnowledgeGraph => "knowledge_graph",
            Stage::Novelty => "novelty",
            Stage::Trend => "trend",
            Stage::Critique => "critique",
            Stage::Roadmap => "roadmap",
            Stage::Literature => "literature",
        }
    }

    /// Prefix of the fallback reason.
    fn label(self) -> &'static str {
        match self {
            Stage::Intent => "Intent classification",
            Stage::Summarizer => "Summarizer",
            Stage::Comparison => "Comparison",
            Stage::Insight => "Insight extraction",
            Stage::Gap => "Gap analysis",
            Stage::KnowledgeGraph => "KG build",
            Stage::Novelty => "Novelty scoring",
            Stage::Trend => "Trend analysis",
            Stage::Critique => "Critique",
            Stage::Roadmap => "Roadmap generation",
            Stage::Literature => "Literature review generation",
        }
    }
}

/// Bookkeeping shared by all stages of one run.
#[derive(Default)]
struct RunLog {
    timings: StageTimings,
    activated: Vec<String>,
    fallbacks: Vec<StageFallback>,
}

impl RunLog {
    fn activate(&mut self, stage: Stage) {
        self.activated.push(stage.name().to_string());
    }

    fn time(&mut self, key: &str, elapsed: Duration) {
        info!("{} took {:.2}s", key, elapsed.as_secs_f64());
        self.timings.record(key, elapsed);
    }

    /// Keep a successful payload, or log the failure and substitute the
    /// stage's fallback.
    fn settle<T>(
        &mut self,
        stage: Stage,
        outcome: Result<T, StageError>,
        fallback: impl FnOnce() -> T,
    ) -> StageResult<T> {
        match outcome {
            Ok(payload) => StageResult::success(payload),
            Err(e) => {
                let reason = format!("{} failed: {}", stage.label(), e);
                error!("Stage {} fell back: {}", stage.name(), e);
                self.fallbacks.push(StageFallback {
                    stage: stage.name().to_string(),
                    reason: reason.clone(),
                });
                StageResult::fallback(fallback(), reason)
            }
        }
    }
}

/// Await a spawned stage, turning a panic or cancellation into a stage error.
async fn joined<T>(handle: JoinHandle<Result<T, StageError>>) -> Result<T, StageError> {
    handle
        .await
        .unwrap_or_else(|e| Err(StageError::Join(e.to_string())))
}

/// Runs the analysis pipeline for one query at a time.
pub struct PipelineCoordinator {
    agent: Arc<dyn AnalysisAgent>,
    source: Arc<dyn PaperSource>,
    graph_config: GraphConfig,
    classify_intent: bool,
}

impl PipelineCoordinator {
    pub fn new(agent: Arc<dyn AnalysisAgent>, source: Arc<dyn PaperSource>) -> Self {
        Self {
            agent,
            source,
            graph_config: GraphConfig::default(),
            classify_intent: true,
        }
    }

    pub fn from_config(
        agent: Arc<dyn AnalysisAgent>,
        source: Arc<dyn PaperSource>,
        config: &Config,
    ) -> Self {
        Self::new(agent, source)
            .with_graph_config(config.graph.clone())
            .with_intent_classification(config.pipeline.classify_intent)
    }

    pub fn with_graph_config(mut self, graph_config: GraphConfig) -> Self {
        self.graph_config = graph_config;
        self
    }

    pub fn with_intent_classification(mut self, enabled: bool) -> Self {
        self.classify_intent = enabled;
        self
    }

    /// Analyze a query. An empty query is rejected without running anything.
    pub async fn analyze(&self, query: &str) -> Result<PipelineReport, PipelineError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(PipelineError::PreconditionViolation(
                "query must not be empty".to_string(),
            ));
        }
        Ok(self.run(query).await)
    }

    /// Run every stage for `query`. Never fails; degraded stages carry
    /// their fallback reason.
    pub async fn run(&self, query: &str) -> PipelineReport {
        let started = Instant::now();
        let mut log = RunLog::default();

        info!("Starting analysis for '{}'", query);

        // Stages 0 and 1 share no inputs.
        let (classified, (retrieved, search_elapsed)) =
            futures::join!(self.classify(query), self.search(query));

        let intent = match classified {
            Some((outcome, elapsed)) => {
                log.activate(Stage::Intent);
                log.time("intent_classification", elapsed);
                log.settle(Stage::Intent, outcome, || {
                    IntentClassification::general(query)
                })
            }
            None => StageResult::success(IntentClassification::general(query)),
        };
        log.time("paper_search", search_elapsed);

        let papers = match retrieved {
            Ok(papers) if !papers.is_empty() => papers,
            Ok(_) => {
                info!("No papers found, returning empty report");
                return Self::empty_report(query, NO_PAPERS_REASON, intent, log, started);
            }
            Err(e) => {
                error!("Paper search failed: {:#}", e);
                let reason = format!("Paper search failed: {:#}", e);
                return Self::empty_report(query, &reason, intent, log, started);
            }
        };
        info!("Found {} papers", papers.len());

        // Stage 2
        let stage_start = Instant::now();
        log.activate(Stage::Summarizer);
        let outcome = stages::summarize(self.agent.as_ref(), &papers).await;
        let summaries = log.settle(Stage::Summarizer, outcome, ExtractionOutput::default);
        log.time("summarizer", stage_start.elapsed());
        let shared_summaries = Arc::new(summaries.payload().clone());

        // Stage 3
        let stage_start = Instant::now();
        log.activate(Stage::Comparison);
        log.activate(Stage::Insight);
        let comparison_task = {
            let agent = Arc::clone(&self.agent);
            let summaries = Arc::clone(&shared_summaries);
            tokio::spawn(async move { stages::compare(agent.as_ref(), &summaries).await })
        };
        let insight_task = {
            let agent = Arc::clone(&self.agent);
            let summaries = Arc::clone(&shared_summaries);
            tokio::spawn(async move { stages::synthesize(agent.as_ref(), &summaries).await })
        };
        let (comparison, insights) =
            futures::join!(joined(comparison_task), joined(insight_task));
        let comparison = log.settle(Stage::Comparison, comparison, Comparison::default);
        let insights = log.settle(Stage::Insight, insights, Insights::default);
        log.time("comparison_and_insight", stage_start.elapsed());

        // Stage 4
        let stage_start = Instant::now();
        log.activate(Stage::Gap);
        let outcome = stages::detect_gaps(
            self.agent.as_ref(),
            &shared_summaries,
            comparison.payload(),
            insights.payload(),
        )
        .await;
        let gaps = log.settle(Stage::Gap, outcome, Gaps::default);
        log.time("gap_analysis", stage_start.elapsed());

        // Stage 5
        let stage_start = Instant::now();
        for stage in [
            Stage::KnowledgeGraph,
            Stage::Novelty,
            Stage::Trend,
            Stage::Critique,
            Stage::Roadmap,
        ] {
            log.activate(stage);
        }
        let shared_query: Arc<str> = Arc::from(query);
        let shared_comparison = Arc::new(comparison.payload().clone());
        let shared_insights = Arc::new(insights.payload().clone());
        let shared_gaps = Arc::new(gaps.payload().clone());

        let graph_task = {
            let builder = GraphBuilder::new(Arc::clone(&self.agent), self.graph_config.clone());
            let summaries = Arc::clone(&shared_summaries);
            let insights = Arc::clone(&shared_insights);
            tokio::spawn(async move {
                Ok::<_, StageError>(builder.build(&summaries, &insights).await)
            })
        };
        let novelty_task = {
            let agent = Arc::clone(&self.agent);
            let query = Arc::clone(&shared_query);
            let summaries = Arc::clone(&shared_summaries);
            let insights = Arc::clone(&shared_insights);
            tokio::spawn(async move {
                stages::score_novelty(agent.as_ref(), &query, &summaries, &insights).await
            })
        };
        let trend_task = {
            let agent = Arc::clone(&self.agent);
            let query = Arc::clone(&shared_query);
            let summaries = Arc::clone(&shared_summaries);
            let insights = Arc::clone(&shared_insights);
            tokio::spawn(async move {
                stages::forecast_trends(agent.as_ref(), &query, &summaries, &insights).await
            })
        };
        let critique_task = {
            let agent = Arc::clone(&self.agent);
            let summaries = Arc::clone(&shared_summaries);
            let comparison = Arc::clone(&shared_comparison);
            tokio::spawn(async move {
                stages::critique(agent.as_ref(), &summaries, &comparison).await
            })
        };
        let roadmap_task = {
            let agent = Arc::clone(&self.agent);
            let query = Arc::clone(&shared_query);
            let summaries = Arc::clone(&shared_summaries);
            let gaps = Arc::clone(&shared_gaps);
            tokio::spawn(async move {
                stages::plan_roadmap(agent.as_ref(), &query, &summaries, &gaps).await
            })
        };

        let (graph, novelty, trends, critique, roadmap) = futures::join!(
            joined(graph_task),
            joined(novelty_task),
            joined(trend_task),
            joined(critique_task),
            joined(roadmap_task),
        );
        let graph = log.settle(Stage::KnowledgeGraph, graph, Default::default);
        let novelty = log.settle(Stage::Novelty, novelty, || NoveltyAssessment {
            explanation: Mention::from("Novelty scoring failed"),
            ..Default::default()
        });
        let trends = log.settle(Stage::Trend, trends, TrendForecast::default);
        let critique = log.settle(Stage::Critique, critique, Critique::default);
        let roadmap = log.settle(Stage::Roadmap, roadmap, Roadmap::default);
        log.time("parallel_agents", stage_start.elapsed());

        // Stage 6
        let stage_start = Instant::now();
        log.activate(Stage::Literature);
        let outcome = stages::review_literature(
            self.agent.as_ref(),
            &shared_summaries,
            comparison.payload(),
            insights.payload(),
            gaps.payload(),
        )
        .await;
        // A failed review carries its reason as the narrative text.
        let literature = match log.settle(Stage::Literature, outcome, String::new) {
            StageResult::Fallback(_, reason) => StageResult::fallback(reason.clone(), reason),
            review => review,
        };
        log.time("literature_review", stage_start.elapsed());

        // Stage 7
        let confidence = confidence::score(papers.len(), &summaries, &comparison, &insights);
        let recommended = recommended_items(&insights, &roadmap);
        let experiments = suggested_actions(&gaps);
        let total_secs = round_secs(started.elapsed());

        let novelty_text = match novelty.success_payload() {
            Some(assessment) => format!("{:.0}", assessment.overall_score),
            None => "N/A".to_string(),
        };
        let reasoning_summary = format!(
            "Searched for '{}', found {} papers. Summarized all papers, then ran comparison and \
             insight analysis in parallel. Detected research gaps, built knowledge graph with {} \
             nodes, scored novelty at {}/100, forecasted trends, critiqued methodologies, and \
             generated a 30-day roadmap. Final confidence: {}/100. Total pipeline time: {}s.",
            query,
            papers.len(),
            graph.payload().node_count,
            novelty_text,
            confidence.score,
            total_secs
        );

        info!(
            "Analysis complete in {}s: confidence {}/100, {} fallbacks",
            total_secs,
            confidence.score,
            log.fallbacks.len()
        );
        debug!("Stage timings: {:?}", log.timings);

        PipelineReport {
            direct_answer: DirectAnswer {
                query: query.to_string(),
                papers_found: papers.len(),
                sources: source_counts(&papers),
                error: None,
                intent: intent.clone(),
            },
            context_summary: ContextSummary::from_papers(&papers),
            knowledge_graph: graph,
            comparison,
            gap_analysis: gaps,
            deep_insights: insights,
            novelty_score: novelty,
            trend_forecast: trends,
            recommended_methods_datasets: recommended,
            experiment_suggestions: experiments,
            researcher_roadmap: roadmap,
            argument_strength: critique.map(|c| c.argument_strength.clone()),
            scientific_critique: critique.map(|c| c.scientific_critique.clone()),
            literature_review: literature,
            confidence_score: confidence,
            explainability_log: ExplainabilityLog {
                total_agents: log.activated.len(),
                agents_activated: log.activated,
                timing_breakdown: log.timings,
                total_pipeline_time_seconds: total_secs,
                routing_strategy: intent.payload().routing_strategy.clone(),
                reasoning_summary,
                fallbacks: log.fallbacks,
                error: None,
            },
            summaries,
        }
    }

    /// Stage 0, skipped when disabled.
    async fn classify(
        &self,
        query: &str,
    ) -> Option<(Result<IntentClassification, StageError>, Duration)> {
        if !self.classify_intent {
            debug!("Intent classification disabled");
            return None;
        }
        let started = Instant::now();
        let outcome = stages::classify(self.agent.as_ref(), query).await;
        Some((outcome, started.elapsed()))
    }

    /// Stage 1.
    async fn search(&self, query: &str) -> (anyhow::Result<Vec<Paper>>, Duration) {
        let started = Instant::now();
        let outcome = self.source.search(query).await;
        (outcome, started.elapsed())
    }

    fn empty_report(
        query: &str,
        reason: &str,
        intent: StageResult<IntentClassification>,
        log: RunLog,
        started: Instant,
    ) -> PipelineReport {
        PipelineReport::empty(
            query,
            reason,
            intent,
            log.activated,
            log.timings,
            round_secs(started.elapsed()),
        )
    }
}
