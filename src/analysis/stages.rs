//! One agent call per analysis stage.
//!
//! Each function builds the prompt for its stage, invokes the agent and
//! validates the reply against the stage's payload type. Failures are
//! returned to the coordinator, which substitutes the fallback.

use crate::agent::{invoke_typed, AgentRequest, AgentTask, AnalysisAgent};
use crate::error::StageError;
use crate::models::{
    Comparison, Critique, ExtractionOutput, Gaps, Insights, IntentClassification,
    NoveltyAssessment, Paper, Roadmap, TrendForecast,
};
use serde::{Deserialize, Serialize};

const AGENT_PREAMBLE: &str = "You are a specialized agent within a multi-agent scientific \
reasoning system. You MUST:\n\
  - Use ONLY the provided data as ground truth evidence.\n\
  - Never fabricate citations, studies, or external information.\n\
  - Return strictly valid JSON.\n\
  - Keep outputs concise and actionable.\n";

fn role(description: &str) -> String {
    format!("{}\nYour role: {}", AGENT_PREAMBLE, description)
}

fn pretty<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_default()
}

fn require_summaries(summaries: &ExtractionOutput) -> Result<(), StageError> {
    if summaries.is_empty() {
        return Err(StageError::Precondition("summaries cannot be empty".to_string()));
    }
    Ok(())
}

/// Stage 0: classify the query. Advisory only.
pub async fn classify(
    agent: &dyn AnalysisAgent,
    query: &str,
) -> Result<IntentClassification, StageError> {
    let prompt = format!(
        r#"Classify this research query:

"{query}"

Return JSON:
{{
    "query_type": "exploration|comparison|gap_analysis|trend_analysis|critique|roadmap|general",
    "intent": "<one-line description of what the user wants>",
    "primary_focus": "<main topic>"
}}

JSON only."#
    );
    let request = AgentRequest::new(
        AgentTask::Classify,
        role("INTENT ROUTER. Classify research queries into types."),
        prompt,
    )
    .max_tokens(500);

    let mut intent: IntentClassification = invoke_typed(agent, request).await?;
    if intent.routing_strategy.is_empty() {
        intent.routing_strategy = "full_pipeline".to_string();
    }
    Ok(intent)
}

/// Stage 2: structured summary of every paper.
pub async fn summarize(
    agent: &dyn AnalysisAgent,
    papers: &[Paper],
) -> Result<ExtractionOutput, StageError> {
    if papers.is_empty() {
        return Err(StageError::Precondition("papers list cannot be empty".to_string()));
    }

    let paper_text: String = papers
        .iter()
        .map(|p| format!("Title: {}\nAbstract: {}\n\n", p.title, p.abstract_text))
        .collect();

    let prompt = format!(
        r#"Using only the provided papers, extract structured summaries for each paper:

- title
- research_problem
- methodology
- dataset
- evaluation_metrics
- key_results
- limitations

Return a strictly valid JSON list with one object per paper.

Papers:
{paper_text}"#
    );
    let request = AgentRequest::new(
        AgentTask::Summarize,
        role("SUMMARIZER AGENT. Extract structured summaries from research papers."),
        prompt,
    )
    .max_tokens(2000);

    Ok(invoke_typed(agent, request).await?)
}

/// Stage 3a: cross-paper comparison.
pub async fn compare(
    agent: &dyn AnalysisAgent,
    summaries: &ExtractionOutput,
) -> Result<Comparison, StageError> {
    require_summaries(summaries)?;

    let prompt = format!(
        r#"Using these structured summaries:

{}

Perform comparative analysis across papers.

Return strictly valid JSON:
{{
    "methodology_similarities": [],
    "methodology_differences": [],
    "strengths": [],
    "weaknesses": [],
    "performance_tradeoffs": []
}}"#,
        pretty(summaries)
    );
    let request = AgentRequest::new(
        AgentTask::Compare,
        role(
            "COMPARISON AGENT. Identify methodology similarities, differences, strengths, \
             weaknesses and performance tradeoffs across the provided summaries.",
        ),
        prompt,
    )
    .max_tokens(1500);

    Ok(invoke_typed(agent, request).await?)
}

/// Stage 3b: cross-paper themes and patterns.
pub async fn synthesize(
    agent: &dyn AnalysisAgent,
    summaries: &ExtractionOutput,
) -> Result<Insights, StageError> {
    require_summaries(summaries)?;

    let prompt = format!(
        r#"Using the following structured summaries:

{}

Extract:

1. Unique methods used across papers
2. Common datasets used
3. Frequently used evaluation metrics
4. Recurring limitations
5. Emerging research themes

Return strictly valid JSON in this format:
{{
    "unique_methods": [],
    "common_datasets": [],
    "evaluation_metrics": [],
    "recurring_limitations": [],
    "emerging_themes": []
}}

JSON only."#,
        pretty(summaries)
    );
    let request = AgentRequest::new(
        AgentTask::Synthesize,
        role("INSIGHT AGENT. Extract cross-paper themes and patterns."),
        prompt,
    )
    .max_tokens(1500);

    Ok(invoke_typed(agent, request).await?)
}

/// Stage 4: research gaps and opportunities.
pub async fn detect_gaps(
    agent: &dyn AnalysisAgent,
    summaries: &ExtractionOutput,
    comparison: &Comparison,
    insights: &Insights,
) -> Result<Gaps, StageError> {
    let prompt = format!(
        r#"Using the following structured research data:

=== SUMMARIES ===
{}

=== COMPARISON ===
{}

=== INSIGHTS ===
{}

Perform research gap analysis.

Return strictly valid JSON in this format:
{{
    "repeated_limitations": [],
    "underexplored_combinations": [],
    "missing_benchmarks": [],
    "conflicting_findings": [],
    "novel_research_directions": []
}}

JSON only."#,
        pretty(summaries),
        pretty(comparison),
        pretty(insights)
    );
    let request = AgentRequest::new(
        AgentTask::DetectGaps,
        role(
            "GAP DETECTION AGENT. Detect repeated limitations, underexplored method and \
             dataset combinations, missing benchmarks, conflicting findings and novel \
             research directions.",
        ),
        prompt,
    )
    .max_tokens(2000);

    Ok(invoke_typed(agent, request).await?)
}

/// Stage 5: novelty of the query against existing work.
pub async fn score_novelty(
    agent: &dyn AnalysisAgent,
    query: &str,
    summaries: &ExtractionOutput,
    insights: &Insights,
) -> Result<NoveltyAssessment, StageError> {
    let prompt = format!(
        r#"Evaluate the novelty of this research query against existing work:

QUERY: {query}

=== EXISTING PAPER SUMMARIES ===
{}

=== CROSS-PAPER INSIGHTS ===
{}

Score the research on these dimensions (0-100 each):

1. uniqueness_score: How different from existing approaches?
2. scientific_novelty_score: Does it advance theory?
3. practical_novelty_score: New real-world applications?
4. redundancy_risk_score: Overlap with existing work? (100 = no redundancy, 0 = fully redundant)
5. opportunity_score: Room for extension and new work?

Return strictly valid JSON:
{{
    "overall_score": <weighted average 0-100>,
    "uniqueness_score": <0-100>,
    "scientific_novelty_score": <0-100>,
    "practical_novelty_score": <0-100>,
    "redundancy_risk_score": <0-100>,
    "opportunity_score": <0-100>,
    "explanation": "<2-3 sentence justification>",
    "opportunity_areas": ["<area 1>", "<area 2>", "<area 3>"]
}}"#,
        pretty(summaries),
        pretty(insights)
    );
    let request = AgentRequest::new(
        AgentTask::ScoreNovelty,
        role("NOVELTY SCORING AGENT. Evaluate how novel a research direction is. Be honest and precise."),
        prompt,
    )
    .max_tokens(1500);

    Ok(invoke_typed(agent, request).await?)
}

/// Stage 5: one- and three-year trend forecast.
pub async fn forecast_trends(
    agent: &dyn AnalysisAgent,
    query: &str,
    summaries: &ExtractionOutput,
    insights: &Insights,
) -> Result<TrendForecast, StageError> {
    let prompt = format!(
        r#"Analyze research trends for this topic and predict future directions:

TOPIC: {query}

=== CURRENT PAPER SUMMARIES ===
{}

=== CROSS-PAPER INSIGHTS ===
{}

Provide trend analysis in strictly valid JSON:
{{
    "current_research_direction": "<where the field is now>",
    "method_adoption_trends": [
        {{"method": "<name>", "trend": "rising|stable|declining", "reason": "<why>"}}
    ],
    "emerging_tools_and_frameworks": [
        {{"name": "<tool/framework>", "impact": "<expected impact>"}}
    ],
    "citation_pattern_insights": "<what citation patterns reveal>",
    "one_year_predictions": ["<prediction>"],
    "three_year_predictions": ["<prediction>"],
    "rising_topics": ["<topic>"],
    "declining_topics": ["<topic>"],
    "cross_domain_opportunities": ["<opportunity>"]
}}"#,
        pretty(summaries),
        pretty(insights)
    );
    let request = AgentRequest::new(
        AgentTask::ForecastTrends,
        role(
            "TREND FORECASTING AGENT. Predict 1-year and 3-year research directions from \
             observable patterns in the data, not speculation.",
        ),
        prompt,
    )
    .max_tokens(2000);

    Ok(invoke_typed(agent, request).await?)
}

/// Stage 5: methodology critique and argument strength.
pub async fn critique(
    agent: &dyn AnalysisAgent,
    summaries: &ExtractionOutput,
    comparison: &Comparison,
) -> Result<Critique, StageError> {
    let prompt = format!(
        r#"Critique these research papers and evaluate argument strength:

=== PAPER SUMMARIES ===
{}

=== COMPARATIVE ANALYSIS ===
{}

Provide two analyses in strictly valid JSON:
{{
    "scientific_critique": {{
        "strong_points": [{{"aspect": "<what>", "detail": "<why it's strong>"}}],
        "weak_points": [{{"aspect": "<what>", "detail": "<why it's weak>", "severity": "minor|moderate|major"}}],
        "experimental_design_assessment": "<brief assessment>",
        "reproducibility_assessment": "<brief assessment>",
        "statistical_validity": "<brief assessment>",
        "dataset_quality": "<brief assessment>"
    }},
    "argument_strength": [
        {{
            "claim": "<extracted claim>",
            "evidence_strength": "strong|moderate|weak",
            "reliability": "high|medium|low",
            "missing_evidence": "<what would strengthen it>",
            "bias_indicators": "<any bias detected or 'none'>"
        }}
    ]
}}

Extract at least 5 claims for argument analysis."#,
        pretty(summaries),
        pretty(comparison)
    );
    let request = AgentRequest::new(
        AgentTask::Critique,
        role(
            "SCIENTIFIC CRITIQUE AGENT. Critique methodologies with the rigor of a \
             conference reviewer and check whether claims are supported by evidence.",
        ),
        prompt,
    )
    .max_tokens(2500);

    Ok(invoke_typed(agent, request).await?)
}

/// Stage 5: 30-day researcher roadmap.
pub async fn plan_roadmap(
    agent: &dyn AnalysisAgent,
    query: &str,
    summaries: &ExtractionOutput,
    gaps: &Gaps,
) -> Result<Roadmap, StageError> {
    let prompt = format!(
        r#"Create a 30-day researcher roadmap for this topic:

TOPIC: {query}

=== EXISTING PAPER SUMMARIES ===
{}

=== IDENTIFIED RESEARCH GAPS ===
{}

Return strictly valid JSON:
{{
    "roadmap": {{
        "week_1": {{"theme": "Foundations & Literature Review", "tasks": ["<task>"], "resources": ["<resource>"]}},
        "week_2": {{"theme": "Technical Deep Dive", "tasks": ["<task>"], "resources": ["<resource>"]}},
        "week_3": {{"theme": "Experimental Work", "tasks": ["<task>"], "resources": ["<resource>"]}},
        "week_4": {{"theme": "Synthesis & Write-up", "tasks": ["<task>"], "resources": ["<resource>"]}}
    }},
    "project_ideas": [
        {{"title": "<project>", "difficulty": "beginner|intermediate|advanced", "description": "<brief>"}}
    ],
    "recommended_datasets": [
        {{"name": "<dataset>", "description": "<what it contains>", "url": "<if known>"}}
    ],
    "baseline_models": [
        {{"name": "<model>", "description": "<what it does>", "implementation": "<where to find>"}}
    ],
    "key_papers_to_read": ["<paper title>"]
}}

Provide at least 5 project ideas, 5 datasets, and 3 baseline models."#,
        pretty(summaries),
        pretty(gaps)
    );
    let request = AgentRequest::new(
        AgentTask::PlanRoadmap,
        role("RESEARCHER ROADMAP AGENT. Create practical 30-day learning roadmaps."),
        prompt,
    )
    .max_tokens(3000);

    Ok(invoke_typed(agent, request).await?)
}

#[derive(Debug, Serialize, Deserialize)]
struct LiteratureReview {
    literature_review: String,
}

/// Stage 6: narrative literature review in Markdown.
pub async fn review_literature(
    agent: &dyn AnalysisAgent,
    summaries: &ExtractionOutput,
    comparison: &Comparison,
    insights: &Insights,
    gaps: &Gaps,
) -> Result<String, StageError> {
    require_summaries(summaries)?;

    let prompt = format!(
        r#"Using the following structured research data:

=== SUMMARIES ===
{}

=== COMPARISON ===
{}

=== INSIGHTS ===
{}

=== GAPS ===
{}

Generate a structured literature review with the following sections:

1. Background
2. Taxonomy of Approaches
3. Comparative Discussion
4. Key Limitations
5. Identified Research Gaps
6. Future Work Directions

Return JSON of the form {{"literature_review": "<markdown text>"}}.
Do not include citations."#,
        pretty(summaries),
        pretty(comparison),
        pretty(insights),
        pretty(gaps)
    );
    let request = AgentRequest::new(
        AgentTask::ReviewLiterature,
        role(
            "LITERATURE REVIEW AGENT. Generate a structured academic literature review in \
             an academic tone, using only the given structured data.",
        ),
        prompt,
    )
    .max_tokens(4000);

    let review: LiteratureReview = invoke_typed(agent, request).await?;
    Ok(review.literature_review)
}
