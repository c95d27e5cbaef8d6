//! Markdown and JSON report generation.
//!
//! JSON output is the wire shape of `PipelineReport` and nothing else.
//! Markdown output renders the same sections for reading, preceded by
//! run metadata.

use crate::graph::GraphAnalytics;
use crate::models::{
    Comparison, ConfidenceBreakdown, CritiquePoint, ExtractionOutput, Gaps, Insights, Mention,
    NoveltyAssessment, Roadmap, StageResult, TrendForecast,
};
use crate::report::{ContextSummary, DirectAnswer, ExplainabilityLog, PipelineReport};
use anyhow::Result;
use chrono::{DateTime, Utc};

/// Facts about the run that are not part of the wire report.
#[derive(Debug, Clone)]
pub struct ReportMetadata {
    pub model_used: String,
    pub generated_at: DateTime<Utc>,
}

impl ReportMetadata {
    pub fn now(model_used: impl Into<String>) -> Self {
        Self {
            model_used: model_used.into(),
            generated_at: Utc::now(),
        }
    }
}

/// Section titles in report order; anchors are derived from them.
const SECTIONS: [&str; 16] = [
    "Direct Answer",
    "Papers Analyzed",
    "Knowledge Graph",
    "Comparison",
    "Research Gaps",
    "Deep Insights",
    "Novelty Score",
    "Trend Forecast",
    "Recommended Methods and Datasets",
    "Experiment Suggestions",
    "Researcher Roadmap",
    "Argument Strength",
    "Scientific Critique",
    "Literature Review",
    "Confidence Score",
    "Explainability Log",
];

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &PipelineReport, metadata: &ReportMetadata) -> String {
    let mut output = String::new();

    output.push_str("# ResearchHub Report\n\n");
    output.push_str(&generate_metadata_section(report, metadata));
    output.push_str(&generate_table_of_contents());

    output.push_str(&generate_direct_answer(&report.direct_answer));
    output.push_str(&generate_context_section(&report.context_summary, &report.summaries));
    output.push_str(&generate_graph_section(&report.knowledge_graph));
    output.push_str(&generate_comparison_section(&report.comparison));
    output.push_str(&generate_gaps_section(&report.gap_analysis));
    output.push_str(&generate_insights_section(&report.deep_insights));
    output.push_str(&generate_novelty_section(&report.novelty_score));
    output.push_str(&generate_trend_section(&report.trend_forecast));

    let recommended = &report.recommended_methods_datasets;
    let mut section = heading(SECTIONS[8]);
    section.push_str(&string_list("Methods", &recommended.recommended_methods));
    section.push_str(&string_list("Datasets", &recommended.recommended_datasets));
    section.push_str(&string_list("Evaluation Metrics", &recommended.evaluation_metrics));
    output.push_str(&section);

    let mut section = heading(SECTIONS[9]);
    for suggestion in &report.experiment_suggestions {
        section.push_str(&format!("- {}\n", suggestion));
    }
    section.push('\n');
    output.push_str(&section);

    output.push_str(&generate_roadmap_section(&report.researcher_roadmap));
    output.push_str(&generate_argument_section(report));
    output.push_str(&generate_critique_section(report));

    let mut section = heading(SECTIONS[13]);
    section.push_str(&degraded_note(&report.literature_review));
    if let Some(review) = report.literature_review.success_payload() {
        section.push_str(review.trim());
        section.push_str("\n\n");
    }
    output.push_str(&section);

    output.push_str(&generate_confidence_section(&report.confidence_score));
    output.push_str(&generate_explainability_section(&report.explainability_log));
    output.push_str(&generate_footer());

    output
}

/// Generate the JSON wire report.
pub fn generate_json_report(report: &PipelineReport) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

fn anchor(title: &str) -> String {
    title.to_lowercase().replace(' ', "-")
}

fn heading(title: &str) -> String {
    format!("## {}\n\n", title)
}

/// Warning line for a section whose stage fell back; empty otherwise.
fn degraded_note<T>(result: &StageResult<T>) -> String {
    match result.reason() {
        Some(reason) => format!("> ⚠️ **Degraded:** {}\n\n", reason),
        None => String::new(),
    }
}

/// Bulleted sub-list, omitted when there is nothing to list.
fn mention_list(title: &str, items: &[Mention]) -> String {
    let items: Vec<&Mention> = items.iter().filter(|m| !m.is_empty()).collect();
    if items.is_empty() {
        return String::new();
    }

    let mut list = format!("### {}\n\n", title);
    for item in items {
        list.push_str(&format!("- {}\n", item));
    }
    list.push('\n');
    list
}

fn string_list(title: &str, items: &[String]) -> String {
    let mentions: Vec<Mention> = items.iter().map(|s| Mention(s.clone())).collect();
    mention_list(title, &mentions)
}

fn labelled(label: &str, value: &Mention) -> String {
    if value.is_empty() {
        String::new()
    } else {
        format!("**{}:** {}\n\n", label, value)
    }
}

fn generate_metadata_section(report: &PipelineReport, metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Query:** {}\n", report.direct_answer.query));
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **Model Used:** `{}`\n", metadata.model_used));
    section.push_str(&format!(
        "- **Papers Analyzed:** {}\n",
        report.direct_answer.papers_found
    ));
    section.push_str(&format!(
        "- **Confidence:** {}/{}\n",
        report.confidence_score.score, report.confidence_score.max_score
    ));
    if !report.fallbacks().is_empty() {
        section.push_str(&format!(
            "- **Degraded Stages:** {}\n",
            report.fallbacks().len()
        ));
    }
    section.push_str(&format!(
        "- **Pipeline Duration:** {:.1}s\n\n",
        report.explainability_log.total_pipeline_time_seconds
    ));

    section
}

fn generate_table_of_contents() -> String {
    let mut toc = String::new();

    toc.push_str("## Table of Contents\n\n");
    toc.push_str("- [Metadata](#metadata)\n");
    for title in SECTIONS {
        toc.push_str(&format!("- [{}](#{})\n", title, anchor(title)));
    }
    toc.push('\n');

    toc
}

fn generate_direct_answer(answer: &DirectAnswer) -> String {
    let mut section = heading(SECTIONS[0]);

    if let Some(ref error) = answer.error {
        section.push_str(&format!("> ⚠️ {}\n\n", error));
    }

    let intent = answer.intent.payload();
    section.push_str(&format!("**Query:** {}\n\n", answer.query));
    section.push_str(&format!("**Query Type:** {}\n\n", intent.query_type));
    if !intent.primary_focus.is_empty() {
        section.push_str(&format!("**Primary Focus:** {}\n\n", intent.primary_focus));
    }
    section.push_str(&format!("**Papers Found:** {}\n\n", answer.papers_found));

    if !answer.sources.is_empty() {
        section.push_str("| Source | Papers |\n");
        section.push_str("|:---|:---:|\n");
        for (source, count) in &answer.sources {
            section.push_str(&format!("| {} | {} |\n", source, count));
        }
        section.push('\n');
    }

    section
}

fn generate_context_section(
    context: &ContextSummary,
    summaries: &StageResult<ExtractionOutput>,
) -> String {
    let mut section = heading(SECTIONS[1]);

    if context.papers.is_empty() {
        section.push_str("No papers were analyzed.\n\n");
        return section;
    }

    for (i, paper) in context.papers.iter().enumerate() {
        if paper.url.is_empty() {
            section.push_str(&format!("{}. **{}**", i + 1, paper.title));
        } else {
            section.push_str(&format!("{}. **[{}]({})**", i + 1, paper.title, paper.url));
        }
        if !paper.source.is_empty() {
            section.push_str(&format!(" *({})*", paper.source));
        }
        section.push('\n');
        if !paper.authors.is_empty() {
            section.push_str(&format!("   {}\n", paper.authors.join(", ")));
        }
        if !paper.abstract_preview.is_empty() {
            section.push_str(&format!("   > {}\n", paper.abstract_preview));
        }
        section.push('\n');
    }

    section.push_str(&generate_summaries(summaries));

    section
}

/// Per-paper structured summaries; a digest reply is shown as its keys.
fn generate_summaries(summaries: &StageResult<ExtractionOutput>) -> String {
    let mut block = String::new();
    if summaries.payload().is_empty() {
        block.push_str(&degraded_note(summaries));
        return block;
    }

    block.push_str("### Structured Summaries\n\n");
    block.push_str(&degraded_note(summaries));
    match summaries.payload() {
        ExtractionOutput::PerItem(items) => {
            for item in items {
                block.push_str(&format!("#### {}\n\n", item.title));
                block.push_str(&labelled("Problem", &item.research_problem));
                block.push_str(&labelled("Method", &item.methodology));
                block.push_str(&labelled("Dataset", &item.dataset));
                block.push_str(&labelled("Key Results", &item.key_results));
                block.push_str(&labelled("Limitations", &item.limitations));
            }
        }
        ExtractionOutput::Digest(map) => {
            for (key, value) in map {
                block.push_str(&format!("- **{}**: {}\n", key, Mention::from_value(value)));
            }
            block.push('\n');
        }
    }

    block
}

fn generate_graph_section(result: &StageResult<GraphAnalytics>) -> String {
    let mut section = heading(SECTIONS[2]);
    section.push_str(&degraded_note(result));

    let graph = result.payload();
    section.push_str(&format!("{}\n\n", graph.summary));
    section.push_str(&format!(
        "*Nodes: {} | Edges: {}*\n\n",
        graph.node_count, graph.edge_count
    ));

    if !graph.key_concepts.is_empty() {
        section.push_str("### Key Concepts\n\n");
        section.push_str("| Concept | Centrality |\n");
        section.push_str("|:---|:---:|\n");
        for entry in &graph.key_concepts {
            section.push_str(&format!("| {} | {:.3} |\n", entry.node_id, entry.score));
        }
        section.push('\n');
    }

    if !graph.node_type_distribution.is_empty() {
        section.push_str("### Node Types\n\n");
        for (kind, count) in &graph.node_type_distribution {
            section.push_str(&format!("- {}: {}\n", kind, count));
        }
        section.push('\n');
    }

    if !graph.clusters.is_empty() {
        section.push_str("### Clusters\n\n");
        for (i, cluster) in graph.clusters.iter().enumerate() {
            section.push_str(&format!(
                "{}. {} nodes: {}\n",
                i + 1,
                cluster.size,
                cluster.sample_members.join(", ")
            ));
        }
        section.push('\n');
    }

    if !graph.hidden_connections.is_empty() {
        section.push_str("### Hidden Connections\n\n");
        for connection in &graph.hidden_connections {
            section.push_str(&format!(
                "- **{}** → **{}** via {} ({} hops)\n",
                connection.from,
                connection.to,
                connection.via.join(" → "),
                connection.hop_count
            ));
        }
        section.push('\n');
    }

    section
}

fn generate_comparison_section(result: &StageResult<Comparison>) -> String {
    let mut section = heading(SECTIONS[3]);
    section.push_str(&degraded_note(result));

    let comparison = result.payload();
    section.push_str(&mention_list("Methodology Similarities", &comparison.methodology_similarities));
    section.push_str(&mention_list("Methodology Differences", &comparison.methodology_differences));
    section.push_str(&mention_list("Strengths", &comparison.strengths));
    section.push_str(&mention_list("Weaknesses", &comparison.weaknesses));
    section.push_str(&mention_list("Performance Trade-offs", &comparison.performance_tradeoffs));

    section
}

fn generate_gaps_section(result: &StageResult<Gaps>) -> String {
    let mut section = heading(SECTIONS[4]);
    section.push_str(&degraded_note(result));

    let gaps = result.payload();
    section.push_str(&mention_list("Repeated Limitations", &gaps.repeated_limitations));
    section.push_str(&mention_list("Underexplored Combinations", &gaps.underexplored_combinations));
    section.push_str(&mention_list("Missing Benchmarks", &gaps.missing_benchmarks));
    section.push_str(&mention_list("Conflicting Findings", &gaps.conflicting_findings));
    section.push_str(&mention_list("Novel Research Directions", &gaps.novel_research_directions));

    section
}

fn generate_insights_section(result: &StageResult<Insights>) -> String {
    let mut section = heading(SECTIONS[5]);
    section.push_str(&degraded_note(result));

    let insights = result.payload();
    section.push_str(&mention_list("Unique Methods", &insights.unique_methods));
    section.push_str(&mention_list("Common Datasets", &insights.common_datasets));
    section.push_str(&mention_list("Evaluation Metrics", &insights.evaluation_metrics));
    section.push_str(&mention_list("Recurring Limitations", &insights.recurring_limitations));
    section.push_str(&mention_list("Emerging Themes", &insights.emerging_themes));

    section
}

fn generate_novelty_section(result: &StageResult<NoveltyAssessment>) -> String {
    let mut section = heading(SECTIONS[6]);
    section.push_str(&degraded_note(result));

    let novelty = result.payload();
    section.push_str("| Overall | Uniqueness | Scientific | Practical | Redundancy Risk | Opportunity |\n");
    section.push_str("|:---:|:---:|:---:|:---:|:---:|:---:|\n");
    section.push_str(&format!(
        "| **{:.0}** | {:.0} | {:.0} | {:.0} | {:.0} | {:.0} |\n\n",
        novelty.overall_score,
        novelty.uniqueness_score,
        novelty.scientific_novelty_score,
        novelty.practical_novelty_score,
        novelty.redundancy_risk_score,
        novelty.opportunity_score
    ));
    section.push_str(&labelled("Explanation", &novelty.explanation));
    section.push_str(&mention_list("Opportunity Areas", &novelty.opportunity_areas));

    section
}

fn generate_trend_section(result: &StageResult<TrendForecast>) -> String {
    let mut section = heading(SECTIONS[7]);
    section.push_str(&degraded_note(result));

    let trends = result.payload();
    section.push_str(&labelled("Current Direction", &trends.current_research_direction));

    if !trends.method_adoption_trends.is_empty() {
        section.push_str("### Method Adoption\n\n");
        section.push_str("| Method | Trend | Reason |\n");
        section.push_str("|:---|:---:|:---|\n");
        for trend in &trends.method_adoption_trends {
            section.push_str(&format!(
                "| {} | {} | {} |\n",
                trend.method, trend.trend, trend.reason
            ));
        }
        section.push('\n');
    }

    if !trends.emerging_tools_and_frameworks.is_empty() {
        section.push_str("### Emerging Tools\n\n");
        for tool in &trends.emerging_tools_and_frameworks {
            section.push_str(&format!("- **{}**: {}\n", tool.name, tool.impact));
        }
        section.push('\n');
    }

    section.push_str(&labelled("Citation Patterns", &trends.citation_pattern_insights));
    section.push_str(&mention_list("One-Year Predictions", &trends.one_year_predictions));
    section.push_str(&mention_list("Three-Year Predictions", &trends.three_year_predictions));
    section.push_str(&mention_list("Rising Topics", &trends.rising_topics));
    section.push_str(&mention_list("Declining Topics", &trends.declining_topics));
    section.push_str(&mention_list("Cross-Domain Opportunities", &trends.cross_domain_opportunities));

    section
}

fn generate_roadmap_section(result: &StageResult<Roadmap>) -> String {
    let mut section = heading(SECTIONS[10]);
    section.push_str(&degraded_note(result));

    let roadmap = result.payload();
    for (week, plan) in &roadmap.roadmap {
        let week_title = week.replace('_', " ");
        if plan.theme.is_empty() {
            section.push_str(&format!("### {}\n\n", week_title));
        } else {
            section.push_str(&format!("### {}: {}\n\n", week_title, plan.theme));
        }
        for task in &plan.tasks {
            section.push_str(&format!("- [ ] {}\n", task));
        }
        if !plan.resources.is_empty() {
            let resources: Vec<String> = plan.resources.iter().map(|r| r.to_string()).collect();
            section.push_str(&format!("\n*Resources: {}*\n", resources.join(", ")));
        }
        section.push('\n');
    }

    if !roadmap.project_ideas.is_empty() {
        section.push_str("### Project Ideas\n\n");
        for idea in &roadmap.project_ideas {
            section.push_str(&format!("- **{}**", idea.title));
            if !idea.difficulty.is_empty() {
                section.push_str(&format!(" ({})", idea.difficulty));
            }
            if !idea.description.is_empty() {
                section.push_str(&format!(": {}", idea.description));
            }
            section.push('\n');
        }
        section.push('\n');
    }

    for (title, resources) in [
        ("Datasets", &roadmap.recommended_datasets),
        ("Baseline Models", &roadmap.baseline_models),
    ] {
        if resources.is_empty() {
            continue;
        }
        section.push_str(&format!("### {}\n\n", title));
        for resource in resources {
            section.push_str(&format!("- **{}**", resource.name));
            if !resource.description.is_empty() {
                section.push_str(&format!(": {}", resource.description));
            }
            if !resource.url.is_empty() {
                section.push_str(&format!(" <{}>", resource.url));
            }
            section.push('\n');
        }
        section.push('\n');
    }

    section.push_str(&mention_list("Key Papers to Read", &roadmap.key_papers_to_read));

    section
}

fn generate_argument_section(report: &PipelineReport) -> String {
    let mut section = heading(SECTIONS[11]);
    section.push_str(&degraded_note(&report.argument_strength));

    let arguments = report.argument_strength.payload();
    if arguments.is_empty() {
        return section;
    }

    section.push_str("| Claim | Evidence | Reliability | Missing Evidence |\n");
    section.push_str("|:---|:---:|:---:|:---|\n");
    for argument in arguments {
        section.push_str(&format!(
            "| {} | {} | {} | {} |\n",
            argument.claim, argument.evidence_strength, argument.reliability, argument.missing_evidence
        ));
    }
    section.push('\n');

    section
}

fn critique_points(title: &str, points: &[CritiquePoint]) -> String {
    if points.is_empty() {
        return String::new();
    }

    let mut list = format!("### {}\n\n", title);
    for point in points {
        list.push_str(&format!("- **{}**: {}", point.aspect, point.detail));
        if !point.severity.is_empty() {
            list.push_str(&format!(" *({})*", point.severity));
        }
        list.push('\n');
    }
    list.push('\n');
    list
}

fn generate_critique_section(report: &PipelineReport) -> String {
    let mut section = heading(SECTIONS[12]);
    section.push_str(&degraded_note(&report.scientific_critique));

    let critique = report.scientific_critique.payload();
    section.push_str(&critique_points("Strong Points", &critique.strong_points));
    section.push_str(&critique_points("Weak Points", &critique.weak_points));
    section.push_str(&labelled("Experimental Design", &critique.experimental_design_assessment));
    section.push_str(&labelled("Reproducibility", &critique.reproducibility_assessment));
    section.push_str(&labelled("Statistical Validity", &critique.statistical_validity));
    section.push_str(&labelled("Dataset Quality", &critique.dataset_quality));

    section
}

fn generate_confidence_section(confidence: &ConfidenceBreakdown) -> String {
    let mut section = heading(SECTIONS[14]);

    section.push_str(&format!(
        "**Score:** {}/{}\n\n",
        confidence.score, confidence.max_score
    ));
    for reason in &confidence.reasons {
        section.push_str(&format!("- {}\n", reason));
    }
    section.push('\n');

    section
}

fn generate_explainability_section(log: &ExplainabilityLog) -> String {
    let mut section = heading(SECTIONS[15]);

    if !log.reasoning_summary.is_empty() {
        section.push_str(&format!("{}\n\n", log.reasoning_summary));
    }
    section.push_str(&format!(
        "**Stages Activated ({}):** {}\n\n",
        log.total_agents,
        log.agents_activated.join(", ")
    ));

    if !log.timing_breakdown.is_empty() {
        section.push_str("| Stage | Seconds |\n");
        section.push_str("|:---|:---:|\n");
        for (stage, seconds) in log.timing_breakdown.iter() {
            section.push_str(&format!("| {} | {:.2} |\n", stage, seconds));
        }
        section.push_str(&format!(
            "| **Total** | **{:.2}** |\n\n",
            log.total_pipeline_time_seconds
        ));
    }

    if !log.fallbacks.is_empty() {
        section.push_str("### Fallbacks\n\n");
        for fallback in &log.fallbacks {
            section.push_str(&format!("- `{}`: {}\n", fallback.stage, fallback.reason));
        }
        section.push('\n');
    }

    section
}

fn generate_footer() -> String {
    let mut footer = String::new();

    footer.push_str("---\n\n");
    footer.push_str("*Report generated by ResearchHub. Sections marked degraded fell back after a failed stage.*\n");

    footer
}
