//! Projections of upstream stage outputs into report sections.
//!
//! Nothing here calls the agent; the sections are derived from lists the
//! synthesis, gap and roadmap stages already produced.

use crate::models::{Gaps, Insights, Mention, Roadmap, StageResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Sentinel used when the gap analysis offered nothing to act on.
pub const NO_SUGGESTIONS: &str = "No specific experiments suggested; gap data was limited";

/// Methods, datasets and metrics worth looking at.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendedItems {
    pub recommended_methods: Vec<String>,
    pub recommended_datasets: Vec<String>,
    pub evaluation_metrics: Vec<String>,
}

/// Concatenate the sources, dropping blanks and repeats. First occurrence
/// wins, so the input order is preserved.
fn dedupe<'a>(sources: impl IntoIterator<Item = &'a Mention>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut items = Vec::new();
    for mention in sources {
        let text = mention.as_str();
        if !text.is_empty() && seen.insert(text.to_string()) {
            items.push(text.to_string());
        }
    }
    items
}

/// Recommended methods and datasets from the insights and the roadmap's
/// baselines and datasets. Failed stages contribute nothing.
pub fn recommended_items(
    insights: &StageResult<Insights>,
    roadmap: &StageResult<Roadmap>,
) -> RecommendedItems {
    let empty_insights = Insights::default();
    let empty_roadmap = Roadmap::default();
    let insights = insights.success_payload().unwrap_or(&empty_insights);
    let roadmap = roadmap.success_payload().unwrap_or(&empty_roadmap);

    RecommendedItems {
        recommended_methods: dedupe(
            insights
                .unique_methods
                .iter()
                .chain(roadmap.baseline_models.iter().map(|m| &m.name)),
        ),
        recommended_datasets: dedupe(
            insights
                .common_datasets
                .iter()
                .chain(roadmap.recommended_datasets.iter().map(|d| &d.name)),
        ),
        evaluation_metrics: dedupe(insights.evaluation_metrics.iter()),
    }
}

/// Labelled experiment suggestions from the gap analysis. Never empty.
pub fn suggested_actions(gaps: &StageResult<Gaps>) -> Vec<String> {
    let mut actions = Vec::new();

    if let Some(gaps) = gaps.success_payload() {
        actions.extend(
            gaps.novel_research_directions
                .iter()
                .filter(|d| !d.is_empty())
                .map(|d| format!("Experiment: {}", d)),
        );
        actions.extend(
            gaps.underexplored_combinations
                .iter()
                .filter(|c| !c.is_empty())
                .map(|c| format!("Explore: {}", c)),
        );
    }

    if actions.is_empty() {
        actions.push(NO_SUGGESTIONS.to_string());
    }
    actions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NamedResource;
    use serde_json::json;

    fn insights() -> Insights {
        serde_json::from_value(json!({
            "unique_methods": ["LoRA", "Adapters", "LoRA"],
            "common_datasets": ["GLUE"],
            "evaluation_metrics": ["Accuracy", "F1"]
        }))
        .unwrap()
    }

    fn roadmap() -> Roadmap {
        Roadmap {
            baseline_models: vec![
                NamedResource {
                    name: "Full fine-tuning".into(),
                    ..Default::default()
                },
                NamedResource {
                    name: "Adapters".into(),
                    ..Default::default()
                },
            ],
            recommended_datasets: vec![NamedResource {
                name: "SuperGLUE".into(),
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_recommended_items_keep_order_and_dedupe() {
        let items = recommended_items(
            &StageResult::success(insights()),
            &StageResult::success(roadmap()),
        );
        assert_eq!(
            items.recommended_methods,
            vec!["LoRA", "Adapters", "Full fine-tuning"]
        );
        assert_eq!(items.recommended_datasets, vec!["GLUE", "SuperGLUE"]);
        assert_eq!(items.evaluation_metrics, vec!["Accuracy", "F1"]);
    }

    #[test]
    fn test_recommended_items_default_to_empty_lists() {
        let partial: Insights = serde_json::from_value(json!({"unique_methods": ["BERT"]})).unwrap();
        let items = recommended_items(
            &StageResult::success(partial),
            &StageResult::degraded("Roadmap generation failed: timeout"),
        );
        assert_eq!(items.recommended_methods, vec!["BERT"]);
        assert!(items.recommended_datasets.is_empty());

        let value = serde_json::to_value(&items).unwrap();
        assert_eq!(value["evaluation_metrics"], json!([]));
    }

    #[test]
    fn test_failed_insights_contribute_nothing() {
        let items = recommended_items(
            &StageResult::fallback(insights(), "Insight extraction failed: boom"),
            &StageResult::success(roadmap()),
        );
        assert_eq!(items.recommended_methods, vec!["Full fine-tuning", "Adapters"]);
        assert!(items.evaluation_metrics.is_empty());
    }

    #[test]
    fn test_suggested_actions_labels() {
        let gaps: Gaps = serde_json::from_value(json!({
            "novel_research_directions": ["Sparse LoRA", {"description": "Quantized adapters"}],
            "underexplored_combinations": ["LoRA on speech"]
        }))
        .unwrap();

        assert_eq!(
            suggested_actions(&StageResult::success(gaps)),
            vec![
                "Experiment: Sparse LoRA",
                "Experiment: Quantized adapters",
                "Explore: LoRA on speech",
            ]
        );
    }

    #[test]
    fn test_suggested_actions_sentinel() {
        assert_eq!(
            suggested_actions(&StageResult::success(Gaps::default())),
            vec![NO_SUGGESTIONS]
        );
        assert_eq!(
            suggested_actions(&StageResult::degraded("Gap analysis failed: boom")),
            vec![NO_SUGGESTIONS]
        );
    }
}
