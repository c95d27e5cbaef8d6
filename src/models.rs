//! Data models for the research analyzer.
//!
//! This module contains the retrieved paper type, the tagged stage result
//! used by every pipeline slot, and the payload schemas each analysis
//! stage validates agent output against.

use serde::de::Deserializer;
use serde::ser::{Error as _, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// A single item returned by the retrieval collaborator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Paper {
    /// Paper title.
    pub title: String,
    /// Abstract text.
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    /// Author names in publication order.
    pub authors: Vec<String>,
    /// Catalog the paper came from (e.g. "arxiv", "pubmed").
    #[serde(alias = "source_tag")]
    pub source: String,
    /// Landing page URL.
    pub url: String,
}

/// Outcome of one pipeline stage.
///
/// Success and fallback share the payload type, so downstream stages never
/// branch on shape. A fallback carries the reason it was substituted.
#[derive(Debug, Clone, PartialEq)]
pub enum StageResult<T> {
    Success(T),
    Fallback(T, String),
}

impl<T> StageResult<T> {
    pub fn success(payload: T) -> Self {
        StageResult::Success(payload)
    }

    pub fn fallback(payload: T, reason: impl Into<String>) -> Self {
        StageResult::Fallback(payload, reason.into())
    }

    /// The payload, whether genuine or substituted.
    pub fn payload(&self) -> &T {
        match self {
            StageResult::Success(payload) | StageResult::Fallback(payload, _) => payload,
        }
    }

    /// The payload only when the stage actually succeeded.
    pub fn success_payload(&self) -> Option<&T> {
        match self {
            StageResult::Success(payload) => Some(payload),
            StageResult::Fallback(..) => None,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, StageResult::Fallback(..))
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            StageResult::Success(_) => None,
            StageResult::Fallback(_, reason) => Some(reason),
        }
    }

    /// Project the payload while keeping the success/fallback tag.
    pub fn map<U>(&self, f: impl FnOnce(&T) -> U) -> StageResult<U> {
        match self {
            StageResult::Success(payload) => StageResult::Success(f(payload)),
            StageResult::Fallback(payload, reason) => StageResult::Fallback(f(payload), reason.clone()),
        }
    }
}

impl<T: Default> StageResult<T> {
    /// A default payload tagged as fallback.
    pub fn degraded(reason: impl Into<String>) -> Self {
        StageResult::Fallback(T::default(), reason.into())
    }
}

/// Serializes as the bare payload. Object payloads of a fallback gain an
/// `"error"` key holding the reason.
impl<T: Serialize> Serialize for StageResult<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            StageResult::Success(payload) => payload.serialize(serializer),
            StageResult::Fallback(payload, reason) => {
                let mut value = serde_json::to_value(payload).map_err(S::Error::custom)?;
                if let Value::Object(ref mut map) = value {
                    map.insert("error".to_string(), Value::String(reason.clone()));
                }
                value.serialize(serializer)
            }
        }
    }
}

/// Free text produced by the agent.
///
/// Agents return list entries either as plain strings or as small objects;
/// both are read into one string. Objects contribute their description,
/// name or title, else their compact JSON.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Mention(pub String);

impl Mention {
    pub fn from_value(value: &Value) -> Self {
        let text = match value {
            Value::Null => String::new(),
            Value::String(s) => s.trim().to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => n.to_string(),
            Value::Array(items) => items
                .iter()
                .map(|item| Mention::from_value(item).0)
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join("; "),
            Value::Object(map) => ["description", "name", "title", "claim"]
                .iter()
                .find_map(|key| map.get(*key).and_then(Value::as_str))
                .map(|s| s.trim().to_string())
                .unwrap_or_else(|| value.to_string()),
        };
        Mention(text)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'de> Deserialize<'de> for Mention {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(Mention::from_value(&value))
    }
}

impl fmt::Display for Mention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Mention {
    fn from(s: &str) -> Self {
        Mention(s.to_string())
    }
}

/// Query classification (Stage 0). Advisory only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntentClassification {
    pub query_type: String,
    pub intent: String,
    pub primary_focus: String,
    pub routing_strategy: String,
}

impl IntentClassification {
    /// Classification used when the classifier is disabled or fails.
    pub fn general(query: &str) -> Self {
        Self {
            query_type: "general".to_string(),
            intent: query.to_string(),
            primary_focus: query.to_string(),
            routing_strategy: "full_pipeline".to_string(),
        }
    }
}

/// Structured summary of one paper.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemSummary {
    #[serde(alias = "Title")]
    pub title: Mention,
    #[serde(alias = "Research Problem", alias = "research problem")]
    pub research_problem: Mention,
    #[serde(alias = "Methodology")]
    pub methodology: Mention,
    #[serde(alias = "Dataset")]
    pub dataset: Mention,
    #[serde(alias = "Evaluation Metrics", alias = "evaluation metrics")]
    pub evaluation_metrics: Mention,
    #[serde(alias = "Key Results", alias = "key results")]
    pub key_results: Mention,
    #[serde(alias = "Limitations")]
    pub limitations: Mention,
}

/// Output of the per-item extraction stage.
///
/// The agent is asked for a list; some replies wrap it in an object, which
/// is kept as a digest rather than rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExtractionOutput {
    PerItem(Vec<ItemSummary>),
    Digest(serde_json::Map<String, Value>),
}

impl Default for ExtractionOutput {
    fn default() -> Self {
        ExtractionOutput::PerItem(Vec::new())
    }
}

impl ExtractionOutput {
    pub fn is_empty(&self) -> bool {
        match self {
            ExtractionOutput::PerItem(items) => items.is_empty(),
            ExtractionOutput::Digest(map) => map.is_empty(),
        }
    }
}

/// Cross-paper comparison (Stage 3a).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Comparison {
    pub methodology_similarities: Vec<Mention>,
    pub methodology_differences: Vec<Mention>,
    pub strengths: Vec<Mention>,
    pub weaknesses: Vec<Mention>,
    pub performance_tradeoffs: Vec<Mention>,
}

/// Cross-paper synthesis (Stage 3b).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Insights {
    pub unique_methods: Vec<Mention>,
    pub common_datasets: Vec<Mention>,
    pub evaluation_metrics: Vec<Mention>,
    pub recurring_limitations: Vec<Mention>,
    pub emerging_themes: Vec<Mention>,
}

/// Gap and opportunity detection (Stage 4).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Gaps {
    pub repeated_limitations: Vec<Mention>,
    pub underexplored_combinations: Vec<Mention>,
    pub missing_benchmarks: Vec<Mention>,
    pub conflicting_findings: Vec<Mention>,
    pub novel_research_directions: Vec<Mention>,
}

/// Novelty scoring, all scores on a 0-100 scale.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoveltyAssessment {
    pub overall_score: f64,
    pub uniqueness_score: f64,
    pub scientific_novelty_score: f64,
    pub practical_novelty_score: f64,
    pub redundancy_risk_score: f64,
    pub opportunity_score: f64,
    pub explanation: Mention,
    pub opportunity_areas: Vec<Mention>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MethodTrend {
    pub method: Mention,
    /// rising, stable or declining
    pub trend: Mention,
    pub reason: Mention,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmergingTool {
    pub name: Mention,
    pub impact: Mention,
}

/// One- and three-year research forecast.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendForecast {
    pub current_research_direction: Mention,
    pub method_adoption_trends: Vec<MethodTrend>,
    pub emerging_tools_and_frameworks: Vec<EmergingTool>,
    pub citation_pattern_insights: Mention,
    pub one_year_predictions: Vec<Mention>,
    pub three_year_predictions: Vec<Mention>,
    pub rising_topics: Vec<Mention>,
    pub declining_topics: Vec<Mention>,
    pub cross_domain_opportunities: Vec<Mention>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CritiquePoint {
    pub aspect: Mention,
    pub detail: Mention,
    /// minor, moderate or major; only present on weak points
    #[serde(skip_serializing_if = "Mention::is_empty")]
    pub severity: Mention,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScientificCritique {
    pub strong_points: Vec<CritiquePoint>,
    pub weak_points: Vec<CritiquePoint>,
    pub experimental_design_assessment: Mention,
    pub reproducibility_assessment: Mention,
    pub statistical_validity: Mention,
    pub dataset_quality: Mention,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArgumentAssessment {
    pub claim: Mention,
    pub evidence_strength: Mention,
    pub reliability: Mention,
    pub missing_evidence: Mention,
    pub bias_indicators: Mention,
}

/// Methodology critique plus per-claim argument strength.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Critique {
    pub scientific_critique: ScientificCritique,
    pub argument_strength: Vec<ArgumentAssessment>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeekPlan {
    pub theme: Mention,
    pub tasks: Vec<Mention>,
    pub resources: Vec<Mention>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectIdea {
    pub title: Mention,
    pub difficulty: Mention,
    pub description: Mention,
}

/// A named dataset or baseline model suggested by the roadmap.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamedResource {
    pub name: Mention,
    pub description: Mention,
    #[serde(skip_serializing_if = "Mention::is_empty")]
    pub url: Mention,
    #[serde(skip_serializing_if = "Mention::is_empty")]
    pub implementation: Mention,
}

/// 30-day researcher roadmap.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Roadmap {
    /// Keyed by week ("week_1" .. "week_4").
    pub roadmap: BTreeMap<String, WeekPlan>,
    pub project_ideas: Vec<ProjectIdea>,
    pub recommended_datasets: Vec<NamedResource>,
    pub baseline_models: Vec<NamedResource>,
    pub key_papers_to_read: Vec<Mention>,
}

/// Weighted data-quality score with one rationale sentence per signal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfidenceBreakdown {
    pub score: u32,
    pub max_score: u32,
    pub reasons: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_mention_reads_strings_and_objects() {
        let items: Vec<Mention> = serde_json::from_value(json!([
            "  BERT ",
            {"description": "Combine GNNs with transformers", "priority": 1},
            {"name": "ImageNet"},
            {"other": 3},
            42
        ]))
        .unwrap();

        assert_eq!(items[0].as_str(), "BERT");
        assert_eq!(items[1].as_str(), "Combine GNNs with transformers");
        assert_eq!(items[2].as_str(), "ImageNet");
        assert_eq!(items[3].as_str(), r#"{"other":3}"#);
        assert_eq!(items[4].as_str(), "42");
    }

    #[test]
    fn test_stage_result_accessors() {
        let ok: StageResult<u32> = StageResult::success(3);
        assert!(!ok.is_fallback());
        assert_eq!(ok.success_payload(), Some(&3));
        assert_eq!(ok.reason(), None);

        let degraded: StageResult<Vec<u32>> = StageResult::degraded("Gap analysis failed: boom");
        assert!(degraded.is_fallback());
        assert!(degraded.payload().is_empty());
        assert_eq!(degraded.success_payload(), None);
        assert_eq!(degraded.reason(), Some("Gap analysis failed: boom"));
    }

    #[test]
    fn test_stage_result_map_keeps_tag() {
        let critique = StageResult::fallback(Critique::default(), "Critique failed: timeout");
        let args = critique.map(|c| c.argument_strength.clone());
        assert_eq!(args.reason(), Some("Critique failed: timeout"));
    }

    #[test]
    fn test_fallback_serialization_marks_objects() {
        let gaps: StageResult<Gaps> = StageResult::degraded("Gap analysis failed: boom");
        let value = serde_json::to_value(&gaps).unwrap();
        assert_eq!(value["error"], "Gap analysis failed: boom");
        assert_eq!(value["novel_research_directions"], json!([]));

        let review: StageResult<String> = StageResult::fallback(String::new(), "failed");
        assert_eq!(serde_json::to_value(&review).unwrap(), json!(""));

        let ok = StageResult::success(Gaps::default());
        assert!(serde_json::to_value(&ok).unwrap().get("error").is_none());
    }

    #[test]
    fn test_extraction_output_shapes() {
        let list: ExtractionOutput =
            serde_json::from_value(json!([{"Title": "Attention", "Methodology": "Transformer"}]))
                .unwrap();
        match &list {
            ExtractionOutput::PerItem(items) => {
                assert_eq!(items[0].title.as_str(), "Attention");
                assert_eq!(items[0].methodology.as_str(), "Transformer");
            }
            other => panic!("expected per-item list, got {:?}", other),
        }

        let digest: ExtractionOutput =
            serde_json::from_value(json!({"papers": [{"title": "x"}]})).unwrap();
        assert!(matches!(digest, ExtractionOutput::Digest(_)));
        assert!(ExtractionOutput::default().is_empty());
    }

    #[test]
    fn test_paper_abstract_field_name() {
        let paper: Paper = serde_json::from_value(json!({
            "title": "T",
            "abstract": "A",
            "authors": ["X"],
            "source": "arxiv",
            "url": "https://arxiv.org/abs/1"
        }))
        .unwrap();
        assert_eq!(paper.abstract_text, "A");
        assert_eq!(serde_json::to_value(&paper).unwrap()["abstract"], "A");
    }
}
