//! Builds the knowledge graph from paper summaries and cross-paper
//! insights.
//!
//! The agent is asked for nodes and edges. When its reply is missing or
//! does not fit the schema, a small graph is derived from the insights
//! alone, so `build` always yields analytics.

use crate::agent::{invoke_typed, AgentRequest, AgentTask, AnalysisAgent};
use crate::config::GraphConfig;
use crate::error::AgentError;
use crate::graph::store::{GraphAnalytics, KnowledgeGraph, NodeKind, Relationship};
use crate::models::{ExtractionOutput, Insights, Mention};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

const SYSTEM_PROMPT: &str = "You are a knowledge graph extraction engine.\n\
Extract concepts, methods, datasets, problems, and findings as nodes, \
and their relationships as edges from research data.\n\
Return strictly valid JSON only.";

/// Datasets each method is linked to in the fallback graph.
const FALLBACK_DATASETS_PER_METHOD: usize = 2;

/// Node as returned by the extraction agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSpec {
    #[serde(alias = "name")]
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: NodeKind,
    #[serde(default)]
    pub description: Mention,
}

/// Edge as returned by the extraction agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeSpec {
    pub source: String,
    pub target: String,
    pub relationship: Relationship,
}

/// Graph elements extracted from research data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphExtraction {
    pub nodes: Vec<NodeSpec>,
    pub edges: Vec<EdgeSpec>,
}

impl KnowledgeGraph {
    /// Populate a fresh graph: all nodes first, then all edges.
    /// Elements with an empty id are skipped.
    pub fn from_extraction(extraction: &GraphExtraction) -> Self {
        let mut graph = KnowledgeGraph::new();

        for node in &extraction.nodes {
            let id = node.id.trim();
            if id.is_empty() {
                debug!("Skipping node without id");
                continue;
            }
            graph.add_node(id, node.kind, node.description.as_str());
        }

        for edge in &extraction.edges {
            let (source, target) = (edge.source.trim(), edge.target.trim());
            if source.is_empty() || target.is_empty() {
                debug!("Skipping edge with an empty endpoint");
                continue;
            }
            graph.add_edge(source, target, edge.relationship);
        }

        graph
    }
}

/// Deterministic graph derived from the insights: one node per method,
/// dataset and theme, and every method evaluated on the first two datasets.
pub fn fallback_extraction(insights: &Insights) -> GraphExtraction {
    let named = |items: &[Mention]| -> Vec<String> {
        items
            .iter()
            .filter(|m| !m.is_empty())
            .map(|m| m.to_string())
            .collect()
    };

    let methods = named(&insights.unique_methods);
    let datasets = named(&insights.common_datasets);
    let themes = named(&insights.emerging_themes);

    let mut nodes = Vec::new();
    for (names, kind) in [
        (&methods, NodeKind::Method),
        (&datasets, NodeKind::Dataset),
        (&themes, NodeKind::Concept),
    ] {
        nodes.extend(names.iter().map(|name| NodeSpec {
            id: name.clone(),
            kind,
            description: Mention(name.clone()),
        }));
    }

    let edges = methods
        .iter()
        .flat_map(|method| {
            datasets
                .iter()
                .take(FALLBACK_DATASETS_PER_METHOD)
                .map(move |dataset| EdgeSpec {
                    source: method.clone(),
                    target: dataset.clone(),
                    relationship: Relationship::EvaluatesOn,
                })
        })
        .collect();

    GraphExtraction { nodes, edges }
}

/// Turns summaries and insights into graph analytics.
pub struct GraphBuilder {
    agent: Arc<dyn AnalysisAgent>,
    config: GraphConfig,
}

impl GraphBuilder {
    pub fn new(agent: Arc<dyn AnalysisAgent>, config: GraphConfig) -> Self {
        Self { agent, config }
    }

    /// Extract, populate and analyze. Agent failures fall back to the
    /// insight-derived graph.
    pub async fn build(&self, summaries: &ExtractionOutput, insights: &Insights) -> GraphAnalytics {
        let elements = match self.extract(summaries, insights).await {
            Ok(elements) => elements,
            Err(e) => {
                warn!("Graph extraction failed, using fallback extraction: {}", e);
                fallback_extraction(insights)
            }
        };

        let graph = KnowledgeGraph::from_extraction(&elements);
        info!(
            "Knowledge graph built: {} nodes, {} edges",
            graph.node_count(),
            graph.edge_count()
        );

        graph.analyze(&self.config)
    }

    async fn extract(
        &self,
        summaries: &ExtractionOutput,
        insights: &Insights,
    ) -> Result<GraphExtraction, AgentError> {
        let summaries_text = serde_json::to_string_pretty(summaries).unwrap_or_default();
        let insights_text = serde_json::to_string_pretty(insights).unwrap_or_default();

        let prompt = format!(
            r#"From this research data, extract a knowledge graph.

=== SUMMARIES ===
{summaries_text}

=== INSIGHTS ===
{insights_text}

Return JSON in this exact format:
{{
    "nodes": [
        {{"id": "node_name", "type": "concept|method|dataset|problem|finding", "description": "brief description"}}
    ],
    "edges": [
        {{"source": "node_name_1", "target": "node_name_2", "relationship": "supports|contradicts|improves|enables|uses|evaluates_on"}}
    ]
}}

Extract at least 20 nodes and 30 edges. JSON only, no markdown."#
        );

        let request = AgentRequest::new(AgentTask::ExtractGraph, SYSTEM_PROMPT, prompt).max_tokens(3000);
        invoke_typed(self.agent.as_ref(), request).await
    }
}
