//! Knowledge graph on a petgraph `DiGraph` and its structural analytics.
//!
//! Node order is the order ids were first seen. Every ranking and search
//! below iterates in that order, so results never depend on hash order.

use crate::config::GraphConfig;
use serde::{Deserialize, Serialize};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::unionfind::UnionFind;
use petgraph::visit::{Bfs, EdgeRef};
use petgraph::Direction;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

/// Kind of a graph node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum NodeKind {
    #[default]
    Concept,
    Method,
    Dataset,
    Problem,
    Finding,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Concept => "concept",
            NodeKind::Method => "method",
            NodeKind::Dataset => "dataset",
            NodeKind::Problem => "problem",
            NodeKind::Finding => "finding",
        }
    }
}

impl FromStr for NodeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_label(s).as_str() {
            "concept" => Ok(NodeKind::Concept),
            "method" => Ok(NodeKind::Method),
            "dataset" => Ok(NodeKind::Dataset),
            "problem" => Ok(NodeKind::Problem),
            "finding" => Ok(NodeKind::Finding),
            _ => Err(format!("unknown node type '{}'", s)),
        }
    }
}

impl TryFrom<String> for NodeKind {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Relationship carried by a directed edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum Relationship {
    Supports,
    Contradicts,
    Improves,
    Enables,
    Uses,
    EvaluatesOn,
}

impl Relationship {
    pub fn as_str(&self) -> &'static str {
        match self {
            Relationship::Supports => "supports",
            Relationship::Contradicts => "contradicts",
            Relationship::Improves => "improves",
            Relationship::Enables => "enables",
            Relationship::Uses => "uses",
            Relationship::EvaluatesOn => "evaluates_on",
        }
    }
}

impl FromStr for Relationship {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_label(s).as_str() {
            "supports" => Ok(Relationship::Supports),
            "contradicts" => Ok(Relationship::Contradicts),
            "improves" => Ok(Relationship::Improves),
            "enables" => Ok(Relationship::Enables),
            "uses" => Ok(Relationship::Uses),
            "evaluates_on" => Ok(Relationship::EvaluatesOn),
            _ => Err(format!("unknown relationship '{}'", s)),
        }
    }
}

impl TryFrom<String> for Relationship {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for Relationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn normalize_label(s: &str) -> String {
    s.trim().to_lowercase().replace(&[' ', '-'][..], "_")
}

/// Node weight: the id plus the attributes of its latest definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    pub kind: NodeKind,
    pub description: String,
}

/// Degree centrality of one node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CentralityEntry {
    #[serde(rename = "name")]
    pub node_id: String,
    #[serde(rename = "centrality")]
    pub score: f64,
}

/// Connected component of the undirected projection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cluster {
    pub size: usize,
    #[serde(rename = "members")]
    pub sample_members: Vec<String>,
}

/// Pair of nodes without a direct edge but joined by a short directed path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HiddenConnection {
    pub from: String,
    pub to: String,
    pub via: Vec<String>,
    #[serde(rename = "path_length")]
    pub hop_count: usize,
}

pub const EMPTY_GRAPH_SUMMARY: &str = "No graph data available.";
pub const NO_PATTERNS_SUMMARY: &str = "Graph constructed but no significant patterns detected.";

/// Everything the report carries about the graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphAnalytics {
    pub node_count: usize,
    pub edge_count: usize,
    pub key_concepts: Vec<CentralityEntry>,
    pub node_type_distribution: BTreeMap<String, usize>,
    pub clusters: Vec<Cluster>,
    pub hidden_connections: Vec<HiddenConnection>,
    #[serde(rename = "graph_insights")]
    pub summary: String,
}

/// Directed graph with at most one edge per ordered pair.
///
/// Nodes are never removed, so `NodeIndex` order is insertion order.
#[derive(Debug, Clone, Default)]
pub struct KnowledgeGraph {
    graph: DiGraph<GraphNode, Relationship>,
    index: HashMap<String, NodeIndex>,
}

/// Hop count and predecessor of each node reached by a BFS, by node index.
type Reached = Vec<Option<(usize, NodeIndex)>>;

impl KnowledgeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Add a node; re-adding an id overwrites its attributes but keeps its
    /// original position.
    pub fn add_node(&mut self, id: &str, kind: NodeKind, description: &str) {
        match self.index.get(id) {
            Some(&idx) => {
                let node = &mut self.graph[idx];
                node.kind = kind;
                node.description = description.to_string();
            }
            None => {
                self.insert_node(id, kind, description);
            }
        }
    }

    /// Add a directed edge. Unknown endpoints become bare concept nodes.
    /// A repeated source/target pair replaces the relationship.
    pub fn add_edge(&mut self, source: &str, target: &str, relationship: Relationship) {
        let from = self.ensure_node(source);
        let to = self.ensure_node(target);

        match self.graph.find_edge(from, to) {
            Some(edge) => self.graph[edge] = relationship,
            None => {
                self.graph.add_edge(from, to, relationship);
            }
        }
    }

    fn ensure_node(&mut self, id: &str) -> NodeIndex {
        match self.index.get(id) {
            Some(&idx) => idx,
            None => self.insert_node(id, NodeKind::Concept, ""),
        }
    }

    fn insert_node(&mut self, id: &str, kind: NodeKind, description: &str) -> NodeIndex {
        let idx = self.graph.add_node(GraphNode {
            id: id.to_string(),
            kind,
            description: description.to_string(),
        });
        self.index.insert(id.to_string(), idx);
        idx
    }

    fn connected(&self, a: NodeIndex, b: NodeIndex) -> bool {
        self.graph.find_edge(a, b).is_some() || self.graph.find_edge(b, a).is_some()
    }

    fn id(&self, idx: NodeIndex) -> String {
        self.graph[idx].id.clone()
    }

    /// `(in-degree + out-degree) / (n - 1)` for every node, sorted descending.
    /// Equal scores keep insertion order.
    pub fn degree_centrality(&self) -> Vec<CentralityEntry> {
        let n = self.graph.node_count();
        let mut entries: Vec<CentralityEntry> = self
            .graph
            .node_indices()
            .map(|idx| {
                let score = if n <= 1 {
                    0.0
                } else {
                    let degree = self.graph.edges_directed(idx, Direction::Outgoing).count()
                        + self.graph.edges_directed(idx, Direction::Incoming).count();
                    degree as f64 / (n - 1) as f64
                };
                CentralityEntry {
                    node_id: self.id(idx),
                    score,
                }
            })
            .collect();

        entries.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        entries
    }

    /// Connected components of the undirected projection, largest first.
    /// Members are listed in insertion order.
    pub fn components(&self) -> Vec<Vec<NodeIndex>> {
        let mut sets = UnionFind::<usize>::new(self.graph.node_count());
        for edge in self.graph.edge_references() {
            sets.union(edge.source().index(), edge.target().index());
        }

        let mut slot_of_root: HashMap<usize, usize> = HashMap::new();
        let mut components: Vec<Vec<NodeIndex>> = Vec::new();
        for idx in self.graph.node_indices() {
            let root = sets.find(idx.index());
            let slot = *slot_of_root.entry(root).or_insert_with(|| {
                components.push(Vec::new());
                components.len() - 1
            });
            components[slot].push(idx);
        }

        components.sort_by(|a, b| b.len().cmp(&a.len()));
        components
    }

    /// Hop distance and predecessor of every node reachable from `source`
    /// along edge direction.
    fn shortest_paths_from(&self, source: NodeIndex) -> Reached {
        let mut reached: Reached = vec![None; self.graph.node_count()];
        reached[source.index()] = Some((0, source));

        let mut bfs = Bfs::new(&self.graph, source);
        while let Some(current) = bfs.next(&self.graph) {
            let hops = reached[current.index()].map(|(h, _)| h).unwrap_or(0);
            for next in self.graph.neighbors(current) {
                if reached[next.index()].is_none() {
                    reached[next.index()] = Some((hops + 1, current));
                }
            }
        }

        reached
    }

    /// Pairs among the first `candidate_cap` nodes with no direct edge in
    /// either direction, joined by a directed path of 2..=`max_path_length`
    /// hops from the earlier node to the later one. Stops after `limit`.
    pub fn hidden_connections(
        &self,
        candidate_cap: usize,
        max_path_length: usize,
        limit: usize,
    ) -> Vec<HiddenConnection> {
        let candidates: Vec<NodeIndex> = self.graph.node_indices().take(candidate_cap).collect();
        let mut hidden = Vec::new();
        if limit == 0 {
            return hidden;
        }

        'outer: for (i, &from) in candidates.iter().enumerate() {
            let reached = self.shortest_paths_from(from);

            for &to in &candidates[i + 1..] {
                if self.connected(from, to) {
                    continue;
                }
                let Some((hops, _)) = reached[to.index()] else {
                    continue;
                };
                if hops > 1 && hops <= max_path_length {
                    hidden.push(HiddenConnection {
                        from: self.id(from),
                        to: self.id(to),
                        via: self.intermediates(&reached, from, to),
                        hop_count: hops,
                    });
                    if hidden.len() >= limit {
                        break 'outer;
                    }
                }
            }
        }

        hidden
    }

    fn intermediates(&self, reached: &Reached, source: NodeIndex, target: NodeIndex) -> Vec<String> {
        let mut via = Vec::new();
        let mut current = target;
        while let Some((_, previous)) = reached[current.index()] {
            if previous == source {
                break;
            }
            via.push(self.id(previous));
            current = previous;
        }
        via.reverse();
        via
    }

    pub fn type_distribution(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for node in self.graph.node_weights() {
            *counts.entry(node.kind.to_string()).or_insert(0) += 1;
        }
        counts
    }

    /// Full analytics pass with the configured limits.
    pub fn analyze(&self, config: &GraphConfig) -> GraphAnalytics {
        if self.graph.node_count() == 0 {
            return GraphAnalytics {
                summary: EMPTY_GRAPH_SUMMARY.to_string(),
                ..GraphAnalytics::default()
            };
        }

        let central: Vec<CentralityEntry> = self
            .degree_centrality()
            .into_iter()
            .take(config.top_central)
            .map(|entry| CentralityEntry {
                score: (entry.score * 1000.0).round() / 1000.0,
                ..entry
            })
            .collect();

        let clusters = self
            .components()
            .into_iter()
            .take(config.top_clusters)
            .map(|members| Cluster {
                size: members.len(),
                sample_members: members
                    .iter()
                    .take(config.cluster_sample_size)
                    .map(|&idx| self.id(idx))
                    .collect(),
            })
            .collect();

        let hidden = self.hidden_connections(
            config.candidate_node_cap,
            config.max_path_length,
            config.max_hidden_connections,
        );

        GraphAnalytics {
            node_count: self.node_count(),
            edge_count: self.edge_count(),
            summary: summary_text(&central, &hidden),
            key_concepts: central,
            node_type_distribution: self.type_distribution(),
            clusters,
            hidden_connections: hidden,
        }
    }
}

/// One or two sentences naming the most central nodes and the number of
/// hidden connections.
pub fn summary_text(central: &[CentralityEntry], hidden: &[HiddenConnection]) -> String {
    let mut parts = Vec::new();

    let names: Vec<&str> = central
        .iter()
        .take(5)
        .map(|entry| entry.node_id.as_str())
        .collect();
    if !names.is_empty() {
        parts.push(format!("Most central concepts: {}.", names.join(", ")));
    }

    if !hidden.is_empty() {
        parts.push(format!(
            "Found {} hidden connections between concepts that aren't directly linked but share intermediate relationships.",
            hidden.len()
        ));
    }

    if parts.is_empty() {
        NO_PATTERNS_SUMMARY.to_string()
    } else {
        parts.join(" ")
    }
}

#[cfg(test)]
#[derive(Debug, Clone, PartialEq)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
    pub relationship: Relationship,
}

#[cfg(test)]
impl KnowledgeGraph {
    pub fn nodes(&self) -> Vec<&GraphNode> {
        self.graph.node_weights().collect()
    }

    /// Edges in insertion order.
    pub fn edges(&self) -> Vec<GraphEdge> {
        self.graph
            .edge_references()
            .map(|edge| GraphEdge {
                source: self.id(edge.source()),
                target: self.id(edge.target()),
                relationship: *edge.weight(),
            })
            .collect()
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.index.get(id).map(|&idx| &self.graph[idx])
    }
}
