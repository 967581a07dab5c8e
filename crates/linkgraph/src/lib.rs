//! Link graph & PageRank (spec §4.8, offline): the directed host graph
//! built from cross-host links harvested out of relevant documents, and
//! the power-iteration PageRank that feeds `Server.page_rank`.

use std::collections::HashMap;

use anyhow::{bail, Result};
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};

const SCHEMA_VERSION: u32 = 1;

/// A directed host graph: vertices are host names, edges are weighted
/// counts of cross-host links.
pub struct HostGraph {
    graph: DiGraph<String, u64>,
    index: HashMap<String, NodeIndex>,
}

impl HostGraph {
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            index: HashMap::new(),
        }
    }

    fn node(&mut self, host: &str) -> NodeIndex {
        if let Some(&idx) = self.index.get(host) {
            return idx;
        }
        let idx = self.graph.add_node(host.to_string());
        self.index.insert(host.to_string(), idx);
        idx
    }

    /// Build from an edge list of `(from_host, to_host)` pairs, one per
    /// harvested cross-host link; repeated edges accumulate weight.
    pub fn from_edges(edges: impl IntoIterator<Item = (String, String)>) -> Self {
        let mut g = Self::new();
        for (from, to) in edges {
            let from_idx = g.node(&from);
            let to_idx = g.node(&to);
            match g.graph.find_edge(from_idx, to_idx) {
                Some(e) => {
                    let w = g.graph.edge_weight_mut(e).unwrap();
                    *w += 1;
                }
                None => {
                    g.graph.add_edge(from_idx, to_idx, 1);
                }
            }
        }
        g
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn hosts(&self) -> impl Iterator<Item = &str> {
        self.graph.node_weights().map(|s| s.as_str())
    }
}

impl Default for HostGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize, Deserialize)]
struct GraphArtifact {
    schema_version: u32,
    nodes: Vec<String>,
    edges: Vec<(u32, u32, u64)>,
}

impl HostGraph {
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let nodes: Vec<String> = self.graph.node_weights().cloned().collect();
        let edges: Vec<(u32, u32, u64)> = self
            .graph
            .edge_indices()
            .map(|e| {
                let (a, b) = self.graph.edge_endpoints(e).unwrap();
                (a.index() as u32, b.index() as u32, self.graph[e])
            })
            .collect();
        let artifact = GraphArtifact {
            schema_version: SCHEMA_VERSION,
            nodes,
            edges,
        };
        Ok(bincode::serialize(&artifact)?)
    }

    /// A reader that encounters an unknown schema version refuses to load
    /// rather than guessing at a layout (spec §9 design note on
    /// versioned artifacts).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let artifact: GraphArtifact = bincode::deserialize(bytes)?;
        if artifact.schema_version != SCHEMA_VERSION {
            bail!(
                "host link graph artifact has schema version {}, expected {}",
                artifact.schema_version,
                SCHEMA_VERSION
            );
        }
        let mut graph = DiGraph::new();
        let mut index = HashMap::new();
        let node_indices: Vec<NodeIndex> = artifact
            .nodes
            .into_iter()
            .map(|name| {
                let idx = graph.add_node(name.clone());
                index.insert(name, idx);
                idx
            })
            .collect();
        for (a, b, w) in artifact.edges {
            graph.add_edge(node_indices[a as usize], node_indices[b as usize], w);
        }
        Ok(Self { graph, index })
    }
}

/// Power-iteration PageRank with a bounded iteration count. Teleports
/// uniformly over all hosts unless `personalization` assigns weights to a
/// subset of them (in which case teleport mass concentrates there,
/// renormalized to sum to 1). Returns an empty map for an empty graph.
pub fn pagerank(
    graph: &HostGraph,
    damping: f64,
    max_iterations: usize,
    personalization: Option<&HashMap<String, f64>>,
) -> HashMap<String, f64> {
    let n = graph.graph.node_count();
    if n == 0 {
        return HashMap::new();
    }

    let teleport: Vec<f64> = match personalization {
        Some(p) if !p.is_empty() => {
            let total: f64 = p.values().sum();
            graph
                .graph
                .node_weights()
                .map(|host| p.get(host).copied().unwrap_or(0.0) / total)
                .collect()
        }
        _ => vec![1.0 / n as f64; n],
    };

    let out_degree: Vec<u64> = graph
        .graph
        .node_indices()
        .map(|idx| {
            graph
                .graph
                .edges(idx)
                .map(|e| *e.weight())
                .sum()
        })
        .collect();

    let mut ranks = vec![1.0 / n as f64; n];
    for _ in 0..max_iterations {
        let mut next = vec![(1.0 - damping) * 1.0 / n as f64; n];
        for (i, t) in teleport.iter().enumerate() {
            next[i] += (1.0 - damping) * (t - 1.0 / n as f64);
        }
        for idx in graph.graph.node_indices() {
            let total_out = out_degree[idx.index()];
            if total_out == 0 {
                continue;
            }
            let share = damping * ranks[idx.index()] / total_out as f64;
            for edge in graph.graph.edges(idx) {
                let target = edge.target();
                next[target.index()] += share * (*edge.weight() as f64);
            }
        }
        let delta: f64 = next.iter().zip(ranks.iter()).map(|(a, b)| (a - b).abs()).sum();
        ranks = next;
        if delta < 1e-9 {
            break;
        }
    }

    graph
        .index
        .iter()
        .map(|(host, idx)| (host.clone(), ranks[idx.index()]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_graph_and_accumulates_weight() {
        let edges = vec![
            ("a.com".to_string(), "b.com".to_string()),
            ("a.com".to_string(), "b.com".to_string()),
            ("b.com".to_string(), "c.com".to_string()),
        ];
        let g = HostGraph::from_edges(edges);
        assert_eq!(g.node_count(), 3);
    }

    #[test]
    fn pagerank_empty_graph_returns_empty() {
        let g = HostGraph::new();
        assert!(pagerank(&g, 0.85, 20, None).is_empty());
    }

    #[test]
    fn pagerank_sums_to_roughly_one() {
        let edges = vec![
            ("a.com".to_string(), "b.com".to_string()),
            ("b.com".to_string(), "a.com".to_string()),
            ("b.com".to_string(), "c.com".to_string()),
        ];
        let g = HostGraph::from_edges(edges);
        let ranks = pagerank(&g, 0.85, 100, None);
        let total: f64 = ranks.values().sum();
        assert!((total - 1.0).abs() < 0.01, "total = {total}");
    }

    #[test]
    fn roundtrips_through_bytes() {
        let edges = vec![("a.com".to_string(), "b.com".to_string())];
        let g = HostGraph::from_edges(edges);
        let bytes = g.to_bytes().unwrap();
        let g2 = HostGraph::from_bytes(&bytes).unwrap();
        assert_eq!(g2.node_count(), 2);
    }

    #[test]
    fn rejects_unknown_schema_version() {
        let artifact = GraphArtifact {
            schema_version: 999,
            nodes: vec![],
            edges: vec![],
        };
        let bytes = bincode::serialize(&artifact).unwrap();
        assert!(HostGraph::from_bytes(&bytes).is_err());
    }
}
