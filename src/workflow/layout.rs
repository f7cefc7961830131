//! Left-to-right layered layout of the workflow chart.
//!
//! The live chart is loaded into a `petgraph` digraph with cycle-closing
//! edges removed. Ranks are longest paths over its topological order, nodes
//! inside a rank are ordered by the barycenter of their parents, and
//! coordinates use fixed rank/node separation. Same input, same output.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use petgraph::Direction;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{DfsEvent, depth_first_search};
use serde::{Deserialize, Serialize};

use crate::workflow::graph::{GraphNode, Link, NodeId, START_NODE_ID};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NodePosition {
    /// Left edge.
    pub x: f64,
    /// Top edge.
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl NodePosition {
    pub fn contains(&self, px: f64, py: f64) -> bool {
        px >= self.x && px <= self.x + self.width && py >= self.y && py <= self.y + self.height
    }

    pub fn center_y(&self) -> f64 {
        self.y + self.height / 2.0
    }
}

pub type PositionMap = BTreeMap<NodeId, NodePosition>;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutConfig {
    pub rank_sep: f64,
    pub node_sep: f64,
    pub node_width: f64,
    pub node_height: f64,
    pub root_width: f64,
    pub root_height: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            rank_sep: 120.0,
            node_sep: 30.0,
            node_width: 180.0,
            node_height: 60.0,
            root_width: 72.0,
            root_height: 40.0,
        }
    }
}

impl LayoutConfig {
    fn size_of(&self, id: NodeId) -> (f64, f64) {
        if id == START_NODE_ID {
            (self.root_width, self.root_height)
        } else {
            (self.node_width, self.node_height)
        }
    }
}

/// Live chart as a digraph, node weights are chart ids.
type ChartGraph = DiGraph<NodeId, ()>;

pub fn layout(nodes: &[GraphNode], links: &[Link], config: &LayoutConfig) -> PositionMap {
    let graph = acyclic_graph(nodes, links);
    let ranks = assign_ranks(&graph);
    let layers = order_layers(&graph, &ranks);
    place(&graph, &layers, config)
}

/// Builds the live (non-deleted) chart and drops the edges that close a
/// cycle, found as DFS back edges walking from the lowest ids.
fn acyclic_graph(nodes: &[GraphNode], links: &[Link]) -> ChartGraph {
    let live: BTreeSet<NodeId> = nodes.iter().filter(|n| !n.is_deleted).map(|n| n.id).collect();
    let mut graph = ChartGraph::with_capacity(live.len(), links.len());
    let index: BTreeMap<NodeId, NodeIndex> = live.iter().map(|&id| (id, graph.add_node(id))).collect();

    let mut edges: Vec<(NodeIndex, NodeIndex)> = links
        .iter()
        .filter_map(|link| Some((*index.get(&link.source)?, *index.get(&link.target)?)))
        .filter(|(s, t)| s != t)
        .collect();
    edges.sort_unstable();
    edges.dedup();
    // petgraph walks the newest edge first; adding in reverse makes the DFS
    // visit children in ascending id order.
    for &(s, t) in edges.iter().rev() {
        graph.add_edge(s, t, ());
    }

    let mut back_edges = Vec::new();
    depth_first_search(&graph, graph.node_indices(), |event| {
        if let DfsEvent::BackEdge(u, v) = event {
            back_edges.push((u, v));
        }
    });
    for (u, v) in back_edges {
        if let Some(edge) = graph.find_edge(u, v) {
            graph.remove_edge(edge);
        }
    }
    graph
}

/// Longest-path layering over a topological order.
fn assign_ranks(graph: &ChartGraph) -> HashMap<NodeIndex, usize> {
    let order = toposort(graph, None).unwrap_or_else(|_| graph.node_indices().collect());
    let mut ranks: HashMap<NodeIndex, usize> = HashMap::with_capacity(order.len());
    for idx in order {
        let rank = graph
            .neighbors_directed(idx, Direction::Incoming)
            .filter_map(|p| ranks.get(&p))
            .map(|r| r + 1)
            .max()
            .unwrap_or(0);
        ranks.insert(idx, rank);
    }
    ranks
}

/// Groups nodes by rank and orders every rank below the first by the mean
/// index of their parents (ties by id).
fn order_layers(graph: &ChartGraph, ranks: &HashMap<NodeIndex, usize>) -> Vec<Vec<NodeIndex>> {
    let depth = ranks.values().max().map(|m| m + 1).unwrap_or(0);
    let mut layers: Vec<Vec<NodeIndex>> = vec![Vec::new(); depth];
    for idx in graph.node_indices() {
        if let Some(&rank) = ranks.get(&idx) {
            layers[rank].push(idx);
        }
    }

    let mut position: HashMap<NodeIndex, f64> = HashMap::new();
    for (rank, layer) in layers.iter_mut().enumerate() {
        if rank > 0 {
            let mut keyed: Vec<(f64, NodeId, NodeIndex)> = layer
                .iter()
                .map(|&idx| {
                    let parents: Vec<f64> = graph
                        .neighbors_directed(idx, Direction::Incoming)
                        .filter_map(|p| position.get(&p).copied())
                        .collect();
                    let key = if parents.is_empty() {
                        f64::MAX
                    } else {
                        parents.iter().sum::<f64>() / parents.len() as f64
                    };
                    (key, graph[idx], idx)
                })
                .collect();
            keyed.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
            *layer = keyed.into_iter().map(|(_, _, idx)| idx).collect();
        }
        for (i, idx) in layer.iter().enumerate() {
            position.insert(*idx, i as f64);
        }
    }
    layers
}

fn place(graph: &ChartGraph, layers: &[Vec<NodeIndex>], config: &LayoutConfig) -> PositionMap {
    let mut positions = PositionMap::new();
    let mut x = 0.0;

    for layer in layers {
        let ids: Vec<NodeId> = layer.iter().map(|idx| graph[*idx]).collect();
        let sizes: Vec<(f64, f64)> = ids.iter().map(|id| config.size_of(*id)).collect();
        let column_width = sizes.iter().map(|s| s.0).fold(0.0, f64::max);
        let column_height: f64 = sizes.iter().map(|s| s.1).sum::<f64>()
            + config.node_sep * (layer.len().saturating_sub(1)) as f64;

        // Columns are centred on y = 0.
        let mut y = -column_height / 2.0;
        for (id, (width, height)) in ids.iter().zip(sizes) {
            positions.insert(
                *id,
                NodePosition {
                    x: x + (column_width - width) / 2.0,
                    y,
                    width,
                    height,
                },
            );
            y += height + config.node_sep;
        }
        x += column_width + config.rank_sep;
    }
    positions
}

/// Shifts a y coordinate so START stays put while nodes come and go.
pub fn normalize_y(positions: &PositionMap, y: f64) -> f64 {
    match positions.get(&START_NODE_ID) {
        Some(root) => y - root.y,
        None => y,
    }
}

/// Endpoints of a link: right edge middle of the source to left edge middle of
/// the target.
pub fn link_endpoints(positions: &PositionMap, link: &Link) -> Option<((f64, f64), (f64, f64))> {
    let source = positions.get(&link.source)?;
    let target = positions.get(&link.target)?;
    Some((
        (source.x + source.width + 1.0, source.center_y()),
        (target.x - 1.0, target.center_y()),
    ))
}
