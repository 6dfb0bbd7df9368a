use std::collections::{HashMap, VecDeque};

use serde::{Deserialize, Serialize};
use tracing::warn;

use pathway_core::config::LayoutConfig;
use pathway_core::types::{Edge, Node};

/// Center of a node on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// Side of a node an edge attaches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Top,
    Bottom,
    Left,
    Right,
}

/// Connector hint for rendering one edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeRoute {
    pub edge_id: String,
    pub source_side: Side,
    pub target_side: Side,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodePosition {
    pub id: String,
    pub position: Position,
}

/// Result of a layout pass. Positions follow node insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Layout {
    pub nodes: Vec<NodePosition>,
    pub routes: Vec<EdgeRoute>,
}

impl Layout {
    pub fn position(&self, id: &str) -> Option<Position> {
        self.nodes.iter().find(|n| n.id == id).map(|n| n.position)
    }

    pub fn route(&self, edge_id: &str) -> Option<&EdgeRoute> {
        self.routes.iter().find(|r| r.edge_id == edge_id)
    }
}

/// Deterministic top-to-bottom layered layout.
#[derive(Debug, Clone, Default)]
pub struct LayoutEngine {
    config: LayoutConfig,
}

impl LayoutEngine {
    pub fn new(config: LayoutConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Position every node and route every edge.
    ///
    /// Primary nodes are ranked by longest path from the roots. A broader
    /// node takes its parent's rank and is placed beside it after that rank
    /// is laid out; the k-th broader child of a parent goes right for even k,
    /// left for odd k, `k / 2 + 1` steps away.
    pub fn layout(&self, nodes: &[Node], edges: &[Edge]) -> Layout {
        let mut index: HashMap<&str, usize> = HashMap::new();
        for (i, node) in nodes.iter().enumerate() {
            index.entry(node.id.as_str()).or_insert(i);
        }

        let anchors = broader_anchors(nodes, edges, &index);

        // Edges resolved to indices, dropping any with unknown endpoints.
        let links: Vec<(usize, usize)> = edges
            .iter()
            .filter_map(|e| Some((*index.get(e.source.as_str())?, *index.get(e.target.as_str())?)))
            .collect();

        let ranks = self.rank(nodes, &links, &anchors);
        let positions = self.position(nodes, &links, &anchors, &ranks);

        let routes = edges
            .iter()
            .filter_map(|edge| {
                let s = *index.get(edge.source.as_str())?;
                let t = *index.get(edge.target.as_str())?;
                let (source_side, target_side) = if anchors[t].is_some() {
                    if positions[t].x > positions[s].x {
                        (Side::Right, Side::Left)
                    } else {
                        (Side::Left, Side::Right)
                    }
                } else {
                    (Side::Bottom, Side::Top)
                };
                Some(EdgeRoute {
                    edge_id: edge.id.clone(),
                    source_side,
                    target_side,
                })
            })
            .collect();

        Layout {
            nodes: nodes
                .iter()
                .zip(positions)
                .map(|(node, position)| NodePosition {
                    id: node.id.clone(),
                    position,
                })
                .collect(),
            routes,
        }
    }

    /// Longest-path ranks over primary edges. Broader nodes share their
    /// anchor's rank.
    fn rank(&self, nodes: &[Node], links: &[(usize, usize)], anchors: &[Option<usize>]) -> Vec<usize> {
        let n = nodes.len();
        let root = |mut i: usize| {
            while let Some(parent) = anchors[i] {
                i = parent;
            }
            i
        };

        // Edges into broader nodes never contribute to ranking.
        let mut preds: Vec<Vec<usize>> = vec![vec![]; n];
        let mut succs: Vec<Vec<usize>> = vec![vec![]; n];
        for &(s, t) in links {
            if anchors[t].is_some() {
                continue;
            }
            let s = root(s);
            if s == t {
                continue;
            }
            preds[t].push(s);
            succs[s].push(t);
        }

        let mut indegree: Vec<usize> = preds.iter().map(Vec::len).collect();
        let mut ranks = vec![0usize; n];
        let mut done = vec![false; n];
        let mut queue: VecDeque<usize> = (0..n)
            .filter(|&i| anchors[i].is_none() && indegree[i] == 0)
            .collect();

        while let Some(u) = queue.pop_front() {
            done[u] = true;
            for &v in &succs[u] {
                ranks[v] = ranks[v].max(ranks[u] + 1);
                indegree[v] -= 1;
                if indegree[v] == 0 {
                    queue.push_back(v);
                }
            }
        }

        // Anything left sits on a cycle.
        for i in 0..n {
            if anchors[i].is_some() || done[i] {
                continue;
            }
            warn!(node_id = %nodes[i].id, "Cycle in journey graph, ranking below placed predecessors");
            ranks[i] = preds[i]
                .iter()
                .filter(|&&p| done[p])
                .map(|&p| ranks[p] + 1)
                .max()
                .unwrap_or(0);
            done[i] = true;
        }

        for i in 0..n {
            if anchors[i].is_some() {
                ranks[i] = ranks[root(i)];
            }
        }
        ranks
    }

    fn position(
        &self,
        nodes: &[Node],
        links: &[(usize, usize)],
        anchors: &[Option<usize>],
        ranks: &[usize],
    ) -> Vec<Position> {
        let n = nodes.len();
        let spacing = self.config.node_width + self.config.node_sep;
        let rank_height = self.config.node_height + self.config.rank_sep;
        let step = self.config.broader_step();

        let mut preds: Vec<Vec<usize>> = vec![vec![]; n];
        for &(s, t) in links {
            if anchors[t].is_none() && s != t {
                preds[t].push(s);
            }
        }

        let max_rank = ranks.iter().copied().max().unwrap_or(0);
        let mut positions = vec![Position { x: 0.0, y: 0.0 }; n];
        let mut placed = vec![false; n];
        let mut fan_count: HashMap<usize, usize> = HashMap::new();

        for rank in 0..=max_rank {
            let y = rank as f64 * rank_height;

            // Primary row: each node aims for the mean x of its placed
            // predecessors, then the row is swept apart and re-centered.
            let mut row: Vec<(f64, usize)> = (0..n)
                .filter(|&i| anchors[i].is_none() && ranks[i] == rank)
                .map(|i| {
                    let xs: Vec<f64> = preds[i]
                        .iter()
                        .filter(|&&p| placed[p])
                        .map(|&p| positions[p].x)
                        .collect();
                    let desired = if xs.is_empty() {
                        0.0
                    } else {
                        xs.iter().sum::<f64>() / xs.len() as f64
                    };
                    (desired, i)
                })
                .collect();
            row.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

            let mut xs: Vec<f64> = Vec::with_capacity(row.len());
            for (k, &(desired, _)) in row.iter().enumerate() {
                let x = if k == 0 {
                    desired
                } else {
                    desired.max(xs[k - 1] + spacing)
                };
                xs.push(x);
            }
            if !row.is_empty() {
                let drift: f64 = row
                    .iter()
                    .zip(&xs)
                    .map(|(&(desired, _), &x)| x - desired)
                    .sum::<f64>()
                    / row.len() as f64;
                for (&(_, i), &x) in row.iter().zip(&xs) {
                    positions[i] = Position { x: x - drift, y };
                    placed[i] = true;
                }
            }

            // Broader fan-out, in creation order, anchored on already placed parents.
            for i in 0..n {
                let Some(parent) = anchors[i] else { continue };
                if ranks[i] != rank || !placed[parent] {
                    continue;
                }
                let k = fan_count.entry(parent).or_insert(0);
                let side = if *k % 2 == 0 { 1.0 } else { -1.0 };
                let multiplier = (*k / 2 + 1) as f64;
                *k += 1;

                let anchor = positions[parent];
                positions[i] = Position {
                    x: anchor.x + side * multiplier * step,
                    y: anchor.y,
                };
                placed[i] = true;
            }
        }

        positions
    }
}

/// The parent each broader node fans out from, by index.
///
/// The parent is `parent_id` when known, else the source of the first edge
/// into the node. Only parents created earlier count; anything else is laid
/// out as a primary node.
fn broader_anchors(nodes: &[Node], edges: &[Edge], index: &HashMap<&str, usize>) -> Vec<Option<usize>> {
    nodes
        .iter()
        .enumerate()
        .map(|(i, node)| {
            if !node.is_broader() {
                return None;
            }
            let from_parent = node.parent_id.as_deref().and_then(|p| index.get(p).copied());
            let from_edge = || {
                edges
                    .iter()
                    .find(|e| e.target == node.id)
                    .and_then(|e| index.get(e.source.as_str()).copied())
            };
            from_parent.or_else(from_edge).filter(|&p| p < i)
        })
        .collect()
}
