use std::collections::HashMap;

use tracing::{debug, info};

use pathway_core::error::{PathwayError, Result};
use pathway_core::types::{Edge, Node, NodeStatus};

/// Canonical node/edge collection for one journey.
#[derive(Debug, Clone, Default)]
pub struct GraphStore {
    nodes: Vec<Node>,
    index: HashMap<String, usize>,
    edges: Vec<Edge>,
}

impl GraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from a generated or restored graph.
    ///
    /// Statuses on the nodes are kept. When no node has been started, the
    /// first becomes active. The frontier is then unlocked so satisfied
    /// prerequisites are reflected.
    pub fn seed(nodes: Vec<Node>, edges: Vec<Edge>) -> Result<Self> {
        let mut store = Self::new();
        for node in nodes {
            if store.index.contains_key(&node.id) {
                return Err(PathwayError::Validation(format!(
                    "duplicate node id {}",
                    node.id
                )));
            }
            store.index.insert(node.id.clone(), store.nodes.len());
            store.nodes.push(node);
        }
        for edge in &edges {
            store.check_endpoints(edge, None)?;
        }
        store.edges = edges;

        let started = store
            .nodes
            .iter()
            .any(|n| n.status != NodeStatus::Locked);
        if !started {
            if let Some(first) = store.nodes.first_mut() {
                first.status = NodeStatus::Active;
            }
        }
        store.unlock_frontier();

        debug!(nodes = store.nodes.len(), edges = store.edges.len(), "Seeded graph");
        Ok(store)
    }

    /// Edges implied by prerequisites. A node with none hangs off the node
    /// it was expanded from, or else its predecessor.
    pub fn derive_edges(nodes: &[Node]) -> Vec<Edge> {
        let mut edges = Vec::new();
        for (i, node) in nodes.iter().enumerate() {
            if node.prerequisites.is_empty() {
                if let Some(parent) = &node.parent_id {
                    edges.push(Edge::between(parent.clone(), node.id.clone()));
                } else if i > 0 {
                    edges.push(Edge::between(nodes[i - 1].id.clone(), node.id.clone()));
                }
            } else {
                for prereq in &node.prerequisites {
                    edges.push(Edge::between(prereq.clone(), node.id.clone()));
                }
            }
        }
        edges
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn completed_ids(&self) -> Vec<String> {
        self.nodes
            .iter()
            .filter(|n| n.status == NodeStatus::Completed)
            .map(|n| n.id.clone())
            .collect()
    }

    /// Nodes currently available to work on.
    pub fn frontier(&self) -> Vec<&Node> {
        self.nodes
            .iter()
            .filter(|n| n.status == NodeStatus::Active)
            .collect()
    }

    /// Append `node` and `edge` together, or neither.
    pub fn commit(&mut self, node: Node, edge: Edge) -> Result<()> {
        if node.id.is_empty() {
            return Err(PathwayError::Validation("node id is empty".into()));
        }
        if self.contains(&node.id) {
            return Err(PathwayError::Validation(format!(
                "node id {} already exists",
                node.id
            )));
        }
        if edge.source != node.id && edge.target != node.id {
            return Err(PathwayError::Validation(format!(
                "edge {} does not connect node {}",
                edge.id, node.id
            )));
        }
        self.check_endpoints(&edge, Some(&node.id))?;

        info!(node_id = %node.id, edge_id = %edge.id, "Committed node");
        self.index.insert(node.id.clone(), self.nodes.len());
        self.nodes.push(node);
        self.edges.push(edge);
        Ok(())
    }

    /// Move a node to `status`. Returns ids unlocked as a consequence.
    ///
    /// Activating a locked node requires its unlock condition to hold.
    pub fn transition(&mut self, id: &str, status: NodeStatus) -> Result<Vec<String>> {
        let i = *self
            .index
            .get(id)
            .ok_or_else(|| PathwayError::Validation(format!("unknown node {}", id)))?;

        let from = self.nodes[i].status;
        let gated = status == NodeStatus::Active && !self.is_unlockable(i);
        if !from.can_transition_to(status) || gated {
            return Err(PathwayError::InvalidTransition {
                node_id: id.to_string(),
                from,
                to: status,
            });
        }
        self.nodes[i].status = status;
        debug!(node_id = %id, %from, to = %status, "Node transitioned");

        if status == NodeStatus::Completed {
            Ok(self.unlock_frontier())
        } else {
            Ok(vec![])
        }
    }

    /// Activate every locked node whose unlock condition now holds.
    pub fn unlock_frontier(&mut self) -> Vec<String> {
        let ready: Vec<usize> = (0..self.nodes.len())
            .filter(|&i| self.nodes[i].status == NodeStatus::Locked && self.is_unlockable(i))
            .collect();

        ready
            .into_iter()
            .map(|i| {
                self.nodes[i].status = NodeStatus::Active;
                debug!(node_id = %self.nodes[i].id, "Node unlocked");
                self.nodes[i].id.clone()
            })
            .collect()
    }

    fn is_unlockable(&self, i: usize) -> bool {
        let node = &self.nodes[i];
        if node.prerequisites.is_empty() {
            return i == 0 || self.nodes[i - 1].status == NodeStatus::Completed;
        }
        node.prerequisites
            .iter()
            .all(|p| self.node(p).is_some_and(|n| n.status == NodeStatus::Completed))
    }

    fn check_endpoints(&self, edge: &Edge, pending: Option<&str>) -> Result<()> {
        for endpoint in [&edge.source, &edge.target] {
            if !self.contains(endpoint) && pending != Some(endpoint.as_str()) {
                return Err(PathwayError::Validation(format!(
                    "edge {} references unknown node {}",
                    edge.id, endpoint
                )));
            }
        }
        Ok(())
    }
}
