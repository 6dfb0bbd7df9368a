use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use pathway_core::error::{PathwayError, Result};
use pathway_core::event::EventBus;
use pathway_core::types::{
    Edge, GeneratedJourney, JourneyEvent, JourneyMode, JourneySnapshot, Node, NodeProgress,
    NodeStatus,
};
use pathway_graph::{GraphStore, Layout, LayoutEngine};

/// A user's curriculum graph with its progress and current layout.
///
/// The layout is recomputed whenever the graph gains nodes.
pub struct Journey {
    id: String,
    topic: String,
    mode: JourneyMode,
    user_level: Option<String>,
    graph: GraphStore,
    progress: BTreeMap<String, NodeProgress>,
    engine: LayoutEngine,
    layout: Layout,
    events: Option<Arc<EventBus>>,
}

impl Journey {
    fn build(
        id: String,
        topic: String,
        mode: JourneyMode,
        graph: GraphStore,
        engine: LayoutEngine,
    ) -> Self {
        let layout = engine.layout(graph.nodes(), graph.edges());
        Self {
            id,
            topic,
            mode,
            user_level: None,
            graph,
            progress: BTreeMap::new(),
            engine,
            layout,
            events: None,
        }
    }

    /// Seed a journey from a generation payload.
    pub fn from_generated(generated: GeneratedJourney, engine: LayoutEngine) -> Result<Self> {
        if generated.nodes.is_empty() {
            return Err(PathwayError::Validation(
                "generated journey has no nodes".into(),
            ));
        }
        let id = if generated.journey_id.is_empty() {
            Uuid::new_v4().to_string()
        } else {
            generated.journey_id
        };

        let edges = GraphStore::derive_edges(&generated.nodes);
        let graph = GraphStore::seed(generated.nodes, edges)?;
        info!(journey_id = %id, nodes = graph.len(), "Journey seeded");

        let mut journey = Self::build(id, generated.topic, generated.mode, graph, engine);
        journey.user_level = generated.user_level;
        Ok(journey)
    }

    /// Restore a journey from its persisted form.
    ///
    /// Ids listed in `completed_nodes` are restored as completed.
    pub fn from_snapshot(snapshot: JourneySnapshot, engine: LayoutEngine) -> Result<Self> {
        let mut nodes = snapshot.nodes;
        for node in &mut nodes {
            if snapshot.completed_nodes.contains(&node.id) {
                node.status = NodeStatus::Completed;
            }
        }
        let edges = GraphStore::derive_edges(&nodes);
        let graph = GraphStore::seed(nodes, edges)?;

        let mut journey = Self::build(
            snapshot.journey_id,
            snapshot.topic,
            snapshot.mode,
            graph,
            engine,
        );
        journey.progress = snapshot.node_progress;
        Ok(journey)
    }

    /// Publish status changes to `events`.
    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn snapshot(&self) -> JourneySnapshot {
        JourneySnapshot {
            journey_id: self.id.clone(),
            topic: self.topic.clone(),
            mode: self.mode,
            nodes: self.graph.nodes().to_vec(),
            completed_nodes: self.graph.completed_ids(),
            node_progress: self.progress.clone(),
            updated_at: Some(Utc::now()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn mode(&self) -> JourneyMode {
        self.mode
    }

    pub fn user_level(&self) -> Option<&str> {
        self.user_level.as_deref()
    }

    pub fn graph(&self) -> &GraphStore {
        &self.graph
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn progress(&self, node_id: &str) -> Option<&NodeProgress> {
        self.progress.get(node_id)
    }

    /// Mark a node completed. Returns the ids this unlocked.
    pub fn complete_node(&mut self, node_id: &str) -> Result<Vec<String>> {
        let unlocked = self.graph.transition(node_id, NodeStatus::Completed)?;
        self.publish_status(node_id, NodeStatus::Completed);
        for id in &unlocked {
            self.publish_status(id, NodeStatus::Active);
        }
        info!(journey_id = %self.id, node_id, unlocked = unlocked.len(), "Node completed");
        Ok(unlocked)
    }

    pub fn record_progress(
        &mut self,
        node_id: &str,
        completed_steps: usize,
        current_step_index: usize,
    ) -> Result<()> {
        if !self.graph.contains(node_id) {
            return Err(PathwayError::Validation(format!("unknown node {}", node_id)));
        }
        self.progress.insert(
            node_id.to_string(),
            NodeProgress {
                completed_steps,
                current_step_index,
            },
        );
        Ok(())
    }

    /// Commit an expansion and refresh the layout.
    pub(crate) fn commit_expansion(&mut self, node: Node, edge: Edge) -> Result<()> {
        self.graph.commit(node, edge)?;
        self.layout = self.engine.layout(self.graph.nodes(), self.graph.edges());
        debug!(journey_id = %self.id, nodes = self.graph.len(), "Layout recomputed");
        Ok(())
    }

    pub(crate) fn events(&self) -> Option<&Arc<EventBus>> {
        self.events.as_ref()
    }

    fn publish_status(&self, node_id: &str, status: NodeStatus) {
        if let Some(events) = &self.events {
            events.publish(JourneyEvent::StatusChanged {
                journey_id: self.id.clone(),
                node_id: node_id.to_string(),
                status,
            });
        }
    }
}
