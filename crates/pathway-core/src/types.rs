use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Progress status of a journey node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    #[default]
    Locked,
    Active,
    Completed,
}

impl NodeStatus {
    /// Whether the state machine permits moving from `self` to `next`.
    pub fn can_transition_to(self, next: NodeStatus) -> bool {
        matches!(
            (self, next),
            (NodeStatus::Locked, NodeStatus::Active) | (NodeStatus::Active, NodeStatus::Completed)
        )
    }
}

impl std::fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeStatus::Locked => write!(f, "locked"),
            NodeStatus::Active => write!(f, "active"),
            NodeStatus::Completed => write!(f, "completed"),
        }
    }
}

/// How an expanded node relates to the node it grew from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpansionType {
    /// A sub-topic one level below the parent.
    Deeper,
    /// A sibling topic at the parent's depth.
    Broader,
}

impl std::fmt::Display for ExpansionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExpansionType::Deeper => write!(f, "deeper"),
            ExpansionType::Broader => write!(f, "broader"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepKind {
    Theory,
    Code,
    Quiz,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    #[default]
    Locked,
    Unlocked,
    Completed,
}

/// A single lesson step inside a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: StepKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
    #[serde(default)]
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A learning module in the journey graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    /// Immutable once assigned.
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub status: NodeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, alias = "parent_id", skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default, alias = "expansion_type", skip_serializing_if = "Option::is_none")]
    pub expansion_type: Option<ExpansionType>,
    #[serde(default)]
    pub prerequisites: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<Step>,
}

impl Node {
    /// Create a locked node with no prerequisites.
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            status: NodeStatus::Locked,
            description: None,
            parent_id: None,
            expansion_type: None,
            prerequisites: vec![],
            steps: vec![],
        }
    }

    pub fn with_status(mut self, status: NodeStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_prerequisites(mut self, prerequisites: Vec<String>) -> Self {
        self.prerequisites = prerequisites;
        self
    }

    /// Mark this node as expanded from `parent`.
    pub fn expanded_from(mut self, parent: impl Into<String>, kind: ExpansionType) -> Self {
        self.parent_id = Some(parent.into());
        self.expansion_type = Some(kind);
        self
    }

    pub fn is_broader(&self) -> bool {
        self.expansion_type == Some(ExpansionType::Broader)
    }
}

/// A directed connection between two nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub id: String,
    pub source: String,
    pub target: String,
}

impl Edge {
    /// Create an edge with the conventional `{source}-{target}` id.
    pub fn between(source: impl Into<String>, target: impl Into<String>) -> Self {
        let source = source.into();
        let target = target.into();
        Self {
            id: format!("{}-{}", source, target),
            source,
            target,
        }
    }
}

/// How the journey was originally generated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JourneyMode {
    Syllabus,
    #[default]
    Topic,
}

/// Per-node lesson progress.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeProgress {
    pub completed_steps: usize,
    pub current_step_index: usize,
}

/// Externally persisted form of a journey.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JourneySnapshot {
    #[serde(alias = "journey_id")]
    pub journey_id: String,
    pub topic: String,
    #[serde(default)]
    pub mode: JourneyMode,
    pub nodes: Vec<Node>,
    #[serde(default, alias = "completed_nodes")]
    pub completed_nodes: Vec<String>,
    #[serde(default, alias = "node_progress")]
    pub node_progress: BTreeMap<String, NodeProgress>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Snapshots keyed by journey id, the persisted document layout.
pub type SnapshotMap = BTreeMap<String, JourneySnapshot>;

/// Journey payload produced by the generation service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedJourney {
    /// Empty when the service did not assign one.
    #[serde(default, alias = "journeyId")]
    pub journey_id: String,
    pub topic: String,
    #[serde(default)]
    pub mode: JourneyMode,
    #[serde(default, alias = "userLevel", skip_serializing_if = "Option::is_none")]
    pub user_level: Option<String>,
    pub nodes: Vec<Node>,
}

/// Events published while a journey evolves.
#[derive(Debug, Clone)]
pub enum JourneyEvent {
    NodeExpanded {
        journey_id: String,
        node_id: String,
        parent_id: String,
        expansion_type: ExpansionType,
    },
    StatusChanged {
        journey_id: String,
        node_id: String,
        status: NodeStatus,
    },
    JourneySeeded {
        journey_id: String,
        nodes: usize,
    },
}

impl JourneyEvent {
    pub fn journey_id(&self) -> &str {
        match self {
            JourneyEvent::NodeExpanded { journey_id, .. }
            | JourneyEvent::StatusChanged { journey_id, .. }
            | JourneyEvent::JourneySeeded { journey_id, .. } => journey_id,
        }
    }
}
