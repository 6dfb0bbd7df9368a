use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use pathway_core::api::{ExpandRequest, SuggestRequest};
use pathway_core::error::{PathwayError, Result};
use pathway_core::traits::JourneyApi;
use pathway_core::types::{Edge, ExpansionType, JourneyEvent, Node, NodeStatus};

use crate::journey::Journey;

const MAX_SUGGESTIONS: usize = 4;

/// The node and edge an expansion committed.
#[derive(Debug, Clone, PartialEq)]
pub struct Expansion {
    pub node: Node,
    pub edge: Edge,
}

/// Topic suggestions used when the service cannot provide any.
pub fn fallback_suggestions(parent: &str, kind: ExpansionType) -> Vec<String> {
    match kind {
        ExpansionType::Deeper => vec![
            format!("Advanced {}", parent),
            format!("{} in Practice", parent),
            format!("{} Patterns", parent),
            format!("Beyond {}", parent),
        ],
        ExpansionType::Broader => vec![
            format!("Related to {}", parent),
            format!("Alternative to {}", parent),
            "Complementary Skills".to_string(),
            "Next Steps".to_string(),
        ],
    }
}

/// Grows a journey one node at a time from completed nodes.
pub struct ExpansionController {
    api: Arc<dyn JourneyApi>,
}

impl ExpansionController {
    pub fn new(api: Arc<dyn JourneyApi>) -> Self {
        Self { api }
    }

    /// Candidate topics for expanding from `parent_id`.
    ///
    /// A failed or empty suggestion call falls back to derived titles.
    pub async fn suggestions(
        &self,
        journey: &Journey,
        parent_id: &str,
        kind: ExpansionType,
    ) -> Result<Vec<String>> {
        let parent = journey
            .graph()
            .node(parent_id)
            .ok_or_else(|| PathwayError::Validation(format!("unknown node {}", parent_id)))?;

        let request = SuggestRequest {
            parent_topic: parent.title.clone(),
            expansion_type: kind,
            context: Some(journey.topic().to_string()),
        };

        let suggestions: Vec<String> = match self.api.suggest_topics(request).await {
            Ok(response) => response
                .suggestions
                .into_iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .take(MAX_SUGGESTIONS)
                .collect(),
            Err(e) => {
                warn!(parent_id, error = %e, "Topic suggestions unavailable, using fallback");
                vec![]
            }
        };

        if suggestions.is_empty() {
            debug!(parent_id, %kind, "Using fallback suggestions");
            return Ok(fallback_suggestions(&parent.title, kind));
        }
        Ok(suggestions)
    }

    /// Expand `journey` from a completed node with a new topic.
    ///
    /// The journey is untouched unless the service call succeeds and the
    /// returned node commits cleanly.
    pub async fn expand(
        &self,
        journey: &mut Journey,
        parent_id: &str,
        title: &str,
        kind: ExpansionType,
    ) -> Result<Expansion> {
        let title = title.trim();
        if title.is_empty() {
            return Err(PathwayError::Validation("expansion title is empty".into()));
        }
        let parent = journey
            .graph()
            .node(parent_id)
            .ok_or_else(|| PathwayError::Validation(format!("unknown node {}", parent_id)))?;
        if parent.status != NodeStatus::Completed {
            return Err(PathwayError::Validation(format!(
                "node {} must be completed before expanding, it is {}",
                parent_id, parent.status
            )));
        }

        let request = ExpandRequest {
            journey_id: journey.id().to_string(),
            parent_node_id: parent_id.to_string(),
            expansion_type: kind,
            topic: title.to_string(),
        };
        let response = self.api.expand(request).await?;

        let mut returned = response.node;
        let id = match returned.id.take().filter(|id| !id.is_empty()) {
            Some(id) => id,
            None => {
                let id = format!("local-{}", Uuid::new_v4());
                warn!(parent_id, node_id = %id, "Expansion returned no node id, assigned one");
                id
            }
        };
        returned
            .rest
            .entry("title")
            .or_insert_with(|| serde_json::Value::String(title.to_string()));

        let mut node = returned.into_node(id)?.expanded_from(parent_id, kind);
        if node.status != NodeStatus::Active {
            warn!(node_id = %node.id, status = %node.status, "Expanded node normalised to active");
            node.status = NodeStatus::Active;
        }
        let edge = response
            .edge
            .unwrap_or_else(|| Edge::between(parent_id, node.id.clone()));
        if edge.source != parent_id || edge.target != node.id {
            return Err(PathwayError::Validation(format!(
                "edge {} must run from {} to {}",
                edge.id, parent_id, node.id
            )));
        }

        journey.commit_expansion(node.clone(), edge.clone())?;
        info!(
            journey_id = %journey.id(),
            parent_id,
            node_id = %node.id,
            %kind,
            "Journey expanded"
        );

        if let Some(events) = journey.events() {
            events.publish(JourneyEvent::NodeExpanded {
                journey_id: journey.id().to_string(),
                node_id: node.id.clone(),
                parent_id: parent_id.to_string(),
                expansion_type: kind,
            });
        }

        Ok(Expansion { node, edge })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pathway_core::event::EventBus;
    use pathway_core::traits::Method;
    use pathway_graph::LayoutEngine;
    use pathway_net::ApiClient;
    use pathway_test_utils::{fixtures, MockTransport};
    use serde_json::json;

    fn controller(transport: Arc<MockTransport>) -> ExpansionController {
        let api = Arc::new(ApiClient::from_config(transport, &fixtures::test_config()));
        ExpansionController::new(api)
    }

    /// `count` chained nodes with the first `completed` of them finished.
    fn journey_completed_through(count: usize, completed: usize) -> Journey {
        let mut journey =
            Journey::from_generated(fixtures::generated_journey(count), LayoutEngine::default())
                .unwrap();
        for i in 1..=completed {
            journey.complete_node(&format!("n{}", i)).unwrap();
        }
        journey
    }

    fn expand_url() -> String {
        fixtures::api_url("/expand")
    }

    #[tokio::test(start_paused = true)]
    async fn expand_deeper_commits_one_node_and_edge() {
        let transport = Arc::new(MockTransport::new());
        transport.respond(
            Method::Post,
            &expand_url(),
            200,
            fixtures::expand_body("n5", "n7", "QuickSort", ExpansionType::Deeper),
        );
        let controller = controller(transport.clone());
        let mut journey = journey_completed_through(6, 5);
        let before_nodes = journey.graph().len();
        let before_edges = journey.graph().edges().len();

        let expansion = controller
            .expand(&mut journey, "n5", "QuickSort", ExpansionType::Deeper)
            .await
            .unwrap();

        assert_eq!(journey.graph().len(), before_nodes + 1);
        assert_eq!(journey.graph().edges().len(), before_edges + 1);
        assert_eq!(expansion.node.id, "n7");
        assert_eq!(expansion.node.status, NodeStatus::Active);
        assert_eq!(expansion.edge.source, "n5");
        assert_eq!(expansion.edge.target, "n7");
        assert_eq!(journey.graph().node("n7").unwrap().status, NodeStatus::Active);
        assert!(journey.layout().position("n7").is_some());

        let body = transport.calls()[0].request.body.clone().unwrap();
        assert_eq!(body["topic"], "QuickSort");
        assert_eq!(body["journey_id"], "journey-1");
    }

    #[tokio::test(start_paused = true)]
    async fn expand_from_unfinished_parent_is_rejected_without_calls() {
        let transport = Arc::new(MockTransport::new());
        let controller = controller(transport.clone());
        let mut journey = journey_completed_through(6, 4);

        let err = controller
            .expand(&mut journey, "n5", "QuickSort", ExpansionType::Deeper)
            .await
            .unwrap_err();

        assert!(matches!(err, PathwayError::Validation(_)));
        assert_eq!(journey.graph().len(), 6);
        assert_eq!(journey.graph().edges().len(), 5);
        assert!(transport.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn blank_title_and_unknown_parent_are_rejected() {
        let transport = Arc::new(MockTransport::new());
        let controller = controller(transport.clone());
        let mut journey = journey_completed_through(2, 1);

        let blank = controller
            .expand(&mut journey, "n1", "   ", ExpansionType::Broader)
            .await;
        assert!(matches!(blank, Err(PathwayError::Validation(_))));

        let unknown = controller
            .expand(&mut journey, "ghost", "Heaps", ExpansionType::Broader)
            .await;
        assert!(matches!(unknown, Err(PathwayError::Validation(_))));
        assert!(transport.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn network_failure_leaves_graph_untouched() {
        let transport = Arc::new(MockTransport::new());
        transport.fail(
            Method::Post,
            &expand_url(),
            PathwayError::Network("connection refused".into()),
        );
        let controller = controller(transport.clone());
        let mut journey = journey_completed_through(6, 5);

        let err = controller
            .expand(&mut journey, "n5", "QuickSort", ExpansionType::Deeper)
            .await
            .unwrap_err();

        assert_eq!(err, PathwayError::Network("connection refused".into()));
        assert_eq!(journey.graph().len(), 6);
        assert_eq!(journey.graph().edges().len(), 5);
        assert_eq!(transport.call_count(Method::Post, &expand_url()), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn client_error_surfaces_unchanged() {
        let transport = Arc::new(MockTransport::new());
        transport.respond(
            Method::Post,
            &expand_url(),
            400,
            json!({"error": "Missing required fields"}),
        );
        let controller = controller(transport.clone());
        let mut journey = journey_completed_through(2, 1);

        let err = controller
            .expand(&mut journey, "n1", "Heaps", ExpansionType::Broader)
            .await
            .unwrap_err();

        assert_eq!(
            err,
            PathwayError::Client {
                status: 400,
                message: "Missing required fields".into()
            }
        );
        assert_eq!(journey.graph().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn missing_id_and_edge_are_filled_in() {
        let transport = Arc::new(MockTransport::new());
        transport.respond(
            Method::Post,
            &expand_url(),
            200,
            json!({"node": {"title": "Heaps", "status": "locked"}}),
        );
        let controller = controller(transport);
        let mut journey = journey_completed_through(2, 1);

        let expansion = controller
            .expand(&mut journey, "n1", "Heaps", ExpansionType::Broader)
            .await
            .unwrap();

        assert!(expansion.node.id.starts_with("local-"));
        assert_eq!(expansion.node.status, NodeStatus::Active);
        assert_eq!(expansion.node.parent_id.as_deref(), Some("n1"));
        assert!(expansion.node.is_broader());
        assert_eq!(expansion.edge.id, format!("n1-{}", expansion.node.id));
        assert_eq!(journey.graph().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn reused_server_id_is_rejected() {
        let transport = Arc::new(MockTransport::new());
        transport.respond(
            Method::Post,
            &expand_url(),
            200,
            fixtures::expand_body("n1", "n2", "Again", ExpansionType::Deeper),
        );
        let controller = controller(transport);
        let mut journey = journey_completed_through(2, 1);

        let err = controller
            .expand(&mut journey, "n1", "Again", ExpansionType::Deeper)
            .await
            .unwrap_err();

        assert!(matches!(err, PathwayError::Validation(_)));
        assert_eq!(journey.graph().len(), 2);
        assert_eq!(journey.graph().edges().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn edge_from_another_node_is_rejected() {
        let transport = Arc::new(MockTransport::new());
        transport.respond(
            Method::Post,
            &expand_url(),
            200,
            json!({
                "node": {"id": "n9", "title": "Heaps", "status": "active"},
                "edge": {"id": "n3-n9", "source": "n3", "target": "n9"},
            }),
        );
        let controller = controller(transport);
        let mut journey = journey_completed_through(3, 1);

        let err = controller
            .expand(&mut journey, "n1", "Heaps", ExpansionType::Deeper)
            .await
            .unwrap_err();

        assert!(matches!(err, PathwayError::Validation(_)));
        assert!(!journey.graph().contains("n9"));
        let edge_ids: Vec<&str> = journey.graph().edges().iter().map(|e| e.id.as_str()).collect();
        assert_eq!(edge_ids, vec!["n1-n2", "n2-n3"]);
    }

    #[tokio::test(start_paused = true)]
    async fn broader_expansions_fan_out_beside_parent() {
        let transport = Arc::new(MockTransport::new());
        for id in ["b1", "b2", "b3"] {
            transport.respond(
                Method::Post,
                &expand_url(),
                200,
                fixtures::expand_body("n1", id, id, ExpansionType::Broader),
            );
        }
        let controller = controller(transport);
        let mut journey = journey_completed_through(1, 1);
        let origin = journey.layout().position("n1").unwrap();

        for title in ["Graphs", "Heaps", "Tries"] {
            controller
                .expand(&mut journey, "n1", title, ExpansionType::Broader)
                .await
                .unwrap();
        }

        let step = LayoutEngine::default().config().broader_step();
        let parent = journey.layout().position("n1").unwrap();
        assert_eq!(parent, origin);
        let offsets: Vec<f64> = ["b1", "b2", "b3"]
            .iter()
            .map(|id| journey.layout().position(id).unwrap().x - parent.x)
            .collect();
        assert_eq!(offsets, vec![step, -step, 2.0 * step]);
        for id in ["b1", "b2", "b3"] {
            assert_eq!(journey.layout().position(id).unwrap().y, parent.y);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn expand_publishes_event() {
        let transport = Arc::new(MockTransport::new());
        transport.respond(
            Method::Post,
            &expand_url(),
            200,
            fixtures::expand_body("n1", "n3", "Heaps", ExpansionType::Deeper),
        );
        let controller = controller(transport);
        let bus = Arc::new(EventBus::default());
        let mut journey = journey_completed_through(2, 1).with_events(bus.clone());
        let mut rx = bus.subscribe();

        controller
            .expand(&mut journey, "n1", "Heaps", ExpansionType::Deeper)
            .await
            .unwrap();

        let event = rx.recv().await.unwrap();
        assert!(matches!(
            event,
            JourneyEvent::NodeExpanded { ref node_id, ref parent_id, expansion_type: ExpansionType::Deeper, .. }
                if node_id == "n3" && parent_id == "n1"
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn suggestions_from_service_are_trimmed_and_capped() {
        let transport = Arc::new(MockTransport::new());
        transport.respond(
            Method::Post,
            &fixtures::api_url("/suggest-topics"),
            200,
            json!({"suggestions": [" Heaps ", "", "Tries", "Graphs", "Hashing", "Extra"]}),
        );
        let controller = controller(transport.clone());
        let journey = journey_completed_through(2, 1);

        let suggestions = controller
            .suggestions(&journey, "n1", ExpansionType::Broader)
            .await
            .unwrap();

        assert_eq!(suggestions, vec!["Heaps", "Tries", "Graphs", "Hashing"]);
        let body = transport.calls()[0].request.body.clone().unwrap();
        assert_eq!(body["parent_topic"], "Module 1");
        assert_eq!(body["context"], "Algorithms");
    }

    #[tokio::test(start_paused = true)]
    async fn suggestions_fall_back_on_failure() {
        let transport = Arc::new(MockTransport::new());
        transport.respond(
            Method::Post,
            &fixtures::api_url("/suggest-topics"),
            503,
            json!({"error": "unavailable"}),
        );
        let controller = controller(transport);
        let journey = journey_completed_through(2, 1);

        let suggestions = controller
            .suggestions(&journey, "n1", ExpansionType::Deeper)
            .await
            .unwrap();

        assert_eq!(suggestions, fallback_suggestions("Module 1", ExpansionType::Deeper));
        assert_eq!(suggestions[0], "Advanced Module 1");
        assert_eq!(suggestions[1], "Module 1 in Practice");
    }

    #[tokio::test(start_paused = true)]
    async fn empty_suggestions_fall_back() {
        let transport = Arc::new(MockTransport::new());
        transport.respond(
            Method::Post,
            &fixtures::api_url("/suggest-topics"),
            200,
            json!({"suggestions": []}),
        );
        let controller = controller(transport);
        let journey = journey_completed_through(1, 0);

        let suggestions = controller
            .suggestions(&journey, "n1", ExpansionType::Broader)
            .await
            .unwrap();

        assert_eq!(suggestions.len(), 4);
        assert_eq!(suggestions[0], "Related to Module 1");
    }
}
