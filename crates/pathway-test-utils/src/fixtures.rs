use pathway_core::config::{ApiConfig, PathwayConfig};
use pathway_core::types::{ExpansionType, GeneratedJourney, JourneyMode, Node, NodeStatus};

/// Config used across tests: defaults, so timings match documented policy.
pub fn test_config() -> PathwayConfig {
    PathwayConfig::default()
}

/// Full URL of an endpoint under the default base url.
pub fn api_url(path: &str) -> String {
    ApiConfig::default().url(path)
}

/// `n1 .. nN` as a plain chain; the first node is active.
pub fn linear_nodes(count: usize) -> Vec<Node> {
    (1..=count)
        .map(|i| {
            let node = Node::new(format!("n{}", i), format!("Module {}", i));
            if i == 1 {
                node.with_status(NodeStatus::Active)
            } else {
                node
            }
        })
        .collect()
}

pub fn generated_journey(count: usize) -> GeneratedJourney {
    GeneratedJourney {
        journey_id: "journey-1".into(),
        topic: "Algorithms".into(),
        mode: JourneyMode::Topic,
        user_level: Some("Beginner".into()),
        nodes: linear_nodes(count),
    }
}

/// Body the expand endpoint returns for a new node under `parent`.
pub fn expand_body(parent: &str, id: &str, title: &str, kind: ExpansionType) -> serde_json::Value {
    serde_json::json!({
        "node": {
            "id": id,
            "title": title,
            "status": "active",
            "prerequisites": [parent],
            "parent_id": parent,
            "expansion_type": kind,
        },
        "edge": {
            "id": format!("{}-{}", parent, id),
            "source": parent,
            "target": id,
            "type": "smoothstep",
        },
        "success": true,
    })
}
