//! Wire types for the generation service endpoints.

use serde::{Deserialize, Serialize};

use crate::types::{Edge, ExpansionType, GeneratedJourney, Node};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpandRequest {
    pub journey_id: String,
    pub parent_node_id: String,
    pub expansion_type: ExpansionType,
    pub topic: String,
}

/// Response of the expand endpoint. Either half may be omitted by the service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpandResponse {
    pub node: ExpandedNode,
    #[serde(default)]
    pub edge: Option<Edge>,
}

/// Node as returned by the expand endpoint, where `id` is optional.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpandedNode {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(flatten)]
    pub rest: serde_json::Map<String, serde_json::Value>,
}

impl ExpandedNode {
    /// Resolve into a full node, assigning `id` to it.
    pub fn into_node(self, id: String) -> serde_json::Result<Node> {
        let mut map = self.rest;
        map.insert("id".into(), serde_json::Value::String(id));
        serde_json::from_value(serde_json::Value::Object(map))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestRequest {
    pub parent_topic: String,
    pub expansion_type: ExpansionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SuggestResponse {
    #[serde(default)]
    pub suggestions: Vec<String>,
}

/// Request to generate a whole journey.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum GenerateRequest {
    Syllabus {
        text: String,
        #[serde(rename = "async", default)]
        run_async: bool,
    },
    Topic {
        topic: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        mastery_level: Option<String>,
        #[serde(rename = "async", default)]
        run_async: bool,
    },
}

/// Generation is sometimes synchronous, sometimes backed by a job.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GenerateResponse {
    Job { job_id: String },
    Direct(GeneratedJourney),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    #[serde(alias = "pending")]
    Processing,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStatus {
    pub status: JobState,
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_response_job_or_direct() {
        let job: GenerateResponse =
            serde_json::from_value(serde_json::json!({"job_id": "j1", "status": "pending"}))
                .unwrap();
        assert!(matches!(job, GenerateResponse::Job { ref job_id } if job_id == "j1"));

        let direct: GenerateResponse = serde_json::from_value(serde_json::json!({
            "journey_id": "abc",
            "topic": "Rust",
            "mode": "topic",
            "nodes": [{"id": "node-1", "title": "Ownership", "status": "active"}]
        }))
        .unwrap();
        match direct {
            GenerateResponse::Direct(journey) => assert_eq!(journey.nodes.len(), 1),
            other => panic!("expected direct payload, got {:?}", other),
        }
    }

    #[test]
    fn test_job_state_accepts_pending() {
        let status: JobStatus =
            serde_json::from_value(serde_json::json!({"status": "pending"})).unwrap();
        assert_eq!(status.status, JobState::Processing);
    }

    #[test]
    fn test_generate_request_wire_shape() {
        let req = GenerateRequest::Syllabus {
            text: "Module 1: Arrays".into(),
            run_async: true,
        };
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["mode"], "syllabus");
        assert_eq!(value["async"], true);
    }

    #[test]
    fn test_expanded_node_without_id() {
        let resp: ExpandResponse = serde_json::from_value(serde_json::json!({
            "node": {"title": "QuickSort", "status": "active", "parent_id": "n5"}
        }))
        .unwrap();
        assert!(resp.node.id.is_none());
        assert!(resp.edge.is_none());
        let node = resp.node.into_node("local-1".into()).unwrap();
        assert_eq!(node.id, "local-1");
        assert_eq!(node.parent_id.as_deref(), Some("n5"));
    }
}
