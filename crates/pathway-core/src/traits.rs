use futures::future::BoxFuture;

use crate::api::*;
use crate::error::Result;
use crate::types::JourneySnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }

    /// Only non-mutating requests are eligible for caching.
    pub fn is_cacheable(&self) -> bool {
        matches!(self, Method::Get)
    }
}

/// An outbound request, before transport.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub body: Option<serde_json::Value>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            body: None,
        }
    }

    pub fn post(url: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            method: Method::Post,
            url: url.into(),
            body: Some(body),
        }
    }
}

/// A raw response; any status code is a successful transport.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: serde_json::Value,
}

impl HttpResponse {
    pub fn ok(body: serde_json::Value) -> Self {
        Self { status: 200, body }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Transport: a single network exchange, no retries or caching.
pub trait Transport: Send + Sync + 'static {
    /// Send a request. Connection-level failures are `PathwayError::Network`.
    fn send(&self, request: HttpRequest) -> BoxFuture<'_, Result<HttpResponse>>;
}

/// Journey API: the typed surface of the generation service.
pub trait JourneyApi: Send + Sync + 'static {
    fn expand(&self, request: ExpandRequest) -> BoxFuture<'_, Result<ExpandResponse>>;

    fn suggest_topics(&self, request: SuggestRequest) -> BoxFuture<'_, Result<SuggestResponse>>;

    fn generate(&self, request: GenerateRequest) -> BoxFuture<'_, Result<GenerateResponse>>;

    /// Fetch the status of a background job. A missing job is a 404 `Client` error.
    fn job_status(&self, job_id: &str) -> BoxFuture<'_, Result<JobStatus>>;
}

/// Snapshot store: persistence collaborator for journeys.
pub trait SnapshotStore: Send + Sync + 'static {
    fn load(&self, journey_id: &str) -> BoxFuture<'_, Result<Option<JourneySnapshot>>>;

    fn save(&self, snapshot: JourneySnapshot) -> BoxFuture<'_, Result<()>>;

    /// Ids of every stored journey.
    fn list(&self) -> BoxFuture<'_, Result<Vec<String>>>;
}
