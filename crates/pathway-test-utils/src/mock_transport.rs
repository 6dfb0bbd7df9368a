use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::time::Instant;

use pathway_core::error::{PathwayError, Result};
use pathway_core::traits::{HttpRequest, HttpResponse, Method, Transport};

/// A scripted reply for one exchange.
#[derive(Debug, Clone)]
pub enum MockReply {
    Respond(HttpResponse),
    Fail(PathwayError),
}

/// A request the mock received, and when.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub request: HttpRequest,
    pub at: Instant,
}

/// Transport that replays scripted replies per `(method, url)`.
///
/// Replies are consumed in order; the last one repeats forever. Unscripted
/// routes answer 404.
pub struct MockTransport {
    routes: Mutex<HashMap<(Method, String), VecDeque<MockReply>>>,
    calls: Mutex<Vec<RecordedCall>>,
    latency: Duration,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::with_latency(Duration::ZERO)
    }

    /// Every exchange takes `latency` before replying.
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            routes: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            latency,
        }
    }

    pub fn push(&self, method: Method, url: &str, reply: MockReply) {
        self.routes
            .lock()
            .unwrap()
            .entry((method, url.to_string()))
            .or_default()
            .push_back(reply);
    }

    pub fn respond(&self, method: Method, url: &str, status: u16, body: serde_json::Value) {
        self.push(method, url, MockReply::Respond(HttpResponse { status, body }));
    }

    pub fn fail(&self, method: Method, url: &str, error: PathwayError) {
        self.push(method, url, MockReply::Fail(error));
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, method: Method, url: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.request.method == method && c.request.url == url)
            .count()
    }

    fn next_reply(&self, method: Method, url: &str) -> MockReply {
        let mut routes = self.routes.lock().unwrap();
        match routes.get_mut(&(method, url.to_string())) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
            Some(queue) if !queue.is_empty() => queue[0].clone(),
            _ => MockReply::Respond(HttpResponse {
                status: 404,
                body: serde_json::json!({ "error": format!("no route for {}", url) }),
            }),
        }
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for MockTransport {
    fn send(&self, request: HttpRequest) -> BoxFuture<'_, Result<HttpResponse>> {
        Box::pin(async move {
            self.calls.lock().unwrap().push(RecordedCall {
                request: request.clone(),
                at: Instant::now(),
            });
            let reply = self.next_reply(request.method, &request.url);
            if !self.latency.is_zero() {
                tokio::time::sleep(self.latency).await;
            }
            match reply {
                MockReply::Respond(response) => Ok(response),
                MockReply::Fail(error) => Err(error),
            }
        })
    }
}
