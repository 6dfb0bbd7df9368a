use futures::future::BoxFuture;
use reqwest::Client;
use tracing::debug;

use pathway_core::error::{PathwayError, Result};
use pathway_core::traits::{HttpRequest, HttpResponse, Method, Transport};

/// reqwest-backed transport. Performs exactly one exchange per call.
pub struct HttpTransport {
    http: Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self {
            http: Client::new(),
        }
    }

    pub fn with_client(http: Client) -> Self {
        Self { http }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for HttpTransport {
    fn send(&self, request: HttpRequest) -> BoxFuture<'_, Result<HttpResponse>> {
        Box::pin(async move {
            let mut builder = match request.method {
                Method::Get => self.http.get(&request.url),
                Method::Post => self.http.post(&request.url),
            };
            if let Some(body) = &request.body {
                builder = builder.json(body);
            }

            let response = builder
                .send()
                .await
                .map_err(|e| PathwayError::Network(e.to_string()))?;
            let status = response.status().as_u16();
            let text = response
                .text()
                .await
                .map_err(|e| PathwayError::Network(e.to_string()))?;

            debug!(method = request.method.as_str(), url = %request.url, status, "HTTP exchange");

            Ok(HttpResponse {
                status,
                body: parse_body(&text),
            })
        })
    }
}

/// Decode a response body, keeping non-JSON text as a string value.
fn parse_body(text: &str) -> serde_json::Value {
    if text.trim().is_empty() {
        return serde_json::Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| serde_json::Value::String(text.to_string()))
}

/// Convert a raw response into its body, mapping non-2xx statuses to errors.
pub fn into_body(response: HttpResponse) -> Result<serde_json::Value> {
    if response.is_success() {
        return Ok(response.body);
    }
    let message = match &response.body {
        serde_json::Value::Object(map) => map
            .get("error")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| response.body.to_string()),
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => format!("HTTP {}", response.status),
        other => other.to_string(),
    };
    Err(PathwayError::from_status(response.status, message))
}
