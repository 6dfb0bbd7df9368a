use std::sync::Arc;

use futures::future::BoxFuture;
use serde::de::DeserializeOwned;

use pathway_core::api::*;
use pathway_core::config::{ApiConfig, ClientConfig, PathwayConfig};
use pathway_core::error::Result;
use pathway_core::traits::{HttpRequest, JourneyApi, Transport};

use crate::resilient::{RequestKey, RequestOptions, ResilientClient};
use crate::transport::into_body;

/// Typed client for the generation service. Every call goes through the
/// shared `ResilientClient`.
pub struct ApiClient {
    transport: Arc<dyn Transport>,
    client: ResilientClient,
    api: ApiConfig,
    config: ClientConfig,
}

impl ApiClient {
    pub fn new(
        transport: Arc<dyn Transport>,
        client: ResilientClient,
        api: ApiConfig,
        config: ClientConfig,
    ) -> Self {
        Self {
            transport,
            client,
            api,
            config,
        }
    }

    /// Build a client with its own request layer from a full config.
    pub fn from_config(transport: Arc<dyn Transport>, config: &PathwayConfig) -> Self {
        Self::new(
            transport,
            ResilientClient::new(&config.client),
            config.api.clone(),
            config.client.clone(),
        )
    }

    pub fn resilient(&self) -> &ResilientClient {
        &self.client
    }

    async fn call<T: DeserializeOwned>(
        &self,
        request: HttpRequest,
        options: RequestOptions,
    ) -> Result<T> {
        let key = RequestKey::for_request(&request);
        let transport = Arc::clone(&self.transport);
        let value = self
            .client
            .request(
                key,
                move || {
                    let transport = Arc::clone(&transport);
                    let request = request.clone();
                    async move { into_body(transport.send(request).await?) }
                },
                options,
            )
            .await?;
        Ok(serde_json::from_value(value)?)
    }
}

impl JourneyApi for ApiClient {
    fn expand(&self, request: ExpandRequest) -> BoxFuture<'_, Result<ExpandResponse>> {
        Box::pin(async move {
            let body = serde_json::to_value(&request)?;
            let http = HttpRequest::post(self.api.url(&self.api.expand_path), body);
            self.call(http, RequestOptions::generation(&self.config)).await
        })
    }

    fn suggest_topics(&self, request: SuggestRequest) -> BoxFuture<'_, Result<SuggestResponse>> {
        Box::pin(async move {
            let body = serde_json::to_value(&request)?;
            let http = HttpRequest::post(self.api.url(&self.api.suggest_path), body);
            self.call(http, RequestOptions::interactive(&self.config)).await
        })
    }

    fn generate(&self, request: GenerateRequest) -> BoxFuture<'_, Result<GenerateResponse>> {
        Box::pin(async move {
            let body = serde_json::to_value(&request)?;
            let http = HttpRequest::post(self.api.url(&self.api.generate_path), body);
            self.call(http, RequestOptions::generation(&self.config)).await
        })
    }

    fn job_status(&self, job_id: &str) -> BoxFuture<'_, Result<JobStatus>> {
        let url = self.api.job_url(job_id);
        Box::pin(async move {
            // The poller counts failures itself, so a single attempt per check.
            let options = RequestOptions::interactive(&self.config).with_max_retries(1);
            self.call(HttpRequest::get(url), options).await
        })
    }
}
