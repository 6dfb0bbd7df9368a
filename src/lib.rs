//! Learning-journey graph engine.
//!
//! `Pathway` wires the generation service client, the job poller, the
//! expansion controller and the layout engine around one shared request
//! layer, so deduplication and caching apply across every consumer.

use std::path::Path;
use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

pub use pathway_core;
pub use pathway_graph;
pub use pathway_journey;
pub use pathway_net;

pub use pathway_core::{PathwayConfig, PathwayError, Result};
pub use pathway_graph::{GraphStore, Layout, LayoutEngine};
pub use pathway_journey::{
    Expansion, ExpansionController, GenerationPipeline, Journey, MemorySnapshotStore,
};
pub use pathway_net::{ApiClient, HttpTransport, JobPoller, ResilientClient};

use pathway_core::api::GenerateRequest;
use pathway_core::event::EventBus;
use pathway_core::traits::{SnapshotStore, Transport};
use pathway_core::types::ExpansionType;
use pathway_net::PollOptions;

/// Install the fmt subscriber. `RUST_LOG` overrides the default filter.
///
/// Safe to call more than once; later calls are ignored.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pathway=info,warn")),
        )
        .with_target(false)
        .try_init();
}

pub struct Pathway {
    config: PathwayConfig,
    api: Arc<ApiClient>,
    events: Arc<EventBus>,
    engine: LayoutEngine,
    expansion: ExpansionController,
    generation: GenerationPipeline,
}

impl Pathway {
    pub fn new(config: PathwayConfig, transport: Arc<dyn Transport>) -> Self {
        let api = Arc::new(ApiClient::from_config(transport, &config));
        let events = Arc::new(EventBus::default());
        let engine = LayoutEngine::new(config.layout.clone());

        let expansion = ExpansionController::new(api.clone());
        let generation =
            GenerationPipeline::new(api.clone(), PollOptions::from(&config.poller), engine.clone())
                .with_events(Arc::clone(&events));

        info!(base_url = %config.api.base_url, "Pathway initialized");
        Self {
            config,
            api,
            events,
            engine,
            expansion,
            generation,
        }
    }

    /// Talk to the configured service over HTTP.
    pub fn http(config: PathwayConfig) -> Self {
        Self::new(config, Arc::new(HttpTransport::new()))
    }

    /// Load config from a TOML file and connect over HTTP.
    pub fn from_file(path: &Path) -> Result<Self> {
        Ok(Self::http(PathwayConfig::load(path)?))
    }

    pub fn config(&self) -> &PathwayConfig {
        &self.config
    }

    pub fn api(&self) -> &Arc<ApiClient> {
        &self.api
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    pub fn layout_engine(&self) -> &LayoutEngine {
        &self.engine
    }

    pub fn expansion(&self) -> &ExpansionController {
        &self.expansion
    }

    pub fn generation(&self) -> &GenerationPipeline {
        &self.generation
    }

    pub async fn generate(&self, request: GenerateRequest) -> Result<Journey> {
        self.generation.generate(request).await
    }

    pub async fn suggestions(
        &self,
        journey: &Journey,
        parent_id: &str,
        kind: ExpansionType,
    ) -> Result<Vec<String>> {
        self.expansion.suggestions(journey, parent_id, kind).await
    }

    pub async fn expand(
        &self,
        journey: &mut Journey,
        parent_id: &str,
        title: &str,
        kind: ExpansionType,
    ) -> Result<Expansion> {
        self.expansion.expand(journey, parent_id, title, kind).await
    }

    /// Restore a saved journey, wired to this instance's event bus.
    pub async fn restore(
        &self,
        store: &dyn SnapshotStore,
        journey_id: &str,
    ) -> Result<Option<Journey>> {
        let journey = Journey::load_from(store, journey_id, self.engine.clone()).await?;
        Ok(journey.map(|j| j.with_events(Arc::clone(&self.events))))
    }
}
