use std::sync::Arc;

use tracing::info;

use pathway_core::api::{GenerateRequest, GenerateResponse};
use pathway_core::error::Result;
use pathway_core::event::EventBus;
use pathway_core::traits::JourneyApi;
use pathway_core::types::{GeneratedJourney, JourneyEvent};
use pathway_graph::LayoutEngine;
use pathway_net::{JobPoller, PollOptions};

use crate::journey::Journey;

/// Turns a generation request into a seeded journey.
///
/// Synchronous responses seed immediately; job responses are awaited
/// through the poller first.
pub struct GenerationPipeline {
    api: Arc<dyn JourneyApi>,
    poller: JobPoller,
    engine: LayoutEngine,
    events: Option<Arc<EventBus>>,
}

impl GenerationPipeline {
    pub fn new(api: Arc<dyn JourneyApi>, poll: PollOptions, engine: LayoutEngine) -> Self {
        let poller = JobPoller::new(Arc::clone(&api), poll);
        Self {
            api,
            poller,
            engine,
            events: None,
        }
    }

    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn poller(&self) -> &JobPoller {
        &self.poller
    }

    pub async fn generate(&self, request: GenerateRequest) -> Result<Journey> {
        let generated = match self.api.generate(request).await? {
            GenerateResponse::Direct(generated) => generated,
            GenerateResponse::Job { job_id } => {
                info!(job_id = %job_id, "Generation queued, polling");
                let payload = self.poller.session(job_id).start().await?;
                serde_json::from_value::<GeneratedJourney>(payload)?
            }
        };

        let mut journey = Journey::from_generated(generated, self.engine.clone())?;
        if let Some(events) = &self.events {
            events.publish(JourneyEvent::JourneySeeded {
                journey_id: journey.id().to_string(),
                nodes: journey.graph().len(),
            });
            journey = journey.with_events(Arc::clone(events));
        }
        Ok(journey)
    }
}
