use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use pathway_core::api::JobState;
use pathway_core::config::PollerConfig;
use pathway_core::error::{PathwayError, Result};
use pathway_core::traits::JourneyApi;

/// Polling policy for one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollOptions {
    pub max_attempts: u32,
    /// Constant delay between checks.
    pub interval: Duration,
    pub lost_after_404s: u32,
    pub disconnect_after_errors: u32,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self::from(&PollerConfig::default())
    }
}

impl From<&PollerConfig> for PollOptions {
    fn from(config: &PollerConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            interval: Duration::from_millis(config.interval_ms),
            lost_after_404s: config.lost_after_404s,
            disconnect_after_errors: config.disconnect_after_errors,
        }
    }
}

impl PollOptions {
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts,
            interval,
            ..Self::default()
        }
    }
}

/// Lifecycle of a poll session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Idle,
    Polling { attempt: u32 },
    Completed,
    Failed,
    /// Consecutive 404s: the server likely dropped the job.
    Lost,
    TimedOut,
    /// Consecutive transport errors.
    Disconnected,
}

impl PollState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PollState::Idle | PollState::Polling { .. })
    }
}

/// A single await-a-job state machine.
pub struct PollSession {
    api: Arc<dyn JourneyApi>,
    job_id: String,
    options: PollOptions,
    state: PollState,
    consecutive_404s: u32,
    consecutive_errors: u32,
}

impl PollSession {
    pub fn new(api: Arc<dyn JourneyApi>, job_id: impl Into<String>, options: PollOptions) -> Self {
        Self {
            api,
            job_id: job_id.into(),
            options,
            state: PollState::Idle,
            consecutive_404s: 0,
            consecutive_errors: 0,
        }
    }

    pub fn state(&self) -> PollState {
        self.state
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// Poll until the job reaches a terminal outcome. A session runs once.
    pub async fn start(&mut self) -> Result<serde_json::Value> {
        if self.state != PollState::Idle {
            return Err(PathwayError::Validation(format!(
                "poll session for job {} already started",
                self.job_id
            )));
        }

        info!(
            job_id = %self.job_id,
            max_attempts = self.options.max_attempts,
            interval_ms = self.options.interval.as_millis() as u64,
            "Polling job"
        );

        for attempt in 1..=self.options.max_attempts {
            self.state = PollState::Polling { attempt };

            if let Some(outcome) = self.check(attempt).await {
                return outcome;
            }

            if attempt < self.options.max_attempts {
                tokio::time::sleep(self.options.interval).await;
            }
        }

        self.state = PollState::TimedOut;
        warn!(job_id = %self.job_id, attempts = self.options.max_attempts, "Job polling timed out");
        Err(PathwayError::JobTimeout {
            job_id: self.job_id.clone(),
            attempts: self.options.max_attempts,
        })
    }

    /// One status check. `Some` means the session reached a terminal outcome.
    async fn check(&mut self, attempt: u32) -> Option<Result<serde_json::Value>> {
        match self.api.job_status(&self.job_id).await {
            Ok(status) => match status.status {
                JobState::Completed => {
                    self.state = PollState::Completed;
                    info!(job_id = %self.job_id, attempt, "Job completed");
                    Some(Ok(status.result.unwrap_or(serde_json::Value::Null)))
                }
                JobState::Failed => {
                    self.state = PollState::Failed;
                    let message = status.error.unwrap_or_else(|| "job failed".to_string());
                    warn!(job_id = %self.job_id, error = %message, "Job failed");
                    Some(Err(PathwayError::JobFailed {
                        job_id: self.job_id.clone(),
                        message,
                    }))
                }
                JobState::Processing => {
                    self.consecutive_404s = 0;
                    self.consecutive_errors = 0;
                    debug!(job_id = %self.job_id, attempt, "Job still processing");
                    None
                }
            },
            // Each failure kind breaks the other's streak.
            Err(e) if e.is_not_found() => {
                self.consecutive_404s += 1;
                self.consecutive_errors = 0;
                debug!(job_id = %self.job_id, consecutive_404s = self.consecutive_404s, "Job not visible yet");
                if self.consecutive_404s >= self.options.lost_after_404s {
                    self.state = PollState::Lost;
                    warn!(job_id = %self.job_id, "Job lost, likely dropped by the server");
                    return Some(Err(PathwayError::JobLost {
                        job_id: self.job_id.clone(),
                        consecutive_404s: self.consecutive_404s,
                    }));
                }
                None
            }
            Err(e) => {
                self.consecutive_errors += 1;
                self.consecutive_404s = 0;
                warn!(
                    job_id = %self.job_id,
                    consecutive_errors = self.consecutive_errors,
                    error = %e,
                    "Job status check failed"
                );
                if self.consecutive_errors >= self.options.disconnect_after_errors {
                    self.state = PollState::Disconnected;
                    return Some(Err(PathwayError::Connectivity {
                        job_id: self.job_id.clone(),
                        consecutive_errors: self.consecutive_errors,
                    }));
                }
                None
            }
        }
    }
}

/// Awaits background jobs over a `JourneyApi`.
pub struct JobPoller {
    api: Arc<dyn JourneyApi>,
    defaults: PollOptions,
}

impl JobPoller {
    pub fn new(api: Arc<dyn JourneyApi>, defaults: PollOptions) -> Self {
        Self { api, defaults }
    }

    pub fn defaults(&self) -> &PollOptions {
        &self.defaults
    }

    /// Create an idle session using the default options.
    pub fn session(&self, job_id: impl Into<String>) -> PollSession {
        PollSession::new(Arc::clone(&self.api), job_id, self.defaults.clone())
    }

    /// Await `job_id` to a terminal outcome with explicit options.
    pub async fn wait(&self, job_id: &str, options: PollOptions) -> Result<serde_json::Value> {
        PollSession::new(Arc::clone(&self.api), job_id, options)
            .start()
            .await
    }
}
