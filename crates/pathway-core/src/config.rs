use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{PathwayError, Result};

/// Top-level Pathway configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathwayConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub poller: PollerConfig,
    #[serde(default)]
    pub layout: LayoutConfig,
}

/// Location of the generation service and its endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_expand_path")]
    pub expand_path: String,
    #[serde(default = "default_suggest_path")]
    pub suggest_path: String,
    #[serde(default = "default_generate_path")]
    pub generate_path: String,
    /// Job status path; `{job_id}` is substituted.
    #[serde(default = "default_job_path")]
    pub job_path: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            expand_path: default_expand_path(),
            suggest_path: default_suggest_path(),
            generate_path: default_generate_path(),
            job_path: default_job_path(),
        }
    }
}

impl ApiConfig {
    /// Join `path` onto the base url.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    pub fn job_url(&self, job_id: &str) -> String {
        self.url(&self.job_path.replace("{job_id}", job_id))
    }
}

fn default_base_url() -> String { "http://127.0.0.1:5000/api".to_string() }
fn default_expand_path() -> String { "/expand".to_string() }
fn default_suggest_path() -> String { "/suggest-topics".to_string() }
fn default_generate_path() -> String { "/generate".to_string() }
fn default_job_path() -> String { "/job/{job_id}".to_string() }

/// Request-layer policy: retries, timeouts, and caching.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Total attempts per request, including the first.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_ms: u64,
    #[serde(default = "default_max_backoff")]
    pub max_backoff_ms: u64,
    #[serde(default = "default_interactive_timeout")]
    pub interactive_timeout_ms: u64,
    #[serde(default = "default_generation_timeout")]
    pub generation_timeout_ms: u64,
    /// Cache size above which expired entries are swept.
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff(),
            max_backoff_ms: default_max_backoff(),
            interactive_timeout_ms: default_interactive_timeout(),
            generation_timeout_ms: default_generation_timeout(),
            cache_capacity: default_cache_capacity(),
        }
    }
}

impl ClientConfig {
    pub fn interactive_timeout(&self) -> Duration {
        Duration::from_millis(self.interactive_timeout_ms)
    }

    pub fn generation_timeout(&self) -> Duration {
        Duration::from_millis(self.generation_timeout_ms)
    }
}

fn default_max_retries() -> u32 { 3 }
fn default_initial_backoff() -> u64 { 1000 }
fn default_max_backoff() -> u64 { 60_000 }
fn default_interactive_timeout() -> u64 { 10_000 }
fn default_generation_timeout() -> u64 { 60_000 }
fn default_cache_capacity() -> usize { 100 }

/// Job polling policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollerConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_interval")]
    pub interval_ms: u64,
    /// Consecutive 404s after which a job is considered lost.
    #[serde(default = "default_lost_after")]
    pub lost_after_404s: u32,
    /// Consecutive transport errors after which polling gives up.
    #[serde(default = "default_disconnect_after")]
    pub disconnect_after_errors: u32,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            interval_ms: default_interval(),
            lost_after_404s: default_lost_after(),
            disconnect_after_errors: default_disconnect_after(),
        }
    }
}

fn default_max_attempts() -> u32 { 60 }
fn default_interval() -> u64 { 2000 }
fn default_lost_after() -> u32 { 3 }
fn default_disconnect_after() -> u32 { 5 }

/// Geometry constants for the graph layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutConfig {
    #[serde(default = "default_node_width")]
    pub node_width: f64,
    #[serde(default = "default_node_height")]
    pub node_height: f64,
    /// Vertical gap between ranks.
    #[serde(default = "default_rank_sep")]
    pub rank_sep: f64,
    /// Horizontal gap between nodes sharing a rank.
    #[serde(default = "default_node_sep")]
    pub node_sep: f64,
    /// Horizontal gap between a parent and its broader siblings.
    #[serde(default = "default_gutter")]
    pub gutter: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            node_width: default_node_width(),
            node_height: default_node_height(),
            rank_sep: default_rank_sep(),
            node_sep: default_node_sep(),
            gutter: default_gutter(),
        }
    }
}

impl LayoutConfig {
    /// Horizontal step between a parent and its nearest broader sibling.
    pub fn broader_step(&self) -> f64 {
        self.node_width + self.gutter
    }
}

fn default_node_width() -> f64 { 280.0 }
fn default_node_height() -> f64 { 120.0 }
fn default_rank_sep() -> f64 { 100.0 }
fn default_node_sep() -> f64 { 60.0 }
fn default_gutter() -> f64 { 80.0 }

impl PathwayConfig {
    /// Load config from a TOML file, with env var expansion.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|_| PathwayError::ConfigNotFound(path.display().to_string()))?;

        Self::from_toml(&content)
    }

    /// Parse config from a TOML string, expanding `${ENV_VAR}` references.
    pub fn from_toml(content: &str) -> Result<Self> {
        let expanded = expand_env_vars(content);

        toml::from_str(&expanded).map_err(|e| PathwayError::Config(e.to_string()))
    }
}

/// Expand `${ENV_VAR}` patterns in a string.
fn expand_env_vars(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '$' && chars.peek() == Some(&'{') {
            chars.next(); // consume '{'
            let mut var_name = String::new();
            for c in chars.by_ref() {
                if c == '}' {
                    break;
                }
                var_name.push(c);
            }
            match std::env::var(&var_name) {
                Ok(val) => result.push_str(&val),
                // Keep original if env var not set
                Err(_) => result.push_str(&format!("${{{}}}", var_name)),
            }
        } else {
            result.push(c);
        }
    }
    result
}
