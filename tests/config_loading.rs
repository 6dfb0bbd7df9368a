use std::io::Write;

use pathway::{Pathway, PathwayConfig, PathwayError};

#[test]
fn test_load_full_config_from_file() {
    let toml_content = r#"
[api]
base_url = "https://learn.example.com/api/"
expand_path = "/journey/expand"
job_path = "/jobs/{job_id}"

[client]
max_retries = 5
initial_backoff_ms = 500
max_backoff_ms = 8000
interactive_timeout_ms = 3000
generation_timeout_ms = 90000
cache_capacity = 20

[poller]
max_attempts = 30
interval_ms = 1000
lost_after_404s = 4
disconnect_after_errors = 6

[layout]
node_width = 200.0
gutter = 40.0
"#;

    let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
    tmp.write_all(toml_content.as_bytes()).expect("write toml");

    let config = PathwayConfig::load(tmp.path()).expect("load config");

    assert_eq!(
        config.api.url(&config.api.expand_path),
        "https://learn.example.com/api/journey/expand"
    );
    assert_eq!(
        config.api.job_url("j1"),
        "https://learn.example.com/api/jobs/j1"
    );
    assert_eq!(config.api.suggest_path, "/suggest-topics");

    assert_eq!(config.client.max_retries, 5);
    assert_eq!(config.client.initial_backoff_ms, 500);
    assert_eq!(config.client.max_backoff_ms, 8000);
    assert_eq!(config.client.interactive_timeout().as_millis(), 3000);
    assert_eq!(config.client.generation_timeout().as_secs(), 90);
    assert_eq!(config.client.cache_capacity, 20);

    assert_eq!(config.poller.max_attempts, 30);
    assert_eq!(config.poller.interval_ms, 1000);
    assert_eq!(config.poller.lost_after_404s, 4);
    assert_eq!(config.poller.disconnect_after_errors, 6);

    assert_eq!(config.layout.broader_step(), 240.0);
    assert_eq!(config.layout.node_height, 120.0);
}

#[test]
fn test_env_var_expansion_in_config() {
    std::env::set_var("PATHWAY_TEST_BASE_URL", "http://10.0.0.5:5000/api");

    let toml_content = r#"
[api]
base_url = "${PATHWAY_TEST_BASE_URL}"
"#;

    let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
    tmp.write_all(toml_content.as_bytes()).expect("write toml");

    let config = PathwayConfig::load(tmp.path()).expect("load config");
    assert_eq!(config.api.base_url, "http://10.0.0.5:5000/api");

    std::env::remove_var("PATHWAY_TEST_BASE_URL");
}

#[test]
fn test_minimal_config_uses_defaults() {
    let toml_content = r#"
[api]
base_url = "http://localhost:5000/api"
"#;

    let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
    tmp.write_all(toml_content.as_bytes()).expect("write toml");

    let config = PathwayConfig::load(tmp.path()).expect("load config");

    assert_eq!(config.client.max_retries, 3);
    assert_eq!(config.client.initial_backoff_ms, 1000);
    assert_eq!(config.client.max_backoff_ms, 60000);
    assert_eq!(config.client.interactive_timeout_ms, 10000);
    assert_eq!(config.client.generation_timeout_ms, 60000);
    assert_eq!(config.client.cache_capacity, 100);
    assert_eq!(config.poller.max_attempts, 60);
    assert_eq!(config.poller.interval_ms, 2000);
    assert_eq!(config.poller.lost_after_404s, 3);
    assert_eq!(config.poller.disconnect_after_errors, 5);
    assert_eq!(config.layout.node_width, 280.0);
    assert_eq!(config.layout.gutter, 80.0);
}

#[test]
fn test_missing_file_is_config_not_found() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join("pathway.toml");

    assert!(matches!(
        PathwayConfig::load(&path),
        Err(PathwayError::ConfigNotFound(_))
    ));
    assert!(matches!(
        Pathway::from_file(&path),
        Err(PathwayError::ConfigNotFound(_))
    ));
}

#[test]
fn test_malformed_toml_is_config_error() {
    let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
    tmp.write_all(b"[client]\nmax_retries = \"many\"\n")
        .expect("write toml");

    assert!(matches!(
        PathwayConfig::load(tmp.path()),
        Err(PathwayError::Config(_))
    ));
}
