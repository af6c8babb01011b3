use serial_test::serial;

use donjed::config::{Config, GOOGLE_OPENAI_BASE_URL};
use donjed::llm::{endpoints_from_config, EndpointMode};
use donjed::services::DEFAULT_MAX_SESSIONS;

const LLM_VARS: &[&str] = &[
    "LLM_API_KEY",
    "GOOGLE_API_KEY",
    "LLM_BASE_URL",
    "LLM_FALLBACK_URLS",
    "LLM_MAX_RETRIES",
    "LLM_TEMPERATURE",
];

fn clear_llm_env() {
    for var in LLM_VARS {
        std::env::remove_var(var);
    }
}

#[test]
#[serial]
fn test_google_api_key_is_accepted_as_fallback_credential() {
    clear_llm_env();
    std::env::set_var("GOOGLE_API_KEY", "google-key");

    let config = Config::from_env();
    assert_eq!(config.llm.credential(), Some("google-key"));

    std::env::set_var("LLM_API_KEY", "llm-key");
    let config = Config::from_env();
    assert_eq!(config.llm.credential(), Some("llm-key"));

    clear_llm_env();
}

#[test]
#[serial]
fn test_default_endpoint_chain_targets_google() {
    clear_llm_env();

    let config = Config::from_env();
    let endpoints = endpoints_from_config(&config.llm);

    assert_eq!(endpoints.len(), 2);
    assert_eq!(endpoints[0].mode, EndpointMode::Streaming);
    assert_eq!(endpoints[1].mode, EndpointMode::NonStreaming);
    let expected = format!("{GOOGLE_OPENAI_BASE_URL}chat/completions");
    assert_eq!(endpoints[0].url, expected);
    assert_eq!(endpoints[1].url, expected);
}

#[test]
#[serial]
fn test_llm_overrides_from_env() {
    clear_llm_env();
    std::env::set_var("LLM_BASE_URL", "http://proxy.local/v1");
    std::env::set_var("LLM_FALLBACK_URLS", "");
    std::env::set_var("LLM_MAX_RETRIES", "5");
    std::env::set_var("LLM_TEMPERATURE", "warm");

    let config = Config::from_env();
    assert_eq!(config.llm.base_url, "http://proxy.local/v1");
    assert!(config.llm.fallback_urls.is_empty());
    assert_eq!(config.llm.max_retries, 5);
    assert_eq!(config.llm.temperature, 0.7);

    let endpoints = endpoints_from_config(&config.llm);
    assert_eq!(endpoints.len(), 1);
    assert_eq!(endpoints[0].url, "http://proxy.local/v1/chat/completions");

    clear_llm_env();
}

#[test]
#[serial]
fn test_session_limit_from_env() {
    std::env::remove_var("DONJED_MAX_SESSIONS");
    assert_eq!(Config::from_env().server.max_sessions, DEFAULT_MAX_SESSIONS);

    std::env::set_var("DONJED_MAX_SESSIONS", "25");
    assert_eq!(Config::from_env().server.max_sessions, 25);

    std::env::remove_var("DONJED_MAX_SESSIONS");
}
