//! Tests for arena configuration loading.

use std::fs;
use std::time::Duration;
use tempfile::TempDir;

use chess_duel::{ArenaConfig, Credential, ProviderKind, Side};

fn write_config(dir: &TempDir, content: &str) -> std::path::PathBuf {
    let path = dir.path().join("arena.toml");
    fs::write(&path, content).expect("Failed to write TOML");
    path
}

#[test]
fn test_full_config_loads() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = write_config(
        &dir,
        r#"
require_verified_credentials = false

[white]
model = "gemini-1.5-flash"
credential_env = "CHESS_DUEL_TEST_UNSET_VAR"

[black]
model = "random"

[timing]
startup_delay_ms = 0
turn_delay_ms = 250
random_think_ms = 10
request_timeout_secs = 12

[generation]
max_output_tokens = 64
temperature = 0.0
"#,
    );

    let config = ArenaConfig::from_file(&path).expect("Failed to load config");
    assert_eq!(config.white().model(), "gemini-1.5-flash");
    assert_eq!(config.black().model(), "random");

    let settings = config.session_settings();
    assert_eq!(settings.startup_delay, Duration::ZERO);
    assert_eq!(settings.turn_delay, Duration::from_millis(250));
    assert_eq!(settings.random_think_time, Duration::from_millis(10));
    assert_eq!(settings.request_timeout, Duration::from_secs(12));
    assert_eq!(settings.generation.max_output_tokens(), 64);
    assert!(!settings.require_verified_credentials);
}

#[test]
fn test_empty_config_uses_defaults() {
    let config = ArenaConfig::from_toml("").expect("empty config is valid");
    assert_eq!(config, ArenaConfig::default());
    assert_eq!(config.white().model(), "random");

    let settings = config.session_settings();
    assert_eq!(settings.request_timeout, Duration::from_secs(30));
    assert_eq!(settings.generation.max_output_tokens(), 100);
    assert!(settings.require_verified_credentials);
}

#[test]
fn test_partial_timing_keeps_other_defaults() {
    let config = ArenaConfig::from_toml("[timing]\nturn_delay_ms = 0\n").unwrap();
    let settings = config.session_settings();
    assert_eq!(settings.turn_delay, Duration::ZERO);
    assert_eq!(settings.startup_delay, Duration::from_millis(500));
}

#[test]
fn test_endpoint_override_substitutes_model() {
    let config = ArenaConfig::from_toml(
        r#"
[white]
model = "gemini-1.5-pro"
endpoint = "http://localhost:8080/models/{model}"
"#,
    )
    .unwrap();

    let provider = config
        .seat(Side::White)
        .to_provider_config(&Credential::new("k"))
        .unwrap();
    let ProviderKind::RemoteTextModel(descriptor) = provider.kind() else {
        panic!("expected remote provider");
    };
    assert_eq!(descriptor.endpoint(), "http://localhost:8080/models/gemini-1.5-pro");
    assert_eq!(provider.credential(), &Credential::new("k"));
}

#[test]
fn test_unset_seat_variable_falls_back_to_shared_credential() {
    let config = ArenaConfig::from_toml(
        r#"
[black]
model = "claude-3-5-haiku-latest"
credential_env = "CHESS_DUEL_TEST_UNSET_VAR"
"#,
    )
    .unwrap();

    let provider = config
        .seat(Side::Black)
        .to_provider_config(&Credential::new("shared"))
        .unwrap();
    assert_eq!(provider.credential(), &Credential::new("shared"));
}

#[test]
fn test_model_override() {
    let mut config = ArenaConfig::default();
    config.override_model(Side::Black, "gpt-4o-mini");
    assert_eq!(config.black().model(), "gpt-4o-mini");
    assert_eq!(config.white().model(), "random");
}

#[test]
fn test_unknown_model_fails_at_resolution() {
    let config = ArenaConfig::from_toml("[white]\nmodel = \"mystery-model\"\n").unwrap();
    assert!(
        config
            .seat(Side::White)
            .to_provider_config(&Credential::default())
            .is_err()
    );
}

#[test]
fn test_malformed_config_is_error() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = write_config(&dir, "[white\nmodel = ");
    let err = ArenaConfig::from_file(&path).unwrap_err();
    assert!(err.message.contains("Failed to parse config"));
}

#[test]
fn test_missing_file_is_error() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let err = ArenaConfig::from_file(dir.path().join("absent.toml")).unwrap_err();
    assert!(err.message.contains("Failed to read config file"));
}
