/*!
 * Tests for configuration loading and validation
 */

use anyhow::Result;
use std::time::Duration;

use dramaflow::app_config::{BackendConfig, Config, LogLevel};
use dramaflow::language_utils::LanguagePolicy;
use dramaflow::voices::{BackendKind, UserTier};

use crate::common;

fn config_with_keys(tier: UserTier) -> Config {
    let mut config = Config::default();
    config.tier = tier;
    for entry in &mut config.available_backends {
        entry.api_key = "test-key".to_string();
        entry.region = "westeurope".to_string();
    }
    config
}

#[test]
fn test_config_file_should_round_trip() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("conf.json");

    let mut config = config_with_keys(UserTier::Vip);
    config.language_policy = LanguagePolicy::Majority;
    config.assembly.trailing_silence = true;
    config.log_level = LogLevel::Debug;
    config.save(&path)?;

    let loaded = Config::from_file(&path)?;
    assert_eq!(loaded.tier, UserTier::Vip);
    assert_eq!(loaded.language_policy, LanguagePolicy::Majority);
    assert!(loaded.assembly.trailing_silence);
    assert_eq!(loaded.log_level, LogLevel::Debug);
    assert_eq!(loaded.available_backends, config.available_backends);
    Ok(())
}

#[test]
fn test_config_json_should_use_documented_keys() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(
        temp_dir.path(),
        "conf.json",
        r#"{
            "tier": "free",
            "default_language": "zh",
            "language_policy": "any_character",
            "available_backends": [
                {"type": "azure", "api_key": "a", "region": "eastus", "concurrent_requests": 4},
                {"type": "google", "api_key": "g", "timeout_secs": 10}
            ],
            "synthesis": {"max_attempts": 5, "retry_backoff_ms": 250, "backoff_jitter": 0.2},
            "assembly": {"silence_ms": 500}
        }"#,
    )?;

    let config = Config::from_file(&path)?;
    config.validate()?;

    assert_eq!(config.default_language, "zh");
    assert_eq!(config.backend_config(BackendKind::Azure).unwrap().concurrent_requests, Some(4));
    assert_eq!(config.backend_config(BackendKind::Google).unwrap().timeout_secs, Some(10));
    assert_eq!(config.synthesis.max_backoff_ms, 8000);
    assert_eq!(config.assembly.silence_ms, 500);

    let policy = config.retry_policy();
    assert_eq!(policy.max_attempts(), 5);
    assert_eq!(policy.nominal_backoff(3), Duration::from_millis(1000));
    Ok(())
}

#[test]
fn test_validation_should_reject_zero_timeout() {
    let mut config = config_with_keys(UserTier::Free);
    config.synthesis.timeout_secs = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_validation_should_reject_unsupported_language() {
    let mut config = config_with_keys(UserTier::Free);
    config.default_language = "fr".to_string();
    assert!(config.validate().is_err());

    config.default_language = "zho".to_string();
    assert!(config.validate().is_ok());
}

#[test]
fn test_validation_should_only_require_routed_backends() {
    let mut config = config_with_keys(UserTier::Free);
    // Free routes to Azure and Google; the premium entries may stay empty
    for kind in [BackendKind::ElevenLabs, BackendKind::OpenAI] {
        if let Some(entry) = config.backend_config_mut(kind) {
            entry.api_key.clear();
        }
    }
    assert!(config.validate().is_ok());
    assert_eq!(config.routed_backends(), vec![BackendKind::Azure, BackendKind::Google]);
}

#[test]
fn test_missing_key_should_fail_validation_without_environment() {
    let mut config = config_with_keys(UserTier::Vip);
    if let Some(entry) = config.backend_config_mut(BackendKind::ElevenLabs) {
        entry.api_key.clear();
    }
    // Only meaningful when the environment does not supply a key
    if std::env::var(BackendConfig::api_key_env(BackendKind::ElevenLabs)).is_err() {
        assert!(config.validate().is_err());
    }
}

#[test]
fn test_log_level_should_map_to_filter() {
    assert_eq!(LogLevel::Warn.level_filter(), log::LevelFilter::Warn);
    assert_eq!(LogLevel::default().level_filter(), log::LevelFilter::Info);
}
