use anyhow::{Context, Result, anyhow};
use log::{LevelFilter, warn};
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::language_utils::{LanguagePolicy, VoiceLanguage};
use crate::synthesis::RetryPolicy;
use crate::voices::{BackendKind, UserTier};

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Account tier, decides backend routing
    #[serde(default)]
    pub tier: UserTier,

    /// Narration language used when a script has no letters to detect from (ISO)
    #[serde(default = "default_language")]
    pub default_language: String,

    /// How mixed-language scripts pick their narration language
    #[serde(default)]
    pub language_policy: LanguagePolicy,

    /// Synthesis backends
    #[serde(default)]
    pub available_backends: Vec<BackendConfig>,

    /// Retry and deadline settings
    #[serde(default)]
    pub synthesis: SynthesisConfig,

    /// Timeline settings
    #[serde(default)]
    pub assembly: AssemblyConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Backend configuration entry
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct BackendConfig {
    // @field: Backend type identifier
    #[serde(rename = "type")]
    pub backend_type: BackendKind,

    // @field: API key; empty falls back to the backend's environment variable
    #[serde(default = "String::new")]
    pub api_key: String,

    // @field: Service URL; empty uses the backend's default
    #[serde(default = "String::new")]
    pub endpoint: String,

    // @field: Azure region; empty falls back to AZURE_SPEECH_REGION
    #[serde(default = "String::new")]
    pub region: String,

    // @field: Model name, where the backend has one
    #[serde(default = "String::new")]
    pub model: String,

    // @field: Max concurrent requests; null uses the backend's profile
    #[serde(default)]
    pub concurrent_requests: Option<usize>,

    // @field: Timeout seconds; null uses the synthesis default
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl BackendConfig {
    // @param backend_type: Backend enum
    // @returns: Backend config with defaults
    pub fn new(backend_type: BackendKind) -> Self {
        Self {
            backend_type,
            api_key: String::new(),
            endpoint: String::new(),
            region: String::new(),
            model: String::new(),
            concurrent_requests: None,
            timeout_secs: None,
        }
    }

    /// Environment variable holding the backend's API key
    pub fn api_key_env(backend_type: BackendKind) -> &'static str {
        match backend_type {
            BackendKind::ElevenLabs => "ELEVENLABS_API_KEY",
            BackendKind::OpenAI => "OPENAI_API_KEY",
            BackendKind::Azure => "AZURE_SPEECH_KEY",
            BackendKind::Google => "GOOGLE_API_KEY",
        }
    }

    /// Configured API key, or the environment's
    pub fn resolved_api_key(&self) -> String {
        if !self.api_key.is_empty() {
            return self.api_key.clone();
        }
        std::env::var(Self::api_key_env(self.backend_type)).unwrap_or_default()
    }

    /// Configured region, or the environment's
    pub fn resolved_region(&self) -> String {
        if !self.region.is_empty() {
            return self.region.clone();
        }
        std::env::var("AZURE_SPEECH_REGION").unwrap_or_default()
    }

    /// Whether the entry has what it needs to make calls
    pub fn is_usable(&self) -> bool {
        if self.resolved_api_key().is_empty() {
            return false;
        }
        self.backend_type != BackendKind::Azure || !self.endpoint.is_empty() || !self.resolved_region().is_empty()
    }
}

/// Synthesis call settings
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SynthesisConfig {
    /// Attempts per segment, first call included
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Base backoff in milliseconds, doubled on each retry
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Cap on a single backoff wait
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,

    /// Random share of each wait, 0.0 to 1.0
    #[serde(default)]
    pub backoff_jitter: f64,

    /// Overall deadline of one call in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            retry_backoff_ms: default_retry_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            backoff_jitter: 0.0,
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Timeline assembly settings
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AssemblyConfig {
    /// Silence between segments in milliseconds
    #[serde(default = "default_silence_ms")]
    pub silence_ms: u64,

    /// Also pad after the last segment
    #[serde(default)]
    pub trailing_silence: bool,
}

impl Default for AssemblyConfig {
    fn default() -> Self {
        Self {
            silence_ms: default_silence_ms(),
            trailing_silence: false,
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn level_filter(&self) -> LevelFilter {
        match self {
            Self::Error => LevelFilter::Error,
            Self::Warn => LevelFilter::Warn,
            Self::Info => LevelFilter::Info,
            Self::Debug => LevelFilter::Debug,
            Self::Trace => LevelFilter::Trace,
        }
    }
}

fn default_language() -> String {
    "en".to_string()
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    1000 // doubled on each retry
}

fn default_max_backoff_ms() -> u64 {
    8000
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_silence_ms() -> u64 {
    crate::timeline::DEFAULT_SILENCE_MS
}

impl Config {
    /// Load the configuration file, writing a default one when it is missing
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            return Self::from_file(path);
        }

        warn!("Config file not found at '{}', creating default config.", path.display());
        let config = Config::default();
        config.save(path)?;
        Ok(config)
    }

    /// Parse a configuration file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content =
            fs::read_to_string(path).with_context(|| format!("Failed to open config file: {}", path.display()))?;
        serde_json::from_str(&content).with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Write the configuration as pretty JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self).context("Failed to serialize config to JSON")?;
        fs::write(path, json).with_context(|| format!("Failed to write config to file: {}", path.display()))
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        VoiceLanguage::from_code(&self.default_language)
            .with_context(|| format!("Invalid default language: {}", self.default_language))?;

        if self.synthesis.max_attempts == 0 {
            return Err(anyhow!("synthesis.max_attempts must be at least 1"));
        }
        if self.synthesis.timeout_secs == 0 {
            return Err(anyhow!("synthesis.timeout_secs must be greater than 0"));
        }
        if !(0.0..=1.0).contains(&self.synthesis.backoff_jitter) {
            return Err(anyhow!(
                "synthesis.backoff_jitter must be between 0.0 and 1.0, got {}",
                self.synthesis.backoff_jitter
            ));
        }

        if self.assembly.silence_ms > crate::timeline::MAX_SILENCE_MS {
            return Err(anyhow!(
                "assembly.silence_ms must be at most {}, got {}",
                crate::timeline::MAX_SILENCE_MS,
                self.assembly.silence_ms
            ));
        }

        for entry in &self.available_backends {
            if entry.concurrent_requests == Some(0) {
                return Err(anyhow!("concurrent_requests for {} must be at least 1", entry.backend_type));
            }
            if entry.timeout_secs == Some(0) {
                return Err(anyhow!("timeout_secs for {} must be greater than 0", entry.backend_type));
            }
        }

        // Every backend the tier routes to needs credentials
        for kind in self.routed_backends() {
            let entry = self
                .backend_config(kind)
                .ok_or_else(|| anyhow!("The {} tier needs a {} backend entry", self.tier, kind.display_name()))?;

            if entry.resolved_api_key().is_empty() {
                return Err(anyhow!(
                    "API key is required for {} (set it in the config or {})",
                    kind.display_name(),
                    BackendConfig::api_key_env(kind)
                ));
            }
            if kind == BackendKind::Azure && entry.endpoint.is_empty() && entry.resolved_region().is_empty() {
                return Err(anyhow!("Azure needs a region (config or AZURE_SPEECH_REGION) or an endpoint"));
            }
        }

        Ok(())
    }

    /// Backends the tier sends traffic to
    pub fn routed_backends(&self) -> Vec<BackendKind> {
        let mut routed = vec![self.narration_backend(), self.tier.dialogue_backend()];
        routed.dedup();
        routed
    }

    /// First usable narration backend in the tier's preference order.
    ///
    /// Falls back to the tier's primary so validation names it.
    pub fn narration_backend(&self) -> BackendKind {
        self.tier
            .narration_candidates()
            .into_iter()
            .find(|kind| self.backend_config(*kind).is_some_and(BackendConfig::is_usable))
            .unwrap_or_else(|| self.tier.narration_backend())
    }

    /// Get a backend configuration by type
    pub fn backend_config(&self, kind: BackendKind) -> Option<&BackendConfig> {
        self.available_backends.iter().find(|b| b.backend_type == kind)
    }

    /// Get a mutable backend configuration by type
    pub fn backend_config_mut(&mut self, kind: BackendKind) -> Option<&mut BackendConfig> {
        self.available_backends.iter_mut().find(|b| b.backend_type == kind)
    }

    /// Retry policy described by the synthesis settings
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.synthesis.max_attempts,
            Duration::from_millis(self.synthesis.retry_backoff_ms),
        )
        .with_max_backoff(Duration::from_millis(self.synthesis.max_backoff_ms))
        .with_jitter(self.synthesis.backoff_jitter)
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            tier: UserTier::default(),
            default_language: default_language(),
            language_policy: LanguagePolicy::default(),
            available_backends: BackendKind::ALL.into_iter().map(BackendConfig::new).collect(),
            synthesis: SynthesisConfig::default(),
            assembly: AssemblyConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}
