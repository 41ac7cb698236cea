/*!
 * Speech synthesis.
 *
 * This module contains:
 * - `SynthesisBackend`: the one capability every backend exposes
 * - `BackendRegistry`: backends keyed by kind, each with an optional concurrency gate
 * - `retry`: retry policy and the sleeper it waits on
 * - `limiter`: the concurrency gate
 * - `profile`: per-backend defaults
 * - `synthesizer`: the bounded concurrent synthesizer
 * - `backends`: HTTP backends and a mock
 */

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use log::{debug, info, warn};
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use crate::app_config::{BackendConfig, Config};
use crate::audio::AudioPayload;
use crate::errors::SynthesisError;
use crate::script::{Emotion, Segment};
use crate::voices::{BackendKind, VoiceIdentity, VoiceSettings};

pub mod backends;
pub mod limiter;
pub mod profile;
pub mod retry;
pub mod synthesizer;

pub use limiter::{ConcurrencyLimiter, LimiterPermit};
pub use profile::BackendProfile;
pub use retry::{RecordingSleeper, RetryFailure, RetryPolicy, Sleeper, TokioSleeper};
pub use synthesizer::BoundedSynthesizer;

/// One synthesis call
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisRequest {
    // @field: Segment index in the script
    pub index: usize,

    pub text: String,

    pub voice: VoiceIdentity,

    pub emotion: Emotion,

    // @field: Present only for backends with expressive controls
    pub settings: Option<VoiceSettings>,
}

impl SynthesisRequest {
    /// Build the request for an assigned segment
    pub fn for_segment(index: usize, segment: &Segment, voice: VoiceIdentity) -> Self {
        let settings = BackendProfile::for_backend(voice.backend)
            .supports_voice_settings
            .then(|| VoiceSettings::for_emotion(segment.emotion));
        Self {
            index,
            text: segment.text.clone(),
            voice,
            emotion: segment.emotion,
            settings,
        }
    }
}

/// A speech synthesis backend
///
/// Implementations turn text plus a voice into raw audio. Errors are
/// classified by `SynthesisError::kind`; transient ones are retried by the
/// caller, never by the backend itself.
#[async_trait]
pub trait SynthesisBackend: Send + Sync + Debug {
    /// Which backend this is
    fn kind(&self) -> BackendKind;

    /// Synthesize one request
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<AudioPayload, SynthesisError>;
}

/// A registered backend and its optional gate
#[derive(Debug, Clone)]
pub struct RegisteredBackend {
    pub backend: Arc<dyn SynthesisBackend>,
    pub limiter: Option<Arc<ConcurrencyLimiter>>,
    // @field: Per-call deadline for this backend; `None` uses the synthesizer's
    pub call_timeout: Option<Duration>,
}

/// Backends available to a run
#[derive(Debug, Clone, Default)]
pub struct BackendRegistry {
    backends: HashMap<BackendKind, RegisteredBackend>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a backend; `max_concurrent` of `None` leaves it ungated
    pub fn register(&mut self, backend: Arc<dyn SynthesisBackend>, max_concurrent: Option<usize>) {
        let kind = backend.kind();
        let limiter = max_concurrent.map(|limit| Arc::new(ConcurrencyLimiter::new(limit)));
        debug!("Registered backend {} (concurrency: {:?})", kind, max_concurrent);
        self.backends.insert(
            kind,
            RegisteredBackend {
                backend,
                limiter,
                call_timeout: None,
            },
        );
    }

    /// Give a registered backend its own per-call deadline
    pub fn set_call_timeout(&mut self, kind: BackendKind, call_timeout: Duration) {
        if let Some(registered) = self.backends.get_mut(&kind) {
            registered.call_timeout = Some(call_timeout);
        }
    }

    /// Builder form of `set_call_timeout`
    pub fn with_call_timeout(mut self, kind: BackendKind, call_timeout: Duration) -> Self {
        self.set_call_timeout(kind, call_timeout);
        self
    }

    /// Deadline of a backend, if it overrides the synthesizer's
    pub fn call_timeout(&self, kind: BackendKind) -> Option<Duration> {
        self.backends.get(&kind).and_then(|b| b.call_timeout)
    }

    /// Builder form of `register`
    pub fn with_backend(mut self, backend: Arc<dyn SynthesisBackend>, max_concurrent: Option<usize>) -> Self {
        self.register(backend, max_concurrent);
        self
    }

    pub fn get(&self, kind: BackendKind) -> Option<&RegisteredBackend> {
        self.backends.get(&kind)
    }

    pub fn contains(&self, kind: BackendKind) -> bool {
        self.backends.contains_key(&kind)
    }

    pub fn kinds(&self) -> Vec<BackendKind> {
        let mut kinds: Vec<_> = self.backends.keys().copied().collect();
        kinds.sort_by_key(|k| k.as_str());
        kinds
    }

    /// Limiter of a backend, if it is gated
    pub fn limiter(&self, kind: BackendKind) -> Option<Arc<ConcurrencyLimiter>> {
        self.backends.get(&kind).and_then(|b| b.limiter.clone())
    }

    /// Build the HTTP backends listed in the configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut registry = Self::new();
        for entry in &config.available_backends {
            if !entry.is_usable() {
                warn!("Skipping {}: no credentials configured", entry.backend_type.display_name());
                continue;
            }
            let backend = backends::build_backend(entry, config.synthesis.timeout_secs)?;
            let limit = Self::effective_limit(entry);
            registry.register(backend, limit);
            registry.set_call_timeout(
                entry.backend_type,
                BackendProfile::effective_timeout(entry.timeout_secs, config.synthesis.timeout_secs),
            );
        }

        if registry.backends.is_empty() {
            return Err(anyhow!("No synthesis backends configured"));
        }
        info!("Synthesis backends ready: {:?}", registry.kinds());
        Ok(registry)
    }

    fn effective_limit(entry: &BackendConfig) -> Option<usize> {
        BackendProfile::for_backend(entry.backend_type).effective_concurrent_requests(entry.concurrent_requests)
    }
}
