/*!
 * Backend-specific defaults.
 *
 * Concurrency ceilings follow each service's documented concurrent-request
 * limit; backends without one are left ungated.
 */

use std::time::Duration;

use crate::voices::BackendKind;

/// Defaults for one backend
#[derive(Debug, Clone, PartialEq)]
pub struct BackendProfile {
    /// Maximum concurrent requests; `None` means ungated
    pub max_concurrent_requests: Option<usize>,
    /// Base URL used when the configuration leaves `endpoint` empty
    pub default_endpoint: &'static str,
    /// Model used when the configuration leaves `model` empty
    pub default_model: Option<&'static str>,
    /// Whether the backend honors emotion voice settings
    pub supports_voice_settings: bool,
    /// Sample rate of the audio the backend is asked for
    pub output_sample_rate: u32,
}

impl BackendProfile {
    /// Profile of a backend
    pub fn for_backend(kind: BackendKind) -> Self {
        match kind {
            BackendKind::ElevenLabs => Self {
                // Documented concurrent-request limit of the starter plans
                max_concurrent_requests: Some(3),
                default_endpoint: "https://api.elevenlabs.io",
                default_model: Some("eleven_multilingual_v2"),
                supports_voice_settings: true,
                output_sample_rate: 24_000,
            },
            BackendKind::OpenAI => Self {
                max_concurrent_requests: None,
                default_endpoint: "https://api.openai.com/v1",
                default_model: Some("tts-1"),
                supports_voice_settings: false,
                output_sample_rate: 24_000,
            },
            BackendKind::Azure => Self {
                max_concurrent_requests: None,
                // Regional; the region is substituted into the host
                default_endpoint: "https://{region}.tts.speech.microsoft.com",
                default_model: None,
                supports_voice_settings: false,
                output_sample_rate: 24_000,
            },
            BackendKind::Google => Self {
                max_concurrent_requests: None,
                default_endpoint: "https://texttospeech.googleapis.com",
                default_model: None,
                supports_voice_settings: false,
                output_sample_rate: 24_000,
            },
        }
    }

    /// Effective ceiling, respecting any user override
    pub fn effective_concurrent_requests(&self, user_override: Option<usize>) -> Option<usize> {
        user_override.or(self.max_concurrent_requests)
    }

    /// Effective per-call deadline
    pub fn effective_timeout(user_override: Option<u64>, default_secs: u64) -> Duration {
        Duration::from_secs(user_override.unwrap_or(default_secs))
    }
}
