use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use url::Url;

use crate::audio::AudioPayload;
use crate::errors::SynthesisError;
use crate::synthesis::profile::BackendProfile;
use crate::synthesis::{SynthesisBackend, SynthesisRequest};
use crate::voices::{BackendKind, VoiceSettings};

use super::{check_status, http_client, join_path, read_body, send_error};

/// ElevenLabs client; returns raw PCM16 at the profile's rate
pub struct ElevenLabsBackend {
    /// HTTP client for API requests
    client: Client,
    /// API key for authentication
    api_key: String,
    /// API base URL
    endpoint: Url,
    /// Model id
    model: String,
    /// Per-request deadline
    timeout: Duration,
    /// Rate requested through `output_format`
    sample_rate: u32,
}

/// Text-to-speech request body
#[derive(Debug, Serialize)]
pub struct ElevenLabsRequest {
    pub text: String,
    pub model_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice_settings: Option<ElevenLabsVoiceSettings>,
}

/// Expressiveness controls
#[derive(Debug, Serialize)]
pub struct ElevenLabsVoiceSettings {
    pub stability: f32,
    pub similarity_boost: f32,
    pub style: f32,
    pub use_speaker_boost: bool,
}

impl From<VoiceSettings> for ElevenLabsVoiceSettings {
    fn from(settings: VoiceSettings) -> Self {
        Self {
            stability: settings.stability,
            similarity_boost: settings.similarity_boost,
            style: settings.style,
            use_speaker_boost: true,
        }
    }
}

impl fmt::Debug for ElevenLabsBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElevenLabsBackend")
            .field("endpoint", &self.endpoint.as_str())
            .field("model", &self.model)
            .finish()
    }
}

impl ElevenLabsBackend {
    /// Create a new ElevenLabs client; an empty model selects the default
    pub fn new(api_key: impl Into<String>, endpoint: Url, model: impl Into<String>, timeout: Duration) -> Self {
        let profile = BackendProfile::for_backend(BackendKind::ElevenLabs);
        let model = model.into();
        let model = if model.is_empty() {
            profile.default_model.unwrap_or_default().to_string()
        } else {
            model
        };
        Self {
            client: http_client(timeout),
            api_key: api_key.into(),
            endpoint,
            model,
            timeout,
            sample_rate: profile.output_sample_rate,
        }
    }

    /// Build the request body for a synthesis request
    pub fn build_request(&self, request: &SynthesisRequest) -> ElevenLabsRequest {
        ElevenLabsRequest {
            text: request.text.clone(),
            model_id: self.model.clone(),
            voice_settings: request.settings.map(Into::into),
        }
    }

    fn url(&self, voice_id: &str) -> String {
        format!(
            "{}?output_format=pcm_{}",
            join_path(&self.endpoint, &format!("v1/text-to-speech/{}", voice_id)),
            self.sample_rate
        )
    }
}

#[async_trait]
impl SynthesisBackend for ElevenLabsBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::ElevenLabs
    }

    async fn synthesize(&self, request: &SynthesisRequest) -> Result<AudioPayload, SynthesisError> {
        let response = self
            .client
            .post(self.url(&request.voice.voice_id))
            .header("xi-api-key", &self.api_key)
            .header("Accept", "audio/pcm")
            .json(&self.build_request(request))
            .send()
            .await
            .map_err(|e| send_error(self.kind(), self.timeout, e))?;

        let response = check_status(self.kind(), response).await?;
        let body = read_body(self.kind(), self.timeout, response).await?;
        Ok(AudioPayload::pcm16(body, self.sample_rate))
    }
}
