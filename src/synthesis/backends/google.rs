use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use url::Url;

use crate::audio::AudioPayload;
use crate::errors::SynthesisError;
use crate::synthesis::profile::BackendProfile;
use crate::synthesis::{SynthesisBackend, SynthesisRequest};
use crate::voices::BackendKind;

use super::{check_status, http_client, join_path, send_error};

/// Google Cloud Text-to-Speech client
pub struct GoogleBackend {
    client: Client,
    api_key: String,
    endpoint: Url,
    timeout: Duration,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleSynthesizeRequest {
    pub input: GoogleInput,
    pub voice: GoogleVoice,
    pub audio_config: GoogleAudioConfig,
}

#[derive(Debug, Serialize)]
pub struct GoogleInput {
    pub text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleVoice {
    pub language_code: String,
    pub name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleAudioConfig {
    pub audio_encoding: &'static str,
    pub sample_rate_hertz: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleSynthesizeResponse {
    audio_content: String,
}

impl fmt::Debug for GoogleBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GoogleBackend")
            .field("endpoint", &self.endpoint.as_str())
            .finish()
    }
}

impl GoogleBackend {
    pub fn new(api_key: impl Into<String>, endpoint: Url, timeout: Duration) -> Self {
        Self {
            client: http_client(timeout),
            api_key: api_key.into(),
            endpoint,
            timeout,
        }
    }

    /// Language code embedded in a voice name, e.g. "cmn-CN" in "cmn-CN-Wavenet-A"
    pub fn language_code(voice_name: &str, fallback: &str) -> String {
        let parts: Vec<&str> = voice_name.splitn(3, '-').collect();
        if parts.len() == 3 {
            format!("{}-{}", parts[0], parts[1])
        } else {
            fallback.to_string()
        }
    }

    pub fn build_request(request: &SynthesisRequest) -> GoogleSynthesizeRequest {
        GoogleSynthesizeRequest {
            input: GoogleInput {
                text: request.text.clone(),
            },
            voice: GoogleVoice {
                language_code: Self::language_code(&request.voice.voice_id, request.voice.language.locale()),
                name: request.voice.voice_id.clone(),
            },
            audio_config: GoogleAudioConfig {
                // LINEAR16 comes back with a WAV header
                audio_encoding: "LINEAR16",
                sample_rate_hertz: BackendProfile::for_backend(BackendKind::Google).output_sample_rate,
            },
        }
    }
}

#[async_trait]
impl SynthesisBackend for GoogleBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Google
    }

    async fn synthesize(&self, request: &SynthesisRequest) -> Result<AudioPayload, SynthesisError> {
        let response = self
            .client
            .post(join_path(&self.endpoint, "v1/text:synthesize"))
            .query(&[("key", self.api_key.as_str())])
            .json(&Self::build_request(request))
            .send()
            .await
            .map_err(|e| send_error(self.kind(), self.timeout, e))?;

        let response = check_status(self.kind(), response).await?;
        let body = response
            .json::<GoogleSynthesizeResponse>()
            .await
            .map_err(|e| SynthesisError::Decode(format!("Failed to parse Google response: {}", e)))?;

        let audio = STANDARD
            .decode(body.audio_content.as_bytes())
            .map_err(|e| SynthesisError::Decode(format!("Invalid base64 audio: {}", e)))?;
        Ok(AudioPayload::wav(audio))
    }
}
