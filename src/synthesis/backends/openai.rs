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
use crate::voices::BackendKind;

use super::{check_status, http_client, join_path, read_body, send_error};

/// OpenAI speech client
pub struct OpenAIBackend {
    client: Client,
    api_key: String,
    endpoint: Url,
    model: String,
    timeout: Duration,
    // @field: Rate of the headerless pcm response
    sample_rate: u32,
}

/// Speech request body
#[derive(Debug, Serialize)]
pub struct OpenAISpeechRequest {
    pub model: String,
    pub input: String,
    pub voice: String,
    pub response_format: &'static str,
}

impl fmt::Debug for OpenAIBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAIBackend")
            .field("endpoint", &self.endpoint.as_str())
            .field("model", &self.model)
            .finish()
    }
}

impl OpenAIBackend {
    pub fn new(api_key: impl Into<String>, endpoint: Url, model: impl Into<String>, timeout: Duration) -> Self {
        let profile = BackendProfile::for_backend(BackendKind::OpenAI);
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

    /// Build the request body; a voice of the form "model|voice" overrides the model
    pub fn build_request(&self, request: &SynthesisRequest) -> OpenAISpeechRequest {
        let (model, voice) = match request.voice.voice_id.split_once('|') {
            Some((model, voice)) => (model.to_string(), voice.to_string()),
            None => (self.model.clone(), request.voice.voice_id.clone()),
        };
        OpenAISpeechRequest {
            model,
            input: request.text.clone(),
            voice,
            // headerless signed 16-bit little-endian
            response_format: "pcm",
        }
    }
}

#[async_trait]
impl SynthesisBackend for OpenAIBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::OpenAI
    }

    async fn synthesize(&self, request: &SynthesisRequest) -> Result<AudioPayload, SynthesisError> {
        let response = self
            .client
            .post(join_path(&self.endpoint, "audio/speech"))
            .bearer_auth(&self.api_key)
            .json(&self.build_request(request))
            .send()
            .await
            .map_err(|e| send_error(self.kind(), self.timeout, e))?;

        let response = check_status(self.kind(), response).await?;
        let body = read_body(self.kind(), self.timeout, response).await?;
        Ok(AudioPayload::pcm16(body, self.sample_rate))
    }
}
