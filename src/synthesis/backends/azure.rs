use async_trait::async_trait;
use reqwest::Client;
use std::fmt;
use std::time::Duration;
use url::Url;

use crate::audio::AudioPayload;
use crate::errors::SynthesisError;
use crate::synthesis::profile::BackendProfile;
use crate::synthesis::{SynthesisBackend, SynthesisRequest};
use crate::voices::BackendKind;

use super::{check_status, http_client, join_path, read_body, send_error};

/// Azure Speech REST client
pub struct AzureBackend {
    client: Client,
    api_key: String,
    // @field: Regional base, e.g. https://eastus.tts.speech.microsoft.com
    endpoint: Url,
    timeout: Duration,
}

impl fmt::Debug for AzureBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AzureBackend")
            .field("endpoint", &self.endpoint.as_str())
            .finish()
    }
}

impl AzureBackend {
    pub fn new(api_key: impl Into<String>, endpoint: Url, timeout: Duration) -> Self {
        Self {
            client: http_client(timeout),
            api_key: api_key.into(),
            endpoint,
            timeout,
        }
    }

    /// `X-Microsoft-OutputFormat` value: RIFF container, 16-bit mono
    pub fn output_format() -> String {
        let rate = BackendProfile::for_backend(BackendKind::Azure).output_sample_rate;
        format!("riff-{}khz-16bit-mono-pcm", rate / 1000)
    }

    /// SSML document for a request
    pub fn build_ssml(request: &SynthesisRequest) -> String {
        format!(
            "<speak version='1.0' xmlns='http://www.w3.org/2001/10/synthesis' xml:lang='{}'><voice name='{}'>{}</voice></speak>",
            request.voice.language.locale(),
            escape_xml(&request.voice.voice_id),
            escape_xml(&request.text)
        )
    }
}

/// Escape text for inclusion in SSML
pub fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[async_trait]
impl SynthesisBackend for AzureBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Azure
    }

    async fn synthesize(&self, request: &SynthesisRequest) -> Result<AudioPayload, SynthesisError> {
        let response = self
            .client
            .post(join_path(&self.endpoint, "cognitiveservices/v1"))
            .header("Ocp-Apim-Subscription-Key", &self.api_key)
            .header("Content-Type", "application/ssml+xml")
            .header("X-Microsoft-OutputFormat", Self::output_format())
            .header("User-Agent", "dramaflow")
            .body(Self::build_ssml(request))
            .send()
            .await
            .map_err(|e| send_error(self.kind(), self.timeout, e))?;

        let response = check_status(self.kind(), response).await?;
        let body = read_body(self.kind(), self.timeout, response).await?;
        Ok(AudioPayload::wav(body))
    }
}
