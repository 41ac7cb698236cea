/*!
 * Synthesis backend implementations.
 *
 * - `elevenlabs`: expressive dialogue voices, concurrency-limited
 * - `openai`: narration voices
 * - `azure`: regional neural voices driven by SSML
 * - `google`: Neural2/Wavenet voices
 * - `mock`: scripted behavior for tests
 */

use anyhow::{Context, Result, anyhow};
use log::error;
use reqwest::{Client, Response};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use crate::app_config::BackendConfig;
use crate::errors::SynthesisError;
use crate::voices::BackendKind;

use super::SynthesisBackend;
use super::profile::BackendProfile;

pub mod azure;
pub mod elevenlabs;
pub mod google;
pub mod mock;
pub mod openai;

pub use azure::AzureBackend;
pub use elevenlabs::ElevenLabsBackend;
pub use google::GoogleBackend;
pub use mock::{MockBackend, MockBehavior};
pub use openai::OpenAIBackend;

/// Build the HTTP backend described by a configuration entry
pub fn build_backend(entry: &BackendConfig, default_timeout_secs: u64) -> Result<Arc<dyn SynthesisBackend>> {
    let timeout = BackendProfile::effective_timeout(entry.timeout_secs, default_timeout_secs);
    let api_key = entry.resolved_api_key();
    if api_key.is_empty() {
        return Err(anyhow!("No API key configured for {}", entry.backend_type));
    }

    let backend: Arc<dyn SynthesisBackend> = match entry.backend_type {
        BackendKind::ElevenLabs => Arc::new(ElevenLabsBackend::new(
            api_key,
            base_url(entry)?,
            entry.model.clone(),
            timeout,
        )),
        BackendKind::OpenAI => Arc::new(OpenAIBackend::new(api_key, base_url(entry)?, entry.model.clone(), timeout)),
        BackendKind::Azure => {
            let region = entry.resolved_region();
            if region.is_empty() && entry.endpoint.is_empty() {
                return Err(anyhow!("Azure needs either a region or an endpoint"));
            }
            let endpoint = if entry.endpoint.is_empty() {
                BackendProfile::for_backend(BackendKind::Azure)
                    .default_endpoint
                    .replace("{region}", &region)
            } else {
                entry.endpoint.clone()
            };
            Arc::new(AzureBackend::new(api_key, parse_endpoint(&endpoint)?, timeout))
        }
        BackendKind::Google => Arc::new(GoogleBackend::new(api_key, base_url(entry)?, timeout)),
    };

    Ok(backend)
}

fn base_url(entry: &BackendConfig) -> Result<Url> {
    if entry.endpoint.is_empty() {
        parse_endpoint(BackendProfile::for_backend(entry.backend_type).default_endpoint)
    } else {
        parse_endpoint(&entry.endpoint)
    }
}

/// Parse an endpoint, normalized without a trailing slash
pub fn parse_endpoint(endpoint: &str) -> Result<Url> {
    Url::parse(endpoint.trim().trim_end_matches('/')).with_context(|| format!("Invalid endpoint URL: {}", endpoint))
}

/// Join a path onto a base URL, keeping the base's own path
pub(crate) fn join_path(base: &Url, path: &str) -> String {
    format!("{}/{}", base.as_str().trim_end_matches('/'), path.trim_start_matches('/'))
}

/// HTTP client shared by one backend
pub(crate) fn http_client(timeout: Duration) -> Client {
    Client::builder()
        .timeout(timeout)
        .pool_idle_timeout(Duration::from_secs(90))
        .build()
        .unwrap_or_default()
}

/// Classify a transport-level failure
pub(crate) fn send_error(backend: BackendKind, timeout: Duration, e: reqwest::Error) -> SynthesisError {
    if e.is_timeout() {
        SynthesisError::Timeout(timeout)
    } else {
        SynthesisError::Connection(format!("{}: {}", backend.display_name(), e))
    }
}

/// Turn a non-success response into a classified error
pub(crate) async fn check_status(backend: BackendKind, response: Response) -> Result<Response, SynthesisError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Failed to get error response text".to_string());
    error!("{} API error ({}): {}", backend.display_name(), status, error_text);
    Err(SynthesisError::from_status(status.as_u16(), error_text))
}

/// Read a response body, classifying a broken stream as transient
pub(crate) async fn read_body(backend: BackendKind, timeout: Duration, response: Response) -> Result<bytes::Bytes, SynthesisError> {
    response.bytes().await.map_err(|e| send_error(backend, timeout, e))
}
