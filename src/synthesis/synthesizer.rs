/*!
 * Bounded concurrent synthesizer.
 *
 * All segments are scheduled at once on the current task; calls to a gated
 * backend wait on that backend's limiter, calls to ungated backends go
 * straight out. Each call is retried per the injected `RetryPolicy`.
 *
 * Clips land in a slot vector keyed by segment index, each slot written
 * once, so completion order never leaks into output order. The first hard
 * failure aborts the run: the stream is dropped, which cancels every
 * in-flight and queued call and releases their limiter slots.
 */

use futures::stream::{self, StreamExt};
use log::{debug, error, info};
use std::sync::Arc;
use std::time::Duration;

use crate::audio::AudioClip;
use crate::errors::{PipelineError, SynthesisError};
use crate::pipeline::PipelineStage;
use crate::script::Script;

use super::retry::{RetryFailure, RetryPolicy, Sleeper, TokioSleeper};
use super::{BackendRegistry, SynthesisRequest};

/// Default per-call deadline, for backends without their own
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Produces one clip per segment under per-backend concurrency ceilings
#[derive(Debug, Clone)]
pub struct BoundedSynthesizer {
    registry: Arc<BackendRegistry>,
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
    call_timeout: Duration,
}

impl BoundedSynthesizer {
    pub fn new(registry: Arc<BackendRegistry>) -> Self {
        Self {
            registry,
            policy: RetryPolicy::default(),
            sleeper: Arc::new(TokioSleeper),
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    pub fn registry(&self) -> &Arc<BackendRegistry> {
        &self.registry
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Synthesize one request with retries
    pub async fn synthesize_segment(&self, request: &SynthesisRequest) -> Result<AudioClip, RetryFailure> {
        let registered = self.registry.get(request.voice.backend).ok_or_else(|| RetryFailure {
            attempts: 0,
            error: SynthesisError::BackendUnavailable(request.voice.backend.to_string()),
        })?;

        let call_timeout = registered.call_timeout.unwrap_or(self.call_timeout);
        let label = format!("segment {} ({})", request.index, request.voice);
        self.policy
            .execute(&label, self.sleeper.as_ref(), move |attempt| async move {
                let _permit = match &registered.limiter {
                    Some(limiter) => Some(limiter.acquire().await?),
                    None => None,
                };

                debug!("Synthesizing segment {} attempt {}", request.index, attempt);
                let payload = tokio::time::timeout(call_timeout, registered.backend.synthesize(request))
                    .await
                    .map_err(|_| SynthesisError::Timeout(call_timeout))??;

                AudioClip::decode(&payload)
            })
            .await
    }

    /// Synthesize every segment of an assigned script.
    ///
    /// Returns clips in script order. `progress` is called with
    /// `(completed, total)` after each clip.
    pub async fn synthesize_all<F>(&self, run_id: &str, script: &Script, progress: F) -> Result<Vec<AudioClip>, PipelineError>
    where
        F: Fn(usize, usize) + Send + Sync,
    {
        let total = script.len();
        let requests = script
            .iter()
            .enumerate()
            .map(|(index, segment)| {
                segment
                    .resolved_voice
                    .clone()
                    .map(|voice| SynthesisRequest::for_segment(index, segment, voice))
                    .ok_or_else(|| {
                        PipelineError::invariant(
                            PipelineStage::SynthesisInFlight,
                            format!("segment {} has no resolved voice", index),
                        )
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        info!("[{}] Synthesizing {} segment(s)", run_id, total);

        let mut slots: Vec<Option<AudioClip>> = vec![None; total];
        let mut completed = 0;

        let mut results = stream::iter(requests)
            .map(|request| async move {
                let outcome = self.synthesize_segment(&request).await;
                (request.index, outcome)
            })
            .buffer_unordered(total.max(1));

        while let Some((index, outcome)) = results.next().await {
            match outcome {
                Ok(clip) => {
                    let slot = slots.get_mut(index).ok_or_else(|| {
                        PipelineError::invariant(PipelineStage::SynthesisInFlight, format!("no slot for segment {}", index))
                    })?;
                    if slot.replace(clip).is_some() {
                        return Err(PipelineError::invariant(
                            PipelineStage::SynthesisInFlight,
                            format!("segment {} produced two clips", index),
                        ));
                    }
                    completed += 1;
                    progress(completed, total);
                }
                Err(failure) => {
                    error!(
                        "[{}] Segment {} failed after {} attempt(s): {}; aborting run",
                        run_id, index, failure.attempts, failure.error
                    );
                    return Err(PipelineError::FatalSynthesis {
                        index,
                        attempts: failure.attempts,
                        source: failure.error,
                    });
                }
            }
        }

        slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| {
                slot.ok_or_else(|| {
                    PipelineError::invariant(PipelineStage::ClipsComplete, format!("segment {} has no clip", index))
                })
            })
            .collect()
    }
}
