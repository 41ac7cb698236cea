/*!
 * Mock synthesis backend for testing.
 *
 * This module provides a backend that simulates different behaviors:
 * - `MockBackend::working()` - Always succeeds with a tone clip
 * - `MockBackend::failing()` - Always fails with a transient server error
 * - `MockBackend::failing_permanent()` - Always fails with an auth error
 * - `MockBackend::intermittent(n)` - Fails every nth request
 * - `MockBackend::slow(ms)` - Succeeds after a delay
 * - `MockBackend::fail_on_text(needle)` - Fails transiently for matching text
 *
 * Every call is recorded, and calls currently inside `synthesize` are
 * counted so tests can check concurrency ceilings from the backend's side.
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::audio::{AudioPayload, CANONICAL_SAMPLE_RATE, SAMPLES_PER_MS};
use crate::errors::SynthesisError;
use crate::synthesis::{SynthesisBackend, SynthesisRequest};
use crate::voices::BackendKind;

/// Behavior mode for the mock backend
#[derive(Debug, Clone, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds
    Working,
    /// Always fails with HTTP 500
    Failing,
    /// Always fails with HTTP 401
    FailingPermanent,
    /// Fails every Nth request with HTTP 503
    Intermittent { fail_every: usize },
    /// Succeeds after a delay
    Slow { delay_ms: u64 },
    /// Fails with HTTP 503 whenever the text contains the needle
    FailOnText { needle: String },
}

#[derive(Debug, Default)]
struct MockState {
    request_count: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    calls: Mutex<Vec<SynthesisRequest>>,
}

// Decrements the in-flight counter even when the call is cancelled
struct InFlightGuard<'a>(&'a MockState);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Mock backend; clones share counters and call records
#[derive(Debug, Clone)]
pub struct MockBackend {
    kind: BackendKind,
    behavior: MockBehavior,
    clip_ms: u64,
    ms_per_char: Option<u64>,
    delay: Option<fn(&SynthesisRequest) -> u64>,
    state: Arc<MockState>,
}

impl MockBackend {
    /// Create a new mock backend with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            kind: BackendKind::Google,
            behavior,
            clip_ms: 1000,
            ms_per_char: None,
            delay: None,
            state: Arc::new(MockState::default()),
        }
    }

    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    pub fn failing_permanent() -> Self {
        Self::new(MockBehavior::FailingPermanent)
    }

    pub fn intermittent(fail_every: usize) -> Self {
        Self::new(MockBehavior::Intermittent {
            fail_every: fail_every.max(1),
        })
    }

    pub fn slow(delay_ms: u64) -> Self {
        Self::new(MockBehavior::Slow { delay_ms })
    }

    pub fn fail_on_text(needle: impl Into<String>) -> Self {
        Self::new(MockBehavior::FailOnText { needle: needle.into() })
    }

    /// Pose as a specific backend
    pub fn with_kind(mut self, kind: BackendKind) -> Self {
        self.kind = kind;
        self
    }

    /// Fixed clip length for every request
    pub fn with_clip_ms(mut self, clip_ms: u64) -> Self {
        self.clip_ms = clip_ms;
        self.ms_per_char = None;
        self
    }

    /// Clip length proportional to the text length
    pub fn with_ms_per_char(mut self, ms_per_char: u64) -> Self {
        self.ms_per_char = Some(ms_per_char);
        self
    }

    /// Per-request delay, applied before answering
    pub fn with_delay(mut self, delay: fn(&SynthesisRequest) -> u64) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Clip length the mock produces for a text
    pub fn clip_ms_for(&self, text: &str) -> u64 {
        match self.ms_per_char {
            Some(per_char) => per_char * text.chars().count() as u64,
            None => self.clip_ms,
        }
    }

    /// Number of synthesize calls so far
    pub fn request_count(&self) -> usize {
        self.state.request_count.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneous calls observed
    pub fn peak_in_flight(&self) -> usize {
        self.state.peak_in_flight.load(Ordering::SeqCst)
    }

    /// Calls currently running
    pub fn in_flight(&self) -> usize {
        self.state.in_flight.load(Ordering::SeqCst)
    }

    /// Requests received, in arrival order
    pub fn calls(&self) -> Vec<SynthesisRequest> {
        self.state.calls.lock().clone()
    }

    /// Calls received for one segment index
    pub fn calls_for(&self, index: usize) -> usize {
        self.state.calls.lock().iter().filter(|r| r.index == index).count()
    }

    /// Raw PCM16 tone of the given length
    pub fn tone(ms: u64) -> AudioPayload {
        let samples = ms as usize * SAMPLES_PER_MS;
        let mut data = Vec::with_capacity(samples * 2);
        for _ in 0..samples {
            data.extend_from_slice(&4096i16.to_le_bytes());
        }
        AudioPayload::pcm16(data, CANONICAL_SAMPLE_RATE)
    }

    fn outcome(&self, count: usize, request: &SynthesisRequest) -> Result<AudioPayload, SynthesisError> {
        let tone = || Self::tone(self.clip_ms_for(&request.text));
        match &self.behavior {
            MockBehavior::Working | MockBehavior::Slow { .. } => Ok(tone()),
            MockBehavior::Failing => Err(SynthesisError::Api {
                status_code: 500,
                message: "Simulated backend failure".to_string(),
            }),
            MockBehavior::FailingPermanent => Err(SynthesisError::Authentication("Simulated invalid API key".to_string())),
            MockBehavior::Intermittent { fail_every } => {
                if count % fail_every == fail_every - 1 {
                    Err(SynthesisError::Api {
                        status_code: 503,
                        message: format!("Simulated intermittent failure (request #{})", count + 1),
                    })
                } else {
                    Ok(tone())
                }
            }
            MockBehavior::FailOnText { needle } => {
                if request.text.contains(needle.as_str()) {
                    Err(SynthesisError::Api {
                        status_code: 503,
                        message: format!("Simulated failure for segment {}", request.index),
                    })
                } else {
                    Ok(tone())
                }
            }
        }
    }
}

#[async_trait]
impl SynthesisBackend for MockBackend {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    async fn synthesize(&self, request: &SynthesisRequest) -> Result<AudioPayload, SynthesisError> {
        let count = self.state.request_count.fetch_add(1, Ordering::SeqCst);
        self.state.calls.lock().push(request.clone());

        let now = self.state.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlightGuard(&self.state);

        let mut delay_ms = self.delay.map(|f| f(request)).unwrap_or(0);
        if let MockBehavior::Slow { delay_ms: slow } = self.behavior {
            delay_ms += slow;
        }
        if delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        } else {
            tokio::task::yield_now().await;
        }

        self.outcome(count, request)
    }
}
