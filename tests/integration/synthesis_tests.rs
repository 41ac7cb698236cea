/*!
 * Integration tests for bounded concurrent synthesis
 */

use std::sync::Arc;
use std::time::{Duration, Instant};

use dramaflow::app_config::Config;
use dramaflow::errors::{PipelineError, SynthesisError};
use dramaflow::script::{Gender, Script, Segment};
use dramaflow::synthesis::backends::MockBackend;
use dramaflow::synthesis::{BackendRegistry, BoundedSynthesizer, RecordingSleeper, RetryPolicy, SynthesisRequest};
use dramaflow::voices::{BackendKind, UserTier, VoiceAssigner};

use crate::common;

fn synthesizer(mock: &MockBackend, limit: usize, policy: RetryPolicy) -> (BoundedSynthesizer, Arc<RecordingSleeper>) {
    let sleeper = Arc::new(RecordingSleeper::new());
    let synthesizer = BoundedSynthesizer::new(Arc::new(common::mock_registry(mock, limit)))
        .with_retry_policy(policy)
        .with_sleeper(sleeper.clone());
    (synthesizer, sleeper)
}

#[tokio::test]
async fn test_gated_backend_should_never_exceed_ceiling() {
    let mock = MockBackend::slow(20);
    let (synthesizer, _) = synthesizer(&mock, 3, RetryPolicy::no_retry());

    let mut script = common::dialogue_script(12);
    VoiceAssigner::new(UserTier::Vip).assign(&mut script);

    let clips = synthesizer.synthesize_all("ceiling", &script, |_, _| {}).await.unwrap();
    assert_eq!(clips.len(), 12);

    let limiter = synthesizer.registry().limiter(BackendKind::ElevenLabs).unwrap();
    assert_eq!(mock.request_count(), 12);
    assert!(mock.peak_in_flight() <= 3, "peak was {}", mock.peak_in_flight());
    assert_eq!(limiter.peak(), 3);
    assert_eq!(limiter.in_flight(), 0);
}

#[tokio::test]
async fn test_clips_should_follow_script_order_not_completion_order() {
    // Later segments answer first
    let mock = MockBackend::working()
        .with_ms_per_char(10)
        .with_delay(|request: &SynthesisRequest| (8 - request.index as u64) * 5);
    let (synthesizer, _) = synthesizer(&mock, 8, RetryPolicy::no_retry());

    let mut script = common::narration_script(&["a", "bb", "ccc", "dddd", "eeeee", "ffffff", "ggggggg", "hhhhhhhh"]);
    VoiceAssigner::new(UserTier::Free).assign(&mut script);

    let clips = synthesizer.synthesize_all("order", &script, |_, _| {}).await.unwrap();
    let durations: Vec<u64> = clips.iter().map(|c| c.duration_ms()).collect();
    assert_eq!(durations, vec![10, 20, 30, 40, 50, 60, 70, 80]);
}

#[tokio::test]
async fn test_progress_should_count_every_clip() {
    let mock = MockBackend::working().with_clip_ms(5);
    let (synthesizer, _) = synthesizer(&mock, 3, RetryPolicy::no_retry());

    let mut script = common::dialogue_script(5);
    VoiceAssigner::new(UserTier::Free).assign(&mut script);

    let seen = parking_lot::Mutex::new(Vec::new());
    synthesizer
        .synthesize_all("progress", &script, |completed, total| seen.lock().push((completed, total)))
        .await
        .unwrap();

    assert_eq!(*seen.lock(), vec![(1, 5), (2, 5), (3, 5), (4, 5), (5, 5)]);
}

#[tokio::test]
async fn test_exhausted_segment_should_abort_run() {
    let mock = MockBackend::fail_on_text("Line 3");
    let (synthesizer, sleeper) = synthesizer(&mock, 3, RetryPolicy::new(3, Duration::from_millis(1000)));

    let mut script = common::dialogue_script(5);
    VoiceAssigner::new(UserTier::Free).assign(&mut script);

    let err = synthesizer.synthesize_all("abort", &script, |_, _| {}).await.unwrap_err();
    match err {
        PipelineError::FatalSynthesis { index, attempts, source } => {
            assert_eq!(index, 3);
            assert_eq!(attempts, 3);
            assert!(source.is_transient());
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(mock.calls_for(3), 3);
    assert_eq!(sleeper.recorded(), vec![Duration::from_millis(1000), Duration::from_millis(2000)]);
}

#[tokio::test]
async fn test_permanent_error_should_not_be_retried() {
    let mock = MockBackend::failing_permanent();
    let (synthesizer, sleeper) = synthesizer(&mock, 3, RetryPolicy::default());

    let mut script = common::narration_script(&["Only one."]);
    VoiceAssigner::new(UserTier::Free).assign(&mut script);

    let err = synthesizer.synthesize_all("auth", &script, |_, _| {}).await.unwrap_err();
    assert!(matches!(
        err,
        PipelineError::FatalSynthesis { index: 0, attempts: 1, source: SynthesisError::Authentication(_) }
    ));
    assert_eq!(mock.request_count(), 1);
    assert!(sleeper.recorded().is_empty());
}

#[tokio::test]
async fn test_empty_audio_body_should_be_retried_then_fail() {
    let mock = MockBackend::working().with_clip_ms(0);
    let policy = RetryPolicy::new(3, Duration::from_millis(100));
    let (synthesizer, sleeper) = synthesizer(&mock, 3, policy);

    let mut script = common::narration_script(&["Silence."]);
    VoiceAssigner::new(UserTier::Free).assign(&mut script);

    let err = synthesizer.synthesize_all("empty", &script, |_, _| {}).await.unwrap_err();
    assert!(matches!(
        err,
        PipelineError::FatalSynthesis { index: 0, attempts: 3, source: SynthesisError::EmptyAudio(_) }
    ));
    assert_eq!(mock.request_count(), 3);
    assert_eq!(sleeper.recorded().len(), 2);
}

#[tokio::test]
async fn test_intermittent_backend_should_recover_with_retries() {
    let mock = MockBackend::intermittent(3).with_clip_ms(10);
    let (synthesizer, _) = synthesizer(&mock, 1, RetryPolicy::new(5, Duration::from_millis(50)));

    let mut script = common::dialogue_script(6);
    VoiceAssigner::new(UserTier::Vip).assign(&mut script);

    let clips = synthesizer.synthesize_all("flaky", &script, |_, _| {}).await.unwrap();
    assert_eq!(clips.len(), 6);
    assert!(mock.request_count() > 6);
}

#[tokio::test]
async fn test_slow_call_should_time_out_as_transient() {
    let mock = MockBackend::slow(200);
    let (synthesizer, _) = synthesizer(&mock, 3, RetryPolicy::no_retry());
    let synthesizer = synthesizer.with_call_timeout(Duration::from_millis(20));

    let mut script = common::narration_script(&["Late."]);
    VoiceAssigner::new(UserTier::Free).assign(&mut script);

    let err = synthesizer.synthesize_all("deadline", &script, |_, _| {}).await.unwrap_err();
    assert!(matches!(
        err,
        PipelineError::FatalSynthesis { source: SynthesisError::Timeout(_), .. }
    ));
}

#[tokio::test]
async fn test_missing_backend_should_fail_without_calls() {
    let mock = MockBackend::working();
    let registry = BackendRegistry::new()
        .with_backend(Arc::new(mock.clone().with_kind(BackendKind::Azure)), None);
    let synthesizer = BoundedSynthesizer::new(Arc::new(registry));

    let mut script = common::amy_script();
    VoiceAssigner::new(UserTier::Free).assign(&mut script);

    let err = synthesizer.synthesize_all("missing", &script, |_, _| {}).await.unwrap_err();
    assert!(matches!(
        err,
        PipelineError::FatalSynthesis { index: 1, attempts: 0, source: SynthesisError::BackendUnavailable(_) }
    ));
}

#[tokio::test]
async fn test_hard_failure_should_cancel_siblings_and_free_slots() {
    // The failing line answers fast; everything else would take seconds
    let mock = MockBackend::fail_on_text("BOOM")
        .with_clip_ms(10)
        .with_delay(|request: &SynthesisRequest| if request.text.contains("BOOM") { 20 } else { 3000 });
    let (synthesizer, _) = synthesizer(&mock, 3, RetryPolicy::no_retry());

    let mut segments = vec![Segment::dialogue("Amy", Gender::Female, "BOOM")];
    segments.extend((1..9).map(|i| Segment::dialogue("Ben", Gender::Male, format!("Line {}", i))));
    let mut script = Script::new(segments).unwrap();
    VoiceAssigner::new(UserTier::Vip).assign(&mut script);

    let started = Instant::now();
    let err = synthesizer.synthesize_all("cancel", &script, |_, _| {}).await.unwrap_err();
    let elapsed = started.elapsed();

    assert!(matches!(err, PipelineError::FatalSynthesis { index: 0, attempts: 1, .. }));
    assert!(elapsed < Duration::from_millis(1000), "took {:?}", elapsed);

    let limiter = synthesizer.registry().limiter(BackendKind::ElevenLabs).unwrap();
    assert_eq!(limiter.in_flight(), 0);
    assert_eq!(mock.in_flight(), 0);
    assert!(mock.request_count() <= 3, "{} requests went out", mock.request_count());
}

#[tokio::test]
async fn test_backend_deadline_should_override_synthesizer_deadline() {
    let mock = MockBackend::slow(150).with_clip_ms(10);
    let registry = common::mock_registry(&mock, 3).with_call_timeout(BackendKind::Azure, Duration::from_secs(2));
    let synthesizer = BoundedSynthesizer::new(Arc::new(registry))
        .with_retry_policy(RetryPolicy::no_retry())
        .with_call_timeout(Duration::from_millis(20));

    // Free narration goes to Azure, which has the longer deadline
    let mut script = common::narration_script(&["Patience."]);
    VoiceAssigner::new(UserTier::Free).assign(&mut script);

    let clips = synthesizer.synthesize_all("patient", &script, |_, _| {}).await.unwrap();
    assert_eq!(clips[0].duration_ms(), 10);
}

#[test]
fn test_registry_from_config_should_keep_backend_timeouts() {
    let mut config = Config::default();
    for entry in &mut config.available_backends {
        entry.api_key = "test-key".to_string();
        entry.region = "westeurope".to_string();
    }
    if let Some(entry) = config.backend_config_mut(BackendKind::ElevenLabs) {
        entry.timeout_secs = Some(90);
    }

    let registry = BackendRegistry::from_config(&config).unwrap();
    assert_eq!(registry.call_timeout(BackendKind::ElevenLabs), Some(Duration::from_secs(90)));
    assert_eq!(
        registry.call_timeout(BackendKind::Google),
        Some(Duration::from_secs(config.synthesis.timeout_secs))
    );
}
