/*!
 * End-to-end pipeline tests over mock backends
 */

use std::sync::Arc;
use std::time::Duration;

use dramaflow::app_config::Config;
use dramaflow::errors::PipelineError;
use dramaflow::pipeline::{DramaPipeline, PipelineStage};
use dramaflow::script::{Gender, Script, Segment};
use dramaflow::subtitles::SubtitleDocument;
use dramaflow::synthesis::{BackendRegistry, RetryPolicy};
use dramaflow::synthesis::backends::MockBackend;
use dramaflow::timeline::DEFAULT_SILENCE_MS;
use dramaflow::voices::{BackendKind, UserTier};

use crate::common::{self, StageRecorder};

#[tokio::test]
async fn test_amy_scene_should_produce_three_prefixed_entries() {
    let mock = MockBackend::working().with_clip_ms(800);
    let (pipeline, _) = common::mock_pipeline(&mock, UserTier::Free, RetryPolicy::no_retry());

    let artifacts = pipeline.run(common::amy_script()).await.unwrap();

    let narration_a = artifacts.script.segments()[0].resolved_voice.clone();
    let narration_b = artifacts.script.segments()[2].resolved_voice.clone();
    assert!(narration_a.is_some());
    assert_eq!(narration_a, narration_b);

    assert_eq!(artifacts.subtitles.len(), 3);
    assert!(artifacts.subtitles.entries[1].text.starts_with("[Amy]"));
    assert!(!artifacts.subtitles.entries[0].text.starts_with('['));
}

#[tokio::test]
async fn test_run_json_should_accept_generator_output() {
    let mock = MockBackend::working().with_clip_ms(100);
    let (pipeline, _) = common::mock_pipeline(&mock, UserTier::Vip, RetryPolicy::no_retry());

    let artifacts = pipeline.run_json(common::AMY_SCRIPT_JSON).await.unwrap();
    assert_eq!(artifacts.timeline.len(), 3);
    assert_eq!(artifacts.cast.len(), 2);
    assert_eq!(artifacts.cast[0].character, "Narrator");
}

#[tokio::test]
async fn test_timeline_should_have_fixed_gaps_and_match_audio() {
    let mock = MockBackend::working().with_ms_per_char(25);
    let (pipeline, _) = common::mock_pipeline(&mock, UserTier::Free, RetryPolicy::no_retry());

    let script = Script::new(vec![
        Segment::narration("The door creaked."),
        Segment::dialogue("Ben", Gender::Male, "Anyone?").with_pacing(1.25),
        Segment::dialogue("Amy", Gender::Female, "Over here.").with_pacing(0.75),
        Segment::narration("Silence."),
    ])
    .unwrap();
    let artifacts = pipeline.run(script).await.unwrap();

    assert_eq!(artifacts.timeline.len(), 4);
    for pair in artifacts.timeline.windows(2) {
        assert_eq!(pair[1].start_ms - pair[0].end_ms, DEFAULT_SILENCE_MS);
    }
    // "Anyone?" is 175 ms, sped up by 1.25
    assert_eq!(artifacts.timeline[1].duration_ms(), 140);
    assert_eq!(artifacts.duration_ms(), artifacts.timeline[3].end_ms);
}

#[tokio::test]
async fn test_subtitles_should_round_trip_through_srt() {
    let mock = MockBackend::working().with_ms_per_char(13);
    let (pipeline, _) = common::mock_pipeline(&mock, UserTier::Free, RetryPolicy::no_retry());

    let artifacts = pipeline.run(common::dialogue_script(7)).await.unwrap();
    let parsed = SubtitleDocument::parse_srt(&artifacts.srt()).unwrap();

    assert_eq!(parsed.to_timeline(), artifacts.timeline);
    assert_eq!(parsed, artifacts.subtitles);
}

#[tokio::test]
async fn test_failing_segment_should_abort_without_artifacts() {
    common::init_test_logging();
    let mock = MockBackend::fail_on_text("Line 3");
    let (pipeline, sleeper) = common::mock_pipeline(&mock, UserTier::Free, RetryPolicy::new(3, Duration::from_millis(500)));
    let recorder = StageRecorder::default();

    let result = pipeline.run_with_observer(common::dialogue_script(5), &recorder).await;

    let err = result.unwrap_err();
    assert!(matches!(err, PipelineError::FatalSynthesis { index: 3, attempts: 3, .. }));
    assert_eq!(err.stage(), PipelineStage::SynthesisInFlight);
    assert!(err.report().contains("segment 3"));
    assert_eq!(sleeper.recorded().len(), 2);

    let stages = recorder.stages.lock().clone();
    assert_eq!(stages.last(), Some(&PipelineStage::Aborted));
    assert!(!stages.contains(&PipelineStage::TimelineAssembled));
    assert!(!stages.contains(&PipelineStage::SubtitleEmitted));
}

#[tokio::test]
async fn test_stages_should_run_in_order() {
    common::init_test_logging();
    let mock = MockBackend::working().with_clip_ms(10);
    let (pipeline, _) = common::mock_pipeline(&mock, UserTier::Free, RetryPolicy::no_retry());
    let recorder = StageRecorder::default();

    pipeline.run_with_observer(common::amy_script(), &recorder).await.unwrap();

    assert_eq!(
        *recorder.stages.lock(),
        vec![
            PipelineStage::ScriptReceived,
            PipelineStage::VoicesAssigned,
            PipelineStage::SynthesisInFlight,
            PipelineStage::ClipsComplete,
            PipelineStage::TimelineAssembled,
            PipelineStage::SubtitleEmitted,
            PipelineStage::Done,
        ]
    );
    assert_eq!(recorder.clips.lock().last(), Some(&(3, 3)));
}

#[tokio::test]
async fn test_concurrent_runs_should_keep_their_own_narrators() {
    let mock = MockBackend::working().with_clip_ms(20);
    let (pipeline, _) = common::mock_pipeline(&mock, UserTier::Free, RetryPolicy::no_retry());

    let english = common::narration_script(&["Night fell.", "The end."]);
    let chinese = common::narration_script(&["夜深了。", "结束。"]);
    let (a, b) = tokio::join!(pipeline.run(english), pipeline.run(chinese));
    let (a, b) = (a.unwrap(), b.unwrap());

    assert_ne!(a.narrator.narrator, b.narrator.narrator);
    assert!(a.script.iter().all(|s| s.resolved_voice.as_ref() == Some(&a.narrator.narrator)));
    assert!(b.script.iter().all(|s| s.resolved_voice.as_ref() == Some(&b.narrator.narrator)));
    assert_ne!(a.run_id, b.run_id);
}

#[tokio::test]
async fn test_pipeline_from_config_should_apply_assembly_settings() {
    let mock = MockBackend::working().with_clip_ms(100);
    let mut config = Config::default();
    config.assembly.silence_ms = 50;
    config.assembly.trailing_silence = true;
    config.synthesis.max_attempts = 2;

    let registry = Arc::new(common::mock_registry(&mock, 3));
    let pipeline = DramaPipeline::with_registry(&config, registry).unwrap();
    assert_eq!(pipeline.synthesizer().policy().max_attempts(), 2);

    let artifacts = pipeline.run(common::narration_script(&["One.", "Two."])).await.unwrap();
    assert_eq!(artifacts.timeline[1].start_ms, 150);
    assert_eq!(artifacts.duration_ms(), 300);
}

#[tokio::test]
async fn test_free_run_without_azure_should_narrate_with_google() {
    let mock = MockBackend::working().with_clip_ms(100).with_kind(BackendKind::Google);
    let registry = Arc::new(BackendRegistry::new().with_backend(Arc::new(mock.clone()), None));
    let pipeline = DramaPipeline::with_registry(&Config::default(), registry).unwrap();

    let artifacts = pipeline.run(common::amy_script()).await.unwrap();
    let narrator = artifacts.script.segments()[0].resolved_voice.clone().unwrap();
    assert_eq!(narrator.backend, BackendKind::Google);
    assert_eq!(mock.request_count(), 3);
}
