/*!
 * Common test utilities for the dramaflow test suite
 */

use anyhow::Result;
use parking_lot::Mutex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

use dramaflow::pipeline::{DramaPipeline, PipelineObserver, PipelineStage};
use dramaflow::script::{Gender, Script, Segment};
use dramaflow::synthesis::backends::MockBackend;
use dramaflow::synthesis::{BackendRegistry, BoundedSynthesizer, RecordingSleeper, RetryPolicy};
use dramaflow::timeline::TimelineAssembler;
use dramaflow::voices::{BackendKind, UserTier, VoiceAssigner};

/// Routes library logs to the test harness; repeated calls are harmless
pub fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// The three-segment scene with Amy
pub fn amy_script() -> Script {
    Script::new(vec![
        Segment::narration("It was dark."),
        Segment::dialogue("Amy", Gender::Female, "Hello?"),
        Segment::narration("She paused.").with_gender(Gender::Male),
    ])
    .unwrap()
}

/// Same scene as the script generator emits it
pub const AMY_SCRIPT_JSON: &str = r#"{"script": [
    {"type": "narration", "text": "It was dark.", "character": "Narrator", "gender": "female", "emotion": "neutral", "pacing": 1.0},
    {"type": "dialogue", "text": "Hello?", "character": "Amy", "gender": "female", "emotion": "fearful", "pacing": 1.0},
    {"type": "narration", "text": "She paused.", "character": "Narrator", "gender": "male", "emotion": "neutral", "pacing": 1.0}
]}"#;

/// Narration-only script with one segment per text
pub fn narration_script(texts: &[&str]) -> Script {
    Script::new(texts.iter().map(|t| Segment::narration(*t)).collect()).unwrap()
}

/// Dialogue-only script alternating two speakers
pub fn dialogue_script(count: usize) -> Script {
    let segments = (0..count)
        .map(|i| {
            if i % 2 == 0 {
                Segment::dialogue("Amy", Gender::Female, format!("Line {}", i))
            } else {
                Segment::dialogue("Ben", Gender::Male, format!("Line {}", i))
            }
        })
        .collect();
    Script::new(segments).unwrap()
}

/// Registry where every backend kind is served by clones of one mock.
///
/// ElevenLabs is gated at `elevenlabs_limit`; the others are ungated.
pub fn mock_registry(mock: &MockBackend, elevenlabs_limit: usize) -> BackendRegistry {
    BackendKind::ALL.into_iter().fold(BackendRegistry::new(), |registry, kind| {
        let limit = (kind == BackendKind::ElevenLabs).then_some(elevenlabs_limit);
        registry.with_backend(Arc::new(mock.clone().with_kind(kind)), limit)
    })
}

/// Pipeline over a mock with instant, recorded backoff
pub fn mock_pipeline(mock: &MockBackend, tier: UserTier, policy: RetryPolicy) -> (DramaPipeline, Arc<RecordingSleeper>) {
    let sleeper = Arc::new(RecordingSleeper::new());
    let synthesizer = BoundedSynthesizer::new(Arc::new(mock_registry(mock, 3)))
        .with_retry_policy(policy)
        .with_sleeper(sleeper.clone());
    let pipeline = DramaPipeline::new(VoiceAssigner::new(tier), synthesizer, TimelineAssembler::default());
    (pipeline, sleeper)
}

/// Observer that records every stage entered
#[derive(Debug, Default)]
pub struct StageRecorder {
    pub stages: Mutex<Vec<PipelineStage>>,
    pub clips: Mutex<Vec<(usize, usize)>>,
}

impl PipelineObserver for StageRecorder {
    fn on_stage(&self, _run_id: &str, stage: PipelineStage) {
        self.stages.lock().push(stage);
    }

    fn on_clip(&self, completed: usize, total: usize) {
        self.clips.lock().push((completed, total));
    }
}
