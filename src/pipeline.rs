/*!
 * Pipeline orchestration.
 *
 * A run moves through a fixed sequence of stages:
 *
 * `ScriptReceived → VoicesAssigned → SynthesisInFlight → ClipsComplete | Aborted
 *  → TimelineAssembled → SubtitleEmitted → Done`
 *
 * The narrator decision is made once per run, before any synthesis call,
 * and carried as a value. Synthesis is the only concurrent stage; assembly
 * starts only after every clip exists. Any failure ends the run with a
 * single `PipelineError` and no partial artifact.
 */

use anyhow::{Context, Result};
use log::{debug, error, info};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::app_config::Config;
use crate::audio::AudioClip;
use crate::errors::PipelineError;
use crate::language_utils::VoiceLanguage;
use crate::script::Script;
use crate::subtitles::SubtitleDocument;
use crate::synthesis::{BackendRegistry, BoundedSynthesizer};
use crate::timeline::{TimelineAssembler, TimelineEntry};
use crate::voices::{CastMember, NarratorDecision, VoiceAssigner};

/// Stages of a generation run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    ScriptReceived,
    VoicesAssigned,
    SynthesisInFlight,
    ClipsComplete,
    Aborted,
    TimelineAssembled,
    SubtitleEmitted,
    Done,
}

impl PipelineStage {
    /// Stage that follows on success; `None` for terminal stages
    pub fn next(&self) -> Option<Self> {
        match self {
            Self::ScriptReceived => Some(Self::VoicesAssigned),
            Self::VoicesAssigned => Some(Self::SynthesisInFlight),
            Self::SynthesisInFlight => Some(Self::ClipsComplete),
            Self::ClipsComplete => Some(Self::TimelineAssembled),
            Self::TimelineAssembled => Some(Self::SubtitleEmitted),
            Self::SubtitleEmitted => Some(Self::Done),
            Self::Aborted | Self::Done => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.next().is_none()
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ScriptReceived => "script validation",
            Self::VoicesAssigned => "voice assignment",
            Self::SynthesisInFlight => "synthesis",
            Self::ClipsComplete => "clip collection",
            Self::Aborted => "aborted",
            Self::TimelineAssembled => "timeline assembly",
            Self::SubtitleEmitted => "subtitle emission",
            Self::Done => "done",
        };
        write!(f, "{}", name)
    }
}

/// Hooks for watching a run
pub trait PipelineObserver: Send + Sync {
    /// Called when the run enters a stage
    fn on_stage(&self, _run_id: &str, _stage: PipelineStage) {}

    /// Called after each clip completes
    fn on_clip(&self, _completed: usize, _total: usize) {}
}

/// Observer that ignores everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl PipelineObserver for NoopObserver {}

/// Everything a successful run produces
#[derive(Debug, Clone)]
pub struct DramaArtifacts {
    pub run_id: String,

    // @field: Script with every segment's resolved voice filled in
    pub script: Script,

    pub narrator: NarratorDecision,

    // @field: Merged track at the canonical rate
    pub audio: AudioClip,

    pub timeline: Vec<TimelineEntry>,

    pub subtitles: SubtitleDocument,

    pub cast: Vec<CastMember>,
}

impl DramaArtifacts {
    pub fn duration_ms(&self) -> u64 {
        self.audio.duration_ms()
    }

    /// Subtitle document rendered as SRT
    pub fn srt(&self) -> String {
        self.subtitles.to_srt()
    }
}

/// Runs scripts through assignment, synthesis, assembly and subtitles
#[derive(Debug, Clone)]
pub struct DramaPipeline {
    assigner: VoiceAssigner,
    synthesizer: BoundedSynthesizer,
    assembler: TimelineAssembler,
}

impl DramaPipeline {
    pub fn new(assigner: VoiceAssigner, synthesizer: BoundedSynthesizer, assembler: TimelineAssembler) -> Self {
        Self {
            assigner,
            synthesizer,
            assembler,
        }
    }

    /// Build a pipeline with the HTTP backends described by the configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let registry = BackendRegistry::from_config(config).context("Failed to set up synthesis backends")?;
        Self::with_registry(config, Arc::new(registry))
    }

    /// Build a pipeline from configuration around an existing registry
    pub fn with_registry(config: &Config, registry: Arc<BackendRegistry>) -> Result<Self> {
        let language = VoiceLanguage::from_code(&config.default_language)?;
        let assigner = VoiceAssigner::new(config.tier)
            .with_default_language(language)
            .with_language_policy(config.language_policy)
            .with_available_backends(registry.kinds());

        let synthesizer = BoundedSynthesizer::new(registry)
            .with_retry_policy(config.retry_policy())
            .with_call_timeout(Duration::from_secs(config.synthesis.timeout_secs));

        let assembler =
            TimelineAssembler::new(config.assembly.silence_ms).with_trailing_silence(config.assembly.trailing_silence);

        Ok(Self::new(assigner, synthesizer, assembler))
    }

    pub fn assigner(&self) -> &VoiceAssigner {
        &self.assigner
    }

    pub fn synthesizer(&self) -> &BoundedSynthesizer {
        &self.synthesizer
    }

    pub fn assembler(&self) -> &TimelineAssembler {
        &self.assembler
    }

    /// Run a validated script to completion
    pub async fn run(&self, script: Script) -> Result<DramaArtifacts, PipelineError> {
        self.run_with_observer(script, &NoopObserver).await
    }

    /// Parse a JSON script and run it
    pub async fn run_json(&self, json: &str) -> Result<DramaArtifacts, PipelineError> {
        let script = Script::from_json(json)?;
        self.run(script).await
    }

    /// Run a validated script, reporting stage changes and clip progress
    pub async fn run_with_observer(
        &self,
        script: Script,
        observer: &dyn PipelineObserver,
    ) -> Result<DramaArtifacts, PipelineError> {
        let run_id = Uuid::new_v4().to_string();
        let result = self.execute(&run_id, script, observer).await;

        if let Err(e) = &result {
            error!("[{}] Run failed: {}", run_id, e.report());
            if e.stage() == PipelineStage::SynthesisInFlight {
                Self::enter(&run_id, PipelineStage::Aborted, observer);
            }
        }
        result
    }

    fn enter(run_id: &str, stage: PipelineStage, observer: &dyn PipelineObserver) {
        info!("[{}] Stage: {}", run_id, stage);
        observer.on_stage(run_id, stage);
    }

    async fn execute(
        &self,
        run_id: &str,
        mut script: Script,
        observer: &dyn PipelineObserver,
    ) -> Result<DramaArtifacts, PipelineError> {
        Self::enter(run_id, PipelineStage::ScriptReceived, observer);
        info!("[{}] Received script with {} segment(s)", run_id, script.len());

        let narrator = self.assigner.assign(&mut script);
        debug!(
            "[{}] Narrator {} (language {}, dialogue via {})",
            run_id, narrator.narrator, narrator.language, narrator.dialogue_backend
        );
        Self::enter(run_id, PipelineStage::VoicesAssigned, observer);

        Self::enter(run_id, PipelineStage::SynthesisInFlight, observer);
        let clips = self
            .synthesizer
            .synthesize_all(run_id, &script, |completed, total| observer.on_clip(completed, total))
            .await?;
        Self::enter(run_id, PipelineStage::ClipsComplete, observer);

        let track = self.assembler.assemble(clips, &script.pacings())?;
        Self::enter(run_id, PipelineStage::TimelineAssembled, observer);

        let subtitles = SubtitleDocument::from_timeline(&track.timeline, &script)?;
        Self::enter(run_id, PipelineStage::SubtitleEmitted, observer);

        let cast = VoiceAssigner::cast_sheet(&script);
        Self::enter(run_id, PipelineStage::Done, observer);
        info!(
            "[{}] Produced {} ms of audio across {} segment(s)",
            run_id,
            track.audio.duration_ms(),
            track.timeline.len()
        );

        Ok(DramaArtifacts {
            run_id: run_id.to_string(),
            script,
            narrator,
            audio: track.audio,
            timeline: track.timeline,
            subtitles,
            cast,
        })
    }
}
