/*!
 * # dramaflow - Audio drama assembly
 *
 * A Rust library that turns a structured narrative script into one merged
 * audio track plus a matching subtitle document.
 *
 * ## Features
 *
 * - Deterministic voice assignment with one consistent narrator per script
 * - Speech synthesis through several backends:
 *   - ElevenLabs
 *   - OpenAI
 *   - Azure Speech
 *   - Google Cloud Text-to-Speech
 * - Per-backend concurrency ceilings with retry and exponential backoff
 * - Fail-fast runs: one hard failure aborts the whole script
 * - Paced, gap-separated timeline with integer millisecond offsets
 * - SRT (and WebVTT) subtitles aligned with the merged track
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `script`: Script model and JSON ingestion
 * - `voices`: Voice identities, catalog tables and the voice assigner
 * - `synthesis`: Backend abstraction and the bounded concurrent synthesizer:
 *   - `synthesis::retry`: Retry policy and sleeper
 *   - `synthesis::limiter`: Concurrency gate
 *   - `synthesis::backends`: HTTP backends and a mock
 * - `audio`: Canonical sample format, decoding, pacing and WAV output
 * - `timeline`: Timeline assembly
 * - `subtitles`: Subtitle emission and parsing
 * - `pipeline`: Stage machine and orchestration
 * - `app_config`: Configuration management
 * - `file_utils`: Artifact output
 * - `language_utils`: Language detection and ISO language code utilities
 * - `errors`: Custom error types for the application
 */

#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod audio;
pub mod errors;
pub mod file_utils;
pub mod language_utils;
pub mod pipeline;
pub mod script;
pub mod subtitles;
pub mod synthesis;
pub mod timeline;
pub mod voices;

// Re-export main types for easier usage
pub use app_config::Config;
pub use audio::AudioClip;
pub use errors::{AppError, PipelineError, SynthesisError, ValidationError};
pub use pipeline::{DramaArtifacts, DramaPipeline, PipelineObserver, PipelineStage};
pub use script::{Emotion, Gender, Script, Segment, SegmentType};
pub use subtitles::{SubtitleDocument, SubtitleEntry};
pub use synthesis::{BackendRegistry, BoundedSynthesizer, RetryPolicy, SynthesisBackend};
pub use timeline::{TimelineAssembler, TimelineEntry};
pub use voices::{BackendKind, UserTier, VoiceAssigner, VoiceIdentity};
