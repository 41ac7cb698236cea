/*!
 * Voice identities and voice assignment.
 *
 * This module contains:
 * - `BackendKind`: the synthesis backends a voice can live on
 * - `VoiceIdentity`: the resolved (backend, voice id, language) triple
 * - `catalog`: static voice tables per backend and language
 * - `assigner`: the engine that resolves a voice for every segment
 */

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::language_utils::VoiceLanguage;
use crate::script::Emotion;

pub mod assigner;
pub mod catalog;

pub use assigner::{CastMember, NarratorDecision, VoiceAssigner};
pub use catalog::VoiceCatalog;

/// Speech synthesis backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    ElevenLabs,
    OpenAI,
    Azure,
    Google,
}

impl BackendKind {
    /// All known backends
    pub const ALL: [BackendKind; 4] = [Self::ElevenLabs, Self::OpenAI, Self::Azure, Self::Google];

    /// Lowercase tag used in configuration and voice namespaces
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ElevenLabs => "elevenlabs",
            Self::OpenAI => "openai",
            Self::Azure => "azure",
            Self::Google => "google",
        }
    }

    /// Parse a backend tag, case-insensitively
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim().to_lowercase();
        Self::ALL.into_iter().find(|b| b.as_str() == value)
    }

    /// Display name
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::ElevenLabs => "ElevenLabs",
            Self::OpenAI => "OpenAI",
            Self::Azure => "Azure",
            Self::Google => "Google",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Account tier; decides which backends are routed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserTier {
    #[default]
    Free,
    Vip,
}

impl UserTier {
    /// Backend used for narration
    pub fn narration_backend(&self) -> BackendKind {
        self.narration_candidates()[0]
    }

    /// Narration backends in order of preference, first one primary
    pub fn narration_candidates(&self) -> [BackendKind; 3] {
        match self {
            Self::Vip => [BackendKind::OpenAI, BackendKind::Azure, BackendKind::Google],
            Self::Free => [BackendKind::Azure, BackendKind::Google, BackendKind::OpenAI],
        }
    }

    /// Backend used for dialogue
    pub fn dialogue_backend(&self) -> BackendKind {
        match self {
            Self::Vip => BackendKind::ElevenLabs,
            Self::Free => BackendKind::Google,
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "free" => Some(Self::Free),
            "vip" => Some(Self::Vip),
            _ => None,
        }
    }
}

impl fmt::Display for UserTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Free => write!(f, "free"),
            Self::Vip => write!(f, "vip"),
        }
    }
}

/// Resolved voice for a segment
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VoiceIdentity {
    pub backend: BackendKind,
    pub voice_id: String,
    pub language: VoiceLanguage,
}

impl VoiceIdentity {
    pub fn new(backend: BackendKind, voice_id: impl Into<String>, language: VoiceLanguage) -> Self {
        Self {
            backend,
            voice_id: voice_id.into(),
            language,
        }
    }

    /// Human-readable label of the voice
    pub fn label(&self) -> String {
        VoiceCatalog::label(&self.voice_id)
    }
}

impl fmt::Display for VoiceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{} ({})", self.backend, self.voice_id, self.language)
    }
}

/// Expressiveness settings sent to backends that support them
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VoiceSettings {
    pub stability: f32,
    pub similarity_boost: f32,
    pub style: f32,
}

impl VoiceSettings {
    /// Settings for a delivery emotion
    pub fn for_emotion(emotion: Emotion) -> Self {
        let (stability, similarity_boost, style) = match emotion {
            Emotion::Neutral | Emotion::Other => (0.60, 0.75, 0.0),
            Emotion::Happy => (0.45, 0.80, 0.3),
            Emotion::Sad => (0.40, 0.70, 0.2),
            Emotion::Angry => (0.30, 0.80, 0.6),
            Emotion::Fearful => (0.30, 0.65, 0.5),
            Emotion::Surprised => (0.35, 0.75, 0.4),
            // low similarity lets breathiness through
            Emotion::Whispering => (0.50, 0.50, 0.0),
            Emotion::Shouting => (0.25, 0.80, 0.7),
        };
        Self {
            stability,
            similarity_boost,
            style,
        }
    }
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self::for_emotion(Emotion::Neutral)
    }
}
