/*!
 * Script model for audio drama generation.
 *
 * A script is an ordered list of segments, each either narration or a line of
 * dialogue. Order is playback order and is never permuted downstream.
 *
 * Scripts usually come from an LLM, so ingestion is lenient where it can be
 * (gender, emotion, pacing, character) and strict where it must be (segment
 * type and text).
 */

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::ValidationError;
use crate::voices::VoiceIdentity;

/// Character name used for every narration segment
pub const NARRATOR: &str = "Narrator";

/// Character name used for dialogue without a speaker
pub const UNKNOWN_SPEAKER: &str = "Unknown";

/// Slowest supported pacing multiplier
pub const MIN_PACING: f32 = 0.25;

/// Fastest supported pacing multiplier
pub const MAX_PACING: f32 = 4.0;

/// Kind of segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentType {
    Narration,
    Dialogue,
}

impl SegmentType {
    /// Parse a segment type, case-insensitively
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "narration" => Some(Self::Narration),
            "dialogue" => Some(Self::Dialogue),
            _ => None,
        }
    }
}

impl fmt::Display for SegmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Narration => write!(f, "narration"),
            Self::Dialogue => write!(f, "dialogue"),
        }
    }
}

/// Speaker gender as reported by the script generator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum Gender {
    Male,
    Female,
    #[default]
    Unknown,
}

impl From<String> for Gender {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<&str> for Gender {
    fn from(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "male" | "m" | "man" => Self::Male,
            "female" | "f" | "woman" => Self::Female,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Male => write!(f, "male"),
            Self::Female => write!(f, "female"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Delivery emotion tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum Emotion {
    #[default]
    Neutral,
    Happy,
    Sad,
    Angry,
    Fearful,
    Surprised,
    Whispering,
    Shouting,
    Other,
}

impl From<String> for Emotion {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<&str> for Emotion {
    fn from(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "" | "neutral" => Self::Neutral,
            "happy" => Self::Happy,
            "sad" => Self::Sad,
            "angry" => Self::Angry,
            "fearful" => Self::Fearful,
            "surprised" => Self::Surprised,
            "whispering" => Self::Whispering,
            "shouting" => Self::Shouting,
            _ => Self::Other,
        }
    }
}

/// One atomic unit of the script
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Segment {
    // @field: Narration or dialogue
    #[serde(rename = "type")]
    pub segment_type: SegmentType,

    // @field: Spoken text, never empty
    pub text: String,

    // @field: Speaker name, "Narrator" for narration
    pub character: String,

    pub gender: Gender,

    pub emotion: Emotion,

    // @field: Speed multiplier applied during assembly
    pub pacing: f32,

    // @field: Manual voice choice, optionally namespaced "backend:voice"
    #[serde(rename = "voice_id", skip_serializing_if = "Option::is_none")]
    pub voice_override: Option<String>,

    // @field: Set by voice assignment
    pub resolved_voice: Option<VoiceIdentity>,
}

impl Segment {
    /// Create a narration segment
    pub fn narration(text: impl Into<String>) -> Self {
        Self {
            segment_type: SegmentType::Narration,
            text: text.into(),
            character: NARRATOR.to_string(),
            gender: Gender::Unknown,
            emotion: Emotion::Neutral,
            pacing: 1.0,
            voice_override: None,
            resolved_voice: None,
        }
    }

    /// Create a dialogue segment
    pub fn dialogue(character: impl Into<String>, gender: Gender, text: impl Into<String>) -> Self {
        Self {
            segment_type: SegmentType::Dialogue,
            text: text.into(),
            character: character.into(),
            gender,
            emotion: Emotion::Neutral,
            pacing: 1.0,
            voice_override: None,
            resolved_voice: None,
        }
    }

    pub fn with_gender(mut self, gender: Gender) -> Self {
        self.gender = gender;
        self
    }

    pub fn with_emotion(mut self, emotion: Emotion) -> Self {
        self.emotion = emotion;
        self
    }

    pub fn with_pacing(mut self, pacing: f32) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn with_voice_override(mut self, voice_id: impl Into<String>) -> Self {
        self.voice_override = Some(voice_id.into());
        self
    }

    pub fn is_narration(&self) -> bool {
        self.segment_type == SegmentType::Narration
    }

    pub fn is_dialogue(&self) -> bool {
        self.segment_type == SegmentType::Dialogue
    }

    // @validates: Non-empty text and pacing range
    fn validate(&self, index: usize) -> Result<(), ValidationError> {
        if self.text.trim().is_empty() {
            return Err(ValidationError::EmptyText { index });
        }
        if !self.pacing.is_finite() || self.pacing < MIN_PACING || self.pacing > MAX_PACING {
            return Err(ValidationError::InvalidPacing {
                index,
                pacing: self.pacing,
                min: MIN_PACING,
                max: MAX_PACING,
            });
        }
        Ok(())
    }
}

/// Segment as produced by the script generator, before validation
#[derive(Debug, Clone, Deserialize)]
struct RawSegment {
    #[serde(rename = "type", default)]
    segment_type: String,
    #[serde(default)]
    text: String,
    #[serde(default)]
    character: Option<String>,
    #[serde(default)]
    gender: Option<String>,
    #[serde(default)]
    emotion: Option<String>,
    #[serde(default)]
    pacing: Option<f32>,
    #[serde(default)]
    voice_id: Option<String>,
}

impl RawSegment {
    fn into_segment(self, index: usize) -> Result<Segment, ValidationError> {
        let segment_type = SegmentType::parse(&self.segment_type).ok_or_else(|| ValidationError::UnknownSegmentType {
            index,
            value: self.segment_type.clone(),
        })?;

        let character = match segment_type {
            SegmentType::Narration => NARRATOR.to_string(),
            SegmentType::Dialogue => self
                .character
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .unwrap_or_else(|| UNKNOWN_SPEAKER.to_string()),
        };

        // "pending" and blanks are placeholders left by editors
        let voice_override = self
            .voice_id
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty() && v != "pending");

        Ok(Segment {
            segment_type,
            text: self.text,
            character,
            gender: self.gender.as_deref().map(Gender::from).unwrap_or_default(),
            emotion: self.emotion.as_deref().map(Emotion::from).unwrap_or_default(),
            pacing: self.pacing.unwrap_or(1.0),
            voice_override,
            resolved_voice: None,
        })
    }
}

/// Accepted top-level document shapes
#[derive(Deserialize)]
#[serde(untagged)]
enum ScriptDocument {
    Wrapped { script: Vec<RawSegment> },
    Bare(Vec<RawSegment>),
}

/// Ordered, validated sequence of segments
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Script {
    segments: Vec<Segment>,
}

impl Script {
    /// Create a validated script
    pub fn new(segments: Vec<Segment>) -> Result<Self, ValidationError> {
        if segments.is_empty() {
            return Err(ValidationError::EmptyScript);
        }
        for (index, segment) in segments.iter().enumerate() {
            segment.validate(index)?;
        }
        Ok(Self { segments })
    }

    /// Parse a script from JSON, either `[...]` or `{"script": [...]}`
    pub fn from_json(json: &str) -> Result<Self, ValidationError> {
        let document: ScriptDocument =
            serde_json::from_str(json).map_err(|e| ValidationError::Malformed(e.to_string()))?;
        let raw = match document {
            ScriptDocument::Wrapped { script } => script,
            ScriptDocument::Bare(segments) => segments,
        };

        let segments = raw
            .into_iter()
            .enumerate()
            .map(|(index, segment)| segment.into_segment(index))
            .collect::<Result<Vec<_>, _>>()?;

        Self::new(segments)
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Segment> {
        self.segments.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Segment> {
        self.segments.iter()
    }

    /// Pacing multiplier of every segment, in script order
    pub fn pacings(&self) -> Vec<f32> {
        self.segments.iter().map(|s| s.pacing).collect()
    }

    /// Record the resolved voice of each segment; no other field is touched
    pub(crate) fn set_resolved_voice(&mut self, index: usize, voice: VoiceIdentity) {
        if let Some(segment) = self.segments.get_mut(index) {
            segment.resolved_voice = Some(voice);
        }
    }
}

impl<'a> IntoIterator for &'a Script {
    type Item = &'a Segment;
    type IntoIter = std::slice::Iter<'a, Segment>;

    fn into_iter(self) -> Self::IntoIter {
        self.segments.iter()
    }
}
