/*!
 * Error types for the dramaflow pipeline.
 *
 * This module contains the error taxonomy used across the pipeline,
 * using the thiserror crate for ergonomic error definitions:
 * - `ValidationError`: malformed input script, never retried
 * - `SynthesisError`: a single backend call failed, classified as transient or permanent
 * - `PipelineError`: the terminal failure report of a generation run
 * - `AppError`: wrapper used by the binary
 */

use std::time::Duration;
use thiserror::Error;

use crate::pipeline::PipelineStage;

/// Errors raised when the incoming script is malformed
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// The script contains no segments
    #[error("Script contains no segments")]
    EmptyScript,

    /// A segment has empty (or whitespace-only) text
    #[error("Segment {index} has empty text")]
    EmptyText {
        /// Segment index (0-based)
        index: usize,
    },

    /// A segment type outside of narration/dialogue
    #[error("Segment {index} has unknown type '{value}'")]
    UnknownSegmentType {
        /// Segment index (0-based)
        index: usize,
        /// The offending value
        value: String,
    },

    /// Pacing multiplier is not a finite number in the supported range
    #[error("Segment {index} has pacing {pacing} outside of [{min}, {max}]")]
    InvalidPacing {
        /// Segment index (0-based)
        index: usize,
        /// The offending value
        pacing: f32,
        /// Lower bound
        min: f32,
        /// Upper bound
        max: f32,
    },

    /// The script document could not be parsed at all
    #[error("Failed to parse script: {0}")]
    Malformed(String),
}

/// Whether a synthesis failure is worth retrying
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SynthesisErrorKind {
    /// Network, rate-limit or server-side problem
    Transient,
    /// Bad voice id, auth failure, unusable response
    Permanent,
}

/// Errors that can occur when calling a synthesis backend
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SynthesisError {
    /// The call exceeded its overall deadline
    #[error("Synthesis request timed out after {0:?}")]
    Timeout(Duration),

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    Connection(String),

    /// Error related to rate limiting (HTTP 429)
    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    /// Error returned by the backend itself
    #[error("Backend responded with error: {status_code} - {message}")]
    Api {
        /// HTTP status code
        status_code: u16,
        /// Error message from the backend
        message: String,
    },

    /// Error with authentication
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// The backend does not know the requested voice
    #[error("Invalid voice: {0}")]
    InvalidVoice(String),

    /// No backend is registered for the resolved voice
    #[error("Backend not available: {0}")]
    BackendUnavailable(String),

    /// The backend answered but the audio could not be decoded
    #[error("Failed to decode audio: {0}")]
    Decode(String),

    /// The backend answered with no audio at all
    #[error("Backend returned no audio: {0}")]
    EmptyAudio(String),
}

impl SynthesisError {
    /// Classify this error as transient or permanent
    pub fn kind(&self) -> SynthesisErrorKind {
        match self {
            Self::Timeout(_) | Self::Connection(_) | Self::RateLimited(_) | Self::EmptyAudio(_) => {
                SynthesisErrorKind::Transient
            }
            Self::Api { status_code, .. } if *status_code >= 500 || *status_code == 429 => {
                SynthesisErrorKind::Transient
            }
            _ => SynthesisErrorKind::Permanent,
        }
    }

    /// Check if this error may succeed on retry
    pub fn is_transient(&self) -> bool {
        self.kind() == SynthesisErrorKind::Transient
    }

    /// Map a non-success HTTP status to an error
    pub fn from_status(status_code: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status_code {
            401 | 403 => Self::Authentication(message),
            404 | 422 => Self::InvalidVoice(message),
            429 => Self::RateLimited(message),
            _ => Self::Api { status_code, message },
        }
    }
}

/// Terminal failure of a generation run
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// The input script was rejected before any work started
    #[error("Invalid script: {0}")]
    Validation(#[from] ValidationError),

    /// A segment could not be synthesized; the run was aborted
    #[error("Synthesis failed for segment {index} after {attempts} attempt(s): {source}")]
    FatalSynthesis {
        /// Segment index (0-based)
        index: usize,
        /// Number of attempts made for that segment
        attempts: u32,
        /// Last error returned by the backend
        #[source]
        source: SynthesisError,
    },

    /// A bug-class inconsistency between stages
    #[error("Internal invariant violated during {stage}: {message}")]
    Invariant {
        /// Stage that detected the violation
        stage: PipelineStage,
        /// What went wrong
        message: String,
    },
}

impl PipelineError {
    /// Create an invariant violation for a stage
    pub fn invariant(stage: PipelineStage, message: impl Into<String>) -> Self {
        Self::Invariant {
            stage,
            message: message.into(),
        }
    }

    /// The stage the run was in when it failed
    pub fn stage(&self) -> PipelineStage {
        match self {
            Self::Validation(_) => PipelineStage::ScriptReceived,
            Self::FatalSynthesis { .. } => PipelineStage::SynthesisInFlight,
            Self::Invariant { stage, .. } => *stage,
        }
    }

    /// The failing segment, if the failure is tied to one
    pub fn segment_index(&self) -> Option<usize> {
        match self {
            Self::Validation(ValidationError::EmptyText { index })
            | Self::Validation(ValidationError::UnknownSegmentType { index, .. })
            | Self::Validation(ValidationError::InvalidPacing { index, .. }) => Some(*index),
            Self::FatalSynthesis { index, .. } => Some(*index),
            _ => None,
        }
    }

    /// One-line report naming the failing stage and segment
    pub fn report(&self) -> String {
        match self.segment_index() {
            Some(index) => format!("{} failed at segment {}: {}", self.stage(), index, self),
            None => format!("{} failed: {}", self.stage(), self),
        }
    }
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from the generation pipeline
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Error in the configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<ValidationError> for AppError {
    fn from(error: ValidationError) -> Self {
        Self::Pipeline(PipelineError::Validation(error))
    }
}

// Utility functions for error conversion
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
