/*!
 * Tests for the error taxonomy
 */

use std::error::Error;

use dramaflow::errors::{AppError, PipelineError, SynthesisError, SynthesisErrorKind, ValidationError};
use dramaflow::pipeline::PipelineStage;

#[test]
fn test_error_kinds_should_split_transient_and_permanent() {
    assert_eq!(SynthesisError::from_status(429, "x").kind(), SynthesisErrorKind::Transient);
    assert_eq!(SynthesisError::from_status(500, "x").kind(), SynthesisErrorKind::Transient);
    assert_eq!(SynthesisError::from_status(404, "x").kind(), SynthesisErrorKind::Permanent);
    assert_eq!(SynthesisError::InvalidVoice("x".into()).kind(), SynthesisErrorKind::Permanent);
    assert_eq!(SynthesisError::BackendUnavailable("x".into()).kind(), SynthesisErrorKind::Permanent);
}

#[test]
fn test_fatal_synthesis_should_expose_source() {
    let error = PipelineError::FatalSynthesis {
        index: 3,
        attempts: 3,
        source: SynthesisError::RateLimited("slow down".into()),
    };

    assert!(error.source().is_some());
    assert!(error.to_string().contains("segment 3"));
    assert!(error.report().starts_with("synthesis failed at segment 3"));
}

#[test]
fn test_invariant_report_should_name_stage_only() {
    let error = PipelineError::invariant(PipelineStage::TimelineAssembled, "2 clip(s) for 3 segment(s)");

    assert_eq!(error.segment_index(), None);
    assert!(error.report().starts_with("timeline assembly failed"));
}

#[test]
fn test_app_error_should_wrap_pipeline_errors() {
    let pipeline: PipelineError = ValidationError::EmptyScript.into();
    let app: AppError = pipeline.into();
    assert!(matches!(app, AppError::Pipeline(_)));

    let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
    assert!(matches!(AppError::from(io), AppError::File(_)));
}
