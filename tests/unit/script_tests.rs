/*!
 * Tests for the script model
 */

use dramaflow::errors::ValidationError;
use dramaflow::script::{Emotion, Gender, Script, Segment, SegmentType, NARRATOR, UNKNOWN_SPEAKER};

use crate::common;

#[test]
fn test_from_json_with_generator_document_should_keep_order() {
    let script = Script::from_json(common::AMY_SCRIPT_JSON).unwrap();

    assert_eq!(script.len(), 3);
    let types: Vec<SegmentType> = script.iter().map(|s| s.segment_type).collect();
    assert_eq!(types, vec![SegmentType::Narration, SegmentType::Dialogue, SegmentType::Narration]);
    assert_eq!(script.segments()[1].emotion, Emotion::Fearful);
    assert_eq!(script.segments()[2].gender, Gender::Male);
}

#[test]
fn test_from_json_should_name_narration_speaker() {
    let json = r#"[{"type": "narration", "text": "Wind.", "character": "Someone"},
                   {"type": "dialogue", "text": "Hm?", "character": "  "}]"#;
    let script = Script::from_json(json).unwrap();

    assert_eq!(script.segments()[0].character, NARRATOR);
    assert_eq!(script.segments()[1].character, UNKNOWN_SPEAKER);
}

#[test]
fn test_unknown_labels_should_fall_back() {
    let json = r#"[{"type": "dialogue", "text": "Hey", "gender": "robot", "emotion": "bemused"}]"#;
    let script = Script::from_json(json).unwrap();
    let segment = &script.segments()[0];

    assert_eq!(segment.gender, Gender::Unknown);
    assert_eq!(segment.emotion, Emotion::Other);
}

#[test]
fn test_empty_text_should_be_rejected_with_index() {
    let json = r#"[{"type": "narration", "text": "Fine."}, {"type": "dialogue", "text": "   "}]"#;
    assert_eq!(Script::from_json(json).unwrap_err(), ValidationError::EmptyText { index: 1 });
}

#[test]
fn test_unknown_type_should_be_rejected_with_index() {
    let json = r#"[{"type": "song", "text": "La la"}]"#;
    assert!(matches!(
        Script::from_json(json).unwrap_err(),
        ValidationError::UnknownSegmentType { index: 0, .. }
    ));
}

#[test]
fn test_out_of_range_pacing_should_be_rejected() {
    let err = Script::new(vec![Segment::narration("Slow.").with_pacing(0.0)]).unwrap_err();
    assert!(matches!(err, ValidationError::InvalidPacing { index: 0, .. }));
}

#[test]
fn test_empty_and_malformed_documents_should_be_rejected() {
    assert_eq!(Script::new(vec![]).unwrap_err(), ValidationError::EmptyScript);
    assert!(matches!(Script::from_json("{not json").unwrap_err(), ValidationError::Malformed(_)));
}

#[test]
fn test_placeholder_voice_ids_should_be_ignored() {
    let json = r#"[{"type": "narration", "text": "A.", "voice_id": "pending"},
                   {"type": "narration", "text": "B.", "voice_id": "azure:en-US-GuyNeural"}]"#;
    let script = Script::from_json(json).unwrap();

    assert_eq!(script.segments()[0].voice_override, None);
    assert_eq!(script.segments()[1].voice_override.as_deref(), Some("azure:en-US-GuyNeural"));
}
