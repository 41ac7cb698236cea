/*!
 * Tests for subtitle emission
 */

use dramaflow::pipeline::PipelineStage;
use dramaflow::script::{Gender, Script, Segment};
use dramaflow::subtitles::{SubtitleDocument, SubtitleEntry};
use dramaflow::timeline::{TimelineAssembler, TimelineEntry};

use crate::common;

fn amy_timeline() -> Vec<TimelineEntry> {
    TimelineAssembler::default().plan(&[1200, 650, 900])
}

#[test]
fn test_document_should_have_one_entry_per_segment() {
    let doc = SubtitleDocument::from_timeline(&amy_timeline(), &common::amy_script()).unwrap();

    assert_eq!(doc.len(), 3);
    let numbers: Vec<usize> = doc.entries.iter().map(|e| e.seq_num).collect();
    assert_eq!(numbers, vec![1, 2, 3]);
    assert!(doc.entries[1].text.starts_with("[Amy] "));
    assert_eq!(doc.entries[2].text, "She paused.");
}

#[test]
fn test_srt_should_be_byte_exact() {
    let doc = SubtitleDocument::from_timeline(&amy_timeline(), &common::amy_script()).unwrap();
    let expected = "1\n00:00:00,000 --> 00:00:01,200\nIt was dark.\n\n\
                    2\n00:00:01,500 --> 00:00:02,150\n[Amy] Hello?\n\n\
                    3\n00:00:02,450 --> 00:00:03,350\nShe paused.\n\n";
    assert_eq!(doc.to_srt(), expected);
}

#[test]
fn test_parsing_emitted_srt_should_reproduce_timeline() {
    let timeline = amy_timeline();
    let doc = SubtitleDocument::from_timeline(&timeline, &common::amy_script()).unwrap();

    let parsed = SubtitleDocument::parse_srt(&doc.to_srt()).unwrap();
    assert_eq!(parsed.to_timeline(), timeline);
}

#[test]
fn test_long_offsets_should_format_hours() {
    assert_eq!(SubtitleEntry::format_timestamp(10 * 3_600_000 + 59_999), "10:00:59,999");
    assert_eq!(SubtitleEntry::parse_timestamp("10:00:59,999").unwrap(), 10 * 3_600_000 + 59_999);
}

#[test]
fn test_dialogue_from_unknown_speaker_should_still_be_prefixed() {
    let script = Script::from_json(r#"[{"type": "dialogue", "text": "Who?"}]"#).unwrap();
    let timeline = TimelineAssembler::default().plan(&[300]);

    let doc = SubtitleDocument::from_timeline(&timeline, &script).unwrap();
    assert_eq!(doc.entries[0].text, "[Unknown] Who?");
}

#[test]
fn test_mismatched_timeline_should_be_an_invariant_violation() {
    let script = Script::new(vec![Segment::dialogue("Amy", Gender::Female, "Hi.")]).unwrap();
    let err = SubtitleDocument::from_timeline(&amy_timeline(), &script).unwrap_err();
    assert_eq!(err.stage(), PipelineStage::SubtitleEmitted);
}

#[test]
fn test_vtt_should_share_entries_with_srt() {
    let doc = SubtitleDocument::from_timeline(&amy_timeline(), &common::amy_script()).unwrap();
    let vtt = doc.to_vtt();

    assert!(vtt.starts_with("WEBVTT\n\n"));
    assert!(vtt.contains("00:00:01.500 --> 00:00:02.150\n[Amy] Hello?"));
}
