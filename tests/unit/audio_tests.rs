/*!
 * Tests for audio clips and timeline assembly
 */

use dramaflow::audio::{AudioClip, AudioPayload, SAMPLES_PER_MS};
use dramaflow::synthesis::backends::MockBackend;
use dramaflow::timeline::{TimelineAssembler, DEFAULT_SILENCE_MS};

fn clip(ms: u64) -> AudioClip {
    AudioClip::silence(ms)
}

#[test]
fn test_pacing_inverse_should_restore_duration_within_one_ms() {
    for &ms in &[1000u64, 777, 1234, 50] {
        for &pacing in &[0.25f32, 0.5, 0.8, 1.3, 2.0, 3.7, 4.0] {
            let original = clip(ms);
            let restored = original.with_pacing(pacing).with_pacing(1.0 / pacing);
            let diff = restored.duration_ms().abs_diff(original.duration_ms());
            assert!(diff <= 1, "{} ms at pacing {} came back as {} ms", ms, pacing, restored.duration_ms());
        }
    }
}

#[test]
fn test_pacing_one_should_be_identity() {
    let original = AudioClip::decode(&MockBackend::tone(40)).unwrap();
    assert_eq!(original.with_pacing(1.0), original);
}

#[test]
fn test_decode_pcm16_should_reject_odd_length() {
    let payload = AudioPayload::pcm16(vec![0u8, 1, 2], 24_000);
    assert!(AudioClip::decode(&payload).is_err());
}

#[test]
fn test_wav_round_trip_should_preserve_length() {
    let original = AudioClip::decode(&MockBackend::tone(125)).unwrap();
    let bytes = original.to_wav_bytes().unwrap();

    let decoded = AudioClip::decode(&AudioPayload::wav(bytes)).unwrap();
    assert_eq!(decoded.len(), 125 * SAMPLES_PER_MS);
}

#[test]
fn test_resampled_input_should_reach_canonical_rate() {
    let samples = vec![0.5f32; 48_000];
    let clip = AudioClip::from_mono(samples, 48_000);
    assert_eq!(clip.duration_ms(), 1000);
}

#[test]
fn test_timeline_gaps_should_equal_silence() {
    let durations = [1000, 20, 3333, 1];
    let timeline = TimelineAssembler::default().plan(&durations);

    assert_eq!(timeline.len(), durations.len());
    for pair in timeline.windows(2) {
        assert_eq!(pair[1].start_ms - pair[0].end_ms, DEFAULT_SILENCE_MS);
        assert!(pair[1].start_ms > pair[0].start_ms);
    }
}

#[test]
fn test_assembled_waveform_should_end_at_last_entry() {
    let clips = vec![clip(1000), clip(480), clip(733)];
    let track = TimelineAssembler::default().assemble(clips, &[1.0, 0.8, 1.5]).unwrap();

    let last = track.timeline.last().unwrap();
    assert_eq!(track.duration_ms(), last.end_ms);
    assert_eq!(track.timeline[1].duration_ms(), 600);
    assert_eq!(track.timeline[2].duration_ms(), 488);
}
