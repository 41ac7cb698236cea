/*!
 * Timeline assembly.
 *
 * Clips are paced, floored to a whole millisecond and concatenated in
 * script order with a fixed silence gap after every segment (after the
 * last one only when trailing silence is on). Offsets are integer
 * milliseconds; because each clip is floored before it is appended, the
 * waveform length always equals the last offset exactly.
 */

use log::debug;
use serde::{Deserialize, Serialize};

use crate::audio::{AudioClip, SAMPLES_PER_MS};
use crate::errors::PipelineError;
use crate::pipeline::PipelineStage;

/// Default gap between segments
pub const DEFAULT_SILENCE_MS: u64 = 300;

/// Longest gap a run may ask for
pub const MAX_SILENCE_MS: u64 = 10_000;

/// Where one segment sits in the merged track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub segment_index: usize,
    pub start_ms: u64,
    pub end_ms: u64,
}

impl TimelineEntry {
    pub fn duration_ms(&self) -> u64 {
        self.end_ms.saturating_sub(self.start_ms)
    }
}

/// Merged audio plus its timeline
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledTrack {
    pub audio: AudioClip,
    pub timeline: Vec<TimelineEntry>,
}

impl AssembledTrack {
    pub fn duration_ms(&self) -> u64 {
        self.audio.duration_ms()
    }
}

/// Merges clips into one track
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimelineAssembler {
    silence_ms: u64,
    trailing_silence: bool,
}

impl Default for TimelineAssembler {
    fn default() -> Self {
        Self::new(DEFAULT_SILENCE_MS)
    }
}

impl TimelineAssembler {
    /// Gaps above [`MAX_SILENCE_MS`] are clamped
    pub fn new(silence_ms: u64) -> Self {
        Self {
            silence_ms: silence_ms.min(MAX_SILENCE_MS),
            trailing_silence: false,
        }
    }

    pub fn with_trailing_silence(mut self, trailing_silence: bool) -> Self {
        self.trailing_silence = trailing_silence;
        self
    }

    pub fn silence_ms(&self) -> u64 {
        self.silence_ms
    }

    /// Lay out entries for clips of the given (already paced) durations
    pub fn plan(&self, durations_ms: &[u64]) -> Vec<TimelineEntry> {
        let mut cursor = 0u64;
        durations_ms
            .iter()
            .enumerate()
            .map(|(segment_index, duration)| {
                let entry = TimelineEntry {
                    segment_index,
                    start_ms: cursor,
                    end_ms: cursor + duration,
                };
                cursor = entry.end_ms + self.silence_ms;
                entry
            })
            .collect()
    }

    /// Merge clips, indexed 1:1 with segments, into one track
    pub fn assemble(&self, clips: Vec<AudioClip>, pacings: &[f32]) -> Result<AssembledTrack, PipelineError> {
        if clips.len() != pacings.len() {
            return Err(PipelineError::invariant(
                PipelineStage::TimelineAssembled,
                format!("{} clip(s) for {} segment(s)", clips.len(), pacings.len()),
            ));
        }

        let paced: Vec<AudioClip> = clips
            .into_iter()
            .zip(pacings)
            .map(|(clip, pacing)| clip.with_pacing(*pacing).floor_to_ms())
            .collect();

        let durations: Vec<u64> = paced.iter().map(AudioClip::duration_ms).collect();
        let timeline = self.plan(&durations);

        let last = paced.len().saturating_sub(1);
        let mut audio = AudioClip::default();
        for (index, clip) in paced.iter().enumerate() {
            audio.append(clip);
            if index < last || self.trailing_silence {
                audio.append_silence(self.silence_ms);
            }
        }

        let expected_end = timeline
            .last()
            .map(|entry| entry.end_ms + if self.trailing_silence { self.silence_ms } else { 0 })
            .unwrap_or(0);
        if audio.duration_ms() != expected_end || audio.len() % SAMPLES_PER_MS != 0 {
            return Err(PipelineError::invariant(
                PipelineStage::TimelineAssembled,
                format!("track is {} ms but timeline ends at {} ms", audio.duration_ms(), expected_end),
            ));
        }

        debug!("Assembled {} segment(s) into {} ms", timeline.len(), audio.duration_ms());
        Ok(AssembledTrack { audio, timeline })
    }
}
