use anyhow::{Context, Result, anyhow};
use log::warn;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::fmt;

use crate::errors::PipelineError;
use crate::pipeline::PipelineStage;
use crate::script::{Script, Segment, UNKNOWN_SPEAKER};
use crate::timeline::TimelineEntry;

// @module: Subtitle emission and parsing

// @const: SRT timestamp regex
static TIMESTAMP_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{2,}):(\d{2}):(\d{2}),(\d{3}) --> (\d{2,}):(\d{2}):(\d{2}),(\d{3})$").unwrap()
});

// @struct: Single subtitle entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleEntry {
    // @field: Sequence number, from 1
    pub seq_num: usize,

    // @field: Start time in ms
    pub start_time_ms: u64,

    // @field: End time in ms
    pub end_time_ms: u64,

    // @field: Subtitle text
    pub text: String,
}

impl SubtitleEntry {
    pub fn new(seq_num: usize, start_time_ms: u64, end_time_ms: u64, text: impl Into<String>) -> Self {
        SubtitleEntry {
            seq_num,
            start_time_ms,
            end_time_ms,
            text: text.into(),
        }
    }

    /// Parse an SRT timestamp to milliseconds
    pub fn parse_timestamp(timestamp: &str) -> Result<u64> {
        // HH:MM:SS,mmm (a '.' separator is accepted too)
        let parts: Vec<&str> = timestamp.trim().split(&[':', ',', '.'][..]).collect();

        if parts.len() != 4 {
            return Err(anyhow!("Invalid timestamp format: {}", timestamp));
        }

        let hours: u64 = parts[0].parse().context("Failed to parse hours")?;
        let minutes: u64 = parts[1].parse().context("Failed to parse minutes")?;
        let seconds: u64 = parts[2].parse().context("Failed to parse seconds")?;
        let millis: u64 = parts[3].parse().context("Failed to parse milliseconds")?;

        if minutes >= 60 || seconds >= 60 || millis >= 1000 {
            return Err(anyhow!("Invalid time components in timestamp: {}", timestamp));
        }

        Ok(hours * 3_600_000 + minutes * 60_000 + seconds * 1_000 + millis)
    }

    /// Format milliseconds as an SRT timestamp (HH:MM:SS,mmm)
    pub fn format_timestamp(ms: u64) -> String {
        let hours = ms / 3_600_000;
        let minutes = (ms % 3_600_000) / 60_000;
        let seconds = (ms % 60_000) / 1_000;
        let millis = ms % 1_000;

        format!("{:02}:{:02}:{:02},{:03}", hours, minutes, seconds, millis)
    }

    /// Format milliseconds as a WebVTT timestamp (HH:MM:SS.mmm)
    pub fn format_vtt_timestamp(ms: u64) -> String {
        Self::format_timestamp(ms).replacen(',', ".", 1)
    }

    pub fn format_start_time(&self) -> String {
        Self::format_timestamp(self.start_time_ms)
    }

    pub fn format_end_time(&self) -> String {
        Self::format_timestamp(self.end_time_ms)
    }

    /// Subtitle content for a segment: dialogue is prefixed with the speaker
    pub fn content_for(segment: &Segment) -> String {
        let text = normalize_text(&segment.text);
        if segment.is_dialogue() {
            let name = segment.character.split_whitespace().collect::<Vec<_>>().join(" ");
            let name = if name.is_empty() { UNKNOWN_SPEAKER } else { name.as_str() };
            format!("[{}] {}", name, text)
        } else {
            text
        }
    }

    fn parse_timestamp_to_ms(caps: &Captures, offset: usize) -> Result<u64> {
        let field = |i: usize| -> Result<u64> {
            caps.get(offset + i)
                .ok_or_else(|| anyhow!("Missing timestamp component"))?
                .as_str()
                .parse::<u64>()
                .context("Invalid timestamp component")
        };
        let (hours, minutes, seconds, millis) = (field(0)?, field(1)?, field(2)?, field(3)?);
        if minutes >= 60 || seconds >= 60 {
            return Err(anyhow!("Invalid time components"));
        }
        Ok(hours * 3_600_000 + minutes * 60_000 + seconds * 1_000 + millis)
    }
}

impl fmt::Display for SubtitleEntry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{}", self.seq_num)?;
        writeln!(f, "{} --> {}", self.format_start_time(), self.format_end_time())?;
        writeln!(f, "{}", self.text)?;
        writeln!(f)
    }
}

/// Collapse text into non-blank, trimmed lines so it survives a parse
fn normalize_text(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Ordered subtitle entries for one track
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SubtitleDocument {
    pub entries: Vec<SubtitleEntry>,
}

impl SubtitleDocument {
    /// Build the document for a timeline, one entry per segment in timeline order
    pub fn from_timeline(timeline: &[TimelineEntry], script: &Script) -> Result<Self, PipelineError> {
        if timeline.len() != script.len() {
            return Err(PipelineError::invariant(
                PipelineStage::SubtitleEmitted,
                format!("{} timeline entries for {} segment(s)", timeline.len(), script.len()),
            ));
        }

        let entries = timeline
            .iter()
            .enumerate()
            .map(|(position, entry)| {
                let segment = script.get(entry.segment_index).ok_or_else(|| {
                    PipelineError::invariant(
                        PipelineStage::SubtitleEmitted,
                        format!("timeline refers to missing segment {}", entry.segment_index),
                    )
                })?;
                Ok(SubtitleEntry::new(
                    position + 1,
                    entry.start_ms,
                    entry.end_ms,
                    SubtitleEntry::content_for(segment),
                ))
            })
            .collect::<Result<Vec<_>, PipelineError>>()?;

        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Render as SRT
    pub fn to_srt(&self) -> String {
        self.entries.iter().map(|entry| entry.to_string()).collect()
    }

    /// Render as WebVTT
    pub fn to_vtt(&self) -> String {
        let mut out = String::from("WEBVTT\n\n");
        for entry in &self.entries {
            out.push_str(&format!(
                "{}\n{} --> {}\n{}\n\n",
                entry.seq_num,
                SubtitleEntry::format_vtt_timestamp(entry.start_time_ms),
                SubtitleEntry::format_vtt_timestamp(entry.end_time_ms),
                entry.text
            ));
        }
        out
    }

    /// Timeline described by the document; sequence numbers map back to segment indices
    pub fn to_timeline(&self) -> Vec<TimelineEntry> {
        self.entries
            .iter()
            .map(|entry| TimelineEntry {
                segment_index: entry.seq_num.saturating_sub(1),
                start_ms: entry.start_time_ms,
                end_ms: entry.end_time_ms,
            })
            .collect()
    }

    /// Parse SRT text
    pub fn parse_srt(content: &str) -> Result<Self> {
        let mut entries = Vec::new();

        let mut current_seq_num: Option<usize> = None;
        let mut current_times: Option<(u64, u64)> = None;
        let mut current_text = String::new();

        let mut flush = |seq: &mut Option<usize>, times: &mut Option<(u64, u64)>, text: &mut String| {
            if let (Some(seq_num), Some((start, end))) = (*seq, *times) {
                if text.is_empty() {
                    warn!("Skipping empty subtitle entry {}", seq_num);
                } else {
                    entries.push(SubtitleEntry::new(seq_num, start, end, text.clone()));
                }
            }
            *seq = None;
            *times = None;
            text.clear();
        };

        for (line_number, line) in content.lines().enumerate() {
            let trimmed = line.trim().trim_start_matches('\u{feff}');

            if trimmed.is_empty() {
                if current_times.is_some() && !current_text.is_empty() {
                    flush(&mut current_seq_num, &mut current_times, &mut current_text);
                }
                continue;
            }

            if current_seq_num.is_none() {
                match trimmed.parse::<usize>() {
                    Ok(num) => current_seq_num = Some(num),
                    Err(_) => warn!("Expected sequence number at line {}: {}", line_number + 1, trimmed),
                }
                continue;
            }

            if current_times.is_none() {
                match TIMESTAMP_REGEX.captures(trimmed).map(|caps| {
                    (
                        SubtitleEntry::parse_timestamp_to_ms(&caps, 1),
                        SubtitleEntry::parse_timestamp_to_ms(&caps, 5),
                    )
                }) {
                    Some((Ok(start), Ok(end))) => current_times = Some((start, end)),
                    _ => {
                        return Err(anyhow!("Invalid timestamp line {}: {}", line_number + 1, trimmed));
                    }
                }
                continue;
            }

            if !current_text.is_empty() {
                current_text.push('\n');
            }
            current_text.push_str(trimmed);
        }
        flush(&mut current_seq_num, &mut current_times, &mut current_text);

        Ok(Self { entries })
    }
}
