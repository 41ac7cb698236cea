/*!
 * Canonical audio representation.
 *
 * Every clip is held as mono f32 samples at 24 kHz, so one millisecond is
 * exactly 24 samples and any integer-ms duration maps to a whole sample
 * count. Backends hand back either WAV or raw little-endian PCM16; both are
 * decoded, downmixed and resampled into this form before assembly.
 */

use bytes::Bytes;
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use std::io::Cursor;
use std::path::Path;

use crate::errors::SynthesisError;

/// Internal sample rate
pub const CANONICAL_SAMPLE_RATE: u32 = 24_000;

/// Samples in one millisecond at the canonical rate
pub const SAMPLES_PER_MS: usize = (CANONICAL_SAMPLE_RATE / 1000) as usize;

/// Canonical sample count for `ms`, saturating instead of wrapping
pub fn samples_for_ms(ms: u64) -> usize {
    usize::try_from(ms).unwrap_or(usize::MAX).saturating_mul(SAMPLES_PER_MS)
}

/// Encoding of bytes returned by a backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    /// RIFF/WAVE container
    Wav,
    /// Headerless little-endian signed 16-bit mono
    Pcm16 { sample_rate: u32 },
}

/// Raw audio returned by a backend
#[derive(Debug, Clone, PartialEq)]
pub struct AudioPayload {
    pub format: AudioFormat,
    pub data: Bytes,
}

impl AudioPayload {
    pub fn wav(data: impl Into<Bytes>) -> Self {
        Self {
            format: AudioFormat::Wav,
            data: data.into(),
        }
    }

    pub fn pcm16(data: impl Into<Bytes>, sample_rate: u32) -> Self {
        Self {
            format: AudioFormat::Pcm16 { sample_rate },
            data: data.into(),
        }
    }
}

/// Audio for exactly one segment, in canonical form
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AudioClip {
    samples: Vec<f32>,
}

impl AudioClip {
    /// Wrap samples already at the canonical rate
    pub fn from_canonical(samples: Vec<f32>) -> Self {
        Self { samples }
    }

    /// Wrap mono samples at any rate, resampling when needed
    pub fn from_mono(samples: Vec<f32>, sample_rate: u32) -> Self {
        if sample_rate == CANONICAL_SAMPLE_RATE || samples.is_empty() {
            return Self { samples };
        }
        let target = (samples.len() as f64 * CANONICAL_SAMPLE_RATE as f64 / sample_rate as f64).round() as usize;
        Self {
            samples: resample_linear(&samples, target),
        }
    }

    /// Zero-filled clip of a whole number of milliseconds
    pub fn silence(ms: u64) -> Self {
        Self {
            samples: vec![0.0; samples_for_ms(ms)],
        }
    }

    /// Decode backend output into canonical form
    ///
    /// A payload that carries no samples is an error, never a zero-length
    /// clip.
    pub fn decode(payload: &AudioPayload) -> Result<Self, SynthesisError> {
        if payload.data.is_empty() {
            return Err(SynthesisError::EmptyAudio("0-byte body".to_string()));
        }
        let clip = match payload.format {
            AudioFormat::Wav => Self::decode_wav(&payload.data)?,
            AudioFormat::Pcm16 { sample_rate } => Self::decode_pcm16(&payload.data, sample_rate)?,
        };
        if clip.is_empty() {
            return Err(SynthesisError::EmptyAudio("body contains no samples".to_string()));
        }
        Ok(clip)
    }

    fn decode_wav(data: &[u8]) -> Result<Self, SynthesisError> {
        let mut reader = WavReader::new(Cursor::new(data)).map_err(|e| SynthesisError::Decode(e.to_string()))?;
        let spec = reader.spec();
        if spec.channels == 0 || spec.sample_rate == 0 {
            return Err(SynthesisError::Decode(format!(
                "unusable WAV header: {} channel(s) at {} Hz",
                spec.channels, spec.sample_rate
            )));
        }

        let interleaved: Vec<f32> = match spec.sample_format {
            SampleFormat::Float => reader
                .samples::<f32>()
                .collect::<Result<_, _>>()
                .map_err(|e| SynthesisError::Decode(e.to_string()))?,
            SampleFormat::Int => {
                let scale = (1u64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / scale))
                    .collect::<Result<_, _>>()
                    .map_err(|e| SynthesisError::Decode(e.to_string()))?
            }
        };

        let channels = spec.channels as usize;
        let mono = if channels == 1 {
            interleaved
        } else {
            interleaved
                .chunks_exact(channels)
                .map(|frame| frame.iter().sum::<f32>() / channels as f32)
                .collect()
        };

        Ok(Self::from_mono(mono, spec.sample_rate))
    }

    fn decode_pcm16(data: &[u8], sample_rate: u32) -> Result<Self, SynthesisError> {
        if sample_rate == 0 {
            return Err(SynthesisError::Decode("PCM sample rate is zero".to_string()));
        }
        if data.len() % 2 != 0 {
            return Err(SynthesisError::Decode(format!("odd PCM16 byte count {}", data.len())));
        }
        let samples = data
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / 32768.0)
            .collect();
        Ok(Self::from_mono(samples, sample_rate))
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration in whole milliseconds, rounded down
    pub fn duration_ms(&self) -> u64 {
        (self.samples.len() / SAMPLES_PER_MS) as u64
    }

    /// Change playback speed; duration scales by `1 / pacing`
    pub fn with_pacing(&self, pacing: f32) -> Self {
        if (pacing - 1.0).abs() < f32::EPSILON || self.samples.is_empty() || pacing <= 0.0 {
            return self.clone();
        }
        let target = (self.samples.len() as f64 / pacing as f64).round() as usize;
        Self {
            samples: resample_linear(&self.samples, target),
        }
    }

    /// Drop the sub-millisecond tail so the sample count matches `duration_ms`
    pub fn floor_to_ms(mut self) -> Self {
        let whole = self.samples.len() - self.samples.len() % SAMPLES_PER_MS;
        self.samples.truncate(whole);
        self
    }

    /// Append another clip
    pub fn append(&mut self, other: &AudioClip) {
        self.samples.extend_from_slice(&other.samples);
    }

    /// Append `ms` of silence
    pub fn append_silence(&mut self, ms: u64) {
        let len = self.samples.len().saturating_add(samples_for_ms(ms));
        self.samples.resize(len, 0.0);
    }

    fn wav_spec() -> WavSpec {
        WavSpec {
            channels: 1,
            sample_rate: CANONICAL_SAMPLE_RATE,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        }
    }

    fn quantize(sample: f32) -> i16 {
        (sample.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16
    }

    /// Encode as 16-bit PCM mono WAV in memory
    pub fn to_wav_bytes(&self) -> Result<Vec<u8>, hound::Error> {
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = WavWriter::new(&mut cursor, Self::wav_spec())?;
            for &sample in &self.samples {
                writer.write_sample(Self::quantize(sample))?;
            }
            writer.finalize()?;
        }
        Ok(cursor.into_inner())
    }

    /// Write as 16-bit PCM mono WAV
    pub fn write_wav(&self, path: impl AsRef<Path>) -> Result<(), hound::Error> {
        let mut writer = WavWriter::create(path, Self::wav_spec())?;
        for &sample in &self.samples {
            writer.write_sample(Self::quantize(sample))?;
        }
        writer.finalize()
    }
}

/// Linear-interpolation resampling to an exact output length
pub fn resample_linear(samples: &[f32], target_len: usize) -> Vec<f32> {
    if target_len == 0 || samples.is_empty() {
        return Vec::new();
    }
    if samples.len() == 1 || target_len == 1 {
        return vec![samples[0]; target_len];
    }

    let step = (samples.len() - 1) as f64 / (target_len - 1) as f64;
    let last = samples.len() - 1;
    (0..target_len)
        .map(|i| {
            let position = i as f64 * step;
            let index = (position.floor() as usize).min(last);
            let next = (index + 1).min(last);
            let frac = (position - index as f64) as f32;
            samples[index] + (samples[next] - samples[index]) * frac
        })
        .collect()
}
