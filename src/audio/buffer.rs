//! Decoded audio buffer
//!
//! Planar `f32` samples plus the sample rate they were decoded at. Built once
//! by the decoder and shared read-only (behind an `Arc`) by the driver, the
//! render graph and the waveform renderer.

use crate::error::DecodeError;

/// Immutable, time-addressable decoded audio
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    sample_rate: u32,
    channels: Vec<Vec<f32>>,
}

impl AudioBuffer {
    /// Build a buffer from planar channel data.
    ///
    /// All channels must have the same length.
    pub fn new(sample_rate: u32, channels: Vec<Vec<f32>>) -> Result<Self, DecodeError> {
        if sample_rate == 0 {
            return Err(DecodeError::InvalidBuffer("sample rate is zero"));
        }
        let Some(first) = channels.first() else {
            return Err(DecodeError::InvalidBuffer("no channels"));
        };
        let frames = first.len();
        if channels.iter().any(|c| c.len() != frames) {
            return Err(DecodeError::InvalidBuffer("channels differ in length"));
        }
        Ok(Self {
            sample_rate,
            channels,
        })
    }

    /// A buffer of digital silence
    pub fn silent(sample_rate: u32, channels: usize, seconds: f64) -> Self {
        let frames = (seconds.max(0.0) * sample_rate as f64).round() as usize;
        Self {
            sample_rate: sample_rate.max(1),
            channels: vec![vec![0.0; frames]; channels.max(1)],
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn number_of_channels(&self) -> usize {
        self.channels.len()
    }

    /// Length in frames
    pub fn length(&self) -> usize {
        self.channels[0].len()
    }

    /// Length in seconds
    pub fn duration(&self) -> f64 {
        self.length() as f64 / self.sample_rate as f64
    }

    pub fn channel_data(&self, channel: usize) -> Option<&[f32]> {
        self.channels.get(channel).map(Vec::as_slice)
    }

    /// Linearly interpolated sample at a fractional frame position.
    ///
    /// Returns `None` past the end of the buffer.
    pub(crate) fn sample_at(&self, channel: usize, position: f64) -> Option<f32> {
        let data = &self.channels[channel.min(self.channels.len() - 1)];
        if position < 0.0 {
            return None;
        }
        let index = position.floor() as usize;
        let current = *data.get(index)?;
        let next = data.get(index + 1).copied().unwrap_or(current);
        let frac = (position - index as f64) as f32;
        Some(current + (next - current) * frac)
    }
}
