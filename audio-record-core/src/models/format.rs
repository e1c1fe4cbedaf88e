use serde::{Deserialize, Serialize};

use super::error::CaptureError;

/// Immutable PCM format parameters for a recording session.
///
/// Only uncompressed integer PCM is supported: 8-bit unsigned or 16-bit
/// signed samples, mono or stereo interleaved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioFormatSpec {
    /// Samples per second per channel.
    pub sample_rate_hz: u32,

    /// Channel count (1 = mono, 2 = stereo interleaved).
    pub channels: u16,

    /// Bits per sample (8 = unsigned, 16 = signed little-endian).
    pub bits_per_sample: u16,
}

impl AudioFormatSpec {
    pub fn new(sample_rate_hz: u32, channels: u16, bits_per_sample: u16) -> Result<Self, CaptureError> {
        let spec = Self {
            sample_rate_hz,
            channels,
            bits_per_sample,
        };
        spec.validate()?;
        Ok(spec)
    }

    pub fn validate(&self) -> Result<(), CaptureError> {
        if self.sample_rate_hz == 0 {
            return Err(CaptureError::InvalidFormat("sample rate must be positive".into()));
        }
        if ![1, 2].contains(&self.channels) {
            return Err(CaptureError::InvalidFormat(format!(
                "unsupported channel count: {}",
                self.channels
            )));
        }
        if ![8, 16].contains(&self.bits_per_sample) {
            return Err(CaptureError::InvalidFormat(format!(
                "unsupported bits per sample: {}",
                self.bits_per_sample
            )));
        }
        Ok(())
    }

    /// Bytes of PCM data per second of audio.
    pub fn byte_rate(&self) -> u32 {
        self.sample_rate_hz * self.channels as u32 * self.bits_per_sample as u32 / 8
    }

    /// Bytes per sample-frame across all channels.
    pub fn block_align(&self) -> u16 {
        self.channels * self.bits_per_sample / 8
    }
}
