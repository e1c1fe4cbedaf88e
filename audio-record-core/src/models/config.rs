use std::path::PathBuf;

use super::error::CaptureError;
use super::format::AudioFormatSpec;

/// Sample rates tried, in order, when the requested rate is unsupported
/// by the capture device.
pub const FALLBACK_SAMPLE_RATES: [u32; 5] = [44100, 22050, 16000, 11025, 8000];

/// Configuration for a recording session.
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Target sample rate in Hz (default: 44100).
    pub sample_rate_hz: u32,

    /// Number of channels (default: 1 for mono). Valid values: 1, 2.
    pub channels: u16,

    /// Bits per PCM sample (default: 16). Valid values: 8, 16.
    pub bits_per_sample: u16,

    /// Maximum retained window in seconds (default: 60). The ring buffer
    /// is sized to hold exactly this much audio; older data is discarded.
    pub max_window_secs: u32,

    /// Directory where the finished recording is written.
    pub output_directory: PathBuf,

    /// Artifact file name, or None for `recording_{uuid}.wav`.
    pub file_name: Option<String>,

    /// Producer read granularity in bytes, or None for ~100 ms of audio.
    pub chunk_bytes: Option<usize>,
}

impl CaptureConfig {
    pub fn validate(&self) -> Result<(), CaptureError> {
        self.format()?;
        // A zero window would size the ring buffer at zero bytes.
        if self.max_window_secs == 0 {
            return Err(CaptureError::CapacityZero);
        }
        if self.chunk_bytes == Some(0) {
            return Err(CaptureError::InvalidFormat("chunk size must be positive".into()));
        }
        Ok(())
    }

    pub fn format(&self) -> Result<AudioFormatSpec, CaptureError> {
        AudioFormatSpec::new(self.sample_rate_hz, self.channels, self.bits_per_sample)
    }

    /// Path of the final artifact for this configuration.
    pub fn artifact_path(&self) -> PathBuf {
        match &self.file_name {
            Some(name) => self.output_directory.join(name),
            None => self
                .output_directory
                .join(format!("recording_{}.wav", uuid::Uuid::new_v4())),
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: 44100,
            channels: 1,
            bits_per_sample: 16,
            max_window_secs: 60,
            output_directory: PathBuf::from("."),
            file_name: None,
            chunk_bytes: None,
        }
    }
}

/// Pick the sample rate a capture backend should open its device with.
///
/// `probe` reports the device's minimum buffer size for a rate, or None if
/// the rate is unsupported. The requested rate wins whenever the device
/// supports it; only then does selection fall back through
/// [`FALLBACK_SAMPLE_RATES`] in order. Returns the chosen rate and the
/// device's minimum buffer size for it, or None if nothing is supported.
pub fn negotiate_sample_rate<F>(requested: u32, probe: F) -> Option<(u32, usize)>
where
    F: Fn(u32) -> Option<usize>,
{
    if let Some(min_buffer) = probe(requested) {
        return Some((requested, min_buffer));
    }
    FALLBACK_SAMPLE_RATES
        .iter()
        .find_map(|&rate| probe(rate).map(|min_buffer| (rate, min_buffer)))
}
