use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::format::AudioFormatSpec;

/// Result returned when a recording session completes successfully.
///
/// `start_time` and `end_time` are wall-clock seconds since the Unix
/// epoch. The start is clamped so the reported window never exceeds the
/// configured maximum — the buffer cannot have retained audio from
/// further back.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordingResult {
    pub file_path: PathBuf,
    pub start_time: f64,
    pub end_time: f64,
    pub duration_secs: f64,
    /// Total bytes evicted from the ring buffer during capture.
    pub bytes_discarded: u64,
    /// PCM payload length in bytes (file length minus the 44-byte header).
    pub data_len: u64,
    pub checksum: String,
    pub metadata: RecordingMetadata,
}

/// Metadata stored in a JSON sidecar next to the recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingMetadata {
    pub id: String,
    pub file_path: String,
    pub format: AudioFormatSpec,
    pub start_time: f64,
    pub end_time: f64,
    pub duration_secs: f64,
    pub bytes_discarded: u64,
    pub data_len: u64,
    pub checksum: String,
    pub created_at: String,
}

impl RecordingMetadata {
    pub fn new(
        format: AudioFormatSpec,
        file_path: &Path,
        start_time: f64,
        end_time: f64,
        bytes_discarded: u64,
        data_len: u64,
        checksum: &str,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            file_path: file_path.to_string_lossy().into_owned(),
            format,
            start_time,
            end_time,
            duration_secs: end_time - start_time,
            bytes_discarded,
            data_len,
            checksum: checksum.to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}
