//! # audio-record-core
//!
//! Platform-agnostic bounded audio recording core.
//!
//! Captures a live PCM stream into a fixed-capacity ring buffer that keeps
//! only the most recent window of audio, and on stop serializes the
//! retained bytes as a canonical WAV file with the wall-clock span
//! actually retained. Platform capture backends (Android AudioRecord,
//! WASAPI, Core Audio) implement the `ChunkSource` trait and plug into the
//! generic `CaptureSession`.
//!
//! ## Architecture
//!
//! ```text
//! audio-record-core (this crate)
//! ├── traits/       ← ChunkSource (platform producer seam)
//! ├── models/       ← CaptureError, CaptureState, AudioFormatSpec,
//! │                   CaptureConfig, RecordingResult
//! ├── processing/   ← RingBuffer, WAV header/encoder
//! ├── session/      ← CaptureSession (orchestrator)
//! └── storage/      ← WavArtifactWriter, metadata sidecar
//! ```

pub mod models;
pub mod processing;
pub mod session;
pub mod storage;
pub mod traits;

// Re-export key types at crate root for convenience.
pub use models::config::{negotiate_sample_rate, CaptureConfig, FALLBACK_SAMPLE_RATES};
pub use models::error::CaptureError;
pub use models::format::AudioFormatSpec;
pub use models::recording_result::{RecordingMetadata, RecordingResult};
pub use models::state::CaptureState;
pub use processing::ring_buffer::RingBuffer;
pub use processing::wav::{encode, encode_into, write_header, WAV_HEADER_SIZE};
pub use session::record::CaptureSession;
pub use storage::wav_writer::WavArtifactWriter;
pub use traits::chunk_source::ChunkSource;
