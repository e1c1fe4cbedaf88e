use crate::models::error::CaptureError;

/// Interface for platform-specific audio producers.
///
/// Implemented by capture backends (Android AudioRecord, WASAPI,
/// Core Audio); the core never touches a platform audio API. The session's
/// producer loop calls `pull_chunk` repeatedly while recording.
pub trait ChunkSource: Send + 'static {
    /// Pull the next chunk of raw PCM bytes into `buf`.
    ///
    /// May block until the hardware delivers samples. Returns the number
    /// of bytes written into `buf`; `Ok(0)` means no data was available
    /// this round and the loop should poll again. An error stops the
    /// producer loop and surfaces through the pending `stop()`.
    fn pull_chunk(&mut self, buf: &mut [u8]) -> Result<usize, CaptureError>;
}
