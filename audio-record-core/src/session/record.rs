use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::models::config::CaptureConfig;
use crate::models::error::CaptureError;
use crate::models::format::AudioFormatSpec;
use crate::models::recording_result::{RecordingMetadata, RecordingResult};
use crate::models::state::CaptureState;
use crate::processing::ring_buffer::RingBuffer;
use crate::processing::wav;
use crate::storage::metadata;
use crate::storage::wav_writer::WavArtifactWriter;
use crate::traits::chunk_source::ChunkSource;

/// Everything the producer thread hands back when it exits.
struct ProducerOutcome {
    buffer: RingBuffer,
    bytes_read: u64,
    bytes_discarded: u64,
    failure: Option<CaptureError>,
}

/// Internal mutable session state, protected by `parking_lot::Mutex`.
struct SessionState {
    state: CaptureState,
    started_at: Option<DateTime<Utc>>,
    result: Option<RecordingResult>,
}

/// Bounded recording session orchestrator.
///
/// Generic over the audio producer via the `ChunkSource` trait. Owns the
/// whole lifecycle: sizing the ring buffer from the configured window,
/// running the producer loop on a dedicated thread, and on stop draining
/// the retained audio through the WAV encoder into a finalized artifact.
///
/// Data flow:
/// ```text
/// [ChunkSource] → producer thread → [RingBuffer (evicts oldest)]
///                                         ↓ stop(): join, then drain
///                                   [WAV encode] → [WavArtifactWriter]
/// ```
///
/// The producer thread owns the ring buffer and its scratch buffer
/// outright; ownership returns through the join handle at stop, so the
/// buffer is never touched from two threads.
pub struct CaptureSession<S: ChunkSource> {
    config: CaptureConfig,
    format: AudioFormatSpec,
    source: Option<S>,
    session_state: Mutex<SessionState>,
    stop_flag: Arc<AtomicBool>,
    producer: Option<thread::JoinHandle<ProducerOutcome>>,
}

impl<S: ChunkSource> CaptureSession<S> {
    pub fn new(source: S, config: CaptureConfig) -> Result<Self, CaptureError> {
        config.validate()?;
        let format = config.format()?;
        Ok(Self {
            config,
            format,
            source: Some(source),
            session_state: Mutex::new(SessionState {
                state: CaptureState::NotStarted,
                started_at: None,
                result: None,
            }),
            stop_flag: Arc::new(AtomicBool::new(false)),
            producer: None,
        })
    }

    pub fn state(&self) -> CaptureState {
        self.session_state.lock().state
    }

    pub fn format(&self) -> AudioFormatSpec {
        self.format
    }

    /// Start recording. Valid only from `NotStarted`.
    ///
    /// Sizes the ring buffer to hold `max_window_secs` of audio and spawns
    /// the producer thread, which pulls fixed-size chunks from the source
    /// until it observes the stop flag.
    pub fn start(&mut self) -> Result<(), CaptureError> {
        {
            let s = self.session_state.lock();
            if !s.state.is_not_started() {
                return Err(CaptureError::InvalidState(
                    "start is only valid before recording".into(),
                ));
            }
        }

        let capacity = (self.format.byte_rate() as u64 * self.config.max_window_secs as u64) as usize;
        let buffer = RingBuffer::new(capacity)?;
        let chunk_bytes = self
            .config
            .chunk_bytes
            .unwrap_or_else(|| default_chunk_bytes(&self.format));

        let source = self
            .source
            .take()
            .ok_or_else(|| CaptureError::InvalidState("audio source already consumed".into()))?;

        self.stop_flag.store(false, Ordering::Release);
        let stop_flag = Arc::clone(&self.stop_flag);

        let started_at = Utc::now();
        let handle = thread::Builder::new()
            .name("capture-producer".into())
            .spawn(move || run_producer(source, buffer, chunk_bytes, stop_flag))
            .map_err(|e| CaptureError::Io(format!("failed to spawn producer thread: {}", e)))?;

        {
            let mut s = self.session_state.lock();
            s.state = CaptureState::Recording;
            s.started_at = Some(started_at);
        }
        self.producer = Some(handle);

        log::info!(
            "recording started: {} Hz, {} ch, {} bit, {} byte window, {} byte chunks",
            self.format.sample_rate_hz,
            self.format.channels,
            self.format.bits_per_sample,
            capacity,
            chunk_bytes
        );
        Ok(())
    }

    /// Stop recording and finalize the artifact. Valid from `Recording`;
    /// called again after completion, returns the already-produced result.
    ///
    /// The reported start time is clamped so the window never claims more
    /// history than the buffer could have retained:
    /// `start = max(raw_start, end - max_window_secs)`.
    pub fn stop(&mut self) -> Result<RecordingResult, CaptureError> {
        {
            let s = self.session_state.lock();
            if !s.state.is_recording() {
                return s.result.clone().ok_or_else(|| {
                    CaptureError::InvalidState("stop is only valid while recording".into())
                });
            }
        }

        // Publish the stop signal, then wait for the producer to observe
        // it and exit. The join is the happens-before edge that makes the
        // drain below safe without any buffer locking.
        self.stop_flag.store(true, Ordering::Release);
        let handle = self
            .producer
            .take()
            .ok_or_else(|| CaptureError::InvalidState("producer thread is missing".into()))?;
        let outcome = handle
            .join()
            .map_err(|_| CaptureError::Io("producer thread panicked".into()))?;
        let ended_at = Utc::now();

        let started_at = {
            let mut s = self.session_state.lock();
            s.state = CaptureState::Stopped;
            s.started_at
        }
        .ok_or_else(|| CaptureError::InvalidState("missing start timestamp".into()))?;

        if let Some(failure) = outcome.failure {
            return Err(failure);
        }

        let end_time = epoch_secs(ended_at);
        let start_time = clamp_start_time(epoch_secs(started_at), end_time, self.config.max_window_secs);

        let mut buffer = outcome.buffer;
        let mut payload = vec![0u8; buffer.available()];
        buffer.drain(&mut payload);

        let data_len = wav::validate_data_len(payload.len() as u64)?;
        let header = wav::write_header(&self.format, data_len)?;

        let mut writer = WavArtifactWriter::new(self.config.artifact_path());
        writer.open()?;
        writer.write(&header)?;
        writer.write(&payload)?;
        let (file_path, checksum) = writer.finalize()?;

        let meta = RecordingMetadata::new(
            self.format,
            &file_path,
            start_time,
            end_time,
            outcome.bytes_discarded,
            data_len as u64,
            &checksum,
        );
        // The WAV artifact is the contract; a sidecar failure is not.
        if let Err(e) = metadata::write_metadata(&meta, &file_path) {
            log::warn!("failed to write metadata sidecar: {}", e);
        }

        log::info!(
            "recording stopped: {} bytes read, {} retained, {} discarded, {:.3}s window",
            outcome.bytes_read,
            data_len,
            outcome.bytes_discarded,
            end_time - start_time
        );

        let result = RecordingResult {
            file_path,
            start_time,
            end_time,
            duration_secs: end_time - start_time,
            bytes_discarded: outcome.bytes_discarded,
            data_len: data_len as u64,
            checksum,
            metadata: meta,
        };

        self.session_state.lock().result = Some(result.clone());
        Ok(result)
    }
}

/// Producer loop: pull fixed-size chunks into a locally owned scratch
/// buffer and push them into the ring until the stop flag is observed.
/// A source error stops the loop; it surfaces through the pending stop.
fn run_producer<S: ChunkSource>(
    mut source: S,
    mut buffer: RingBuffer,
    chunk_bytes: usize,
    stop_flag: Arc<AtomicBool>,
) -> ProducerOutcome {
    let mut scratch = vec![0u8; chunk_bytes];
    let mut bytes_read: u64 = 0;
    let mut bytes_discarded: u64 = 0;
    let mut failure = None;

    while !stop_flag.load(Ordering::Acquire) {
        match source.pull_chunk(&mut scratch) {
            Ok(0) => continue,
            Ok(n) => {
                let n = n.min(scratch.len());
                bytes_read += n as u64;
                bytes_discarded += buffer.push(&scratch[..n]) as u64;
            }
            Err(e) => {
                log::error!("audio source failed, stopping producer: {}", e);
                failure = Some(e);
                break;
            }
        }
    }

    ProducerOutcome {
        buffer,
        bytes_read,
        bytes_discarded,
        failure,
    }
}

/// Producer read granularity when none is configured: ~100 ms of audio,
/// aligned to whole sample-frames.
fn default_chunk_bytes(format: &AudioFormatSpec) -> usize {
    let block = format.block_align() as usize;
    let approx = format.byte_rate() as usize / 10;
    approx.max(block) / block * block
}

fn epoch_secs(at: DateTime<Utc>) -> f64 {
    at.timestamp_millis() as f64 / 1000.0
}

fn clamp_start_time(raw_start: f64, end: f64, max_window_secs: u32) -> f64 {
    raw_start.max(end - max_window_secs as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::VecDeque;
    use std::fs;
    use std::time::{Duration, Instant};

    use approx::assert_relative_eq;

    use crate::storage::metadata::read_metadata;

    /// Serves scripted chunks in order, then flags exhaustion and idles.
    struct ScriptedSource {
        chunks: VecDeque<Vec<u8>>,
        drained: Arc<AtomicBool>,
    }

    impl ScriptedSource {
        fn new(chunks: Vec<Vec<u8>>) -> (Self, Arc<AtomicBool>) {
            let drained = Arc::new(AtomicBool::new(false));
            (
                Self {
                    chunks: chunks.into(),
                    drained: Arc::clone(&drained),
                },
                drained,
            )
        }
    }

    impl ChunkSource for ScriptedSource {
        fn pull_chunk(&mut self, buf: &mut [u8]) -> Result<usize, CaptureError> {
            match self.chunks.pop_front() {
                Some(chunk) => {
                    let n = chunk.len().min(buf.len());
                    buf[..n].copy_from_slice(&chunk[..n]);
                    Ok(n)
                }
                None => {
                    self.drained.store(true, Ordering::Release);
                    thread::sleep(Duration::from_millis(1));
                    Ok(0)
                }
            }
        }
    }

    struct FailingSource;

    impl ChunkSource for FailingSource {
        fn pull_chunk(&mut self, _buf: &mut [u8]) -> Result<usize, CaptureError> {
            Err(CaptureError::Io("device unplugged".into()))
        }
    }

    fn wait_until(flag: &AtomicBool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !flag.load(Ordering::Acquire) {
            assert!(Instant::now() < deadline, "source never drained");
            thread::sleep(Duration::from_millis(1));
        }
    }

    /// 50 Hz mono 8-bit with a 2 s window: a 100-byte ring buffer.
    fn test_config(name: &str) -> CaptureConfig {
        CaptureConfig {
            sample_rate_hz: 50,
            channels: 1,
            bits_per_sample: 8,
            max_window_secs: 2,
            output_directory: std::env::temp_dir(),
            file_name: Some(format!("audio_record_session_{}.wav", name)),
            chunk_bytes: Some(40),
        }
    }

    fn cleanup(result: &RecordingResult) {
        fs::remove_file(&result.file_path).ok();
        fs::remove_file(result.file_path.with_extension("metadata.json")).ok();
    }

    #[test]
    fn end_to_end_retains_last_window() {
        let stream: Vec<u8> = (0..120).map(|i| i as u8).collect();
        let chunks = stream.chunks(40).map(|c| c.to_vec()).collect();
        let (source, drained) = ScriptedSource::new(chunks);

        let mut session = CaptureSession::new(source, test_config("e2e")).unwrap();
        assert!(session.state().is_not_started());

        session.start().unwrap();
        assert!(session.state().is_recording());
        assert_eq!(session.format().byte_rate(), 50);

        wait_until(&drained);
        let result = session.stop().unwrap();
        assert!(session.state().is_stopped());

        // The ring held 100 bytes: the last 100 of the 120-byte stream.
        assert_eq!(result.data_len, 100);
        assert_eq!(result.bytes_discarded, 20);

        let file = fs::read(&result.file_path).unwrap();
        assert_eq!(file.len(), 144);
        assert_eq!(&file[0..4], b"RIFF");
        assert_eq!(u32::from_le_bytes([file[24], file[25], file[26], file[27]]), 50);
        assert_eq!(u16::from_le_bytes([file[22], file[23]]), 1);
        assert_eq!(u16::from_le_bytes([file[34], file[35]]), 8);
        assert_eq!(u32::from_le_bytes([file[40], file[41], file[42], file[43]]), 100);
        assert_eq!(&file[44..], &stream[20..]);

        // Timing: the run took far less than the window, so no clamping.
        assert!(result.end_time >= result.start_time);
        assert!(result.duration_secs <= 2.0);
        assert_eq!(result.checksum.len(), 64);

        // Sidecar reproduces the result metadata.
        let loaded = read_metadata(&result.file_path).unwrap();
        assert_eq!(loaded, result.metadata);

        cleanup(&result);
    }

    #[test]
    fn lossless_when_stream_fits_window() {
        let stream: Vec<u8> = (0..80).map(|i| i as u8).collect();
        let chunks = stream.chunks(40).map(|c| c.to_vec()).collect();
        let (source, drained) = ScriptedSource::new(chunks);

        let mut session = CaptureSession::new(source, test_config("lossless")).unwrap();
        session.start().unwrap();
        wait_until(&drained);
        let result = session.stop().unwrap();

        assert_eq!(result.data_len, 80);
        assert_eq!(result.bytes_discarded, 0);
        let file = fs::read(&result.file_path).unwrap();
        assert_eq!(&file[44..], &stream[..]);

        cleanup(&result);
    }

    #[test]
    fn stop_before_start_is_invalid() {
        let (source, _) = ScriptedSource::new(vec![]);
        let mut session = CaptureSession::new(source, test_config("nostart")).unwrap();
        assert!(matches!(session.stop(), Err(CaptureError::InvalidState(_))));
    }

    #[test]
    fn double_start_is_invalid() {
        let (source, drained) = ScriptedSource::new(vec![]);
        let mut session = CaptureSession::new(source, test_config("dblstart")).unwrap();
        session.start().unwrap();
        assert!(matches!(session.start(), Err(CaptureError::InvalidState(_))));

        wait_until(&drained);
        let result = session.stop().unwrap();
        cleanup(&result);
    }

    #[test]
    fn double_stop_replays_result() {
        let (source, drained) = ScriptedSource::new(vec![vec![7u8; 40]]);
        let mut session = CaptureSession::new(source, test_config("dblstop")).unwrap();
        session.start().unwrap();
        wait_until(&drained);

        let first = session.stop().unwrap();
        let second = session.stop().unwrap();
        assert_eq!(first, second);

        cleanup(&first);
    }

    #[test]
    fn producer_failure_surfaces_through_stop() {
        let config = test_config("srcfail");
        let artifact = config.artifact_path();
        let mut session = CaptureSession::new(FailingSource, config).unwrap();
        session.start().unwrap();

        // The producer exits on its own; stop still joins and reports.
        let err = session.stop().unwrap_err();
        assert_eq!(err, CaptureError::Io("device unplugged".into()));
        assert!(session.state().is_stopped());
        assert!(!artifact.exists());

        // No artifact was produced, so a further stop has nothing to report.
        assert!(matches!(session.stop(), Err(CaptureError::InvalidState(_))));
    }

    #[test]
    fn start_time_clamped_to_window() {
        let t0 = 1_700_000_000.0;
        assert_relative_eq!(clamp_start_time(t0, t0 + 90.0, 60), t0 + 30.0);
        // Short runs are reported as-is.
        assert_relative_eq!(clamp_start_time(t0, t0 + 30.0, 60), t0);
    }

    #[test]
    fn default_chunk_is_100ms_frame_aligned() {
        let format = AudioFormatSpec::new(44100, 1, 16).unwrap();
        assert_eq!(default_chunk_bytes(&format), 8820);

        let format = AudioFormatSpec::new(44100, 2, 16).unwrap();
        assert_eq!(default_chunk_bytes(&format) % format.block_align() as usize, 0);

        // Tiny rates still get at least one whole frame.
        let format = AudioFormatSpec::new(5, 2, 16).unwrap();
        assert_eq!(default_chunk_bytes(&format), 4);
    }
}
