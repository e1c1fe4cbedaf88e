use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::models::error::CaptureError;

/// Staged writer for the final WAV artifact.
///
/// Bytes go to a `*.wav.tmp` sibling first; `finalize` renames it onto the
/// final path only once every byte has been written and flushed, so a
/// failed encode never leaves a partial artifact at the output path.
/// Dropping an unfinalized writer removes the temp file.
pub struct WavArtifactWriter {
    final_path: PathBuf,
    temp_path: PathBuf,
    file: Option<File>,
    total_bytes_written: u64,
}

impl WavArtifactWriter {
    pub fn new(final_path: PathBuf) -> Self {
        let temp_path = final_path.with_extension("wav.tmp");
        Self {
            final_path,
            temp_path,
            file: None,
            total_bytes_written: 0,
        }
    }

    /// Create the temp file, making the output directory as needed.
    pub fn open(&mut self) -> Result<(), CaptureError> {
        if self.file.is_some() {
            return Ok(());
        }

        if let Some(parent) = self.final_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| CaptureError::Io(format!("failed to create directory: {}", e)))?;
        }

        let file = File::create(&self.temp_path)
            .map_err(|e| CaptureError::Io(format!("failed to create temp file: {}", e)))?;
        self.file = Some(file);
        Ok(())
    }

    pub fn write(&mut self, data: &[u8]) -> Result<(), CaptureError> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| CaptureError::Io("artifact writer is not open".into()))?;
        file.write_all(data)
            .map_err(|e| CaptureError::Io(format!("write failed: {}", e)))?;
        self.total_bytes_written += data.len() as u64;
        Ok(())
    }

    /// Flush, promote the temp file onto the final path, and return the
    /// final path with the SHA-256 hex checksum of the finished file.
    pub fn finalize(mut self) -> Result<(PathBuf, String), CaptureError> {
        let file = self
            .file
            .take()
            .ok_or_else(|| CaptureError::Io("artifact writer is not open".into()))?;
        file.sync_all()
            .map_err(|e| CaptureError::Io(format!("flush failed: {}", e)))?;
        drop(file);

        fs::rename(&self.temp_path, &self.final_path)
            .map_err(|e| CaptureError::Io(format!("failed to finalize artifact: {}", e)))?;

        let checksum = sha256_file(&self.final_path)?;
        Ok((self.final_path.clone(), checksum))
    }

    /// Total bytes written so far.
    pub fn bytes_written(&self) -> u64 {
        self.total_bytes_written
    }
}

impl Drop for WavArtifactWriter {
    fn drop(&mut self) {
        // Unfinalized temp files are never promoted.
        if self.file.take().is_some() {
            if let Err(e) = fs::remove_file(&self.temp_path) {
                log::warn!("failed to remove temp file {}: {}", self.temp_path.display(), e);
            }
        }
    }
}

/// Compute the SHA-256 hex digest of a file.
fn sha256_file(path: &Path) -> Result<String, CaptureError> {
    let data = fs::read(path)
        .map_err(|e| CaptureError::Io(format!("failed to read file for checksum: {}", e)))?;
    let digest = Sha256::digest(&data);
    Ok(hex_encode(&digest))
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
