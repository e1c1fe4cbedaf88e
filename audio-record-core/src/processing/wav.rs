//! Canonical WAV (RIFF/WAVE) container encoding.
//!
//! Produces the standard 44-byte PCM header followed by the raw payload.
//! The encoder has no dependency on where the payload came from — ring
//! buffer drain, spill file, or test fixture all serialize identically.

use std::io::Write;

use crate::models::error::CaptureError;
use crate::models::format::AudioFormatSpec;

/// Size of the standard WAV RIFF header in bytes.
pub const WAV_HEADER_SIZE: usize = 44;

/// Largest representable PCM payload: the RIFF size field at offset 4
/// holds `data_len + 36` and must fit in 32 bits.
pub const MAX_DATA_LEN: u32 = u32::MAX - 36;

/// Generate the 44-byte WAV header for `data_len` bytes of PCM payload.
///
/// Layout (all integers little-endian):
/// ```text
/// [0-3]    "RIFF"
/// [4-7]    data_len + 36
/// [8-11]   "WAVE"
/// [12-15]  "fmt "
/// [16-19]  16 (fmt chunk size)
/// [20-21]  1 (PCM format tag)
/// [22-23]  channels
/// [24-27]  sample_rate
/// [28-31]  byte_rate
/// [32-33]  block_align
/// [34-35]  bits_per_sample
/// [36-39]  "data"
/// [40-43]  data_len
/// ```
pub fn write_header(format: &AudioFormatSpec, data_len: u32) -> Result<[u8; WAV_HEADER_SIZE], CaptureError> {
    format.validate()?;
    if data_len > MAX_DATA_LEN {
        return Err(CaptureError::PayloadTooLarge(data_len as u64));
    }

    let mut header = [0u8; WAV_HEADER_SIZE];

    // RIFF chunk descriptor
    header[0..4].copy_from_slice(b"RIFF");
    header[4..8].copy_from_slice(&(data_len + 36).to_le_bytes());
    header[8..12].copy_from_slice(b"WAVE");

    // fmt sub-chunk
    header[12..16].copy_from_slice(b"fmt ");
    header[16..20].copy_from_slice(&16u32.to_le_bytes());
    header[20..22].copy_from_slice(&1u16.to_le_bytes());
    header[22..24].copy_from_slice(&format.channels.to_le_bytes());
    header[24..28].copy_from_slice(&format.sample_rate_hz.to_le_bytes());
    header[28..32].copy_from_slice(&format.byte_rate().to_le_bytes());
    header[32..34].copy_from_slice(&format.block_align().to_le_bytes());
    header[34..36].copy_from_slice(&format.bits_per_sample.to_le_bytes());

    // data sub-chunk
    header[36..40].copy_from_slice(b"data");
    header[40..44].copy_from_slice(&data_len.to_le_bytes());

    Ok(header)
}

/// Check a payload length against the 32-bit RIFF size limit.
pub fn validate_data_len(len: u64) -> Result<u32, CaptureError> {
    if len > MAX_DATA_LEN as u64 {
        return Err(CaptureError::PayloadTooLarge(len));
    }
    Ok(len as u32)
}

/// Encode a complete WAV byte stream: header followed by the payload
/// unmodified. Output length is always `44 + payload.len()`.
pub fn encode(format: &AudioFormatSpec, payload: &[u8]) -> Result<Vec<u8>, CaptureError> {
    let mut out = Vec::with_capacity(WAV_HEADER_SIZE + payload.len());
    encode_into(format, payload, &mut out)?;
    Ok(out)
}

/// Stream the encoded WAV bytes into any writer.
pub fn encode_into<W: Write>(format: &AudioFormatSpec, payload: &[u8], writer: &mut W) -> Result<(), CaptureError> {
    let data_len = validate_data_len(payload.len() as u64)?;
    let header = write_header(format, data_len)?;
    writer
        .write_all(&header)
        .and_then(|_| writer.write_all(payload))
        .map_err(|e| CaptureError::Io(format!("wav encode failed: {}", e)))
}
