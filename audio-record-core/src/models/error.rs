use thiserror::Error;

/// Errors that can occur while configuring, running, or finalizing a
/// recording session.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("invalid format: {0}")]
    InvalidFormat(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("payload too large: {0} bytes exceeds the 32-bit WAV data limit")]
    PayloadTooLarge(u64),

    #[error("ring buffer capacity must be non-zero")]
    CapacityZero,

    #[error("i/o failure: {0}")]
    Io(String),
}
