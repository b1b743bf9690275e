// Audio/session error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Audio error code constants
///
/// Single source of truth for the numeric codes shared with collaborating
/// layers (UI, session persistence).
///
/// Error code range: 1001-1006
pub struct AudioErrorCodes {}

impl AudioErrorCodes {
    /// Sample rate is zero or too low for the gut band
    pub const INVALID_SAMPLE_RATE: i32 = 1001;

    /// Session was already stopped
    pub const SESSION_STOPPED: i32 = 1002;

    /// Capture side ran out of pooled buffers
    pub const BUFFER_POOL_EXHAUSTED: i32 = 1003;

    /// Analysis worker thread failed or disconnected
    pub const WORKER_FAILED: i32 = 1004;

    /// Input audio format cannot be processed
    pub const UNSUPPORTED_FORMAT: i32 = 1005;

    /// Capture hardware error
    pub const HARDWARE_ERROR: i32 = 1006;
}

/// Log an audio error with structured context
///
/// Emits error_code, component and message in a single line so the entry
/// can be grepped out of clinical session logs.
pub fn log_audio_error(err: &AudioError, context: &str) {
    error!(
        "Audio error in {}: code={}, component=MotilitySession, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Audio-related errors
///
/// These errors cover session lifecycle, the capture/analysis link and
/// input decoding. None of them is raised for numeric edge cases in the
/// DSP stages.
///
/// Error code ranges: 1001-1006
#[derive(Debug, Clone, PartialEq)]
pub enum AudioError {
    /// Sample rate is invalid
    InvalidSampleRate { sample_rate: u32 },

    /// Session no longer accepts audio
    SessionStopped,

    /// Every pooled buffer is queued; the analysis side is behind
    BufferPoolExhausted { dropped_samples: usize },

    /// Analysis worker panicked or its channel closed
    WorkerFailed { reason: String },

    /// Input could not be decoded into mono f32 samples
    UnsupportedFormat { reason: String },

    /// Capture hardware error
    HardwareError { details: String },
}

impl ErrorCode for AudioError {
    fn code(&self) -> i32 {
        match self {
            AudioError::InvalidSampleRate { .. } => AudioErrorCodes::INVALID_SAMPLE_RATE,
            AudioError::SessionStopped => AudioErrorCodes::SESSION_STOPPED,
            AudioError::BufferPoolExhausted { .. } => AudioErrorCodes::BUFFER_POOL_EXHAUSTED,
            AudioError::WorkerFailed { .. } => AudioErrorCodes::WORKER_FAILED,
            AudioError::UnsupportedFormat { .. } => AudioErrorCodes::UNSUPPORTED_FORMAT,
            AudioError::HardwareError { .. } => AudioErrorCodes::HARDWARE_ERROR,
        }
    }

    fn message(&self) -> String {
        match self {
            AudioError::InvalidSampleRate { sample_rate } => {
                format!("Sample rate {} Hz cannot carry the gut band", sample_rate)
            }
            AudioError::SessionStopped => {
                "Session already stopped. Start a new session to record again.".to_string()
            }
            AudioError::BufferPoolExhausted { dropped_samples } => {
                format!(
                    "Buffer pool exhausted, {} samples could not be queued",
                    dropped_samples
                )
            }
            AudioError::WorkerFailed { reason } => {
                format!("Analysis worker failed: {}", reason)
            }
            AudioError::UnsupportedFormat { reason } => {
                format!("Unsupported audio format: {}", reason)
            }
            AudioError::HardwareError { details } => {
                format!("Hardware error: {}", details)
            }
        }
    }
}

impl fmt::Display for AudioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AudioError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for AudioError {}

impl From<std::io::Error> for AudioError {
    fn from(err: std::io::Error) -> Self {
        AudioError::HardwareError {
            details: err.to_string(),
        }
    }
}
