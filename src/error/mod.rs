// Error types for the gut motility pipeline
//
// Configuration problems are reported at setup time through ConfigError.
// Session and capture problems are reported through AudioError. Numeric edge
// cases inside the DSP stages never become errors; they resolve to sentinel
// values instead.

mod audio;
mod config;

pub use audio::{log_audio_error, AudioError, AudioErrorCodes};
pub use config::{log_config_error, ConfigError, ConfigErrorCodes};

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from custom error types, so downstream collaborators (UI, persistence)
/// can react to a stable numeric code instead of parsing text.
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}

/// Either failure a pipeline entry point can report
///
/// Returned where setup (configuration) and runtime (session, worker)
/// failures meet, such as starting the streaming engine.
#[derive(Debug, Clone, PartialEq)]
pub enum MotilityError {
    Config(ConfigError),
    Audio(AudioError),
}

impl ErrorCode for MotilityError {
    fn code(&self) -> i32 {
        match self {
            MotilityError::Config(err) => err.code(),
            MotilityError::Audio(err) => err.code(),
        }
    }

    fn message(&self) -> String {
        match self {
            MotilityError::Config(err) => err.message(),
            MotilityError::Audio(err) => err.message(),
        }
    }
}

impl std::fmt::Display for MotilityError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MotilityError::Config(err) => write!(f, "{}", err),
            MotilityError::Audio(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for MotilityError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MotilityError::Config(err) => Some(err),
            MotilityError::Audio(err) => Some(err),
        }
    }
}

impl From<ConfigError> for MotilityError {
    fn from(err: ConfigError) -> Self {
        MotilityError::Config(err)
    }
}

impl From<AudioError> for MotilityError {
    fn from(err: AudioError) -> Self {
        MotilityError::Audio(err)
    }
}
