// Configuration error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Configuration error code constants
///
/// Error code range: 3001-3005
pub struct ConfigErrorCodes {}

impl ConfigErrorCodes {
    /// A single option holds an invalid value
    pub const INVALID_VALUE: i32 = 3001;

    /// Two related options contradict each other
    pub const INVALID_RANGE: i32 = 3002;

    /// Band-limiting filter coefficients could not be designed
    pub const FILTER_DESIGN: i32 = 3003;

    /// Configuration file could not be read
    pub const READ: i32 = 3004;

    /// Configuration file is not valid JSON for AppConfig
    pub const PARSE: i32 = 3005;
}

/// Log a configuration error with structured context
pub fn log_config_error(err: &ConfigError, context: &str) {
    error!(
        "Config error in {}: code={}, component=AppConfig, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Configuration errors, always surfaced before a session starts
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Option `field` holds a value outside its domain
    InvalidValue { field: &'static str, reason: String },

    /// Options `lower` and `upper` are out of order
    InvalidRange {
        lower: &'static str,
        upper: &'static str,
        reason: String,
    },

    /// biquad refused the requested section
    FilterDesign { reason: String },

    /// Reading the config file failed
    Read { path: String, reason: String },

    /// Parsing the config file failed
    Parse { reason: String },
}

impl ErrorCode for ConfigError {
    fn code(&self) -> i32 {
        match self {
            ConfigError::InvalidValue { .. } => ConfigErrorCodes::INVALID_VALUE,
            ConfigError::InvalidRange { .. } => ConfigErrorCodes::INVALID_RANGE,
            ConfigError::FilterDesign { .. } => ConfigErrorCodes::FILTER_DESIGN,
            ConfigError::Read { .. } => ConfigErrorCodes::READ,
            ConfigError::Parse { .. } => ConfigErrorCodes::PARSE,
        }
    }

    fn message(&self) -> String {
        match self {
            ConfigError::InvalidValue { field, reason } => {
                format!("Invalid value for {}: {}", field, reason)
            }
            ConfigError::InvalidRange {
                lower,
                upper,
                reason,
            } => {
                format!("{} must not exceed {}: {}", lower, upper, reason)
            }
            ConfigError::FilterDesign { reason } => {
                format!("Filter design failed: {}", reason)
            }
            ConfigError::Read { path, reason } => {
                format!("Failed to read config {}: {}", path, reason)
            }
            ConfigError::Parse { reason } => {
                format!("Failed to parse config: {}", reason)
            }
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ConfigError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for ConfigError {}
