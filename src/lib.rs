// Gut Motility Core - acoustic isolation and event classification
// Streaming DSP pipeline: band-limit → 100 ms energy → calibrate → segment → classify → aggregate

// Module declarations
pub mod analysis;
pub mod audio;
pub mod calibration;
pub mod config;
pub mod engine;
pub mod error;
pub mod session;
pub mod testing;

// Re-exports for convenience
pub use analysis::{Analytics, ClassifiedEvent, EventClass, QualityTier};
pub use calibration::CalibrationProfile;
pub use config::AppConfig;
pub use engine::{CaptureFeed, EngineHandle};
pub use error::{AudioError, ConfigError, ErrorCode, MotilityError};
pub use session::{analyze_recording, MotilitySession, SessionEvent, SessionPhase, SessionReport};

/// Install a stderr `tracing` subscriber filtered by `RUST_LOG` (default `info`)
///
/// Safe to call more than once; only the first call installs a subscriber.
/// `log` records from the config loader reach the same sink through the
/// subscriber's log bridge.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init();
}
