// Audio module - sample-domain stages ahead of event analysis
//
// Components:
// - BandLimitingFilter: 100-450 Hz IIR cascade with persistent state
// - WindowEnergyExtractor: fixed 100 ms RMS windows over a sample stream
// - BufferPool: lock-free SPSC buffer recycling between capture and analysis
// - MicrophoneCapture: default cpal input device (feature `microphone`)

pub mod buffer_pool;
#[cfg(feature = "microphone")]
pub mod capture;
pub mod filter;
pub mod window;

pub use filter::BandLimitingFilter;
pub use window::{AudioWindow, WindowEnergyExtractor, WINDOW_DURATION_MS};
