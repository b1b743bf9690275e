// NoiseFloorCalibrator - quiet-period window collection
//
// The calibrator is fed the RMS of each 100 ms window of filtered audio
// while the patient stays still. Once the configured calibration duration
// has been covered it reports completion, and finalize() turns the collected
// windows into a CalibrationProfile.

use serde::{Deserialize, Serialize};

use crate::analysis::features::windowed_rms;
use crate::audio::window::{WindowEnergyExtractor, WINDOW_DURATION_MS};
use crate::calibration::profile::CalibrationProfile;
use crate::config::{CalibrationConfig, QualityConfig};
use crate::error::AudioError;

/// Progress through the calibration prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalibrationProgress {
    pub windows_collected: usize,
    pub windows_needed: usize,
}

impl CalibrationProgress {
    pub fn is_complete(&self) -> bool {
        self.windows_collected >= self.windows_needed
    }

    /// Fraction complete in [0, 1]
    pub fn fraction(&self) -> f64 {
        if self.windows_needed == 0 {
            return 1.0;
        }
        (self.windows_collected as f64 / self.windows_needed as f64).min(1.0)
    }
}

/// Windows reserved up front; longer calibrations grow on demand
const RESERVED_WINDOWS: usize = 1024;

pub struct NoiseFloorCalibrator {
    config: CalibrationConfig,
    quality: QualityConfig,
    window_rms: Vec<f64>,
    windows_needed: usize,
}

impl NoiseFloorCalibrator {
    pub fn new(config: CalibrationConfig, quality: QualityConfig) -> Self {
        let windows_needed = Self::windows_for(config.anf_calibration_duration_seconds);
        Self {
            config,
            quality,
            window_rms: Vec::with_capacity(windows_needed.min(RESERVED_WINDOWS)),
            windows_needed,
        }
    }

    /// Number of 100 ms windows covering `seconds` (rounded up)
    pub fn windows_for(seconds: f64) -> usize {
        let ms = (seconds * 1000.0).max(0.0);
        (ms / WINDOW_DURATION_MS as f64).ceil() as usize
    }

    pub fn windows_needed(&self) -> usize {
        self.windows_needed
    }

    /// Record one window RMS
    ///
    /// # Returns
    /// `true` once enough windows have been collected. Extra windows beyond
    /// the calibration duration are ignored.
    pub fn add_window(&mut self, rms: f64) -> bool {
        if !self.is_complete() {
            self.window_rms.push(if rms.is_finite() { rms } else { 0.0 });
        }
        self.is_complete()
    }

    pub fn is_complete(&self) -> bool {
        self.window_rms.len() >= self.windows_needed
    }

    pub fn progress(&self) -> CalibrationProgress {
        CalibrationProgress {
            windows_collected: self.window_rms.len(),
            windows_needed: self.windows_needed,
        }
    }

    /// Build the profile from whatever has been collected so far
    pub fn finalize(&self) -> CalibrationProfile {
        CalibrationProfile::from_window_rms(&self.window_rms, &self.config, &self.quality)
    }

    /// Drop all collected windows
    pub fn reset(&mut self) {
        self.window_rms.clear();
    }
}

/// One-shot calibration of a buffer of already-filtered samples
///
/// Partitions `filtered` into 100 ms windows (a trailing partial window is
/// ignored) and builds the profile from their RMS values.
pub fn calibrate(
    filtered: &[f32],
    sample_rate: u32,
    config: &CalibrationConfig,
    quality: &QualityConfig,
) -> Result<CalibrationProfile, AudioError> {
    let samples_per_window = WindowEnergyExtractor::new(sample_rate)?.samples_per_window();
    let values = windowed_rms(filtered, samples_per_window, false);
    Ok(CalibrationProfile::from_window_rms(&values, config, quality))
}
