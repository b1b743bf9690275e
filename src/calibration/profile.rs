// CalibrationProfile - immutable ambient noise floor snapshot
//
// Built once per session from the RMS of the quiet calibration windows and
// never mutated afterwards. A retry builds a new profile from scratch.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::analysis::features::{mean_and_std_dev, snr_db};
use crate::analysis::quality::QualityTier;
use crate::config::{CalibrationConfig, QualityConfig};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalibrationProfile {
    /// Mean of the calibration window RMS values
    pub noise_mean: f64,
    /// Sample standard deviation of the calibration window RMS values
    pub noise_std_dev: f64,
    /// Live segmentation trigger, `noise_mean + k * noise_std_dev`
    pub adaptive_threshold: f64,
    /// k used to build `adaptive_threshold`
    pub threshold_multiplier: f64,
    /// Fixed reference gut-sound RMS against `noise_mean`; 0.0 when the
    /// floor is silent
    pub estimated_snr_db: f64,
    pub quality_tier: QualityTier,
    /// Number of 100 ms windows the profile was built from
    pub window_count: usize,
    /// Too few windows or an all-silent floor; the caller decides whether
    /// to proceed or retry
    pub low_confidence: bool,
}

impl CalibrationProfile {
    /// Build a profile from per-window RMS values
    ///
    /// Never fails: an empty, short, or silent calibration produces a
    /// low-confidence profile with the hard threshold floor and a poor tier.
    pub fn from_window_rms(
        window_rms: &[f64],
        config: &CalibrationConfig,
        quality: &QualityConfig,
    ) -> Self {
        let (noise_mean, noise_std_dev) = mean_and_std_dev(window_rms);
        let window_count = window_rms.len();
        let estimated_snr_db = snr_db(config.reference_signal_rms, noise_mean);

        if window_count < config.min_calibration_windows {
            warn!(
                "[Calibration] only {} of {} minimum windows, using threshold floor {:.5}",
                window_count, config.min_calibration_windows, config.threshold_floor_rms
            );
            return Self {
                noise_mean,
                noise_std_dev,
                adaptive_threshold: config.threshold_floor_rms,
                threshold_multiplier: config.anf_threshold_multiplier,
                estimated_snr_db,
                quality_tier: QualityTier::Poor,
                window_count,
                low_confidence: true,
            };
        }

        let silent = noise_mean <= 0.0;
        let computed = noise_mean + config.anf_threshold_multiplier * noise_std_dev;
        let adaptive_threshold = computed.max(config.threshold_floor_rms);
        let quality_tier = if silent {
            QualityTier::Poor
        } else {
            QualityTier::from_snr_db(estimated_snr_db, quality)
        };

        if silent {
            warn!("[Calibration] noise floor is silent, check the microphone connection");
        }

        Self {
            noise_mean,
            noise_std_dev,
            adaptive_threshold,
            threshold_multiplier: config.anf_threshold_multiplier,
            estimated_snr_db,
            quality_tier,
            window_count,
            low_confidence: silent,
        }
    }
}
