// SignalQualityAssessor - live SNR feedback for the operator
//
// Runs on every window regardless of segmentation state and compares the
// window RMS to the calibrated noise mean. The result only drives operator
// feedback ("find a quieter room"); it never gates classification.

use serde::{Deserialize, Serialize};

use crate::analysis::features::snr_db;
use crate::audio::window::AudioWindow;
use crate::calibration::CalibrationProfile;
use crate::config::QualityConfig;

/// Slack on the dB cut points; `20 * log10` of an exact ratio such as 10x
/// can land a few ulps below the nominal value
pub const SNR_CUT_TOLERANCE_DB: f64 = 1e-9;

/// Recording quality tier derived from an SNR in dB
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityTier {
    Poor,
    Fair,
    Good,
    Excellent,
}

impl QualityTier {
    /// Map an SNR onto the configured cut points (inclusive lower bounds)
    pub fn from_snr_db(snr_db: f64, config: &QualityConfig) -> Self {
        let snr_db = snr_db + SNR_CUT_TOLERANCE_DB;
        if snr_db >= config.snr_excellent_threshold {
            QualityTier::Excellent
        } else if snr_db >= config.snr_good_threshold {
            QualityTier::Good
        } else if snr_db >= config.snr_fair_threshold {
            QualityTier::Fair
        } else {
            QualityTier::Poor
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            QualityTier::Poor => "poor",
            QualityTier::Fair => "fair",
            QualityTier::Good => "good",
            QualityTier::Excellent => "excellent",
        }
    }
}

/// Quality of one window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityReading {
    pub time_ms: u64,
    pub rms: f64,
    pub snr_db: f64,
    pub tier: QualityTier,
    /// SNR reaches `anfMinSNR`
    pub is_suitable: bool,
}

pub struct SignalQualityAssessor {
    noise_mean: f64,
    config: QualityConfig,
}

impl SignalQualityAssessor {
    pub fn new(profile: &CalibrationProfile, config: QualityConfig) -> Self {
        Self {
            noise_mean: profile.noise_mean,
            config,
        }
    }

    pub fn assess(&self, window: &AudioWindow) -> QualityReading {
        let snr = snr_db(window.rms, self.noise_mean);
        QualityReading {
            time_ms: window.start_time_ms,
            rms: window.rms,
            snr_db: snr,
            tier: QualityTier::from_snr_db(snr, &self.config),
            is_suitable: snr + SNR_CUT_TOLERANCE_DB >= self.config.anf_min_snr,
        }
    }
}
