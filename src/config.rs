//! Configuration for the acoustic isolation and classification pipeline
//!
//! Every tunable threshold lives here as a serde field with a documented
//! default, so research and clinical-sensitivity tuning can override any
//! single option from a JSON file without touching the others. JSON keys use
//! the camelCase option names (`anfThresholdMultiplier`, `burstMaxDurationMs`, ...).
//!
//! Conflicting constants found in earlier firmware generations are resolved
//! to one canonical set below; the alternatives stay available as named
//! constants for sensitivity studies.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::ConfigError;

/// Canonical calibration length. Earlier builds used 3 s.
pub const CANONICAL_CALIBRATION_DURATION_SECONDS: f64 = 10.0;
/// Short calibration used by the quick-start flow of earlier builds.
pub const QUICK_CALIBRATION_DURATION_SECONDS: f64 = 3.0;

/// Longest accepted calibration; calibration windows are held in memory.
pub const MAX_CALIBRATION_DURATION_SECONDS: f64 = 600.0;

/// Canonical k in `noiseMean + k * noiseStdDev`. Earlier builds used 2.2.
pub const CANONICAL_THRESHOLD_MULTIPLIER: f64 = 2.5;
/// More sensitive multiplier from the earlier build.
pub const SENSITIVE_THRESHOLD_MULTIPLIER: f64 = 2.2;

/// Canonical breathing ceiling and burst upper bound.
pub const CANONICAL_MAX_EVENT_DURATION_MS: u64 = 2000;
/// Canonical burst lower bound. The later generation used 500 ms.
pub const CANONICAL_BURST_MIN_DURATION_MS: u64 = 20;
/// Minimum duration for constant-noise rejection (the older 1.5 s ceiling).
pub const CANONICAL_CONSTANT_NOISE_REJECT_MS: u64 = 1500;

/// Complete application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AppConfig {
    pub calibration: CalibrationConfig,
    pub filter: FilterConfig,
    pub segmentation: SegmentationConfig,
    pub classifier: ClassifierConfig,
    pub quality: QualityConfig,
    pub aggregation: AggregationConfig,
    pub audio: AudioConfig,
}

/// Ambient noise floor calibration parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CalibrationConfig {
    /// Length of the quiet calibration prefix
    pub anf_calibration_duration_seconds: f64,
    /// k in `adaptiveThreshold = noiseMean + k * noiseStdDev`
    pub anf_threshold_multiplier: f64,
    /// Profiles built from fewer windows are flagged low-confidence
    pub min_calibration_windows: usize,
    /// Lowest adaptive threshold ever produced (RMS)
    pub threshold_floor_rms: f64,
    /// Fixed RMS assumed representative of a true gut sound, used for the
    /// calibration SNR estimate
    pub reference_signal_rms: f64,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            anf_calibration_duration_seconds: CANONICAL_CALIBRATION_DURATION_SECONDS,
            anf_threshold_multiplier: CANONICAL_THRESHOLD_MULTIPLIER,
            min_calibration_windows: 10,
            threshold_floor_rms: 0.0005,
            reference_signal_rms: 0.05,
        }
    }
}

/// Band-limiting filter chain parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FilterConfig {
    pub gut_band_low_hz: f64,
    pub gut_band_high_hz: f64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            gut_band_low_hz: 100.0,
            gut_band_high_hz: 450.0,
        }
    }
}

/// Segmentation state machine parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SegmentationConfig {
    /// Open candidates are force-closed at this length to bound memory
    pub max_candidate_duration_ms: u64,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            max_candidate_duration_ms: 10_000,
        }
    }
}

/// Event classifier thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClassifierConfig {
    pub min_event_duration_ms: u64,
    /// Breathing-artifact ceiling: longer candidates are rejected
    pub max_event_duration_ms: u64,
    /// High-energy portion shorter than this marks a transient
    pub transient_reject_duration_ms: u64,
    /// Onset slope limit, in multiples of the candidate's mean envelope per ms
    pub transient_onset_slope_threshold: f64,
    /// Peak-to-mean block energy ratio considered extreme
    pub transient_energy_ratio_threshold: f64,
    /// Coefficient of variation (variance / mean^2) below which a candidate is stationary
    pub stationarity_variance_threshold: f64,
    /// Stationary candidates longer than this are constant noise
    pub constant_noise_reject_ms: u64,
    pub burst_min_duration_ms: u64,
    pub burst_max_duration_ms: u64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            min_event_duration_ms: 20,
            max_event_duration_ms: CANONICAL_MAX_EVENT_DURATION_MS,
            transient_reject_duration_ms: 100,
            transient_onset_slope_threshold: 0.5,
            transient_energy_ratio_threshold: 6.0,
            stationarity_variance_threshold: 0.05,
            constant_noise_reject_ms: CANONICAL_CONSTANT_NOISE_REJECT_MS,
            burst_min_duration_ms: CANONICAL_BURST_MIN_DURATION_MS,
            burst_max_duration_ms: CANONICAL_MAX_EVENT_DURATION_MS,
        }
    }
}

/// Live signal quality parameters (dB)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct QualityConfig {
    #[serde(rename = "anfMinSNR", alias = "anfMinSnr")]
    pub anf_min_snr: f64,
    pub snr_excellent_threshold: f64,
    pub snr_good_threshold: f64,
    pub snr_fair_threshold: f64,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            anf_min_snr: 6.0,
            snr_excellent_threshold: 20.0,
            snr_good_threshold: 12.0,
            snr_fair_threshold: 6.0,
        }
    }
}

/// Session aggregation parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AggregationConfig {
    /// Event rate mapped to 100 on the normalized rate scale
    pub reference_events_per_minute: f64,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            reference_events_per_minute: 15.0,
        }
    }
}

/// Audio transport configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AudioConfig {
    pub sample_rate: u32,
    /// Size of each pooled buffer in samples
    pub buffer_size: usize,
    /// Number of pooled buffers between capture and analysis
    pub buffer_pool_size: usize,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            buffer_size: 2048,
            buffer_pool_size: 64,
        }
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue {
            field,
            reason: format!("must be a positive finite number (got {})", value),
        })
    }
}

fn ordered<T: PartialOrd + std::fmt::Display>(
    lower: &'static str,
    lower_value: T,
    upper: &'static str,
    upper_value: T,
) -> Result<(), ConfigError> {
    if lower_value <= upper_value {
        Ok(())
    } else {
        Err(ConfigError::InvalidRange {
            lower,
            upper,
            reason: format!("{} > {}", lower_value, upper_value),
        })
    }
}

impl AppConfig {
    /// Check every option and every cross-option constraint.
    ///
    /// Called by `MotilitySession::new` and the loaders, so a malformed
    /// configuration is rejected before the first sample is processed.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let cal = &self.calibration;
        positive(
            "anfCalibrationDurationSeconds",
            cal.anf_calibration_duration_seconds,
        )?;
        if cal.anf_calibration_duration_seconds > MAX_CALIBRATION_DURATION_SECONDS {
            return Err(ConfigError::InvalidValue {
                field: "anfCalibrationDurationSeconds",
                reason: format!(
                    "{} s exceeds the {} s maximum",
                    cal.anf_calibration_duration_seconds, MAX_CALIBRATION_DURATION_SECONDS
                ),
            });
        }
        positive("anfThresholdMultiplier", cal.anf_threshold_multiplier)?;
        positive("thresholdFloorRms", cal.threshold_floor_rms)?;
        positive("referenceSignalRms", cal.reference_signal_rms)?;
        if cal.min_calibration_windows < 2 {
            return Err(ConfigError::InvalidValue {
                field: "minCalibrationWindows",
                reason: "at least two windows are needed for a standard deviation".to_string(),
            });
        }

        self.validate_band(self.audio.sample_rate)?;

        let cls = &self.classifier;
        if cls.min_event_duration_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "minEventDurationMs",
                reason: "must be greater than zero".to_string(),
            });
        }
        ordered(
            "minEventDurationMs",
            cls.min_event_duration_ms,
            "maxEventDurationMs",
            cls.max_event_duration_ms,
        )?;
        ordered(
            "burstMinDurationMs",
            cls.burst_min_duration_ms,
            "burstMaxDurationMs",
            cls.burst_max_duration_ms,
        )?;
        if self.segmentation.max_candidate_duration_ms <= cls.max_event_duration_ms {
            return Err(ConfigError::InvalidRange {
                lower: "maxEventDurationMs",
                upper: "maxCandidateDurationMs",
                reason: format!(
                    "candidate cap {} ms must exceed the breathing ceiling {} ms",
                    self.segmentation.max_candidate_duration_ms, cls.max_event_duration_ms
                ),
            });
        }
        positive(
            "transientOnsetSlopeThreshold",
            cls.transient_onset_slope_threshold,
        )?;
        positive(
            "transientEnergyRatioThreshold",
            cls.transient_energy_ratio_threshold,
        )?;
        positive(
            "stationarityVarianceThreshold",
            cls.stationarity_variance_threshold,
        )?;

        let q = &self.quality;
        ordered(
            "snrFairThreshold",
            q.snr_fair_threshold,
            "snrGoodThreshold",
            q.snr_good_threshold,
        )?;
        ordered(
            "snrGoodThreshold",
            q.snr_good_threshold,
            "snrExcellentThreshold",
            q.snr_excellent_threshold,
        )?;

        positive(
            "referenceEventsPerMinute",
            self.aggregation.reference_events_per_minute,
        )?;

        if self.audio.buffer_size == 0 || self.audio.buffer_pool_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "bufferSize",
                reason: "buffer size and pool size must be greater than zero".to_string(),
            });
        }

        Ok(())
    }

    /// Check that the gut band fits under the Nyquist frequency of `sample_rate`.
    pub fn validate_band(&self, sample_rate: u32) -> Result<(), ConfigError> {
        if sample_rate == 0 {
            return Err(ConfigError::InvalidValue {
                field: "sampleRate",
                reason: "must be greater than zero".to_string(),
            });
        }
        let band = &self.filter;
        positive("gutBandLowHz", band.gut_band_low_hz)?;
        if band.gut_band_low_hz >= band.gut_band_high_hz {
            return Err(ConfigError::InvalidRange {
                lower: "gutBandLowHz",
                upper: "gutBandHighHz",
                reason: format!("{} >= {}", band.gut_band_low_hz, band.gut_band_high_hz),
            });
        }
        let nyquist = sample_rate as f64 / 2.0;
        if band.gut_band_high_hz >= nyquist {
            return Err(ConfigError::InvalidValue {
                field: "gutBandHighHz",
                reason: format!(
                    "{} Hz is not below the Nyquist frequency {} Hz",
                    band.gut_band_high_hz, nyquist
                ),
            });
        }
        Ok(())
    }

    /// Parse a JSON document and validate it
    pub fn from_json(contents: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = serde_json::from_str(contents).map_err(|err| {
            ConfigError::Parse {
                reason: err.to_string(),
            }
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON file
    ///
    /// # Returns
    /// * `Ok(AppConfig)` - Parsed and validated configuration
    /// * `Err(ConfigError)` - File unreadable, JSON invalid, or values rejected
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(&path).map_err(|err| ConfigError::Read {
            path: path.as_ref().display().to_string(),
            reason: err.to_string(),
        })?;
        let config = Self::from_json(&contents)?;
        log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
        Ok(config)
    }

    /// Load configuration, falling back to defaults on any error
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load_from_file(&path) {
            Ok(config) => config,
            Err(err) => {
                log::warn!(
                    "[Config] {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err.to_string()
                );
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.filter.gut_band_low_hz, 100.0);
        assert_eq!(config.filter.gut_band_high_hz, 450.0);
        assert_eq!(config.audio.sample_rate, 44_100);
    }

    /// Pins the resolution of the conflicting constants (3 s vs 10 s
    /// calibration, 2.2 vs 2.5 sigma, 20 ms-1.5 s vs 500 ms-2 s burst window).
    #[test]
    fn test_canonical_defaults_resolve_conflicting_constants() {
        let config = AppConfig::default();
        assert_eq!(config.calibration.anf_calibration_duration_seconds, 10.0);
        assert_ne!(
            config.calibration.anf_calibration_duration_seconds,
            QUICK_CALIBRATION_DURATION_SECONDS
        );
        assert_eq!(config.calibration.anf_threshold_multiplier, 2.5);
        assert_ne!(
            config.calibration.anf_threshold_multiplier,
            SENSITIVE_THRESHOLD_MULTIPLIER
        );
        assert_eq!(config.classifier.burst_min_duration_ms, 20);
        assert_eq!(config.classifier.burst_max_duration_ms, 2000);
        assert_eq!(config.classifier.max_event_duration_ms, 2000);
        assert_eq!(config.classifier.constant_noise_reject_ms, 1500);
        // A 2 s stationary tone must reach the stationarity rule rather than
        // the breathing ceiling, so the ceiling cannot sit below it.
        assert!(
            config.classifier.max_event_duration_ms >= config.classifier.constant_noise_reject_ms
        );
    }

    #[test]
    fn test_min_event_above_max_is_setup_error() {
        let mut config = AppConfig::default();
        config.classifier.min_event_duration_ms = 3000;
        match config.validate() {
            Err(ConfigError::InvalidRange { lower, upper, .. }) => {
                assert_eq!(lower, "minEventDurationMs");
                assert_eq!(upper, "maxEventDurationMs");
            }
            other => panic!("Expected InvalidRange, got {:?}", other),
        }
    }

    #[test]
    fn test_oversized_calibration_duration_is_setup_error() {
        let json = r#"{ "calibration": { "anfCalibrationDurationSeconds": 1e17 } }"#;
        match AppConfig::from_json(json) {
            Err(ConfigError::InvalidValue { field, .. }) => {
                assert_eq!(field, "anfCalibrationDurationSeconds");
            }
            other => panic!("Expected InvalidValue, got {:?}", other),
        }

        let mut config = AppConfig::default();
        config.calibration.anf_calibration_duration_seconds = MAX_CALIBRATION_DURATION_SECONDS;
        assert!(config.validate().is_ok());
        config.calibration.anf_calibration_duration_seconds = f64::INFINITY;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_band_above_nyquist_rejected() {
        let config = AppConfig::default();
        assert!(config.validate_band(800).is_err());
        assert!(config.validate_band(8000).is_ok());
    }

    #[test]
    fn test_inverted_snr_cut_points_rejected() {
        let mut config = AppConfig::default();
        config.quality.snr_good_threshold = 25.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidRange { .. })
        ));
    }

    #[test]
    fn test_candidate_cap_must_exceed_breathing_ceiling() {
        let mut config = AppConfig::default();
        config.segmentation.max_candidate_duration_ms = 2000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_overrides_single_option() {
        let json = r#"{ "calibration": { "anfThresholdMultiplier": 2.2 },
                        "quality": { "anfMinSNR": 9.0 } }"#;
        let config = AppConfig::from_json(json).unwrap();
        assert_eq!(config.calibration.anf_threshold_multiplier, 2.2);
        assert_eq!(config.calibration.anf_calibration_duration_seconds, 10.0);
        assert_eq!(config.quality.anf_min_snr, 9.0);
        assert_eq!(config.classifier, ClassifierConfig::default());
    }

    #[test]
    fn test_json_roundtrip_uses_option_names() {
        let config = AppConfig::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        assert!(json.contains("anfCalibrationDurationSeconds"));
        assert!(json.contains("anfMinSNR"));
        assert!(json.contains("stationarityVarianceThreshold"));

        let parsed = AppConfig::from_json(&json).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_malformed_json_is_parse_error() {
        assert!(matches!(
            AppConfig::from_json("{ not json"),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = AppConfig::load_or_default("/nonexistent/motility.json");
        assert_eq!(config, AppConfig::default());
        assert!(matches!(
            AppConfig::load_from_file("/nonexistent/motility.json"),
            Err(ConfigError::Read { .. })
        ));
    }
}
