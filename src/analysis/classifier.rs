// EventClassifier - ordered rejection rules for segmented candidates
//
// Each candidate runs through four checks in a fixed order and the first
// rejection wins:
//
// 1. Transient: sharp onset, or an extreme peak/mean energy ratio confined to
//    a short high-energy span (taps, clatter)
// 2. Duration gate: longer than the breathing ceiling, or shorter than the
//    minimum event duration
// 3. Stationarity: long and flat energy (HVAC hum, fabric rub)
// 4. Burst fingerprint: duration inside the valid burst window
//
// Anything that survives is a gut sound. Every outcome carries a reason
// string for clinical review. Classification is a pure function of the
// candidate and the configuration.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::analysis::features::{
    coefficient_of_variation, mean, mean_square, ms_to_samples, rms, windowed_rms,
};
use crate::analysis::segmenter::EventCandidate;
use crate::audio::window::WINDOW_DURATION_MS;
use crate::config::ClassifierConfig;

/// Envelope block length for onset and energy-ratio analysis
/// (about 256 samples at 44.1 kHz)
pub const ENVELOPE_BLOCK_MS: f64 = 5.0;

/// Sub-window count from which the edge windows are left out of the
/// stationarity measure
pub const STATIONARITY_MIN_WINDOWS: usize = 4;

/// Fraction of peak block energy that counts as "high energy"
const HIGH_ENERGY_FRACTION: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventClass {
    GutSound,
    BreathingArtifact,
    Transient,
    ConstantNoise,
    Unknown,
}

impl EventClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventClass::GutSound => "gut_sound",
            EventClass::BreathingArtifact => "breathing_artifact",
            EventClass::Transient => "transient",
            EventClass::ConstantNoise => "constant_noise",
            EventClass::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for EventClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Measurements the rules were evaluated on
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventMetrics {
    /// Largest block-to-block envelope rise in the first 100 ms (the first
    /// block rises from silence), normalized by the candidate's mean
    /// envelope, per millisecond
    pub onset_slope_per_ms: f64,
    /// Peak block energy over mean block energy
    pub energy_ratio: f64,
    /// Time spent at or above half the peak block energy
    pub high_energy_ms: f64,
    /// variance / mean^2 of the interior 100 ms sub-window RMS values
    pub energy_variation: f64,
}

/// Immutable classification of one candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifiedEvent {
    pub start_time_ms: u64,
    pub end_time_ms: u64,
    pub duration_ms: u64,
    pub peak_rms: f64,
    pub classification: EventClass,
    /// True iff `classification` is `GutSound`
    pub accepted: bool,
    pub reason: String,
    pub metrics: EventMetrics,
}

pub struct EventClassifier {
    config: ClassifierConfig,
}

impl EventClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Classify a closed candidate
    ///
    /// An open candidate is treated as ending where its captured samples end.
    pub fn classify(&self, candidate: &EventCandidate) -> ClassifiedEvent {
        let start_time_ms = candidate.start_time_ms;
        let end_time_ms = candidate
            .end_time_ms
            .unwrap_or_else(|| start_time_ms + candidate.captured_ms());
        let duration_ms = end_time_ms.saturating_sub(start_time_ms);

        let metrics = measure(&candidate.samples, candidate.sample_rate);
        let peak_rms = peak_window_rms(&candidate.samples, candidate.sample_rate);
        let (classification, reason) = self.decide(duration_ms, &metrics);

        debug!(
            "[Classifier] {}..{} ms -> {} ({})",
            start_time_ms, end_time_ms, classification, reason
        );

        ClassifiedEvent {
            start_time_ms,
            end_time_ms,
            duration_ms,
            peak_rms,
            classification,
            accepted: classification == EventClass::GutSound,
            reason,
            metrics,
        }
    }

    fn decide(&self, duration_ms: u64, m: &EventMetrics) -> (EventClass, String) {
        let c = &self.config;

        // 1. Transient
        if m.onset_slope_per_ms > c.transient_onset_slope_threshold {
            return (
                EventClass::Transient,
                format!(
                    "transient: onset slope {:.3}/ms exceeds {:.3}/ms",
                    m.onset_slope_per_ms, c.transient_onset_slope_threshold
                ),
            );
        }
        if m.energy_ratio > c.transient_energy_ratio_threshold
            && m.high_energy_ms < c.transient_reject_duration_ms as f64
        {
            return (
                EventClass::Transient,
                format!(
                    "transient: peak/mean energy {:.1} exceeds {:.1} with only {:.0} ms of high energy (< {} ms)",
                    m.energy_ratio,
                    c.transient_energy_ratio_threshold,
                    m.high_energy_ms,
                    c.transient_reject_duration_ms
                ),
            );
        }

        // 2. Duration gate
        if duration_ms > c.max_event_duration_ms {
            return (
                EventClass::BreathingArtifact,
                format!(
                    "breathing_artifact: duration {} ms exceeds {} ms ceiling",
                    duration_ms, c.max_event_duration_ms
                ),
            );
        }
        if duration_ms < c.min_event_duration_ms {
            return (
                EventClass::Unknown,
                format!(
                    "unknown: duration {} ms below {} ms minimum event duration",
                    duration_ms, c.min_event_duration_ms
                ),
            );
        }

        // 3. Stationarity
        if m.energy_variation < c.stationarity_variance_threshold
            && duration_ms > c.constant_noise_reject_ms
        {
            return (
                EventClass::ConstantNoise,
                format!(
                    "constant_noise: energy variation {:.4} below {:.4} over {} ms (> {} ms)",
                    m.energy_variation,
                    c.stationarity_variance_threshold,
                    duration_ms,
                    c.constant_noise_reject_ms
                ),
            );
        }

        // 4. Burst fingerprint
        if duration_ms < c.burst_min_duration_ms {
            return (
                EventClass::Unknown,
                format!(
                    "unknown: too short, {} ms below {} ms burst minimum",
                    duration_ms, c.burst_min_duration_ms
                ),
            );
        }
        if duration_ms > c.burst_max_duration_ms {
            return (
                EventClass::Unknown,
                format!(
                    "unknown: too long, {} ms above {} ms burst maximum",
                    duration_ms, c.burst_max_duration_ms
                ),
            );
        }

        (
            EventClass::GutSound,
            format!(
                "gut_sound: {} ms burst within {}-{} ms, energy variation {:.3}",
                duration_ms, c.burst_min_duration_ms, c.burst_max_duration_ms, m.energy_variation
            ),
        )
    }
}

/// Compute every rule input for a candidate's samples
pub fn measure(samples: &[f32], sample_rate: u32) -> EventMetrics {
    if samples.is_empty() || sample_rate == 0 {
        return EventMetrics::default();
    }

    let block_samples = ms_to_samples(ENVELOPE_BLOCK_MS, sample_rate).max(1);
    let block_ms = block_samples as f64 * 1000.0 / sample_rate as f64;
    let envelope = windowed_rms(samples, block_samples, true);
    let energies: Vec<f64> = samples.chunks(block_samples).map(mean_square).collect();

    let window_samples = ms_to_samples(WINDOW_DURATION_MS as f64, sample_rate);
    let onset_blocks = window_samples.div_ceil(block_samples).max(1);

    let mean_envelope = mean(&envelope);
    let mut previous = 0.0;
    let mut max_rise = 0.0f64;
    for &level in envelope.iter().take(onset_blocks) {
        max_rise = max_rise.max(level - previous);
        previous = level;
    }
    let onset_slope_per_ms = if mean_envelope > 0.0 {
        max_rise / block_ms / mean_envelope
    } else {
        0.0
    };

    let peak_energy = energies.iter().copied().fold(0.0f64, f64::max);
    let mean_energy = mean(&energies);
    let energy_ratio = if mean_energy > 0.0 {
        peak_energy / mean_energy
    } else {
        0.0
    };
    let high_energy_ms = energies
        .iter()
        .filter(|&&e| peak_energy > 0.0 && e >= peak_energy * HIGH_ENERGY_FRACTION)
        .count() as f64
        * block_ms;

    let energy_variation = if window_samples == 0 {
        0.0
    } else {
        coefficient_of_variation(interior(&windowed_rms(samples, window_samples, false)))
    };

    EventMetrics {
        onset_slope_per_ms,
        energy_ratio,
        high_energy_ms,
        energy_variation,
    }
}

/// Sub-windows without the first and last once there are enough of them
///
/// The edge windows of a candidate hold the threshold crossing and the
/// filter ring-out, which are only partly covered by the source.
fn interior(windows: &[f64]) -> &[f64] {
    if windows.len() >= STATIONARITY_MIN_WINDOWS {
        &windows[1..windows.len() - 1]
    } else {
        windows
    }
}

/// Largest 100 ms sub-window RMS, counting a trailing partial window
fn peak_window_rms(samples: &[f32], sample_rate: u32) -> f64 {
    let window_samples = ms_to_samples(WINDOW_DURATION_MS as f64, sample_rate);
    if window_samples == 0 {
        return rms(samples);
    }
    windowed_rms(samples, window_samples, true)
        .into_iter()
        .fold(0.0f64, f64::max)
}

#[cfg(test)]
#[path = "classifier_tests.rs"]
mod tests;
