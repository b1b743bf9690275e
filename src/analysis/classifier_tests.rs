use super::*;
use crate::config::{ClassifierConfig, CANONICAL_MAX_EVENT_DURATION_MS};
use crate::testing::signals::{hann_burst, sine};

const RATE: u32 = 44_100;

fn classifier() -> EventClassifier {
    EventClassifier::new(ClassifierConfig::default())
}

fn samples_for_ms(ms: u64) -> usize {
    (ms as usize * RATE as usize) / 1000
}

fn candidate(duration_ms: u64, samples: Vec<f32>) -> EventCandidate {
    EventCandidate::closed(1_000, 1_000 + duration_ms, samples, RATE)
}

/// Back-to-back Hann bursts filling `duration_ms`
fn bursty(duration_ms: u64, burst_ms: u64) -> Vec<f32> {
    let mut out = Vec::new();
    let bursts = (duration_ms / burst_ms).max(1);
    for _ in 0..bursts {
        out.extend(hann_burst(200.0, 0.2, samples_for_ms(burst_ms), RATE));
    }
    out
}

#[test]
fn test_hann_burst_is_gut_sound() {
    let event = classifier().classify(&candidate(400, bursty(400, 400)));
    assert_eq!(event.classification, EventClass::GutSound);
    assert!(event.accepted);
    assert_eq!(event.duration_ms, 400);
    assert_eq!(event.start_time_ms, 1_000);
    assert_eq!(event.end_time_ms, 1_400);
    assert!(event.reason.starts_with("gut_sound"));
    assert!(event.peak_rms > 0.05);
}

#[test]
fn test_duration_exactly_at_ceiling_is_accepted() {
    let samples = bursty(CANONICAL_MAX_EVENT_DURATION_MS, 400);
    let event = classifier().classify(&candidate(CANONICAL_MAX_EVENT_DURATION_MS, samples));
    assert_eq!(event.classification, EventClass::GutSound, "{}", event.reason);
    assert!(event.accepted);
}

#[test]
fn test_duration_one_ms_over_ceiling_is_breathing() {
    let samples = bursty(CANONICAL_MAX_EVENT_DURATION_MS, 400);
    let event = classifier().classify(&candidate(CANONICAL_MAX_EVENT_DURATION_MS + 1, samples));
    assert_eq!(event.classification, EventClass::BreathingArtifact);
    assert!(!event.accepted);
    assert!(event.reason.contains("2001 ms"));
}

#[test]
fn test_long_stationary_tone_is_constant_noise() {
    let tone = sine(200.0, 0.1, samples_for_ms(2000), RATE);
    let event = classifier().classify(&candidate(2000, tone));
    assert_eq!(event.classification, EventClass::ConstantNoise, "{}", event.reason);
    assert!(!event.accepted);
    assert!(event.metrics.energy_variation < 0.05);
}

#[test]
fn test_tone_with_partial_edge_windows_is_constant_noise() {
    // 1.8 s tone entered at a low level and followed by 100 ms of silence
    let mut samples = sine(200.0, 0.1, samples_for_ms(1800), RATE);
    for s in samples.iter_mut().take(samples_for_ms(50)) {
        *s *= 0.3;
    }
    samples.extend(std::iter::repeat(0.0).take(samples_for_ms(100)));

    let event = classifier().classify(&candidate(1900, samples));
    assert_eq!(event.classification, EventClass::ConstantNoise, "{}", event.reason);
    assert!(!event.accepted);
    assert!(event.metrics.energy_variation < 0.01);
}

#[test]
fn test_stationarity_keeps_edges_of_short_candidates() {
    let windows = [0.1, 0.2, 0.3];
    assert_eq!(interior(&windows), &windows[..]);
    let windows = [0.0, 0.2, 0.2, 0.0];
    assert_eq!(interior(&windows), &[0.2, 0.2][..]);
}

#[test]
fn test_short_stationary_tone_is_not_constant_noise() {
    let tone = sine(200.0, 0.1, samples_for_ms(800), RATE);
    let event = classifier().classify(&candidate(800, tone));
    assert!(event.metrics.energy_variation < 0.05);
    assert_eq!(event.classification, EventClass::GutSound, "{}", event.reason);
}

#[test]
fn test_sharp_onset_is_transient() {
    let mut samples = sine(200.0, 0.001, samples_for_ms(100), RATE);
    let click = sine(200.0, 0.8, 512, RATE);
    samples[2048..2048 + 512].copy_from_slice(&click);

    let event = classifier().classify(&candidate(100, samples));
    assert_eq!(event.classification, EventClass::Transient);
    assert!(!event.accepted);
    assert!(event.metrics.onset_slope_per_ms > 0.5);
    assert!(event.metrics.energy_ratio > 6.0);
    assert!(event.metrics.high_energy_ms < 100.0);
}

#[test]
fn test_energy_ratio_rule_alone_rejects_short_spike() {
    // Onset check disabled; only the peak/mean energy rule can fire
    let config = ClassifierConfig {
        transient_onset_slope_threshold: f64::MAX,
        ..ClassifierConfig::default()
    };
    let mut samples = sine(200.0, 0.001, samples_for_ms(300), RATE);
    let click = sine(200.0, 0.8, 512, RATE);
    samples[8000..8000 + 512].copy_from_slice(&click);

    let event = EventClassifier::new(config).classify(&candidate(300, samples));
    assert_eq!(event.classification, EventClass::Transient);
    assert!(event.reason.contains("high energy"));
}

#[test]
fn test_transient_check_runs_before_duration_gate() {
    let mut samples = sine(200.0, 0.001, samples_for_ms(2500), RATE);
    let click = sine(200.0, 0.8, 512, RATE);
    samples[2048..2048 + 512].copy_from_slice(&click);

    let event = classifier().classify(&candidate(2500, samples));
    assert_eq!(event.classification, EventClass::Transient);
}

#[test]
fn test_too_short_is_unknown() {
    let samples = bursty(10, 10);
    let event = classifier().classify(&candidate(10, samples));
    assert_eq!(event.classification, EventClass::Unknown);
    assert!(event.reason.contains("below"));
}

#[test]
fn test_burst_window_above_range_is_unknown() {
    let config = ClassifierConfig {
        burst_max_duration_ms: 1000,
        ..ClassifierConfig::default()
    };
    let event = EventClassifier::new(config).classify(&candidate(1200, bursty(1200, 400)));
    assert_eq!(event.classification, EventClass::Unknown);
    assert!(event.reason.contains("too long"));
}

#[test]
fn test_empty_candidate_is_defined() {
    let event = classifier().classify(&candidate(0, Vec::new()));
    assert_eq!(event.classification, EventClass::Unknown);
    assert_eq!(event.peak_rms, 0.0);
    assert!(event.metrics.energy_ratio.is_finite());
}

#[test]
fn test_classification_is_idempotent() {
    let c = candidate(600, bursty(600, 300));
    let classifier = classifier();
    let first = classifier.classify(&c);
    for _ in 0..5 {
        assert_eq!(classifier.classify(&c), first);
    }
}

#[test]
fn test_accepted_iff_gut_sound() {
    let classifier = classifier();
    let cases = vec![
        candidate(400, bursty(400, 400)),
        candidate(2500, bursty(2400, 400)),
        candidate(2000, sine(200.0, 0.1, samples_for_ms(2000), RATE)),
        candidate(5, bursty(5, 5)),
    ];
    for c in &cases {
        let event = classifier.classify(c);
        assert_eq!(event.accepted, event.classification == EventClass::GutSound);
        assert!(!event.reason.is_empty());
    }
}

#[test]
fn test_class_serializes_snake_case() {
    assert_eq!(
        serde_json::to_string(&EventClass::BreathingArtifact).unwrap(),
        "\"breathing_artifact\""
    );
    assert_eq!(EventClass::ConstantNoise.to_string(), "constant_noise");
}
