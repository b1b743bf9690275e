//! End-to-end pipeline tests
//!
//! These tests drive the public library API the way a capture collaborator
//! would:
//! - Calibration followed by segmentation of a known burst
//! - Whole-recording analysis of the synthetic scenarios
//! - Ordering and duration invariants of the emitted events
//! - Zero-activity recordings

use gut_motility::analysis::{EventClass, EventSegmenter};
use gut_motility::audio::window::WindowEnergyExtractor;
use gut_motility::calibration::calibrate;
use gut_motility::config::AppConfig;
use gut_motility::testing::signals::{gaussian_noise, mix_into, seconds_to_samples, sine};
use gut_motility::testing::{render_scenario, render_scenario_with_events, SyntheticScenario};
use gut_motility::{analyze_recording, ClassifiedEvent, SessionReport};
use rand::rngs::StdRng;
use rand::SeedableRng;

const RATE: u32 = 8000;
const SCENARIO_SECONDS: f64 = 40.0;

fn analyze_scenario(scenario: SyntheticScenario, seed: u64) -> SessionReport {
    let samples = render_scenario(scenario, RATE, SCENARIO_SECONDS, seed);
    analyze_recording(&AppConfig::default(), RATE, &samples).expect("analysis should succeed")
}

fn assert_ordered_and_disjoint(events: &[ClassifiedEvent]) {
    for pair in events.windows(2) {
        assert!(
            pair[0].start_time_ms < pair[1].start_time_ms,
            "events out of order: {} then {}",
            pair[0].start_time_ms,
            pair[1].start_time_ms
        );
        assert!(
            pair[0].end_time_ms <= pair[1].start_time_ms,
            "events overlap: [{}, {}) and [{}, {})",
            pair[0].start_time_ms,
            pair[0].end_time_ms,
            pair[1].start_time_ms,
            pair[1].end_time_ms
        );
    }
}

fn accepted_duration_ms(events: &[ClassifiedEvent]) -> u64 {
    events
        .iter()
        .filter(|e| e.accepted)
        .map(|e| e.duration_ms)
        .sum()
}

#[test]
fn test_calibrated_threshold_segments_single_burst() {
    let sample_rate = 44_100;
    let config = AppConfig::default();
    let mut rng = StdRng::seed_from_u64(2024);

    let calibration = gaussian_noise(seconds_to_samples(10.0, sample_rate), 0.01, &mut rng);
    let profile = calibrate(
        &calibration,
        sample_rate,
        &config.calibration,
        &config.quality,
    )
    .unwrap();

    assert_eq!(profile.window_count, 100);
    assert!(!profile.low_confidence);
    assert!((profile.noise_mean - 0.01).abs() < 0.0005);
    let expected = profile.noise_mean + 2.5 * profile.noise_std_dev;
    assert!((profile.adaptive_threshold - expected).abs() < 1e-12);

    // Quieter background, then a 400 ms burst with RMS 0.05 at t = 1 s
    let mut monitoring = gaussian_noise(seconds_to_samples(3.0, sample_rate), 0.005, &mut rng);
    let burst = sine(
        200.0,
        0.05 * std::f32::consts::SQRT_2,
        seconds_to_samples(0.4, sample_rate),
        sample_rate,
    );
    mix_into(&mut monitoring, &burst, seconds_to_samples(1.0, sample_rate));

    let mut extractor = WindowEnergyExtractor::new(sample_rate).unwrap();
    let mut segmenter =
        EventSegmenter::new(profile.adaptive_threshold, &config.segmentation, sample_rate);
    let mut candidates = Vec::new();
    extractor.process(&monitoring, |window, samples| {
        if let Some(candidate) = segmenter.process_window(&window, samples) {
            candidates.push(candidate);
        }
    });

    assert_eq!(candidates.len(), 1, "expected exactly one candidate");
    let candidate = &candidates[0];
    assert_eq!(candidate.start_time_ms, 1000);
    assert_eq!(candidate.duration_ms(), Some(400));
    assert_eq!(candidate.samples.len(), seconds_to_samples(0.4, sample_rate));
}

#[test]
fn test_active_scenario_detects_bursts() {
    let (samples, injected) =
        render_scenario_with_events(SyntheticScenario::Active, RATE, SCENARIO_SECONDS, 7);
    let report = analyze_recording(&AppConfig::default(), RATE, &samples).unwrap();

    let calibration = report.calibration.as_ref().expect("calibration completed");
    assert!(!calibration.low_confidence);

    // Every burst is segmented and accepted within one window of its onset
    assert!(injected.len() >= 5);
    for burst in &injected {
        let onset_ms = burst.monitoring_start_ms();
        let matched = report.events.iter().find(|e| {
            e.classification == EventClass::GutSound
                && (e.start_time_ms as f64 - onset_ms).abs() <= 100.0
        });
        assert!(
            matched.is_some(),
            "burst at {onset_ms} ms ({} s long) not accepted: {:?}",
            burst.duration_seconds,
            report.events
        );
    }
    assert!(report.analytics.accepted_event_count >= injected.len());

    assert!(report.analytics.events_per_minute > 0.0);
    assert!(report.analytics.motility_index > 0);
    assert!(report.analytics.has_activity());

    let gut_sounds: Vec<_> = report
        .events
        .iter()
        .filter(|e| e.classification == EventClass::GutSound)
        .collect();
    assert!(gut_sounds.iter().all(|e| e.accepted));
    assert!(gut_sounds.iter().any(|e| e.duration_ms >= 300));
}

#[test]
fn test_tone_scenario_rejects_constant_noise() {
    let report = analyze_scenario(SyntheticScenario::Tone, 11);

    let constant = report
        .analytics
        .rejection_breakdown
        .get(&EventClass::ConstantNoise)
        .copied()
        .unwrap_or(0);
    // Six tones fit in the monitoring period
    assert!(constant >= 3, "expected tones rejected, got {}", constant);

    for event in report
        .events
        .iter()
        .filter(|e| e.classification == EventClass::ConstantNoise)
    {
        assert!(!event.accepted);
        assert!(event.duration_ms > 1500);
        assert!(!event.reason.is_empty());
    }
}

#[test]
fn test_abrupt_tones_near_stationarity_limit_are_constant_noise() {
    let mut rng = StdRng::seed_from_u64(31);
    let calibration_seconds = 10.0;
    let mut samples = gaussian_noise(seconds_to_samples(26.0, RATE), 0.003, &mut rng);

    // (monitoring onset, length) in seconds; no fades so the filter rings out
    let tones = [(1.0, 1.6), (5.05, 1.75), (10.0, 1.9)];
    for (onset, length) in tones {
        let tone = sine(200.0, 0.1, seconds_to_samples(length, RATE), RATE);
        mix_into(
            &mut samples,
            &tone,
            seconds_to_samples(calibration_seconds + onset, RATE),
        );
    }

    let report = analyze_recording(&AppConfig::default(), RATE, &samples).unwrap();
    let long: Vec<_> = report
        .events
        .iter()
        .filter(|e| e.duration_ms > 1500)
        .collect();
    assert_eq!(long.len(), 3, "{:?}", report.events);
    for (event, expected_start) in long.iter().zip([1000, 5000, 10_000]) {
        assert_eq!(event.start_time_ms, expected_start);
        assert_eq!(
            event.classification,
            EventClass::ConstantNoise,
            "{} ms tone: {}",
            event.duration_ms,
            event.reason
        );
        assert!(!event.accepted);
    }
}

#[test]
fn test_tap_scenario_rejects_transients() {
    let report = analyze_scenario(SyntheticScenario::Taps, 5);

    let transients = report
        .events
        .iter()
        .filter(|e| e.classification == EventClass::Transient)
        .count();
    assert!(transients >= 10, "expected taps rejected, got {}", transients);
    assert!(report.analytics.accepted_event_count < transients);
    assert_eq!(
        report.analytics.rejection_breakdown.get(&EventClass::Transient),
        Some(&transients)
    );
}

#[test]
fn test_events_ordered_and_within_recording() {
    for (seed, scenario) in SyntheticScenario::ALL.into_iter().enumerate() {
        let report = analyze_scenario(scenario, seed as u64);
        assert_ordered_and_disjoint(&report.events);

        let recording_ms = (report.analytics.recording_duration_seconds * 1000.0).round() as u64;
        assert!(
            accepted_duration_ms(&report.events) <= recording_ms,
            "{}: accepted durations exceed the recording",
            scenario
        );
        for event in &report.events {
            assert_eq!(event.accepted, event.classification == EventClass::GutSound);
            assert!(event.end_time_ms <= recording_ms);
        }
    }
}

#[test]
fn test_silent_recording_has_zero_motility() {
    // 10 s calibration plus 180 s of monitoring
    let samples = vec![0.0f32; seconds_to_samples(190.0, RATE)];
    let report = analyze_recording(&AppConfig::default(), RATE, &samples).unwrap();

    let calibration = report.calibration.expect("calibration completed");
    assert!(calibration.low_confidence);

    assert!(report.events.is_empty());
    assert_eq!(report.analytics.motility_index, 0);
    assert_eq!(report.analytics.events_per_minute, 0.0);
    assert_eq!(report.analytics.recording_duration_seconds, 180.0);
    assert_eq!(report.analytics.total_quiet_seconds, 180.0);
    assert!(report.analytics.activity_timeline.iter().all(|&b| b == 0.0));
}

#[test]
fn test_analysis_is_deterministic() {
    let a = analyze_scenario(SyntheticScenario::Active, 99);
    let b = analyze_scenario(SyntheticScenario::Active, 99);
    assert_eq!(a, b);
}
