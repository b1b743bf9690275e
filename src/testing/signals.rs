// Synthetic signal generators
//
// All generators are pure functions of their arguments; noise takes an
// explicit seeded RNG so a scenario renders identically on every run.

use std::f32::consts::PI;
use std::fmt;
use std::str::FromStr;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::CANONICAL_CALIBRATION_DURATION_SECONDS;

/// Background noise RMS used by every rendered scenario
pub const BACKGROUND_NOISE_RMS: f32 = 0.003;

/// Convert seconds to a sample count at `sample_rate`
pub fn seconds_to_samples(seconds: f64, sample_rate: u32) -> usize {
    (seconds.max(0.0) * sample_rate as f64).round() as usize
}

/// Zero-mean Gaussian noise with the given RMS (Box-Muller)
pub fn gaussian_noise(len: usize, rms: f32, rng: &mut StdRng) -> Vec<f32> {
    let mut out = Vec::with_capacity(len);
    while out.len() < len {
        // gen::<f32>() is in [0, 1); keep u1 away from zero for ln()
        let u1: f32 = rng.gen::<f32>().max(f32::MIN_POSITIVE);
        let u2: f32 = rng.gen();
        let radius = (-2.0 * u1.ln()).sqrt();
        let theta = 2.0 * PI * u2;
        out.push(rms * radius * theta.cos());
        if out.len() < len {
            out.push(rms * radius * theta.sin());
        }
    }
    out
}

/// Constant-amplitude sine
pub fn sine(freq_hz: f32, amplitude: f32, len: usize, sample_rate: u32) -> Vec<f32> {
    (0..len)
        .map(|i| amplitude * (2.0 * PI * freq_hz * i as f32 / sample_rate as f32).sin())
        .collect()
}

/// Sine under a Hann envelope, a smooth gut-like burst
pub fn hann_burst(freq_hz: f32, amplitude: f32, len: usize, sample_rate: u32) -> Vec<f32> {
    if len < 2 {
        return vec![0.0; len];
    }
    let last = (len - 1) as f32;
    sine(freq_hz, amplitude, len, sample_rate)
        .into_iter()
        .enumerate()
        .map(|(i, s)| s * 0.5 * (1.0 - (2.0 * PI * i as f32 / last).cos()))
        .collect()
}

/// Linear fade-in and fade-out over `fade_len` samples at each end
pub fn fade_edges(signal: &mut [f32], fade_len: usize) {
    let fade_len = fade_len.min(signal.len() / 2);
    let len = signal.len();
    for i in 0..fade_len {
        let gain = i as f32 / fade_len as f32;
        signal[i] *= gain;
        signal[len - 1 - i] *= gain;
    }
}

/// Instant-attack decaying 300 Hz ring, 30 ms long (a knock on the sensor)
pub fn tap(amplitude: f32, sample_rate: u32) -> Vec<f32> {
    let len = seconds_to_samples(0.03, sample_rate);
    let tau = 0.004 * sample_rate as f32;
    (0..len)
        .map(|i| {
            let t = i as f32;
            amplitude * (-t / tau).exp() * (2.0 * PI * 300.0 * t / sample_rate as f32).sin()
        })
        .collect()
}

/// Add `source` into `target` starting at `offset`, clipping at the end
pub fn mix_into(target: &mut [f32], source: &[f32], offset: usize) {
    if offset >= target.len() {
        return;
    }
    for (t, s) in target[offset..].iter_mut().zip(source) {
        *t += *s;
    }
}

/// Canned recordings for demos and end-to-end tests
///
/// Every scenario starts with a quiet calibration prefix of
/// `CANONICAL_CALIBRATION_DURATION_SECONDS` of background noise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyntheticScenario {
    /// Background noise only
    Quiet,
    /// Hann bursts of 300-600 ms every 2-4 s
    Active,
    /// 1.8 s constant 200 Hz tones (10 ms fades) every 5 s
    Tone,
    /// Sharp taps every 2 s
    Taps,
}

impl SyntheticScenario {
    pub const ALL: [SyntheticScenario; 4] = [
        SyntheticScenario::Quiet,
        SyntheticScenario::Active,
        SyntheticScenario::Tone,
        SyntheticScenario::Taps,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            SyntheticScenario::Quiet => "quiet",
            SyntheticScenario::Active => "active",
            SyntheticScenario::Tone => "tone",
            SyntheticScenario::Taps => "taps",
        }
    }
}

impl fmt::Display for SyntheticScenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SyntheticScenario {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SyntheticScenario::ALL
            .iter()
            .copied()
            .find(|scenario| scenario.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                format!("unknown scenario '{}', expected quiet, active, tone or taps", s)
            })
    }
}

/// A synthetic event mixed into a scenario, in recording seconds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InjectedEvent {
    pub start_seconds: f64,
    pub duration_seconds: f64,
}

impl InjectedEvent {
    /// Onset in milliseconds from the end of the calibration prefix
    pub fn monitoring_start_ms(&self) -> f64 {
        (self.start_seconds - CANONICAL_CALIBRATION_DURATION_SECONDS) * 1000.0
    }
}

/// Render `seconds` of a scenario at `sample_rate`
///
/// Event onsets fall on whole seconds (or 100 ms steps for bursts) measured
/// from the end of the calibration prefix.
pub fn render_scenario(
    scenario: SyntheticScenario,
    sample_rate: u32,
    seconds: f64,
    seed: u64,
) -> Vec<f32> {
    render_scenario_with_events(scenario, sample_rate, seconds, seed).0
}

/// Render a scenario and list the events mixed into it
pub fn render_scenario_with_events(
    scenario: SyntheticScenario,
    sample_rate: u32,
    seconds: f64,
    seed: u64,
) -> (Vec<f32>, Vec<InjectedEvent>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let total = seconds_to_samples(seconds, sample_rate);
    let mut signal = gaussian_noise(total, BACKGROUND_NOISE_RMS, &mut rng);
    let mut injected = Vec::new();

    let prefix = CANONICAL_CALIBRATION_DURATION_SECONDS;
    let mut t = prefix + 1.0;

    match scenario {
        SyntheticScenario::Quiet => {}
        SyntheticScenario::Active => {
            while t < seconds - 1.0 {
                let burst_ms = rng.gen_range(3..=6) * 100;
                let burst = hann_burst(
                    rng.gen_range(150.0..350.0),
                    0.2,
                    seconds_to_samples(burst_ms as f64 / 1000.0, sample_rate),
                    sample_rate,
                );
                mix_into(&mut signal, &burst, seconds_to_samples(t, sample_rate));
                injected.push(InjectedEvent {
                    start_seconds: t,
                    duration_seconds: burst_ms as f64 / 1000.0,
                });
                t += rng.gen_range(20..=40) as f64 / 10.0;
            }
        }
        SyntheticScenario::Tone => {
            while t + 1.8 < seconds {
                let mut tone =
                    sine(200.0, 0.1, seconds_to_samples(1.8, sample_rate), sample_rate);
                fade_edges(&mut tone, seconds_to_samples(0.01, sample_rate));
                mix_into(&mut signal, &tone, seconds_to_samples(t, sample_rate));
                injected.push(InjectedEvent {
                    start_seconds: t,
                    duration_seconds: 1.8,
                });
                t += 5.0;
            }
        }
        SyntheticScenario::Taps => {
            let knock = tap(0.8, sample_rate);
            while t < seconds - 0.5 {
                mix_into(&mut signal, &knock, seconds_to_samples(t + 0.02, sample_rate));
                injected.push(InjectedEvent {
                    start_seconds: t + 0.02,
                    duration_seconds: knock.len() as f64 / sample_rate as f64,
                });
                t += 2.0;
            }
        }
    }

    (signal, injected)
}
