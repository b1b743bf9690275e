// Energy statistics shared by the calibrator, the classifier and the
// quality assessor.
//
// All functions are pure and total: empty input and zero means resolve to
// 0.0 instead of NaN, so no sentinel check is needed downstream.

/// Root-mean-square of a sample slice (0.0 for an empty slice)
pub fn rms(samples: &[f32]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_squares: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
    (sum_squares / samples.len() as f64).sqrt()
}

/// Mean square (energy) of a sample slice
pub fn mean_square(samples: &[f32]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().map(|&s| (s as f64) * (s as f64)).sum::<f64>() / samples.len() as f64
}

/// RMS of consecutive `window_len` sample blocks
///
/// When `include_partial` is set, a trailing block shorter than
/// `window_len` contributes one extra value.
pub fn windowed_rms(samples: &[f32], window_len: usize, include_partial: bool) -> Vec<f64> {
    if window_len == 0 {
        return Vec::new();
    }
    if include_partial {
        samples.chunks(window_len).map(rms).collect()
    } else {
        samples.chunks_exact(window_len).map(rms).collect()
    }
}

/// Arithmetic mean (0.0 for no values)
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample mean and sample standard deviation (Bessel-corrected)
///
/// Fewer than two values yield a standard deviation of 0.0.
pub fn mean_and_std_dev(values: &[f64]) -> (f64, f64) {
    let m = mean(values);
    if values.len() < 2 {
        return (m, 0.0);
    }
    let variance =
        values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / (values.len() - 1) as f64;
    (m, variance.sqrt())
}

/// Coefficient of variation as `variance / mean^2` (population variance)
///
/// Returns 0.0 when the mean is zero or fewer than two values exist.
pub fn coefficient_of_variation(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    if m <= f64::EPSILON {
        return 0.0;
    }
    let variance = values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / values.len() as f64;
    variance / (m * m)
}

/// Signal-to-noise ratio in dB, `20 * log10(signal / noise)`
///
/// Returns 0.0 when either level is non-positive or non-finite.
pub fn snr_db(signal_rms: f64, noise_rms: f64) -> f64 {
    if !(signal_rms.is_finite() && noise_rms.is_finite()) || signal_rms <= 0.0 || noise_rms <= 0.0
    {
        return 0.0;
    }
    20.0 * (signal_rms / noise_rms).log10()
}

/// Convert a sample count to whole milliseconds
pub fn samples_to_ms(samples: u64, sample_rate: u32) -> u64 {
    if sample_rate == 0 {
        return 0;
    }
    samples * 1000 / sample_rate as u64
}

/// Convert milliseconds to a sample count (rounded to nearest)
pub fn ms_to_samples(ms: f64, sample_rate: u32) -> usize {
    (ms * sample_rate as f64 / 1000.0).round().max(0.0) as usize
}
