/// Reference pitch for absolute cent values (A4).
pub const A4_HZ: f64 = 440.0;

/// Cents of `freq_hz` relative to A4.
///
/// 1200 cents = one octave, so 880 Hz → +1200 and 220 Hz → -1200.
/// Callers must pass a positive frequency.
pub fn hz_to_cents(freq_hz: f64) -> f64 {
    1200.0 * (freq_hz / A4_HZ).log2()
}

/// Signed cent difference of `f1` relative to `f2`: `1200 * log2(f1 / f2)`.
/// Returns 0.0 when either frequency is not a positive pitch.
pub fn cent_diff(f1: f64, f2: f64) -> f64 {
    if f1 > 0.0 && f2 > 0.0 {
        hz_to_cents(f1) - hz_to_cents(f2)
    } else {
        0.0
    }
}

/// Distance between two frequencies in octaves, always non-negative.
pub fn octave_distance(a: f64, b: f64) -> f64 {
    if a <= 0.0 || b <= 0.0 {
        return f64::INFINITY;
    }
    (a / b).log2().abs()
}

/// A pitch sample is voiced when it is a positive finite frequency.
pub fn is_voiced(freq_hz: f64) -> bool {
    freq_hz.is_finite() && freq_hz > 0.0
}

/// Clamp anything that is not a usable pitch (negative, NaN, infinite) to 0.0.
pub fn sanitize_pitch(freq_hz: f64) -> f64 {
    if is_voiced(freq_hz) {
        freq_hz
    } else {
        0.0
    }
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation. 0.0 for fewer than two values.
pub fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|&v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}
