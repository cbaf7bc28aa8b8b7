use std::f32::consts::PI;

/// Hann window coefficients of length `n`: `w(k) = 0.5 * (1 - cos(2πk / (n - 1)))`.
///
/// Zero at both edges, 1.0 at the centre. Lengths 0 and 1 yield an empty
/// window and a single unit coefficient respectively.
pub fn hann_coefficients(n: usize) -> Vec<f32> {
    match n {
        0 => Vec::new(),
        1 => vec![1.0],
        _ => {
            let scale = 2.0 * PI / (n - 1) as f32;
            (0..n).map(|k| 0.5 * (1.0 - (scale * k as f32).cos())).collect()
        }
    }
}

/// Apply a Hann window to a chunk before autocorrelation or FFT, so the
/// abrupt chunk edges do not leak energy across the spectrum.
pub fn hanning(samples: &[f32]) -> Vec<f32> {
    hann_coefficients(samples.len())
        .iter()
        .zip(samples)
        .map(|(w, s)| w * s)
        .collect()
}
