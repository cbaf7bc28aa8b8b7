use rustfft::{num_complex::Complex, FftPlanner};
use serde::{Deserialize, Serialize};

use super::windowing;

/// Harmonic series estimate for one chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarmonicsResult {
    /// Best fundamental in Hz, 0.0 when nothing periodic was found.
    pub fundamental_frequency: f64,
    /// `h * fundamental` for h = 1.. up to the harmonic limit or Nyquist.
    pub harmonics: Vec<f64>,
    /// Peak magnitude near each harmonic, relative to the strongest bin.
    pub harmonic_strengths: Vec<f64>,
    /// Fraction of in-band spectral energy sitting on the harmonic series.
    pub confidence: f64,
    /// Harmonic energy over residual energy.
    pub snr: f64,
}

impl HarmonicsResult {
    pub fn empty() -> Self {
        Self {
            fundamental_frequency: 0.0,
            harmonics: Vec::new(),
            harmonic_strengths: Vec::new(),
            confidence: 0.0,
            snr: 0.0,
        }
    }
}

impl Default for HarmonicsResult {
    fn default() -> Self {
        Self::empty()
    }
}

/// Upper bound reported for `snr` when the residual is effectively zero.
const MAX_SNR: f64 = 1000.0;

/// Spectral peaks weaker than this fraction of the maximum are ignored.
///
/// Hann sidelobes sit about 31 dB down (roughly 0.03 of the main lobe), so
/// this floor keeps only real partials.
const PEAK_FLOOR: f32 = 0.1;

/// FFT-based harmonic analysis of a single chunk.
///
/// A voice is a harmonic series: energy at f0, 2*f0, 3*f0 and so on. The
/// analyzer lists the local maxima of a zero-padded Hann spectrum, takes
/// the strongest ones and their 1/2 and 1/3 sub-multiples as candidate
/// fundamentals, and scores each candidate with a 1/h-weighted sum of the
/// peaks found at its harmonics.
///
/// A harmonic only counts when an actual spectral peak lies within one
/// unpadded bin of it. Measuring "whatever magnitude is near" instead lets
/// the f0/2 candidate collect the flank of the real peak's main lobe
/// whenever the window is short, and the analyzer then reports the octave
/// below with full confidence. With peak matching the true fundamental
/// outranks its octave above (which misses the odd harmonics) and its
/// octave below (whose only hits carry half the weight or less).
#[derive(Debug, Clone)]
pub struct HarmonicsAnalyzer {
    pub min_hz: f64,
    pub max_hz: f64,
    pub max_harmonics: usize,
    /// Zero-padding multiplier on the FFT size, for finer peak positions.
    pub zero_pad_factor: usize,
    pub max_candidate_peaks: usize,
}

impl Default for HarmonicsAnalyzer {
    fn default() -> Self {
        Self {
            min_hz: 60.0,
            max_hz: 1000.0,
            max_harmonics: 8,
            zero_pad_factor: 4,
            max_candidate_peaks: 5,
        }
    }
}

/// A local maximum of the magnitude spectrum.
#[derive(Debug, Clone, Copy)]
struct SpectralPeak {
    /// Parabolically interpolated position.
    freq_hz: f64,
    magnitude: f32,
}

struct Spectrum {
    magnitudes: Vec<f32>,
    bin_hz: f64,
    /// Half-width, in padded bins, of a Hann main lobe.
    lobe_bins: usize,
    /// Peaks above the floor, strongest first.
    peaks: Vec<SpectralPeak>,
    /// Frequency resolution of the unpadded transform. A harmonic matches
    /// a peak no further away than this.
    match_tolerance_hz: f64,
}

impl Spectrum {
    fn bin_of(&self, freq_hz: f64) -> usize {
        (freq_hz / self.bin_hz).round() as usize
    }

    fn lobe_range(&self, freq_hz: f64) -> std::ops::Range<usize> {
        let centre = self.bin_of(freq_hz);
        let start = centre.saturating_sub(self.lobe_bins).min(self.magnitudes.len());
        let end = (centre + self.lobe_bins + 1).min(self.magnitudes.len());
        start..end.max(start)
    }

    /// Strongest peak within the match tolerance of `freq_hz`.
    fn peak_at(&self, freq_hz: f64) -> Option<SpectralPeak> {
        // Sorted strongest first, so the first hit is the best one
        self.peaks
            .iter()
            .find(|p| (p.freq_hz - freq_hz).abs() <= self.match_tolerance_hz)
            .copied()
    }

    /// Parabolic interpolation of a local maximum at `bin`.
    fn interpolated_freq(magnitudes: &[f32], bin: usize, bin_hz: f64) -> f64 {
        if bin == 0 || bin + 1 >= magnitudes.len() {
            return bin as f64 * bin_hz;
        }
        let (a, b, c) = (
            magnitudes[bin - 1] as f64,
            magnitudes[bin] as f64,
            magnitudes[bin + 1] as f64,
        );
        let denom = a - 2.0 * b + c;
        let offset = if denom.abs() > 1e-12 {
            (0.5 * (a - c) / denom).clamp(-0.5, 0.5)
        } else {
            0.0
        };
        (bin as f64 + offset) * bin_hz
    }
}

impl HarmonicsAnalyzer {
    pub fn new(min_hz: f64, max_hz: f64) -> Self {
        Self {
            min_hz,
            max_hz,
            ..Self::default()
        }
    }

    /// Analyze one PCM chunk. Returns `HarmonicsResult::empty()` for
    /// silence, chunks too short to resolve the pitch range, or spectra
    /// without usable peaks.
    pub fn analyze(&self, chunk: &[i16], sample_rate: u32) -> HarmonicsResult {
        if chunk.len() < 64 || sample_rate == 0 {
            return HarmonicsResult::empty();
        }

        let spectrum = self.spectrum(chunk, sample_rate);
        let nyquist = sample_rate as f64 / 2.0;

        let band_start = spectrum.bin_of(self.min_hz).min(spectrum.magnitudes.len());
        let total_energy: f64 = spectrum.magnitudes[band_start..]
            .iter()
            .map(|&m| (m as f64).powi(2))
            .sum();
        if total_energy < 1e-12 {
            return HarmonicsResult::empty();
        }

        let mut best: Option<(f64, f64)> = None;
        for f0 in self.candidates(&spectrum) {
            let score = self.harmonic_sum(&spectrum, f0, nyquist);
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((f0, score));
            }
        }
        let Some((fundamental, _)) = best.filter(|&(_, s)| s > 0.0) else {
            return HarmonicsResult::empty();
        };

        let max_mag = spectrum.magnitudes.iter().copied().fold(0.0, f32::max) as f64;
        let mut harmonics = Vec::new();
        let mut strengths = Vec::new();
        let mut on_series = vec![false; spectrum.magnitudes.len()];

        for h in 1..=self.max_harmonics {
            let freq = fundamental * h as f64;
            if freq >= nyquist {
                break;
            }
            harmonics.push(freq);
            match spectrum.peak_at(freq) {
                Some(peak) => {
                    strengths.push(peak.magnitude as f64 / max_mag);
                    for bin in spectrum.lobe_range(peak.freq_hz) {
                        on_series[bin] = true;
                    }
                }
                None => strengths.push(0.0),
            }
        }

        let harmonic_energy: f64 = spectrum
            .magnitudes
            .iter()
            .zip(&on_series)
            .skip(band_start)
            .filter(|(_, &on)| on)
            .map(|(&m, _)| (m as f64).powi(2))
            .sum();
        let residual = (total_energy - harmonic_energy).max(0.0);

        let confidence = (harmonic_energy / total_energy).clamp(0.0, 1.0);
        let snr = if residual > total_energy * 1e-9 {
            (harmonic_energy / residual).min(MAX_SNR)
        } else {
            MAX_SNR
        };

        HarmonicsResult {
            fundamental_frequency: fundamental,
            harmonics,
            harmonic_strengths: strengths,
            confidence,
            snr,
        }
    }

    fn spectrum(&self, chunk: &[i16], sample_rate: u32) -> Spectrum {
        let normalized: Vec<f32> = chunk.iter().map(|&s| s as f32 / 32768.0).collect();
        let windowed = windowing::hanning(&normalized);

        // Zero padding interpolates the spectrum between the bins of the
        // chunk's own transform. It sharpens peak positions but does not
        // separate partials closer than the unpadded resolution.
        let pad = self.zero_pad_factor.max(1);
        let fft_size = chunk.len().next_power_of_two() * pad;

        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_size);

        let mut buf: Vec<Complex<f32>> = windowed.iter().map(|&s| Complex::new(s, 0.0)).collect();
        buf.resize(fft_size, Complex::new(0.0, 0.0));
        fft.process(&mut buf);

        let magnitudes: Vec<f32> = buf[..fft_size / 2].iter().map(|c| c.norm()).collect();
        let bin_hz = sample_rate as f64 / fft_size as f64;
        let peaks = Self::find_peaks(&magnitudes, bin_hz);
        // Hann main lobe spans ±2 bins of the unpadded transform
        let lobe_bins = 2 * fft_size / chunk.len();

        Spectrum {
            magnitudes,
            bin_hz,
            lobe_bins,
            peaks,
            match_tolerance_hz: sample_rate as f64 / chunk.len() as f64,
        }
    }

    /// Local maxima above `PEAK_FLOOR`, strongest first.
    fn find_peaks(mags: &[f32], bin_hz: f64) -> Vec<SpectralPeak> {
        let max_mag = mags.iter().copied().fold(0.0, f32::max);
        let mut bins: Vec<usize> = (1..mags.len().saturating_sub(1))
            .filter(|&k| {
                mags[k] > mags[k - 1] && mags[k] >= mags[k + 1] && mags[k] > max_mag * PEAK_FLOOR
            })
            .collect();
        bins.sort_by(|&a, &b| mags[b].total_cmp(&mags[a]));
        bins.into_iter()
            .map(|k| SpectralPeak {
                freq_hz: Spectrum::interpolated_freq(mags, k, bin_hz),
                magnitude: mags[k],
            })
            .collect()
    }

    fn candidates(&self, spectrum: &Spectrum) -> Vec<f64> {
        let mut candidates = Vec::new();
        for peak in spectrum
            .peaks
            .iter()
            .filter(|p| p.freq_hz >= self.min_hz)
            .take(self.max_candidate_peaks)
        {
            for divisor in 1..=3 {
                let c = peak.freq_hz / divisor as f64;
                if c >= self.min_hz && c <= self.max_hz {
                    candidates.push(c);
                }
            }
        }
        candidates
    }

    /// 1/h-weighted sum of the peaks sitting on `f0`'s harmonic series.
    fn harmonic_sum(&self, spectrum: &Spectrum, f0: f64, nyquist: f64) -> f64 {
        (1..=self.max_harmonics)
            .map(|h| (h, f0 * h as f64))
            .take_while(|&(_, f)| f < nyquist)
            .filter_map(|(h, f)| spectrum.peak_at(f).map(|p| p.magnitude as f64 / h as f64))
            .sum()
    }
}
